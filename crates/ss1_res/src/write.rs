//! Types for writing resource files
//!

use binrw::BinWrite;
use byteorder::{LittleEndian, WriteBytesExt};
use indexmap::IndexMap;
use std::fmt::Debug;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument, Level};

use crate::compression::PayloadWriter;
use crate::error::{Error, Result};
use crate::types::{
    BlockTable, ContainerHeader, ContentType, Directory, DirectoryEntry, ResourceId,
    DIRECTORY_OFFSET_POSITION, FIRST_RESOURCE_OFFSET, LEGACY_PADDING_SIZE, MAX_BLOCK_COUNT,
    MAX_RESOURCE_LENGTH, RESOURCE_ALIGNMENT,
};
use crate::view::{ResourceProperties, ResourceViewer};

fn lock<T>(mutex: &Mutex<T>) -> io::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "block buffer lock poisoned"))
}

#[derive(Debug, Default)]
struct BlockBuffer {
    data: Vec<u8>,
    sealed: bool,
}

/// Buffers the data of one block until its resource is finalized.
///
/// Handles are cheap to clone and can be moved to other threads. Once the resource has been
/// finalized, writing to the block fails.
#[derive(Debug, Clone)]
pub struct BlockWriter {
    id: ResourceId,
    buffer: Arc<Mutex<BlockBuffer>>,
}

impl BlockWriter {
    fn new(id: ResourceId) -> Self {
        Self {
            id,
            buffer: Arc::default(),
        }
    }

    /// The resource this block belongs to
    pub fn resource_id(&self) -> ResourceId {
        self.id
    }

    fn seal(&self) -> io::Result<Vec<u8>> {
        let mut buffer = lock(&self.buffer)?;
        buffer.sealed = true;
        Ok(std::mem::take(&mut buffer.data))
    }
}

impl Write for BlockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = lock(&self.buffer)?;
        if buffer.sealed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "Resource has already been finalized",
            ));
        }
        buffer.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CompoundBlocks {
    writers: Vec<BlockWriter>,
    sealed: bool,
}

/// Creates the blocks of a compound resource.
///
/// Blocks are stored in the order they were created, regardless of the order they are filled in.
#[derive(Debug, Clone)]
pub struct CompoundWriter {
    id: ResourceId,
    blocks: Arc<Mutex<CompoundBlocks>>,
}

impl CompoundWriter {
    fn new(id: ResourceId) -> Self {
        Self {
            id,
            blocks: Arc::default(),
        }
    }

    /// The resource the blocks belong to
    pub fn resource_id(&self) -> ResourceId {
        self.id
    }

    /// Appends a new, empty block to the resource
    pub fn create_block(&self) -> io::Result<BlockWriter> {
        let mut blocks = lock(&self.blocks)?;
        if blocks.sealed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "Resource has already been finalized",
            ));
        }
        let writer = BlockWriter::new(self.id);
        blocks.writers.push(writer.clone());
        Ok(writer)
    }

    /// Number of blocks created so far
    pub fn block_count(&self) -> io::Result<usize> {
        Ok(lock(&self.blocks)?.writers.len())
    }

    fn seal(&self) -> io::Result<Vec<Vec<u8>>> {
        let mut blocks = lock(&self.blocks)?;
        blocks.sealed = true;
        blocks.writers.iter().map(BlockWriter::seal).collect()
    }
}

#[derive(Debug)]
enum PendingBlocks {
    Simple(BlockWriter),
    Compound(CompoundWriter),
}

#[derive(Debug)]
struct PendingResource {
    id: ResourceId,
    properties: ResourceProperties,
    blocks: PendingBlocks,
}

/// Resource file generator
///
/// ```
/// # fn doit() -> ss1_res::error::Result<()>
/// # {
/// use ss1_res::{ContentType, ResourceId, ResourceWriter};
/// use std::io::Write;
///
/// // We use a buffer here, though you'd normally use a `File`
/// let mut res = ResourceWriter::new(std::io::Cursor::new(Vec::new()))?;
///
/// res.create_resource(ResourceId(0x0100), ContentType(0x07), false)?;
/// res.write_all(b"Hello, World!")?;
///
/// let compound = res.create_compound_resource(ResourceId(0x0101), ContentType(0x30), true)?;
/// compound.create_block()?.write_all(b"first")?;
/// compound.create_block()?.write_all(b"second")?;
///
/// // Apply the changes you've made.
/// let _data = res.into_inner()?;
///
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct ResourceWriter<W: Write + Seek> {
    inner: W,
    position: u64,
    entries: IndexMap<ResourceId, DirectoryEntry>,
    pending: Option<PendingResource>,
    finished: bool,
}

impl<W: Write + Seek> Debug for ResourceWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceWriter")
            .field("position", &self.position)
            .field("resources", &self.entries.len())
            .field("pending", &self.pending)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<W: Write + Seek> ResourceWriter<W> {
    /// Initializes the file, writing its header.
    ///
    /// The writer must be positioned at the start of an empty stream.
    #[instrument(skip(inner), err)]
    pub fn new(mut inner: W) -> Result<ResourceWriter<W>> {
        ContainerHeader::default().write(&mut inner)?;

        Ok(ResourceWriter {
            inner,
            position: FIRST_RESOURCE_OFFSET as u64,
            entries: IndexMap::new(),
            pending: None,
            finished: false,
        })
    }

    /// Returns true once [`ResourceWriter::finish`] has completed.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of resources written or started so far
    pub fn len(&self) -> usize {
        self.entries.len() + usize::from(self.pending.is_some())
    }

    /// Whether no resource has been started yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new simple resource, finalizing the previous one.
    ///
    /// Data can be written either through the returned block or through this writer itself.
    #[instrument(skip(self, content_type), err)]
    pub fn create_resource(
        &mut self,
        id: ResourceId,
        content_type: impl Into<ContentType>,
        compressed: bool,
    ) -> Result<BlockWriter> {
        let properties = ResourceProperties::builder()
            .content_type(content_type)
            .compressed(compressed)
            .build();
        self.start_resource(id, properties)?;

        let block = BlockWriter::new(id);
        self.pending = Some(PendingResource {
            id,
            properties,
            blocks: PendingBlocks::Simple(block.clone()),
        });
        Ok(block)
    }

    /// Start a new compound resource, finalizing the previous one.
    #[instrument(skip(self, content_type), err)]
    pub fn create_compound_resource(
        &mut self,
        id: ResourceId,
        content_type: impl Into<ContentType>,
        compressed: bool,
    ) -> Result<CompoundWriter> {
        let properties = ResourceProperties::builder()
            .content_type(content_type)
            .compressed(compressed)
            .compound(true)
            .build();
        self.start_resource(id, properties)?;

        let compound = CompoundWriter::new(id);
        self.pending = Some(PendingResource {
            id,
            properties,
            blocks: PendingBlocks::Compound(compound.clone()),
        });
        Ok(compound)
    }

    fn start_resource(&mut self, id: ResourceId, properties: ResourceProperties) -> Result<()> {
        if self.finished {
            return Err(Error::WriterFinished);
        }
        self.finish_resource()?;

        if self.entries.contains_key(&id) {
            return Err(Error::DuplicateResource(id));
        }

        debug!(%id, ?properties, offset = self.position, "starting resource");
        Ok(())
    }

    #[instrument(skip(self), err)]
    fn finish_resource(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let id = pending.id;
        let compressed = pending.properties.compressed;

        let (unpacked, payload) = match pending.blocks {
            PendingBlocks::Simple(block) => {
                let data = block.seal()?;
                check_length(id, data.len())?;

                let mut payload = PayloadWriter::new(Vec::new(), compressed);
                payload.write_all(&data)?;
                (data.len(), payload.finalize()?)
            }
            PendingBlocks::Compound(compound) => {
                let blocks = compound.seal()?;
                let padding = if id.has_legacy_padding() {
                    LEGACY_PADDING_SIZE
                } else {
                    0
                };
                if blocks.len() > MAX_BLOCK_COUNT {
                    return Err(Error::TooManyBlocks {
                        id,
                        count: blocks.len(),
                    });
                }
                let lengths: Vec<usize> = blocks.iter().map(Vec::len).collect();
                let unpacked = BlockTable::size_for(lengths.len()) as usize
                    + padding as usize
                    + lengths.iter().sum::<usize>();
                check_length(id, unpacked)?;

                let mut header = Cursor::new(Vec::with_capacity(unpacked));
                BlockTable::for_lengths(&lengths, padding).write(&mut header)?;

                let mut payload = PayloadWriter::new(header.into_inner(), compressed);
                payload.write_all(&vec![0u8; padding as usize])?;
                for block in &blocks {
                    payload.write_all(block)?;
                }
                (unpacked, payload.finalize()?)
            }
        };
        check_length(id, payload.len())?;

        self.inner.write_all(&payload)?;
        let end = self.position + payload.len() as u64;
        let aligned = align_resource(end);
        self.inner.write_all(&vec![0u8; (aligned - end) as usize])?;
        self.position = aligned;

        let entry = DirectoryEntry::new(
            id,
            pending.properties.content_type,
            pending.properties.flags(),
            unpacked as u32,
            payload.len() as u32,
        );
        self.entries.insert(id, entry);

        debug!(%id, unpacked, packed = payload.len(), "finished resource");
        Ok(())
    }

    /// Finish the last resource and write the directory
    ///
    /// Any operation on the writer afterwards fails with [`Error::WriterFinished`].
    #[instrument(skip(self), err)]
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::WriterFinished);
        }
        self.finish_resource()?;

        let directory_offset = u32::try_from(self.position).map_err(|_| {
            io::Error::new(io::ErrorKind::Other, "Resource file exceeds 4 GiB")
        })?;

        let directory = Directory {
            first_resource_offset: FIRST_RESOURCE_OFFSET,
            entries: self.entries.values().copied().collect(),
        };
        directory.write(&mut self.inner)?;
        let end = self.inner.stream_position()?;

        self.inner
            .seek(SeekFrom::Start(DIRECTORY_OFFSET_POSITION))?;
        self.inner.write_u32::<LittleEndian>(directory_offset)?;
        self.inner.seek(SeekFrom::Start(end))?;
        self.inner.flush()?;

        self.finished = true;
        debug!(directory_offset, resources = self.entries.len(), "finished resource file");

        Ok(())
    }

    /// Finish the file if needed and return the inner writer
    ///
    /// One should normally not append any data to the end of the file.
    pub fn into_inner(mut self) -> Result<W> {
        if !self.finished {
            self.finish()?;
        }
        Ok(self.inner)
    }
}

impl<W: Write + Seek> Write for ResourceWriter<W> {
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size=buf.len()) )]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.pending {
            Some(PendingResource {
                blocks: PendingBlocks::Simple(block),
                ..
            }) => block.write(buf),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "No simple resource has been started",
            )),
        }
    }

    #[instrument(skip(self), err)]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn check_length(id: ResourceId, length: usize) -> Result<()> {
    if length > MAX_RESOURCE_LENGTH as usize {
        return Err(Error::ResourceTooLarge { id, length });
    }
    Ok(())
}

fn align_resource(offset: u64) -> u64 {
    let relative = offset - FIRST_RESOURCE_OFFSET as u64;
    FIRST_RESOURCE_OFFSET as u64 + crate::read::align(relative, RESOURCE_ALIGNMENT as u64)
}

/// Writes every resource of `source` into a new resource file.
///
/// Resources keep their order, identifiers and properties. Simple resources take the first block
/// of their provider.
#[instrument(skip_all, err)]
pub fn write<W, V>(target: W, source: &mut V) -> Result<W>
where
    W: Write + Seek,
    V: ResourceViewer + ?Sized,
{
    let mut writer = ResourceWriter::new(target)?;

    for id in source.ids() {
        let properties = source.properties(id)?;
        let mut provider = source.provider(id)?;

        if properties.compound {
            let compound = writer.create_compound_resource(
                id,
                properties.content_type,
                properties.compressed,
            )?;
            for index in 0..provider.block_count() {
                let mut block = compound.create_block()?;
                io::copy(&mut provider.block(index)?, &mut block)?;
            }
        } else {
            let mut block =
                writer.create_resource(id, properties.content_type, properties.compressed)?;
            if provider.block_count() > 0 {
                io::copy(&mut provider.block(0)?, &mut block)?;
            }
        }
    }

    writer.into_inner()
}

#[cfg(test)]
mod test {
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::types::{ContentType, ResourceId};
    use crate::write::ResourceWriter;
    use std::io::{Cursor, Write};

    fn header(directory_offset: u32) -> Vec<u8> {
        let mut data = b"LG Res File v2\r\n\x1A".to_vec();
        data.resize(0x7C, 0x00);
        data.extend_from_slice(&directory_offset.to_le_bytes());
        data
    }

    #[traced_test]
    #[test]
    fn res_empty_write() -> Result<()> {
        let mut expected = header(0x80);
        #[rustfmt::skip]
        expected.extend_from_slice(&[
            // Directory
            0x00, 0x00,
            0x80, 0x00, 0x00, 0x00,
        ]);

        let writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        let result = writer.into_inner()?;
        assert_str_eq!(
            format!("{:02X?}", *result.get_ref()),
            format!("{:02X?}", expected)
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn res_uncompressed_simple_write() -> Result<()> {
        let mut expected = header(0x8C);
        #[rustfmt::skip]
        expected.extend_from_slice(&[
            // Data (11) + padding (1)
            0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x57, 0x6F, 0x72, 0x6C, 0x64, 0x00,
            // Directory
            0x01, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x0B, 0x00, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x07,
        ]);

        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        writer.create_resource(ResourceId(0x0100), ContentType(0x07), false)?;
        writer.write_all(b"Hello World")?;

        let result = writer.into_inner()?;
        assert_str_eq!(
            format!("{:02X?}", *result.get_ref()),
            format!("{:02X?}", expected)
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn res_compressed_simple_write() -> Result<()> {
        let mut expected = header(0x88);
        #[rustfmt::skip]
        expected.extend_from_slice(&[
            // Data (8)
            0x00, 0x04, 0x00, 0x20, 0x40, 0x7F, 0xFF, 0x00,
            // Directory
            0x01, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0x00, 0x02, 0x04, 0x00, 0x00, 0x01, 0x08, 0x00, 0x00, 0x03,
        ]);

        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        writer
            .create_resource(ResourceId(0x0200), ContentType(0x03), true)?
            .write_all(&[0x01, 0x02, 0x02, 0x02])?;

        let result = writer.into_inner()?;
        assert_str_eq!(
            format!("{:02X?}", *result.get_ref()),
            format!("{:02X?}", expected)
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn res_uncompressed_compound_write() -> Result<()> {
        let mut expected = header(0x94);
        #[rustfmt::skip]
        expected.extend_from_slice(&[
            // Block table (14)
            0x02, 0x00,
            0x0E, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x13, 0x00, 0x00, 0x00,
            // Blocks (5) + padding (1)
            0x61, 0x62, 0x63, 0x64, 0x65, 0x00,
            // Directory
            0x01, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0x00, 0x03, 0x13, 0x00, 0x00, 0x02, 0x13, 0x00, 0x00, 0x30,
        ]);

        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        let compound = writer.create_compound_resource(ResourceId(0x0300), ContentType(0x30), false)?;
        let mut first = compound.create_block()?;
        let mut second = compound.create_block()?;
        // blocks keep their creation order
        second.write_all(b"cde")?;
        first.write_all(b"ab")?;

        let result = writer.into_inner()?;
        assert_str_eq!(
            format!("{:02X?}", *result.get_ref()),
            format!("{:02X?}", expected)
        );

        Ok(())
    }

    #[traced_test]
    #[test]
    fn res_legacy_padded_compound_write() -> Result<()> {
        let mut expected = header(0x90);
        #[rustfmt::skip]
        expected.extend_from_slice(&[
            // Block table (10)
            0x01, 0x00,
            0x0C, 0x00, 0x00, 0x00,
            0x0E, 0x00, 0x00, 0x00,
            // Legacy padding (2)
            0x00, 0x00,
            // Block (2)
            0x41, 0x42,
            // Alignment padding (2)
            0x00, 0x00,
            // Directory
            0x01, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0xFC, 0x08, 0x0E, 0x00, 0x00, 0x02, 0x0E, 0x00, 0x00, 0x11,
        ]);

        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        let compound = writer.create_compound_resource(ResourceId(0x08FC), ContentType(0x11), false)?;
        compound.create_block()?.write_all(b"AB")?;

        let result = writer.into_inner()?;
        assert_str_eq!(
            format!("{:02X?}", *result.get_ref()),
            format!("{:02X?}", expected)
        );

        Ok(())
    }

    #[test]
    fn res_write_after_finish() -> Result<()> {
        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        writer.finish()?;
        assert!(writer.is_finished());

        assert!(matches!(
            writer.create_resource(ResourceId(1), ContentType(0), false),
            Err(Error::WriterFinished)
        ));
        assert!(matches!(
            writer.create_compound_resource(ResourceId(1), ContentType(0), false),
            Err(Error::WriterFinished)
        ));
        assert!(matches!(writer.finish(), Err(Error::WriterFinished)));

        Ok(())
    }

    #[test]
    fn res_duplicate_resource() -> Result<()> {
        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        writer.create_resource(ResourceId(1), ContentType(0), false)?;
        writer.create_resource(ResourceId(2), ContentType(0), false)?;

        assert!(matches!(
            writer.create_resource(ResourceId(1), ContentType(0), true),
            Err(Error::DuplicateResource(ResourceId(1)))
        ));
        assert!(matches!(
            writer.create_compound_resource(ResourceId(2), ContentType(0), true),
            Err(Error::DuplicateResource(ResourceId(2)))
        ));

        Ok(())
    }

    #[test]
    fn res_write_to_finalized_block() -> Result<()> {
        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        let mut block = writer.create_resource(ResourceId(1), ContentType(0), false)?;
        let compound = writer.create_compound_resource(ResourceId(2), ContentType(0), false)?;

        let err = block.write_all(b"late").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);

        writer.finish()?;
        assert!(compound.create_block().is_err());

        Ok(())
    }

    #[test]
    fn res_write_without_simple_resource() -> Result<()> {
        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        assert!(writer.write_all(b"data").is_err());

        writer.create_compound_resource(ResourceId(1), ContentType(0), false)?;
        assert!(writer.write_all(b"data").is_err());

        Ok(())
    }

    #[test]
    fn res_resource_too_large() -> Result<()> {
        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        writer
            .create_resource(ResourceId(7), ContentType(0), false)?
            .write_all(&vec![0u8; 0x0100_0000])?;

        assert!(matches!(
            writer.finish(),
            Err(Error::ResourceTooLarge {
                id: ResourceId(7),
                length: 0x0100_0000
            })
        ));

        Ok(())
    }

    #[test]
    fn res_too_many_blocks() -> Result<()> {
        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        let compound = writer.create_compound_resource(ResourceId(9), ContentType(0), false)?;
        for _ in 0..=u16::MAX {
            compound.create_block()?;
        }
        compound.create_block()?.write_all(b"x")?;

        assert!(matches!(
            writer.finish(),
            Err(Error::TooManyBlocks {
                id: ResourceId(9),
                count: 0x10001
            })
        ));

        Ok(())
    }

    #[test]
    fn res_max_blocks() -> Result<()> {
        let mut writer = ResourceWriter::new(Cursor::new(Vec::new()))?;
        let compound = writer.create_compound_resource(ResourceId(9), ContentType(0), false)?;
        for _ in 0..u16::MAX {
            compound.create_block()?;
        }
        let data = writer.into_inner()?.into_inner();

        let mut res = crate::read::ResourceReader::new(Cursor::new(data))?;
        assert_eq!(res.by_id(ResourceId(9))?.block_count(), 0xFFFF);

        Ok(())
    }
}
