//! Types for reading resource files
//!

use binrw::BinRead;
use indexmap::IndexMap;
use std::{
    fmt::{self, Debug},
    io::{Read, Seek, SeekFrom},
    sync::Arc,
};
use tracing::{debug, error, instrument};

use crate::{
    compression::BlockReader,
    error::{format_error, Error, ResourceNotFoundError, Result},
    types::{
        BlockTable, ContainerHeader, ContentType, Directory, DirectoryEntry, ResourceFlags,
        ResourceId, FIRST_RESOURCE_OFFSET, RESOURCE_ALIGNMENT,
    },
    view::{BlockProvider, ResourceProperties, ResourceViewer},
};

/// Location and directory information of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceData {
    /// The directory entry of the resource
    pub entry: DirectoryEntry,
    /// Absolute offset of the resource's data
    pub data_start: u64,
}

/// A struct for reading a single resource from a resource file
pub struct Resource<'a, R: Read + Seek> {
    data: ResourceData,
    table: Option<BlockTable>,
    reader: &'a mut R,
}

impl<R: Read + Seek> Debug for Resource<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Resource({:#?}, {:?})", self.data, self.table)
    }
}

impl<'a, R: Read + Seek> Resource<'a, R> {
    #[instrument(skip(reader))]
    fn new(reader: &'a mut R, data: ResourceData) -> Result<Self> {
        let table = if data.entry.is_compound() {
            reader.seek(SeekFrom::Start(data.data_start))?;
            let table = BlockTable::read(reader).map_err(format_error)?;

            let packed = data.entry.packed_length();
            let fits = table.size() <= packed
                && (data.entry.is_compressed() || table.total_length() <= packed);
            if !table.is_consistent() || !fits {
                return Err(Error::FormatMismatch);
            }
            Some(table)
        } else {
            None
        };

        Ok(Resource {
            data,
            table,
            reader,
        })
    }

    /// Get the identifier of the resource
    pub fn id(&self) -> ResourceId {
        self.data.entry.id
    }

    /// Get the content type of the resource
    pub fn content_type(&self) -> ContentType {
        self.data.entry.content_type()
    }

    /// Get the storage flags of the resource
    pub fn flags(&self) -> ResourceFlags {
        self.data.entry.flags()
    }

    /// Whether the resource is stored compressed
    pub fn is_compressed(&self) -> bool {
        self.data.entry.is_compressed()
    }

    /// Whether the resource has a block table
    pub fn is_compound(&self) -> bool {
        self.data.entry.is_compound()
    }

    /// Get the logical size of the resource, in bytes
    pub fn size(&self) -> u64 {
        self.data.entry.unpacked_length() as u64
    }

    /// Get the size of the resource, in bytes, in the file
    pub fn compressed_size(&self) -> u64 {
        self.data.entry.packed_length() as u64
    }

    /// Get the starting offset of the resource's data
    pub fn data_start(&self) -> u64 {
        self.data.data_start
    }

    /// Get the properties of the resource
    pub fn properties(&self) -> ResourceProperties {
        properties_of(&self.data.entry)
    }

    /// Number of blocks of the resource. Simple resources always have one.
    pub fn block_count(&self) -> usize {
        self.table.as_ref().map_or(1, BlockTable::block_count)
    }

    /// Get a reader for the block at `index`
    #[instrument(skip(self), fields(id = %self.id()))]
    pub fn block(&mut self, index: usize) -> Result<Block<'_, R>> {
        let out_of_range = Error::BlockIndexOutOfRange {
            id: self.id(),
            index,
            count: self.block_count(),
        };
        let packed = self.compressed_size();
        let start = self.data.data_start;
        let compressed = self.is_compressed();

        let reader = match &self.table {
            None if index != 0 => return Err(out_of_range),
            None => {
                self.reader.seek(SeekFrom::Start(start))?;
                if compressed {
                    BlockReader::compressed(self.reader, packed, 0, u64::MAX)
                        .inspect_err(|err| error!(%err, "unable to start decompression"))?
                } else {
                    BlockReader::raw(self.reader, packed)
                }
            }
            Some(table) => {
                let range = table.block_range(index).ok_or(out_of_range)?;
                let length = (range.end - range.start) as u64;
                if compressed {
                    let header = table.size();
                    self.reader.seek(SeekFrom::Start(start + header as u64))?;
                    BlockReader::compressed(
                        self.reader,
                        packed - header as u64,
                        (range.start - header) as u64,
                        length,
                    )
                    .inspect_err(|err| error!(%err, index, "unable to skip to block"))?
                } else {
                    self.reader.seek(SeekFrom::Start(start + range.start as u64))?;
                    BlockReader::raw(self.reader, length)
                }
            }
        };

        Ok(Block {
            id: self.data.entry.id,
            index,
            reader,
        })
    }
}

impl<R: Read + Seek> BlockProvider for Resource<'_, R> {
    fn block_count(&self) -> usize {
        Resource::block_count(self)
    }

    fn block(&mut self, index: usize) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(Resource::block(self, index)?))
    }
}

/// A struct for reading the data of one block
pub struct Block<'a, R: Read> {
    id: ResourceId,
    index: usize,
    reader: BlockReader<'a, R>,
}

impl<R: Read> Block<'_, R> {
    /// The resource this block belongs to
    pub fn resource_id(&self) -> ResourceId {
        self.id
    }

    /// Index of the block within its resource
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<R: Read> Debug for Block<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Block({}, {})", self.id, self.index)
    }
}

impl<R: Read> Read for Block<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> std::io::Result<usize> {
        self.reader.read_to_end(buf)
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    header: ContainerHeader,
    first_resource_offset: u32,
    resources: IndexMap<ResourceId, ResourceData>,
}

/// Resource file reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn dump_resources(reader: impl Read + Seek) -> ss1_res::error::Result<()> {
///     let mut res = ss1_res::ResourceReader::new(reader)?;
///
///     for i in 0..res.len() {
///         let mut resource = res.by_index(i)?;
///         println!("Resource: {}", resource.id());
///         for block in 0..resource.block_count() {
///             std::io::copy(&mut resource.block(block)?, &mut std::io::stdout())?;
///         }
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ResourceReader<R> {
    reader: R,
    shared: Arc<Shared>,
}

impl<R> ResourceReader<R> {
    /// Total logical size of all resources in the file
    pub fn unpacked_size(&self) -> u64 {
        self.shared
            .resources
            .values()
            .map(|r| r.entry.unpacked_length() as u64)
            .sum()
    }

    /// Creates a reader sharing this file's directory over another handle to the same data.
    ///
    /// This allows independent readers without parsing the directory again.
    pub fn with_reader<S: Read + Seek>(&self, reader: S) -> ResourceReader<S> {
        ResourceReader {
            reader,
            shared: self.shared.clone(),
        }
    }
}

impl<R: Read + Seek> ResourceReader<R> {
    /// Read a resource file collecting the resources it contains.
    #[instrument(skip(reader), err)]
    pub fn new(mut reader: R) -> Result<ResourceReader<R>> {
        let shared = Self::get_metadata(&mut reader)?;
        Ok(ResourceReader {
            reader,
            shared: shared.into(),
        })
    }

    /// Number of resources contained in this file.
    pub fn len(&self) -> usize {
        self.shared.resources.len()
    }

    /// Whether this file contains no resources
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over all resource identifiers, in the order they were written.
    pub fn ids(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.shared.resources.keys().copied()
    }

    /// Absolute offset of the directory
    pub fn directory_offset(&self) -> u32 {
        self.shared.header.directory_offset
    }

    /// Absolute offset of the first resource
    pub fn first_resource_offset(&self) -> u32 {
        self.shared.first_resource_offset
    }

    /// Get the index of a resource by its identifier, if it's present.
    #[inline(always)]
    pub fn index_for_id(&self, id: ResourceId) -> Option<usize> {
        self.shared.resources.get_index_of(&id)
    }

    /// Get the identifier of a resource by its index, if it's present.
    #[inline(always)]
    pub fn id_for_index(&self, index: usize) -> Option<ResourceId> {
        self.shared.resources.get_index(index).map(|(id, _)| *id)
    }

    /// Get the directory entry of a resource, if it's present.
    pub fn entry(&self, id: ResourceId) -> Option<&DirectoryEntry> {
        self.shared.resources.get(&id).map(|r| &r.entry)
    }

    /// Get the absolute offset of a resource's data, if it's present.
    pub fn resource_offset(&self, id: ResourceId) -> Option<u64> {
        self.shared.resources.get(&id).map(|r| r.data_start)
    }

    /// Search for a resource by its identifier
    pub fn by_id(&mut self, id: ResourceId) -> Result<Resource<'_, R>> {
        let data = *self
            .shared
            .resources
            .get(&id)
            .ok_or(Error::ResourceNotFound(ResourceNotFoundError::Id(id)))?;

        Resource::new(&mut self.reader, data)
            .inspect_err(|err| error!(%err, id = %data.entry.id, "unable to open resource"))
    }

    /// Get a contained resource by index
    pub fn by_index(&mut self, index: usize) -> Result<Resource<'_, R>> {
        let (_, data) = self
            .shared
            .resources
            .get_index(index)
            .ok_or(Error::ResourceNotFound(ResourceNotFoundError::Index(index)))?;
        let data = *data;

        Resource::new(&mut self.reader, data)
            .inspect_err(|err| error!(%err, id = %data.entry.id, "unable to open resource"))
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn get_metadata(reader: &mut R) -> Result<Shared> {
        let length = reader.seek(SeekFrom::End(0))?;
        reader.rewind()?;

        let header = ContainerHeader::read(reader).map_err(format_error)?;
        let directory_offset = header.directory_offset as u64;
        if directory_offset < FIRST_RESOURCE_OFFSET as u64 || directory_offset + 6 > length {
            debug!(directory_offset, length, "directory offset out of range");
            return Err(Error::FormatMismatch);
        }

        reader.seek(SeekFrom::Start(directory_offset))?;
        let directory = Directory::read(reader).map_err(format_error)?;

        let first_resource_offset = directory.first_resource_offset;
        if first_resource_offset < FIRST_RESOURCE_OFFSET
            || first_resource_offset as u64 > directory_offset
        {
            debug!(first_resource_offset, "first resource offset out of range");
            return Err(Error::FormatMismatch);
        }

        let mut resources = IndexMap::with_capacity(directory.entries.len());
        let mut offset = first_resource_offset as u64;
        for entry in directory.entries {
            let end = offset + entry.packed_length() as u64;
            if end > directory_offset {
                debug!(id = %entry.id, end, "resource exceeds resource area");
                return Err(Error::FormatMismatch);
            }

            let data = ResourceData {
                entry,
                data_start: offset,
            };
            if resources.insert(entry.id, data).is_some() {
                debug!(id = %entry.id, "duplicate resource");
                return Err(Error::FormatMismatch);
            }

            offset = first_resource_offset as u64
                + align(end - first_resource_offset as u64, RESOURCE_ALIGNMENT as u64);
        }

        debug!(resources = resources.len(), directory_offset, "loaded directory");

        Ok(Shared {
            header,
            first_resource_offset,
            resources,
        })
    }
}

impl<R: Read + Seek> ResourceViewer for ResourceReader<R> {
    fn ids(&self) -> Vec<ResourceId> {
        ResourceReader::ids(self).collect()
    }

    fn properties(&self, id: ResourceId) -> Result<ResourceProperties> {
        self.entry(id)
            .map(properties_of)
            .ok_or(Error::ResourceNotFound(ResourceNotFoundError::Id(id)))
    }

    fn provider(&mut self, id: ResourceId) -> Result<Box<dyn BlockProvider + '_>> {
        Ok(Box::new(self.by_id(id)?))
    }
}

fn properties_of(entry: &DirectoryEntry) -> ResourceProperties {
    ResourceProperties {
        content_type: entry.content_type(),
        compressed: entry.is_compressed(),
        compound: entry.is_compound(),
    }
}

pub(crate) const fn align(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}
