//! Base types for structure of resource files.

use std::fmt;
use std::ops::{Range, RangeInclusive};

use binrw::{binrw, BinRead, BinWrite};
use bitflags::bitflags;

/// The text every resource file starts with
pub const HEADER_STRING: &[u8; 16] = b"LG Res File v2\r\n";

/// Terminates the comment area following the header string
pub const COMMENT_TERMINATOR: u8 = 0x1A;

/// Position of the absolute offset of the directory
pub const DIRECTORY_OFFSET_POSITION: u64 = 0x7C;

/// Zero bytes between the comment terminator and [`DIRECTORY_OFFSET_POSITION`]
pub const HEADER_PADDING: u64 = DIRECTORY_OFFSET_POSITION - (HEADER_STRING.len() as u64 + 1);

/// Value stored at [`DIRECTORY_OFFSET_POSITION`] until the writer has finished
pub const DIRECTORY_OFFSET_PLACEHOLDER: u32 = 0xFFFF_FFFF;

/// Absolute offset where the data of the first resource starts
pub const FIRST_RESOURCE_OFFSET: u32 = 0x80;

/// Resources start on multiples of this value, relative to the resource area
pub const RESOURCE_ALIGNMENT: u32 = 4;

/// Size of one serialized [`DirectoryEntry`]
pub const DIRECTORY_ENTRY_SIZE: u32 = 10;

/// Largest length that fits into the 24 bit length fields of the directory
pub const MAX_RESOURCE_LENGTH: u32 = 0x00FF_FFFF;

/// Largest number of blocks the 16 bit count of a [`BlockTable`] can describe
pub const MAX_BLOCK_COUNT: usize = u16::MAX as usize;

/// Compound resources in this ID range carry extra padding between their block table and data.
pub const LEGACY_PADDED_IDS: RangeInclusive<u16> = 0x08FC..=0x094B;

/// Number of zero bytes inserted for compound resources in [`LEGACY_PADDED_IDS`]
pub const LEGACY_PADDING_SIZE: u32 = 2;

/// Identifier of a resource within a file
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u16);

impl ResourceId {
    /// Raw value of the identifier
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Whether compound resources with this ID are written with the legacy padding
    pub fn has_legacy_padding(self) -> bool {
        LEGACY_PADDED_IDS.contains(&self.0)
    }
}

impl From<u16> for ResourceId {
    fn from(value: u16) -> Self {
        ResourceId(value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Describes how the data of a resource is to be interpreted.
///
/// The value is opaque to this library and only carried through.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentType(pub u8);

impl From<u8> for ContentType {
    fn from(value: u8) -> Self {
        ContentType(value)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

bitflags! {
    /// Storage flags of a resource
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[rustfmt::skip]
    pub struct ResourceFlags: u8 {
        #[doc = "Resource data is stored through the dictionary compressor"]
        const COMPRESSED = 0b0000_0001;
        #[doc = "Resource has its own block table and 0..N blocks"]
        const COMPOUND   = 0b0000_0010;
    }
}

impl ResourceFlags {
    /// Builds flags from the two properties stored in the directory
    pub fn new(compressed: bool, compound: bool) -> Self {
        let mut flags = ResourceFlags::empty();
        flags.set(ResourceFlags::COMPRESSED, compressed);
        flags.set(ResourceFlags::COMPOUND, compound);
        flags
    }
}

/// Resource file header
///
/// Defines the first [`FIRST_RESOURCE_OFFSET`] bytes of the file. The area between the comment
/// terminator and the directory offset is ignored when reading and zeroed when writing.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little, magic = b"LG Res File v2\r\n")]
pub struct ContainerHeader {
    /// Marks the end of the comment area
    #[br(assert(comment_terminator == COMMENT_TERMINATOR))]
    pub comment_terminator: u8,

    /// The absolute offset of the directory, stored at [`DIRECTORY_OFFSET_POSITION`]
    #[brw(pad_before = HEADER_PADDING)]
    pub directory_offset: u32,
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self {
            comment_terminator: COMMENT_TERMINATOR,
            directory_offset: DIRECTORY_OFFSET_PLACEHOLDER,
        }
    }
}

/// Directory entry
///
/// The lengths are stored in the lower 24 bits of two words, sharing them with the flags and the
/// content type in the upper 8 bits.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct DirectoryEntry {
    /// Identifier of the resource
    pub id: ResourceId,

    unpacked_and_flags: u32,

    packed_and_type: u32,
}

impl DirectoryEntry {
    /// Creates a new entry. Lengths are truncated to 24 bits.
    pub fn new(
        id: ResourceId,
        content_type: ContentType,
        flags: ResourceFlags,
        unpacked_length: u32,
        packed_length: u32,
    ) -> Self {
        Self {
            id,
            unpacked_and_flags: (unpacked_length & MAX_RESOURCE_LENGTH)
                | ((flags.bits() as u32) << 24),
            packed_and_type: (packed_length & MAX_RESOURCE_LENGTH)
                | ((content_type.0 as u32) << 24),
        }
    }

    /// Size of the resource's logical data
    pub fn unpacked_length(&self) -> u32 {
        self.unpacked_and_flags & MAX_RESOURCE_LENGTH
    }

    /// Size of the resource as stored in the file
    pub fn packed_length(&self) -> u32 {
        self.packed_and_type & MAX_RESOURCE_LENGTH
    }

    /// Storage flags of the resource
    pub fn flags(&self) -> ResourceFlags {
        ResourceFlags::from_bits_retain((self.unpacked_and_flags >> 24) as u8)
    }

    /// Content type of the resource
    pub fn content_type(&self) -> ContentType {
        ContentType((self.packed_and_type >> 24) as u8)
    }

    /// Whether the resource is stored compressed
    pub fn is_compressed(&self) -> bool {
        self.flags().contains(ResourceFlags::COMPRESSED)
    }

    /// Whether the resource has a block table
    pub fn is_compound(&self) -> bool {
        self.flags().contains(ResourceFlags::COMPOUND)
    }
}

/// Resource file directory, stored after all resources
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    #[br(temp)]
    #[bw(calc = entries.len() as u16)]
    count: u16,

    /// Absolute offset of the first resource
    pub first_resource_offset: u32,

    /// Entries in the order the resources were written
    #[br(count = count)]
    pub entries: Vec<DirectoryEntry>,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            first_resource_offset: FIRST_RESOURCE_OFFSET,
            entries: Vec::new(),
        }
    }
}

/// Block table at the start of every compound resource
///
/// Holds one offset per block plus a final one marking the end of the last block. All offsets
/// are relative to the start of the resource.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTable {
    #[br(temp)]
    #[bw(calc = offsets.len().saturating_sub(1) as u16)]
    count: u16,

    /// Block start offsets, followed by the total length
    #[br(count = count as usize + 1)]
    pub offsets: Vec<u32>,
}

impl BlockTable {
    /// Creates the table for blocks of the given lengths, with `padding` bytes between the table
    /// and the first block.
    pub fn for_lengths(lengths: &[usize], padding: u32) -> Self {
        let mut offset = Self::size_for(lengths.len()) + padding;
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        for length in lengths {
            offsets.push(offset);
            offset += *length as u32;
        }
        offsets.push(offset);
        Self { offsets }
    }

    /// Serialized size of a table for `block_count` blocks
    pub const fn size_for(block_count: usize) -> u32 {
        2 + 4 * (block_count as u32 + 1)
    }

    /// Number of blocks described by the table
    pub fn block_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Serialized size of this table
    pub fn size(&self) -> u32 {
        Self::size_for(self.block_count())
    }

    /// Logical length of the whole resource
    pub fn total_length(&self) -> u32 {
        self.offsets.last().copied().unwrap_or_default()
    }

    /// Span of the given block, relative to the start of the resource
    pub fn block_range(&self, index: usize) -> Option<Range<u32>> {
        Some(*self.offsets.get(index)?..*self.offsets.get(index + 1)?)
    }

    /// Whether the offsets are ordered and start behind the table itself
    pub fn is_consistent(&self) -> bool {
        !self.offsets.is_empty()
            && self.offsets[0] >= self.size()
            && self.offsets.windows(2).all(|w| w[0] <= w[1])
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{
        BlockTable, ContainerHeader, ContentType, Directory, DirectoryEntry, ResourceFlags,
        ResourceId,
    };

    fn header_bytes(directory_offset: [u8; 4]) -> Vec<u8> {
        let mut data = b"LG Res File v2\r\n\x1A".to_vec();
        data.resize(0x7C, 0x00);
        data.extend_from_slice(&directory_offset);
        data
    }

    #[test]
    fn read_header() -> Result<()> {
        let mut input = Cursor::new(header_bytes([0x80, 0x00, 0x00, 0x00]));

        let expected = ContainerHeader {
            directory_offset: 0x80,
            ..Default::default()
        };

        assert_eq!(ContainerHeader::read(&mut input)?, expected);
        assert_eq!(input.position(), 0x80);

        Ok(())
    }

    #[test]
    fn read_header_ignores_comment() -> Result<()> {
        let mut data = header_bytes([0x80, 0x00, 0x00, 0x00]);
        data[0x20..0x30].copy_from_slice(b"some old comment");

        let header = ContainerHeader::read(&mut Cursor::new(data))?;
        assert_eq!(header.directory_offset, 0x80);

        Ok(())
    }

    #[test]
    fn read_header_with_invalid_terminator() {
        let mut data = header_bytes([0x80, 0x00, 0x00, 0x00]);
        data[16] = 0x00;

        assert!(ContainerHeader::read(&mut Cursor::new(data)).is_err());
    }

    #[test]
    fn write_header() -> Result<()> {
        let expected = header_bytes([0xFF, 0xFF, 0xFF, 0xFF]);

        let mut actual = Vec::new();
        ContainerHeader::default().write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn read_entry() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x34, 0x12,
            0x0B, 0x00, 0x00, 0x03,
            0x08, 0x00, 0x00, 0x11,
        ]);

        let entry = DirectoryEntry::read(&mut input)?;
        assert_eq!(entry.id, ResourceId(0x1234));
        assert_eq!(entry.unpacked_length(), 11);
        assert_eq!(entry.packed_length(), 8);
        assert_eq!(entry.content_type(), ContentType(0x11));
        assert_eq!(
            entry.flags(),
            ResourceFlags::COMPRESSED | ResourceFlags::COMPOUND
        );
        assert!(entry.is_compressed());
        assert!(entry.is_compound());

        Ok(())
    }

    #[test]
    fn write_entry() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x0A,
            0x56, 0x34, 0x12, 0x01,
            0x21, 0x43, 0x65, 0x30,
        ];

        let entry = DirectoryEntry::new(
            ResourceId(0x0A00),
            ContentType(0x30),
            ResourceFlags::COMPRESSED,
            0x123456,
            0x654321,
        );

        let mut actual = Vec::new();
        entry.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn write_directory() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x01, 0x00,
            0x80, 0x00, 0x00, 0x00,
            0x01, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x02,
        ];

        let directory = Directory {
            entries: vec![DirectoryEntry::new(
                ResourceId(1),
                ContentType(2),
                ResourceFlags::empty(),
                4,
                4,
            )],
            ..Default::default()
        };

        let mut actual = Vec::new();
        directory.write(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual, expected);

        let read = Directory::read(&mut Cursor::new(actual))?;
        assert_eq!(read, directory);

        Ok(())
    }

    #[test]
    fn block_table_for_lengths() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x02, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x13, 0x00, 0x00, 0x00,
            0x15, 0x00, 0x00, 0x00,
        ];

        let table = BlockTable::for_lengths(&[3, 2], 2);
        assert_eq!(table.block_count(), 2);
        assert_eq!(table.size(), 14);
        assert_eq!(table.total_length(), 0x15);
        assert_eq!(table.block_range(1), Some(0x13..0x15));
        assert_eq!(table.block_range(2), None);
        assert!(table.is_consistent());

        let mut actual = Vec::new();
        table.write(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn empty_block_table() -> Result<()> {
        let table = BlockTable::read(&mut Cursor::new(vec![
            0x00, 0x00, 0x06, 0x00, 0x00, 0x00,
        ]))?;
        assert_eq!(table.block_count(), 0);
        assert_eq!(table.total_length(), 6);
        assert!(table.is_consistent());

        Ok(())
    }

    #[test]
    fn legacy_padding_range() {
        assert!(!ResourceId(0x08FB).has_legacy_padding());
        assert!(ResourceId(0x08FC).has_legacy_padding());
        assert!(ResourceId(0x094B).has_legacy_padding());
        assert!(!ResourceId(0x094C).has_legacy_padding());
    }
}
