//! This library handles reading from and creating **LG Res** resource files used by *System Shock*.
//!
//! # Resource File Format Documentation
//!
//! A resource file stores a flat set of binary resources, each identified by a 16 bit number.
//! Every resource can be stored compressed, and can consist of either exactly one block of data
//! (a *simple* resource) or of any number of indexed blocks (a *compound* resource). Resource
//! files typically use the `.res` extension.
//!
//! ## File Structure
//!
//! A resource file consists of a header, followed by the resources and finally the directory.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Header string          | 16 bytes: "LG Res File v2\r\n"                             |
//! | 0x0010         | Comment terminator     | 1 byte: 0x1A                                               |
//! | 0x0011         | Comment                | 107 bytes: free text, zeroed when written                  |
//! | 0x007C         | Directory Offset       | 4 bytes: Absolute offset of the directory                  |
//! | 0x0080         | Resources              | Data of all resources, in directory order                  |
//!
//! ### Resources
//!
//! Resources are stored one after the other, each starting on a 4 byte boundary relative to the
//! start of the resource area. Their offsets are not stored; they follow from the lengths in the
//! directory.
//!
//! A compound resource begins with a block table, which is never compressed:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Block Count            | 2 bytes: Number of blocks                               |
//! | 0x0002         | Block Offsets          | 4 bytes each: Block Count + 1 offsets                   |
//!
//! The offsets are relative to the start of the resource; the last one is the total length of
//! the resource. Compound resources with identifiers `0x08FC..=0x094B` carry two extra zero bytes
//! between the table and the first block. When a compound resource is compressed, everything after
//! the block table is a single compressed stream.
//!
//! ### Directory
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Count                  | 2 bytes: Number of resources                            |
//! | 0x0002         | First Resource Offset  | 4 bytes: Absolute offset of the first resource          |
//! | 0x0006         | Entries                | 10 bytes each, in the order the resources are stored    |
//!
//! Each entry has the following structure:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Identifier             | 2 bytes: Identifier of the resource                     |
//! | 0x0002         | Unpacked Length        | 3 bytes: Logical size of the resource                   |
//! | 0x0005         | Flags                  | 1 byte: `0x01` compressed, `0x02` compound              |
//! | 0x0006         | Packed Length          | 3 bytes: Size of the resource in the file               |
//! | 0x0009         | Content Type           | 1 byte: Interpretation of the data                      |
//!
//! ## Compression
//!
//! Compressed data is a sequence of 14 bit codes, see [`compression`] for the details.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.res`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod compression;
pub mod error;
pub mod read;
pub mod store;
pub mod types;
pub mod view;
pub mod write;

pub use read::ResourceReader;
pub use store::{ResourceStore, StoredResource};
pub use types::{ContentType, ResourceFlags, ResourceId};
pub use view::{BlockProvider, ResourceProperties, ResourceViewer};
pub use write::{write, ResourceWriter};
