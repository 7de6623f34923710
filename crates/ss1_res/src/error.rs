//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::types::ResourceId;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file is not a valid resource container
    #[error("file is not a valid resource container")]
    #[diagnostic(help("the header, directory pointer or directory of the file is malformed"))]
    FormatMismatch,

    /// unable to find requested resource
    #[error("unable to find requested resource")]
    ResourceNotFound(#[from] ResourceNotFoundError),

    /// block {index} of resource {id} is out of range
    #[error("block {index} of resource {id} is out of range (resource has {count} blocks)")]
    BlockIndexOutOfRange {
        /// Resource that was accessed
        id: ResourceId,
        /// Requested block
        index: usize,
        /// Number of blocks of the resource
        count: usize,
    },

    /// writer has already been finished
    #[error("writer has already been finished")]
    WriterFinished,

    /// resource {0} has already been written
    #[error("resource {0} has already been written")]
    DuplicateResource(ResourceId),

    /// resource {id} is too large
    #[error("resource {id} is too large ({length} bytes)")]
    #[diagnostic(help("resource lengths are stored in 24 bits"))]
    ResourceTooLarge {
        /// Resource being written
        id: ResourceId,
        /// Length that could not be stored
        length: usize,
    },

    /// resource {id} has too many blocks
    #[error("resource {id} has too many blocks ({count})")]
    #[diagnostic(help("block counts are stored in 16 bits"))]
    TooManyBlocks {
        /// Resource being written
        id: ResourceId,
        /// Number of blocks that could not be stored
        count: usize,
    },
}

/// Error type to provide further information when a resource has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested resource")]
pub enum ResourceNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by id {0}
    #[error("by id {0}")]
    Id(ResourceId),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

/// Classifies a failure while decoding a container structure.
///
/// Anything that is not a genuine I/O failure means the structure itself is broken.
pub(crate) fn format_error(err: binrw::Error) -> Error {
    match err {
        binrw::Error::Backtrace(bt) => format_error(*bt.error),
        binrw::Error::Io(io) if io.kind() != std::io::ErrorKind::UnexpectedEof => {
            Error::IOError(io)
        }
        _ => Error::FormatMismatch,
    }
}
