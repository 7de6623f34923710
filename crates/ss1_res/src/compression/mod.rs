//! Resource compression and decompression handling.
//!
//! Compressed resources use a dictionary scheme: the input is split into phrases, each phrase is
//! emitted as a 14 bit code and every emitted phrase extended by the following byte becomes a new
//! dictionary entry. Codes below [`LITERAL_LIMIT`] stand for single bytes. Once all codes are in
//! use the dictionary stays frozen for [`RESET_THRESHOLD`] further phrases, after which
//! [`RESET_CODE`] is emitted and both sides start over with the literal codes only.
//!
//! The codes are packed most significant bit first, the stream ends with [`END_OF_STREAM`],
//! followed by the padding of the last byte and a single zero byte.

use std::io::{self, Read, Write};

use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

mod bits;
mod compressor;
mod decompressor;
mod dictionary;

pub use bits::{WordReader, WordWriter};
pub use compressor::Compressor;
pub use decompressor::Decompressor;

/// Number of bits per code in the stream
pub const WORD_BITS: u32 = 14;

/// First code that is not a literal byte
pub const LITERAL_LIMIT: u16 = 0x0100;

/// Code telling the decompressor to start over with an empty dictionary
pub const RESET_CODE: u16 = 0x3FFE;

/// Code ending the compressed stream
pub const END_OF_STREAM: u16 = 0x3FFF;

/// Number of phrases emitted with an exhausted dictionary before it is reset
pub const RESET_THRESHOLD: u32 = 1000;

/// Errors found in a compressed stream
#[derive(Error, Diagnostic, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream refers to a phrase that does not exist
    #[error("invalid code {code:#06x} in compressed stream, next free code is {next:#06x}")]
    InvalidCode {
        /// The code read from the stream
        code: u16,
        /// The next code the dictionary would have assigned
        next: u16,
    },
}

impl From<DecodeError> for io::Error {
    fn from(value: DecodeError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}

/// Compresses `data` in one go
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut compressor = Compressor::new(Vec::new());
    compressor.write_all(data)?;
    compressor.finish()
}

/// Decompresses a complete stream in one go
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    Decompressor::new(data).read_to_end(&mut output)?;
    Ok(output)
}

/// Reader for the data of a single block inside a resource file
pub(crate) enum BlockReader<'a, R: Read> {
    Raw(io::Take<&'a mut R>),
    Compressed(Box<io::Take<Decompressor<io::Take<&'a mut R>>>>),
}

impl<'a, R: Read> BlockReader<'a, R> {
    /// Reads `limit` bytes as they are stored
    pub fn raw(reader: &'a mut R, limit: u64) -> Self {
        BlockReader::Raw(reader.take(limit))
    }

    /// Decompresses a span of `packed` bytes, skipping the first `skip` decompressed bytes and
    /// stopping after `limit` more.
    #[instrument(skip(reader))]
    pub fn compressed(reader: &'a mut R, packed: u64, skip: u64, limit: u64) -> io::Result<Self> {
        let mut decompressor = Decompressor::new(reader.take(packed));
        let skipped = io::copy(&mut decompressor.by_ref().take(skip), &mut io::sink())?;
        if skipped < skip {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "compressed data ends before block",
            ));
        }
        Ok(BlockReader::Compressed(Box::new(decompressor.take(limit))))
    }
}

impl<R: Read> Read for BlockReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BlockReader::Raw(r) => r.read(buf),
            BlockReader::Compressed(r) => r.read(buf),
        }
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self {
            BlockReader::Raw(r) => r.read_to_end(buf),
            BlockReader::Compressed(r) => r.read_to_end(buf),
        }
    }
}

/// Writer for the payload of a resource, either stored as is or compressed
pub(crate) enum PayloadWriter<W: Write> {
    Raw(W, usize),
    Compressed(Box<Compressor<W>>),
}

impl<W: Write> PayloadWriter<W> {
    pub fn new(writer: W, compressed: bool) -> Self {
        if compressed {
            PayloadWriter::Compressed(Box::new(Compressor::new(writer)))
        } else {
            PayloadWriter::Raw(writer, 0)
        }
    }

    #[instrument(skip(self), err)]
    pub fn finalize(self) -> io::Result<W> {
        match self {
            PayloadWriter::Raw(w, _) => Ok(w),
            PayloadWriter::Compressed(w) => w.finish(),
        }
    }

    pub fn total_in(&self) -> u64 {
        match self {
            PayloadWriter::Raw(_, c) => *c as u64,
            PayloadWriter::Compressed(w) => w.total_in(),
        }
    }
}

impl<W: Write> Write for PayloadWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            PayloadWriter::Raw(w, c) => {
                let written = w.write(buf)?;
                *c += written;
                Ok(written)
            }
            PayloadWriter::Compressed(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            PayloadWriter::Raw(w, _) => w.flush(),
            PayloadWriter::Compressed(w) => w.flush(),
        }
    }
}
