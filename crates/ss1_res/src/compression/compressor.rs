use std::io::{self, Write};

use tracing::trace;

use super::bits::WordWriter;
use super::dictionary::{Dictionary, ROOT};
use super::{END_OF_STREAM, RESET_CODE, RESET_THRESHOLD};

/// Compresses everything written to it into the underlying writer.
///
/// The stream is only complete after [`Compressor::finish`] has been called.
///
/// ```
/// use std::io::Write;
/// use ss1_res::compression::Compressor;
///
/// let mut compressor = Compressor::new(Vec::new());
/// compressor.write_all(b"abababab")?;
/// let compressed = compressor.finish()?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct Compressor<W: Write> {
    stream: WordWriter<W>,
    dictionary: Dictionary,
    current: u16,
    overtime: u32,
    total_in: u64,
}

impl<W: Write> Compressor<W> {
    /// Creates a compressor writing its output to `inner`
    pub fn new(inner: W) -> Self {
        Self {
            stream: WordWriter::new(inner),
            dictionary: Dictionary::new(),
            current: ROOT,
            overtime: 0,
            total_in: 0,
        }
    }

    /// Number of uncompressed bytes consumed so far
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Writes the pending phrase and the end of the stream, then returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.stream.write(self.current)?;
        self.stream.write(END_OF_STREAM)?;
        self.stream.close()
    }

    fn add_byte(&mut self, value: u8) -> io::Result<()> {
        if let Some(next) = self.dictionary.child(self.current, value) {
            self.current = next;
            return Ok(());
        }

        self.stream.write(self.current)?;
        if self.dictionary.add(self.current, value).is_none() {
            // codes stay exhausted for a while before the dictionary starts over
            self.overtime += 1;
            if self.overtime > RESET_THRESHOLD {
                trace!(total_in = self.total_in, "compressor emitting reset");
                self.stream.write(RESET_CODE)?;
                self.dictionary.reset();
                self.overtime = 0;
            }
        }
        self.current = value as u16;

        Ok(())
    }
}

impl<W: Write> Write for Compressor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for value in buf {
            self.add_byte(*value)?;
        }
        self.total_in += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
