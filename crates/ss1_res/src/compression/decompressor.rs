use std::io::{self, Read};

use tracing::trace;

use super::bits::WordReader;
use super::dictionary::Dictionary;
use super::{DecodeError, END_OF_STREAM, RESET_CODE};

/// Decompresses a stream produced by [`super::Compressor`].
///
/// Reading ends at the end-of-stream code; bytes following it in the source are left unread.
#[derive(Debug)]
pub struct Decompressor<R: Read> {
    stream: WordReader<R>,
    dictionary: Dictionary,
    previous: Option<u16>,
    phrase: Vec<u8>,
    position: usize,
    finished: bool,
}

impl<R: Read> Decompressor<R> {
    /// Creates a decompressor reading compressed data from `inner`
    pub fn new(inner: R) -> Self {
        Self {
            stream: WordReader::new(inner),
            dictionary: Dictionary::new(),
            previous: None,
            phrase: Vec::new(),
            position: 0,
            finished: false,
        }
    }

    /// Whether the end-of-stream code has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Unwrap and return the inner reader object
    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }

    /// Decodes the next phrase into the phrase buffer.
    ///
    /// Returns `false` once the end of the stream has been reached.
    fn decode_next(&mut self) -> io::Result<bool> {
        loop {
            let code = self.stream.read()?;
            match code {
                END_OF_STREAM => {
                    self.finished = true;
                    return Ok(false);
                }
                RESET_CODE => {
                    trace!("decompressor received reset");
                    self.dictionary.reset();
                    self.previous = None;
                    continue;
                }
                _ => {}
            }

            let next = self.dictionary.next_code();
            let first = match self.previous {
                _ if self.dictionary.contains(code) => self.dictionary.first_byte(code),
                // the code names the phrase that is about to be added
                Some(previous) if code == next => self.dictionary.first_byte(previous),
                _ => return Err(DecodeError::InvalidCode { code, next }.into()),
            };

            if let Some(previous) = self.previous {
                self.dictionary.add(previous, first);
            }

            self.phrase.clear();
            self.dictionary.write_phrase(code, &mut self.phrase);
            self.position = 0;
            self.previous = Some(code);

            return Ok(true);
        }
    }
}

impl<R: Read> Read for Decompressor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.position >= self.phrase.len() {
            if self.finished || !self.decode_next()? {
                return Ok(0);
            }
        }

        let available = &self.phrase[self.position..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.position += count;

        Ok(count)
    }
}
