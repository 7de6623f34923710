//! Packing of 14 bit words into bytes, most significant bit first.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use super::WORD_BITS;

const WORD_MASK: u32 = (1 << WORD_BITS) - 1;

/// Writes words to a byte stream
#[derive(Debug)]
pub struct WordWriter<W: Write> {
    inner: W,
    scratch: u32,
    bits: u32,
}

impl<W: Write> WordWriter<W> {
    /// Creates a writer appending to `inner`
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: 0,
            bits: 0,
        }
    }

    /// Appends the lower 14 bits of `word`
    pub fn write(&mut self, word: u16) -> io::Result<()> {
        self.scratch = (self.scratch << WORD_BITS) | (word as u32 & WORD_MASK);
        self.bits += WORD_BITS;

        while self.bits >= 8 {
            self.bits -= 8;
            self.inner.write_u8((self.scratch >> self.bits) as u8)?;
        }
        self.scratch &= (1 << self.bits) - 1;

        Ok(())
    }

    /// Flushes the remaining bits, padded with zeroes, followed by a single zero byte.
    pub fn close(mut self) -> io::Result<W> {
        if self.bits > 0 {
            self.inner.write_u8((self.scratch << (8 - self.bits)) as u8)?;
        }
        self.inner.write_u8(0x00)?;
        Ok(self.inner)
    }

    /// Flushes the underlying writer. Bits of an incomplete byte stay buffered.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reads words from a byte stream
#[derive(Debug)]
pub struct WordReader<R: Read> {
    inner: R,
    buffer: u8,
    available: u32,
}

impl<R: Read> WordReader<R> {
    /// Creates a reader pulling bytes from `inner`
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: 0,
            available: 0,
        }
    }

    /// Reads the next word.
    ///
    /// Running out of data within a word is reported as [`io::ErrorKind::UnexpectedEof`].
    pub fn read(&mut self) -> io::Result<u16> {
        let mut word = 0u16;
        let mut needed = WORD_BITS;

        while needed > 0 {
            if self.available == 0 {
                self.buffer = self.inner.read_u8()?;
                self.available = 8;
            }

            let take = needed.min(self.available);
            let bits = (self.buffer as u16 >> (self.available - take)) & ((1 << take) - 1);
            word = (word << take) | bits;

            self.available -= take;
            needed -= take;
        }

        Ok(word)
    }

    /// Unwrap and return the inner reader object
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, ErrorKind};

    use pretty_assertions::assert_eq;

    use super::{WordReader, WordWriter};

    #[test]
    fn write_words() -> std::io::Result<()> {
        let mut writer = WordWriter::new(Vec::new());
        for word in [0x0001, 0x0002, 0x0101, 0x3FFF] {
            writer.write(word)?;
        }

        assert_eq!(
            writer.close()?,
            vec![0x00, 0x04, 0x00, 0x20, 0x40, 0x7F, 0xFF, 0x00]
        );

        Ok(())
    }

    #[test]
    fn write_pads_incomplete_byte() -> std::io::Result<()> {
        let mut writer = WordWriter::new(Vec::new());
        writer.write(0x3FFE)?;
        writer.write(0x3FFF)?;

        assert_eq!(writer.close()?, vec![0xFF, 0xFB, 0xFF, 0xF0, 0x00]);

        Ok(())
    }

    #[test]
    fn write_nothing() -> std::io::Result<()> {
        assert_eq!(WordWriter::new(Vec::new()).close()?, vec![0x00]);
        Ok(())
    }

    #[test]
    fn read_words() -> std::io::Result<()> {
        let mut reader = WordReader::new(Cursor::new(vec![
            0x00, 0x04, 0x00, 0x20, 0x40, 0x7F, 0xFF, 0x00,
        ]));

        assert_eq!(reader.read()?, 0x0001);
        assert_eq!(reader.read()?, 0x0002);
        assert_eq!(reader.read()?, 0x0101);
        assert_eq!(reader.read()?, 0x3FFF);

        Ok(())
    }

    #[test]
    fn read_mirrors_write() -> std::io::Result<()> {
        let words = (0..200u16).map(|i| i.wrapping_mul(0x1F3) & 0x3FFF).collect::<Vec<_>>();

        let mut writer = WordWriter::new(Vec::new());
        for word in &words {
            writer.write(*word)?;
        }

        let mut reader = WordReader::new(Cursor::new(writer.close()?));
        for word in &words {
            assert_eq!(reader.read()?, *word);
        }

        Ok(())
    }

    #[test]
    fn read_past_end() {
        let mut reader = WordReader::new(Cursor::new(vec![0xFF]));

        let err = reader.read().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
