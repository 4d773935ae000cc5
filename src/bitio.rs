//! Bit-level I/O.
//!
//! The coder moves exactly one bit at a time across its boundary, so the
//! collaborators it talks to are single-bit streams. [`BitReader`] and
//! [`BitWriter`] adapt any `io::Read` / `io::Write` byte stream, packing bits
//! MSB-first.
//!
//! # Padding Rules
//! - `BitWriter::finish` pads the final partial byte with zero bits.
//! - `BitReader` reports end of stream as `None`; the decoder treats that as
//!   an endless run of zeros, so the padding is harmless.

use std::io::{self, Read, Write};

/// Source of single bits.
pub trait BitInput {
    /// Read the next bit, or `None` once the stream is exhausted.
    fn read_bit(&mut self) -> io::Result<Option<u8>>;
}

/// Sink for single bits.
pub trait BitOutput {
    /// Append one bit (`0` or `1`).
    fn write_bit(&mut self, bit: u8) -> io::Result<()>;
}

impl<T: BitInput + ?Sized> BitInput for &mut T {
    fn read_bit(&mut self) -> io::Result<Option<u8>> {
        (**self).read_bit()
    }
}

impl<T: BitOutput + ?Sized> BitOutput for &mut T {
    fn write_bit(&mut self, bit: u8) -> io::Result<()> {
        (**self).write_bit(bit)
    }
}

/// Reads bits MSB-first from a byte stream.
#[derive(Debug)]
pub struct BitReader<R> {
    inner: R,
    /// Byte currently being drained.
    current: u8,
    /// Bits of `current` not yet returned (0-8).
    remaining: u8,
    eof: bool,
}

impl<R: Read> BitReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            current: 0,
            remaining: 0,
            eof: false,
        }
    }

    /// Unwrap the underlying reader. Unread bits of a partial byte are lost.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<bool> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(_) => {
                    self.current = byte[0];
                    self.remaining = 8;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> BitInput for BitReader<R> {
    fn read_bit(&mut self) -> io::Result<Option<u8>> {
        if self.eof {
            return Ok(None);
        }
        if self.remaining == 0 && !self.fill()? {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some((self.current >> self.remaining) & 1))
    }
}

/// Writes bits MSB-first into a byte stream.
///
/// # Invariants
/// - `filled` is always < 8 between calls; a full byte is written out immediately.
#[derive(Debug)]
pub struct BitWriter<W> {
    inner: W,
    current: u8,
    filled: u8,
    bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            current: 0,
            filled: 0,
            bits_written: 0,
        }
    }

    /// Total number of bits written so far, excluding padding.
    pub fn bit_len(&self) -> u64 {
        self.bits_written
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Pad the last partial byte with zeros, flush, and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.filled > 0 {
            let byte = self.current << (8 - self.filled);
            self.inner.write_all(&[byte])?;
            self.current = 0;
            self.filled = 0;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> BitOutput for BitWriter<W> {
    fn write_bit(&mut self, bit: u8) -> io::Result<()> {
        if bit > 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "bit must be 0 or 1",
            ));
        }
        self.current = (self.current << 1) | bit;
        self.filled += 1;
        self.bits_written += 1;
        if self.filled == 8 {
            self.inner.write_all(&[self.current])?;
            self.current = 0;
            self.filled = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msb_first_with_padding() {
        let mut writer = BitWriter::new(Vec::new());
        for &bit in &[1u8, 0, 1, 1, 0, 0, 0, 1, 1, 1] {
            writer.write_bit(bit).unwrap();
        }
        assert_eq!(writer.bit_len(), 10);
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes, vec![0b1011_0001, 0b1100_0000]);

        let mut reader = BitReader::new(&bytes[..]);
        let mut bits = Vec::new();
        while let Some(bit) = reader.read_bit().unwrap() {
            bits.push(bit);
        }
        assert_eq!(bits, vec![1, 0, 1, 1, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(reader.read_bit().unwrap(), None);
    }

    #[test]
    fn test_rejects_non_bit() {
        let mut writer = BitWriter::new(Vec::new());
        let err = writer.write_bit(2).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(writer.bit_len(), 0);
    }

    #[test]
    fn test_empty_reader() {
        let mut reader = BitReader::new(io::empty());
        assert_eq!(reader.read_bit().unwrap(), None);
    }
}
