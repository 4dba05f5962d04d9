//! Positioned, little-endian reading over a seekable byte source.
//!
//! A [ByteCursor] wraps any `Read + Seek` (a buffered file, or an in-memory `Cursor<Vec<u8>>`
//! when decoding an already-sliced row blob) and exposes every primitive decoder the on-disk
//! formats need: fixed-width integers, IEEE-754 floats, fixed-length UTF-16LE strings,
//! length-prefixed UTF-8 strings, and the LEB128-style variable-length unsigned integer used
//! throughout the geometry and row encodings.
//!
//! Every read is exact: a short read (fewer bytes available than requested) surfaces as
//! [crate::Error::Io], never as silent zero-padding.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

use crate::{Error, Result};

/// A seekable little-endian byte reader.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: R,
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Wraps an existing reader.
    pub fn new(inner: R) -> ByteCursor<R> {
        ByteCursor { inner }
    }

    /// Unwraps this cursor, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Seeks to an absolute byte offset from the start of the source.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Advances the cursor by `n` bytes without reading them.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(i64::try_from(n)?))?;
        Ok(())
    }

    /// Returns the current absolute byte offset.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Returns the total length of the underlying source, in bytes.
    ///
    /// Leaves the cursor positioned where it was before the call.
    pub fn length(&mut self) -> Result<u64> {
        let current = self.position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(current))?;
        Ok(end)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8()?)
    }

    /// Reads a little-endian `i8`.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.inner.read_i8()?)
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.inner.read_u16::<LittleEndian>()?)
    }

    /// Reads a little-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.inner.read_i16::<LittleEndian>()?)
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.inner.read_u32::<LittleEndian>()?)
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.inner.read_i32::<LittleEndian>()?)
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.inner.read_u64::<LittleEndian>()?)
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.inner.read_i64::<LittleEndian>()?)
    }

    /// Reads a little-endian 40-bit unsigned integer (5 bytes), widened into a `u64`.
    pub fn read_u40(&mut self) -> Result<u64> {
        self.read_uint_n(5)
    }

    /// Reads a little-endian 48-bit unsigned integer (6 bytes), widened into a `u64`.
    pub fn read_u48(&mut self) -> Result<u64> {
        self.read_uint_n(6)
    }

    /// Reads an `n`-byte little-endian unsigned integer, `1 <= n <= 8`, widened into a `u64`.
    ///
    /// Used for the row-offset index, whose `offset_size` is a per-table value in `{4,5,6}`.
    pub fn read_uint_n(&mut self, n: usize) -> Result<u64> {
        debug_assert!(n >= 1 && n <= 8);
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf[..n])?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a little-endian `f32`.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.inner.read_f32::<LittleEndian>()?)
    }

    /// Reads a little-endian `f64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(self.inner.read_f64::<LittleEndian>()?)
    }

    /// Reads exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads exactly `buf.len()` raw bytes into an existing buffer.
    pub fn read_bytes_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    /// Reads `n_chars` UTF-16LE code units (`2 * n_chars` bytes) and decodes them to a `String`.
    pub fn read_utf16(&mut self, n_chars: usize) -> Result<String> {
        let mut units = vec![0u16; n_chars];
        for unit in units.iter_mut() {
            *unit = self.read_u16()?;
        }
        String::from_utf16(&units)
            .map_err(|err| Error::FormatError(format!("invalid utf-16: {}", err)))
    }

    /// Reads `n_bytes` raw bytes and decodes them as UTF-8.
    pub fn read_utf8(&mut self, n_bytes: usize) -> Result<String> {
        let bytes = self.read_bytes(n_bytes)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Reads a LEB128-style variable-length unsigned integer.
    ///
    /// Each byte's continuation bit (`0x80`) signals that another byte follows; the low-order 7
    /// bits of each byte are payload, assembled in little-endian group order (the first byte
    /// read holds the least-significant 7 bits).
    pub fn read_var_uint(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 {
                return Err(Error::FormatError(
                    "variable-length integer longer than 64 bits".to_string(),
                ));
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Closes this cursor, dropping the underlying reader (and, for a file, its handle).
    pub fn close(self) {
        drop(self.inner)
    }
}

/// Decodes a ZigZag-encoded unsigned integer back into its signed value.
///
/// Used for the delta-encoded coordinate streams in geometry blobs: `n = (raw >> 1) ^ -(raw & 1)`.
pub fn zigzag_decode(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

/// Encodes a signed integer into its ZigZag unsigned form. Only used by the test-only geometry
/// encoder; the crate has no public write path.
#[cfg(test)]
pub(crate) fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}
