//! Sequential, endian aware reads over an in-memory byte region.

use binrw::{BinRead, Endian};
use byteorder::ReadBytesExt;
use std::io::{self, Cursor};

use crate::error::Result;

/// A read position within a borrowed byte region
///
/// Every multi-byte read uses the cursor's current [`Endian`], which can be switched part way
/// through a region (member headers are always big endian, the rest follows a flag in the header).
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    inner: Cursor<&'a [u8]>,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    /// Start reading `data` from its first byte
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            inner: Cursor::new(data),
            endian,
        }
    }

    /// The byte order used for multi-byte reads
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the byte order for all following reads
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Offset of the next byte to be read
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Move to an absolute offset within the region
    pub fn set_position(&mut self, position: u64) {
        self.inner.set_position(position);
    }

    /// Size of the whole region
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    /// Whether the region is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read any fixed width value using the current byte order
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        Ok(T::read_options(&mut self.inner, self.endian, ())?)
    }

    /// Read a single byte as a boolean, anything but zero is `true`
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.inner.read_u8()? != 0)
    }

    /// Borrow the next `count` bytes and advance past them
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let data: &'a [u8] = *self.inner.get_ref();
        let start = self.inner.position() as usize;
        let end = start
            .checked_add(count)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("wanted {count} bytes at offset {start}"),
                )
            })?;
        self.inner.set_position(end as u64);
        Ok(&data[start..end])
    }

    /// Read a fixed size byte array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Skip `count` bytes, failing if the region ends first
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Read a NUL terminated string, decoding it lossily as UTF-8
    pub fn read_cstring(&mut self) -> Result<String> {
        let mut raw: Vec<u8> = Vec::new();
        loop {
            let char = self.inner.read_u8()?;
            if char == b'\0' {
                break;
            }
            raw.push(char);
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// Advance to the next multiple of `alignment`
    ///
    /// Padding past the end of the region is not an error, a following read will fail instead.
    pub fn align(&mut self, alignment: u64) {
        let remainder = self.inner.position() % alignment;
        if remainder != 0 {
            self.inner
                .set_position(self.inner.position() + alignment - remainder);
        }
    }

    /// Everything from the current position to the end of the region
    pub fn remaining(&self) -> &'a [u8] {
        let data: &'a [u8] = *self.inner.get_ref();
        let start = (self.inner.position() as usize).min(data.len());
        &data[start..]
    }
}
