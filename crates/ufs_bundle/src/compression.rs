//! Block decompression handling.

use std::fmt;

use lzma_rs::decompress::{Options, UnpackedSize};
use tracing::instrument;

use crate::error::{Error, Result};

/// Mask selecting the compression type from a flags word
pub const COMPRESSION_MASK: u32 = 0x3F;

/// Length of the LZMA properties header that precedes every LZMA block
pub const LZMA_PROPERTIES_LEN: usize = 5;

/// Identifies the storage format used to compress a block inside the archive
///
/// Both the info block and the data blocks select their method through the low 6 bits of a
/// flags field, see [`CompressionMethod::from_flags`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None = 0,

    /// Raw LZMA stream prefixed with its 5 byte properties
    Lzma = 1,

    /// LZ4 block
    Lz4 = 2,

    /// LZ4 block written by the high compression encoder
    Lz4Hc = 3,
}

impl TryFrom<u32> for CompressionMethod {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(CompressionMethod::None),
            1 => Ok(CompressionMethod::Lzma),
            2 => Ok(CompressionMethod::Lz4),
            3 => Ok(CompressionMethod::Lz4Hc),
            other => Err(Error::UnsupportedCompression(other)),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CompressionMethod {
    /// Extract the method from a header or block flags field
    pub fn from_flags(flags: u32) -> Result<Self> {
        Self::try_from(flags & COMPRESSION_MASK)
    }

    /// Short name used in logs and errors
    pub fn name(self) -> &'static str {
        match self {
            CompressionMethod::None => "none",
            CompressionMethod::Lzma => "lzma",
            CompressionMethod::Lz4 => "lz4",
            CompressionMethod::Lz4Hc => "lz4hc",
        }
    }

    /// Decode one compressed region into exactly `uncompressed_size` bytes
    ///
    /// LZMA regions include their 5 byte properties header in `data`.
    #[instrument(skip(data), fields(compressed = data.len()), err)]
    pub fn decompress(self, data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let out = match self {
            CompressionMethod::None => data.to_vec(),
            CompressionMethod::Lz4 | CompressionMethod::Lz4Hc => {
                lz4_flex::block::decompress(data, uncompressed_size)
                    .map_err(|e| self.failure(e))?
            }
            CompressionMethod::Lzma => {
                let mut input = data;
                let mut out = Vec::with_capacity(uncompressed_size);
                lzma_rs::lzma_decompress_with_options(
                    &mut input,
                    &mut out,
                    &Options {
                        unpacked_size: UnpackedSize::UseProvided(Some(uncompressed_size as u64)),
                        ..Default::default()
                    },
                )
                .map_err(|e| self.failure(e))?;
                out
            }
        };

        if self != CompressionMethod::None && out.len() != uncompressed_size {
            return Err(Error::Decompression {
                method: self.name(),
                message: format!("expected {uncompressed_size} bytes, got {}", out.len()),
            });
        }

        Ok(out)
    }

    fn failure(self, e: impl fmt::Display) -> Error {
        Error::Decompression {
            method: self.name(),
            message: e.to_string(),
        }
    }
}
