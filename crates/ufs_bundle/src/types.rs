//! Base types for the fixed layout parts of a bundle archive.
//!
//! The container header and the info block are always big endian, whatever endianness the
//! members inside declare.

use binrw::{binread, BinRead, NullString};

use crate::compression::CompressionMethod;
use crate::error::Result;

/// Flag bit stating the info block is stored at the end of the file
pub const INFO_BLOCK_AT_END: u32 = 0x80;

/// Container header, following the NUL terminated signature
#[derive(BinRead, Debug, Clone, PartialEq, Default)]
#[br(big)]
pub struct BundleHeader {
    /// Version of the container format
    pub format_version: u32,

    /// Version string of the player that wrote the archive
    pub player_version: NullString,

    /// Version string of the engine that wrote the archive
    pub engine_version: NullString,

    /// Total size of the archive in bytes
    pub size: i64,

    /// Size of the info block as stored
    pub info_compressed: u32,

    /// Size of the info block once decompressed
    pub info_uncompressed: u32,

    /// Compression method in the low 6 bits, [`INFO_BLOCK_AT_END`] and others above
    pub flags: u32,
}

impl BundleHeader {
    /// How the info block is compressed
    pub fn info_compression(&self) -> Result<CompressionMethod> {
        CompressionMethod::from_flags(self.flags)
    }

    /// Whether the info block sits at the end of the stream instead of after the header
    pub fn info_at_end(&self) -> bool {
        self.flags & INFO_BLOCK_AT_END != 0
    }
}

/// One compressed segment of the logical member stream
#[derive(BinRead, Debug, Copy, Clone, PartialEq, Default)]
#[br(big)]
pub struct BlockInfo {
    /// The size of the block once decompressed
    pub uncompressed_size: u32,

    /// The size of the block as stored
    pub compressed_size: u32,

    /// Compression method in the low 6 bits
    pub flags: u16,
}

impl BlockInfo {
    /// How this block is compressed
    pub fn compression(&self) -> Result<CompressionMethod> {
        CompressionMethod::from_flags(self.flags as u32)
    }
}

/// A named region of the reassembled member stream
#[derive(BinRead, Debug, Clone, PartialEq, Default)]
#[br(big)]
pub struct NodeInfo {
    /// Offset of the member within the reassembled stream
    pub offset: i64,

    /// Size of the member in bytes
    pub size: i64,

    /// Status flags, unused when reading
    pub flags: u32,

    /// Name of the member, unique within the archive
    pub name: NullString,
}

/// The decompressed info block
#[binread]
#[derive(Debug, Clone, PartialEq, Default)]
#[br(big)]
pub struct BlocksInfo {
    /// Identifier of the archive contents
    pub guid: [u8; 16],

    #[br(temp)]
    block_count: u32,

    /// Compressed segments in stream order
    #[br(count = block_count)]
    pub blocks: Vec<BlockInfo>,

    #[br(temp)]
    node_count: u32,

    /// Members of the archive
    #[br(count = node_count)]
    pub nodes: Vec<NodeInfo>,
}
