//! Types for reading bundle archives
//!

use binrw::BinRead;
use bon::Builder;
use byteorder::ReadBytesExt;
use indexmap::{map::Entry, IndexMap};
use std::{
    fmt::{self, Debug},
    io::{Cursor, Read, Seek, SeekFrom},
    sync::Arc,
};
use tracing::{debug, instrument, trace};

use crate::{
    asset::Asset,
    compression::{CompressionMethod, LZMA_PROPERTIES_LEN},
    error::{Error, MemberNotFoundError, Result},
    types::{BlockInfo, BlocksInfo, BundleHeader, NodeInfo},
};

/// Signature of the current streaming format
pub const UNITY_FS_SIGNATURE: &str = "UnityFS";

/// Signature of web archives, laid out the same way
pub const UNITY_WEB_SIGNATURE: &str = "UnityWeb";

const MAX_SIGNATURE_LEN: usize = 16;

/// How blocks map onto members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockLayout {
    /// Decompress every block into one stream, then slice members out by offset and size
    #[default]
    Contiguous,
    /// Block `i` holds member `i`, both tables must have the same length
    PerBlock,
}

/// Options for decoding an archive
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct ArchiveOptions {
    /// How blocks are assembled into members
    #[builder(default)]
    pub layout: BlockLayout,
}

/// Bundle archive reader
///
/// The whole archive is decoded while opening it, members are available as parsed [`Asset`]s.
///
/// ```no_run
/// fn list_bundle_contents(reader: impl std::io::Read + std::io::Seek) -> ufs_bundle::error::Result<()> {
///     let bundle = ufs_bundle::BundleArchive::open(reader)?;
///
///     for asset in bundle.assets() {
///         println!("{}: {} objects", asset.name(), asset.object_count());
///         for object in asset.objects() {
///             println!("  {} {:?}", object.path_id, object.type_name());
///         }
///     }
///
///     Ok(())
/// }
/// ```
pub struct BundleArchive {
    signature: String,
    header: BundleHeader,
    guid: [u8; 16],
    assets: IndexMap<Box<str>, Arc<Asset>>,
}

impl Debug for BundleArchive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BundleArchive")
            .field("signature", &self.signature)
            .field("format_version", &self.header.format_version)
            .field("members", &self.assets.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BundleArchive {
    /// Read an archive with default options
    pub fn open<R: Read + Seek>(reader: R) -> Result<BundleArchive> {
        Self::open_with_options(reader, ArchiveOptions::default())
    }

    /// Read an archive held in memory
    pub fn from_bytes(bytes: &[u8], options: ArchiveOptions) -> Result<BundleArchive> {
        Self::open_with_options(Cursor::new(bytes), options)
    }

    /// Read an archive, decoding every member it contains
    #[instrument(skip(reader), err)]
    pub fn open_with_options<R: Read + Seek>(
        mut reader: R,
        options: ArchiveOptions,
    ) -> Result<BundleArchive> {
        let signature = read_signature(&mut reader)?;
        if signature != UNITY_FS_SIGNATURE && signature != UNITY_WEB_SIGNATURE {
            return Err(Error::UnsupportedSignature(signature));
        }

        let header = BundleHeader::read(&mut reader)?;
        debug!(
            %signature,
            format = header.format_version,
            engine = %header.engine_version,
            "read archive header"
        );

        let info = Self::get_blocks_info(&mut reader, &header)?;
        debug!(
            blocks = info.blocks.len(),
            members = info.nodes.len(),
            "read block table"
        );

        let members = match options.layout {
            BlockLayout::Contiguous => Self::get_contiguous_members(&mut reader, &info)?,
            BlockLayout::PerBlock => Self::get_per_block_members(&mut reader, &info)?,
        };

        let mut assets = IndexMap::with_capacity(members.len());
        for (name, bytes) in members {
            let slot = match assets.entry(name.into_boxed_str()) {
                Entry::Occupied(slot) => {
                    return Err(Error::DuplicateMember(slot.key().to_string()))
                }
                Entry::Vacant(slot) => slot,
            };
            let asset = Asset::parse(&bytes, slot.key()).map_err(|e| e.in_member(slot.key()))?;
            slot.insert(Arc::new(asset));
        }

        Ok(BundleArchive {
            signature,
            header,
            guid: info.guid,
            assets,
        })
    }

    /// Signature string the archive starts with
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Version of the container format
    pub fn format_version(&self) -> u32 {
        self.header.format_version
    }

    /// Version string of the player that wrote the archive
    pub fn player_version(&self) -> String {
        self.header.player_version.to_string()
    }

    /// Version string of the engine that wrote the archive
    pub fn engine_version(&self) -> String {
        self.header.engine_version.to_string()
    }

    /// Identifier stored in the info block
    pub fn guid(&self) -> &[u8; 16] {
        &self.guid
    }

    /// Name of the first member, empty for an archive without members
    pub fn name(&self) -> &str {
        self.assets.keys().next().map(|n| n.as_ref()).unwrap_or_default()
    }

    /// Number of members contained in this archive.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether this archive contains no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over all member names in this archive.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(|s| s.as_ref())
    }

    /// Returns an iterator over all members in archive order.
    pub fn assets(&self) -> impl Iterator<Item = &Arc<Asset>> {
        self.assets.values()
    }

    /// Get the index of a member by name, if it's present.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.assets.get_index_of(name)
    }

    /// Search for a member by name
    pub fn by_name(&self, name: &str) -> Result<&Arc<Asset>> {
        self.assets
            .get(name)
            .ok_or_else(|| MemberNotFoundError::Name(name.to_owned()).into())
    }

    /// Get a member by index
    pub fn by_index(&self, index: usize) -> Result<&Arc<Asset>> {
        self.assets
            .get_index(index)
            .map(|(_, asset)| asset)
            .ok_or(Error::MemberNotFound(MemberNotFoundError::Index(index)))
    }

    /// Take ownership of the parsed members
    pub fn into_assets(self) -> impl Iterator<Item = Arc<Asset>> {
        self.assets.into_values()
    }

    fn get_blocks_info<R: Read + Seek>(reader: &mut R, header: &BundleHeader) -> Result<BlocksInfo> {
        let compression = header.info_compression()?;
        let resume = reader.stream_position()?;

        if header.info_at_end() {
            reader.seek(SeekFrom::End(-(header.info_compressed as i64)))?;
        }
        let raw = read_region(reader, header.info_compressed as u64)?;
        if header.info_at_end() {
            reader.seek(SeekFrom::Start(resume))?;
        }

        let data = compression.decompress(&raw, header.info_uncompressed as usize)?;
        Ok(BlocksInfo::read(&mut Cursor::new(data))?)
    }

    fn get_contiguous_members<R: Read>(
        reader: &mut R,
        info: &BlocksInfo,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let mut stream = Vec::new();
        for block in &info.blocks {
            stream.extend_from_slice(&read_block(reader, block)?);
        }

        info.nodes
            .iter()
            .map(|node| {
                let name = node.name.to_string();
                let bytes = slice_member(&stream, node, &name)?.to_vec();
                Ok((name, bytes))
            })
            .collect()
    }

    fn get_per_block_members<R: Read>(
        reader: &mut R,
        info: &BlocksInfo,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        if info.blocks.len() != info.nodes.len() {
            return Err(Error::BlockCountMismatch {
                blocks: info.blocks.len(),
                members: info.nodes.len(),
            });
        }

        info.blocks
            .iter()
            .zip(&info.nodes)
            .map(|(block, node)| Ok((node.name.to_string(), read_block(reader, block)?)))
            .collect()
    }
}

fn read_signature<R: Read>(reader: &mut R) -> Result<String> {
    let mut raw = Vec::new();
    loop {
        let char = reader.read_u8()?;
        if char == b'\0' {
            break;
        }
        raw.push(char);
        if raw.len() > MAX_SIGNATURE_LEN {
            return Err(Error::UnsupportedSignature(
                String::from_utf8_lossy(&raw).into_owned(),
            ));
        }
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn read_region<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

fn read_block<R: Read>(reader: &mut R, block: &BlockInfo) -> Result<Vec<u8>> {
    let method = block.compression()?;
    trace!(
        %method,
        compressed = block.compressed_size,
        uncompressed = block.uncompressed_size,
        "decoding block"
    );

    if method == CompressionMethod::Lzma && (block.compressed_size as usize) < LZMA_PROPERTIES_LEN {
        return Err(Error::Decompression {
            method: method.name(),
            message: "block is shorter than its properties header".into(),
        });
    }

    let raw = read_region(reader, block.compressed_size as u64)?;
    method.decompress(&raw, block.uncompressed_size as usize)
}

fn slice_member<'a>(stream: &'a [u8], node: &NodeInfo, name: &str) -> Result<&'a [u8]> {
    let out_of_bounds = || Error::MemberOutOfBounds {
        name: name.to_owned(),
        offset: node.offset,
        end: node.offset.saturating_add(node.size),
        len: stream.len(),
    };

    let start = usize::try_from(node.offset).map_err(|_| out_of_bounds())?;
    let len = usize::try_from(node.size).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
    stream.get(start..end).ok_or_else(out_of_bounds)
}
