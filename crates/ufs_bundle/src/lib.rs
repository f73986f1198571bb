//! This library handles reading **UnityFS** asset bundles and decoding the objects they contain.
//!
//! # Bundle Format Documentation
//!
//! A bundle is a container of compressed blocks. Decompressed and concatenated, the blocks form
//! one logical stream that is cut into named members. Each member is a serialized file holding
//! a directory of objects together with the type trees needed to decode them, so objects can be
//! read without knowing the engine's class definitions.
//!
//! ## Container
//!
//! The container header is big endian. Strings are null terminated.
//!
//! | Field                  | Encoding | Description                                            |
//! |------------------------|----------|--------------------------------------------------------|
//! | Signature              | string   | `UnityFS` or `UnityWeb`                                |
//! | Format Version         | 4 bytes  | Version of the container                               |
//! | Player Version         | string   | Minimum player version                                 |
//! | Engine Version         | string   | Version of the engine that built the bundle            |
//! | Size                   | 8 bytes  | Total size of the bundle                               |
//! | Info Comp. Size        | 4 bytes  | Compressed size of the info block                      |
//! | Info Uncomp. Size      | 4 bytes  | Uncompressed size of the info block                    |
//! | Flags                  | 4 bytes  | Compression in the low 6 bits, `0x80` info at the end  |
//!
//! ### Info Block
//!
//! Found right after the header, or in the last `Info Comp. Size` bytes of the bundle when
//! flag `0x80` is set. Once decompressed it holds:
//!
//! - **GUID**: 16 bytes identifying the bundle contents.
//! - **Blocks**: a 4 byte count followed by `(uncompressed size: u32, compressed size: u32,
//!   flags: u16)` entries, the low 6 bits of the flags selecting the compression.
//! - **Nodes**: a 4 byte count followed by `(offset: i64, size: i64, flags: u32, name: string)`
//!   entries locating each member within the logical stream.
//!
//! ### Compression Methods
//!
//! - `0`: None
//! - `1`: LZMA, a 5 byte properties header followed by the raw stream
//! - `2`: LZ4
//! - `3`: LZ4HC, decoded the same way as LZ4
//!
//! ## Members
//!
//! Members are parsed by [`asset::Asset::parse`]. The layout of a member changes with its
//! declared format version, see [`format::FormatVersion`] for every threshold. Members whose name
//! ends in `.resource` are raw data referenced by other members and are kept as they are.
//!
//! ## Objects
//!
//! Objects are decoded on request with [`asset::Asset::read_object`], which walks the object's
//! [`type_tree::TypeTreeNode`] and produces a [`value::Value`]. Pointers between objects are
//! plain [`pointer::ObjectPointer`] values followed with [`asset::Asset::resolve_object`].
//!
//! ```no_run
//! use ufs_bundle::{BundleArchive, UnimplementedLocator};
//!
//! fn print_names(path: &str) -> ufs_bundle::error::Result<()> {
//!     let bundle = BundleArchive::open(std::fs::File::open(path)?)?;
//!
//!     for asset in bundle.assets().filter(|a| !a.is_resource()) {
//!         for info in asset.objects() {
//!             let value = asset.read_object(info.path_id)?;
//!             if let Some(name) = value.as_record().and_then(|r| r.name()) {
//!                 println!("{} {name}", info.path_id);
//!             }
//!             let owner_ptr = value
//!                 .as_record()
//!                 .and_then(|r| r.get("m_GameObject"))
//!                 .and_then(|v| v.as_pointer());
//!             if let Some(ptr) = owner_ptr {
//!                 let owner = asset.resolve_object(*ptr, &UnimplementedLocator)?;
//!                 println!("  owned by {owner:?}");
//!             }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod asset;
pub mod compression;
pub mod cursor;
pub mod error;
pub mod format;
pub mod materialize;
pub mod object;
pub mod pointer;
pub mod type_metadata;
pub mod type_tree;
pub mod types;
pub mod value;

pub use archive::{ArchiveOptions, BlockLayout, BundleArchive};
pub use asset::Asset;
pub use compression::CompressionMethod;
pub use materialize::{Materialized, ObjectFactory};
pub use object::ObjectInfo;
pub use pointer::{AssetLocator, ObjectPointer, UnimplementedLocator};
pub use type_tree::TypeTreeNode;
pub use value::{Record, Value};
