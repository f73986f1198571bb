//! Pointers between objects and the external assets they may point into.

use std::{
    fmt,
    ops::Deref,
    sync::{Arc, OnceLock},
};

use tracing::{debug, warn};

use crate::{
    asset::Asset,
    cursor::ByteCursor,
    error::{Error, Result},
};

/// An unresolved reference to an object
///
/// `file_id` selects a slot in the owning asset's reference table, slot 0 being the asset
/// itself. A `path_id` of 0 is the null pointer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ObjectPointer {
    pub file_id: i32,
    pub path_id: i64,
}

impl ObjectPointer {
    /// Whether this pointer refers to nothing
    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }
}

impl fmt::Display for ObjectPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.path_id)
    }
}

/// Finds the asset an external reference names
///
/// Locating sibling archives is up to the caller, the library ships only
/// [`UnimplementedLocator`].
pub trait AssetLocator {
    fn locate(&self, file_path: &str) -> Result<Arc<Asset>>;
}

/// A locator that never finds anything
#[derive(Debug, Default, Copy, Clone)]
pub struct UnimplementedLocator;

impl AssetLocator for UnimplementedLocator {
    fn locate(&self, file_path: &str) -> Result<Arc<Asset>> {
        Err(Error::NotResolvable {
            path: file_path.to_owned(),
            reason: "not implemented".into(),
        })
    }
}

/// An entry of an asset's reference table
#[derive(Debug, Default)]
pub struct AssetRef {
    /// Path of the referenced asset
    pub asset_path: String,
    /// Identifier of the referenced asset
    pub guid: [u8; 16],
    /// Kind of reference
    pub ref_type: i32,
    /// File path handed to the [`AssetLocator`]
    pub file_path: String,
    resolved: OnceLock<Option<Arc<Asset>>>,
}

impl AssetRef {
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            asset_path: cursor.read_cstring()?,
            guid: cursor.read_array()?,
            ref_type: cursor.read()?,
            file_path: cursor.read_cstring()?,
            resolved: OnceLock::new(),
        })
    }

    /// Resolve the referenced asset
    ///
    /// The first call asks `locator`, its outcome is kept for every later call, including a
    /// failure.
    pub fn resolve(&self, locator: &dyn AssetLocator) -> Option<Arc<Asset>> {
        self.resolved
            .get_or_init(|| match locator.locate(&self.file_path) {
                Ok(asset) => {
                    debug!(path = %self.file_path, "resolved external asset");
                    Some(asset)
                }
                Err(e) => {
                    warn!(path = %self.file_path, error = %e, "external asset unavailable");
                    None
                }
            })
            .clone()
    }

    /// Whether [`AssetRef::resolve`] has been attempted
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

/// The asset a pointer resolved to
#[derive(Debug, Clone)]
pub enum AssetHandle<'a> {
    /// The asset holding the pointer
    Local(&'a Asset),
    /// An asset reached through the reference table
    External(Arc<Asset>),
}

impl Deref for AssetHandle<'_> {
    type Target = Asset;

    fn deref(&self) -> &Asset {
        match self {
            AssetHandle::Local(asset) => asset,
            AssetHandle::External(asset) => asset,
        }
    }
}
