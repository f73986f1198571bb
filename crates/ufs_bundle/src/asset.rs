//! A single member of an archive.
//!
//! | Field            | Encoding                                                     |
//! |------------------|--------------------------------------------------------------|
//! | Metadata size    | 4 bytes, big endian                                          |
//! | File size        | 4 bytes, big endian                                          |
//! | Format           | 4 bytes, big endian                                          |
//! | Data offset      | 4 bytes, big endian                                          |
//! | Endianness       | 1 byte + 3 padding, format 9 and later, non-zero is big      |
//! | Type metadata    | see [`TypeMetadata`]                                         |
//! | Long ids         | 4 bytes, formats 7 through 13                                |
//! | Objects          | count + [`ObjectInfo`] entries, 4 aligned from format 14     |
//! | Script table     | count + 12 byte records, format 15 and later                 |
//! | External refs    | count + [`AssetRef`] entries, format 6 and later             |
//! | Trailer          | null terminated string                                       |
//! | Object data      | `data offset..file size`                                     |

use std::{collections::HashSet, fmt, ops::Range, sync::Arc};

use binrw::Endian;
use indexmap::{map::Entry, IndexMap};
use tracing::{debug, instrument, warn};

use crate::{
    cursor::ByteCursor,
    error::{Error, Result},
    format::{FormatVersion, IdWidth},
    materialize::{materialize, Materialized, ObjectFactory},
    object::ObjectInfo,
    pointer::{AssetHandle, AssetLocator, AssetRef, ObjectPointer},
    type_metadata::TypeMetadata,
    type_tree::TypeTreeNode,
    value::{Value, ValueReader},
};

/// Member names ending with this hold raw resource data
pub const RESOURCE_SUFFIX: &str = ".resource";

const SCRIPT_TABLE_ENTRY_LEN: usize = 12;

/// A parsed member
///
/// Objects are decoded on request with [`Asset::read_object`], nothing is cached.
pub struct Asset {
    name: String,
    format: FormatVersion,
    endian: Endian,
    long_object_ids: bool,
    metadata: Option<TypeMetadata>,
    objects: IndexMap<i64, ObjectInfo>,
    refs: Vec<AssetRef>,
    bytes: Vec<u8>,
    data: Range<usize>,
}

impl Asset {
    /// Parse a member from its bytes
    ///
    /// Members named with [`RESOURCE_SUFFIX`] are kept as opaque data.
    #[instrument(skip(bytes), fields(len = bytes.len()), err)]
    pub fn parse(bytes: &[u8], name: &str) -> Result<Self> {
        if name.ends_with(RESOURCE_SUFFIX) {
            debug!("keeping resource member opaque");
            return Ok(Self {
                name: name.to_owned(),
                format: FormatVersion::default(),
                endian: Endian::Big,
                long_object_ids: false,
                metadata: None,
                objects: IndexMap::new(),
                refs: Vec::new(),
                bytes: bytes.to_vec(),
                data: 0..bytes.len(),
            });
        }

        let mut cursor = ByteCursor::new(bytes, Endian::Big);
        let _metadata_size = cursor.read::<i32>()?;
        let file_size = cursor.read::<i32>()?;
        let format = FormatVersion(cursor.read::<i32>()?);
        let data_offset = cursor.read::<i32>()?;

        if format.has_endian_flag() {
            let big = cursor.read_bool()?;
            cursor.skip(3)?;
            cursor.set_endian(if big { Endian::Big } else { Endian::Little });
        }

        let metadata = TypeMetadata::parse(&mut cursor, format)?;

        let long_object_ids = format.has_long_id_flag() && cursor.read::<i32>()? != 0;
        let ids = format.object_id_width(long_object_ids);

        let count = cursor.read::<i32>()?.max(0) as usize;
        let mut objects = IndexMap::with_capacity(count.min(cursor.remaining().len()));
        let mut untyped = HashSet::new();
        for _ in 0..count {
            if format.aligns_object_entries() {
                cursor.align(4);
            }
            let mut info = ObjectInfo::parse(&mut cursor, format, ids, &metadata)?;
            info.type_tree = metadata.find_type(info.type_id).cloned();
            if info.type_tree.is_none() && untyped.insert(info.type_id) {
                warn!(type_id = info.type_id, "no type tree embedded for type");
            }

            match objects.entry(info.path_id) {
                Entry::Occupied(_) => return Err(Error::DuplicateObject(info.path_id)),
                Entry::Vacant(slot) => {
                    slot.insert(info);
                }
            }
        }

        if format.has_script_table() {
            let count = cursor.read::<i32>()?;
            let count = usize::try_from(count).map_err(|_| Error::InvalidLength(count))?;
            cursor.align(4);
            cursor.skip(count.saturating_mul(SCRIPT_TABLE_ENTRY_LEN))?;
        }

        let mut refs = Vec::new();
        if format.has_external_refs() {
            let count = cursor.read::<i32>()?.max(0) as usize;
            refs.reserve(count.min(cursor.remaining().len()));
            for _ in 0..count {
                refs.push(AssetRef::parse(&mut cursor)?);
            }
        }

        let _trailer = cursor.read_cstring()?;

        let out_of_bounds = || Error::MemberOutOfBounds {
            name: name.to_owned(),
            offset: data_offset as i64,
            end: file_size as i64,
            len: bytes.len(),
        };
        let start = usize::try_from(data_offset).map_err(|_| out_of_bounds())?;
        let end = usize::try_from(file_size).map_err(|_| out_of_bounds())?;
        if start > end || end > bytes.len() {
            return Err(out_of_bounds());
        }
        let data = start..end;

        debug!(
            %format,
            objects = objects.len(),
            refs = refs.len(),
            data = data.len(),
            "parsed member"
        );

        Ok(Self {
            name: name.to_owned(),
            format,
            endian: cursor.endian(),
            long_object_ids,
            metadata: Some(metadata),
            objects,
            refs,
            bytes: bytes.to_vec(),
            data,
        })
    }

    /// Name of the member within its archive
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared serialized format, zero for resource members
    pub fn format(&self) -> FormatVersion {
        self.format
    }

    /// Byte order of every field after the member header
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Whether the member header forced 8 byte object ids
    pub fn long_object_ids(&self) -> bool {
        self.long_object_ids
    }

    /// Whether this member is opaque resource data
    pub fn is_resource(&self) -> bool {
        self.name.ends_with(RESOURCE_SUFFIX)
    }

    /// Type directory, `None` for resource members
    pub fn type_metadata(&self) -> Option<&TypeMetadata> {
        self.metadata.as_ref()
    }

    /// Objects in directory order
    pub fn objects(&self) -> impl Iterator<Item = &ObjectInfo> {
        self.objects.values()
    }

    /// Number of objects in the directory
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Directory entry of an object
    pub fn object(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.objects.get(&path_id)
    }

    /// External references, slot `n` of a pointer is entry `n - 1`
    pub fn references(&self) -> &[AssetRef] {
        &self.refs
    }

    /// Object data region, or the whole member for resources
    pub fn data(&self) -> &[u8] {
        &self.bytes[self.data.clone()]
    }

    /// The member exactly as stored in the archive
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    /// Schema for a type, falling back to the class id for script types
    pub fn find_type(&self, type_id: i32, class_id: i32) -> Option<&Arc<TypeTreeNode>> {
        let metadata = self.metadata.as_ref()?;
        metadata
            .find_type(type_id)
            .or_else(|| (type_id < 0).then(|| metadata.find_type(class_id)).flatten())
    }

    /// Width of object ids stored in pointers
    pub fn pointer_id_width(&self) -> IdWidth {
        self.format.object_id_width(false)
    }

    /// Decode an object of this member
    #[instrument(skip(self), fields(member = %self.name), err)]
    pub fn read_object(&self, path_id: i64) -> Result<Value> {
        let info = self
            .objects
            .get(&path_id)
            .ok_or(Error::UnresolvedReference { file_id: 0, path_id })?;
        let tree = info
            .type_tree
            .as_ref()
            .or_else(|| self.find_type(info.type_id, info.class_id))
            .ok_or(Error::MissingTypeTree {
                type_id: info.type_id,
            })?;

        let end = info.data_offset as u64 + info.size as u64;
        let data = self.data();
        if end > data.len() as u64 {
            return Err(Error::ObjectOutOfBounds { path_id });
        }

        ValueReader::new(
            data,
            info.data_offset as u64,
            self.endian,
            self.pointer_id_width(),
        )
        .read_value(tree)
    }

    /// Decode an object and hand it to the first factory recognizing its type
    pub fn materialize_object<T>(
        &self,
        path_id: i64,
        factories: &[&dyn ObjectFactory<T>],
    ) -> Result<Materialized<T>> {
        materialize(self.read_object(path_id)?, factories)
    }

    /// The member a pointer refers to
    ///
    /// Null pointers and unknown slots give `None`. External slots are located once through
    /// `locator`, later calls reuse the outcome.
    pub fn resolve(&self, ptr: ObjectPointer, locator: &dyn AssetLocator) -> Option<AssetHandle<'_>> {
        if ptr.is_null() {
            return None;
        }
        match usize::try_from(ptr.file_id).ok()? {
            0 => Some(AssetHandle::Local(self)),
            slot => self
                .refs
                .get(slot - 1)?
                .resolve(locator)
                .map(AssetHandle::External),
        }
    }

    /// Decode the object a pointer refers to
    ///
    /// Null pointers give `Ok(None)`, an unavailable target is
    /// [`Error::UnresolvedReference`].
    pub fn resolve_object(
        &self,
        ptr: ObjectPointer,
        locator: &dyn AssetLocator,
    ) -> Result<Option<Value>> {
        if ptr.is_null() {
            return Ok(None);
        }

        let unresolved = || Error::UnresolvedReference {
            file_id: ptr.file_id,
            path_id: ptr.path_id,
        };
        let target = self.resolve(ptr, locator).ok_or_else(unresolved)?;
        if target.object(ptr.path_id).is_none() {
            return Err(unresolved());
        }
        target.read_object(ptr.path_id).map(Some)
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("endian", &self.endian)
            .field("objects", &self.objects.len())
            .field("refs", &self.refs.len())
            .field("data", &self.data.len())
            .finish_non_exhaustive()
    }
}
