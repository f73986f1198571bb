//! Entries of a member's object directory.

use std::sync::Arc;

use crate::{
    cursor::ByteCursor,
    error::Result,
    format::{FormatVersion, IdWidth},
    type_metadata::TypeMetadata,
    type_tree::TypeTreeNode,
};

/// Location and type of one object within a member's object data
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectInfo {
    /// Identifier unique within the member
    pub path_id: i64,
    /// Offset into the object data region
    pub data_offset: u32,
    /// Serialized length of the object
    pub size: u32,
    /// Type id, equal to `class_id` from format 17
    pub type_id: i32,
    /// Engine class id, negative for script types
    pub class_id: i32,
    /// Schema of the object, `None` when the member carries no tree for its type
    pub type_tree: Option<Arc<TypeTreeNode>>,
}

impl ObjectInfo {
    /// Read one directory entry
    ///
    /// The schema is left unresolved, see [`crate::asset::Asset::find_type`].
    pub fn parse(
        cursor: &mut ByteCursor<'_>,
        format: FormatVersion,
        ids: IdWidth,
        metadata: &TypeMetadata,
    ) -> Result<Self> {
        let path_id = match ids {
            IdWidth::Wide => cursor.read::<i64>()?,
            IdWidth::Narrow => cursor.read::<i32>()? as i64,
        };
        let data_offset = cursor.read::<u32>()?;
        let size = cursor.read::<u32>()?;

        let (type_id, class_id) = if format.uses_type_index() {
            let class_id = metadata.find_class_id(cursor.read::<i32>()?)?;
            (class_id, class_id)
        } else {
            let type_id = cursor.read::<i32>()?;
            let class_id = cursor.read::<i16>()? as i32;
            (type_id, class_id)
        };

        cursor.skip(format.object_entry_padding())?;

        Ok(Self {
            path_id,
            data_offset,
            size,
            type_id,
            class_id,
            type_tree: None,
        })
    }

    /// Whether a schema is available to read this object
    pub fn has_type_tree(&self) -> bool {
        self.type_tree.is_some()
    }

    /// Name of the object's schema type
    pub fn type_name(&self) -> Option<&str> {
        self.type_tree.as_deref().map(|t| t.type_name.as_str())
    }
}
