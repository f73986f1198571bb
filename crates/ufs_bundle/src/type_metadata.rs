//! The per member table of types, their hashes and schemas.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    cursor::ByteCursor,
    error::{Error, Result},
    format::{remap_script_class_id, type_hash_len, FormatVersion},
    type_tree::TypeTreeNode,
};

/// Types declared by a member
///
/// Keys are class ids, negative for script defined types (see
/// [`crate::format::remap_script_class_id`]).
#[derive(Debug, Clone, Default)]
pub struct TypeMetadata {
    /// Version string of the tool that produced the member
    pub generator_version: String,
    /// Platform the member was built for
    pub target_platform: u32,
    class_ids: Vec<i32>,
    hashes: HashMap<i32, Vec<u8>>,
    trees: HashMap<i32, Arc<TypeTreeNode>>,
}

impl TypeMetadata {
    /// Read the type table at the cursor
    #[instrument(skip(cursor), err)]
    pub fn parse(cursor: &mut ByteCursor<'_>, format: FormatVersion) -> Result<Self> {
        let mut metadata = TypeMetadata {
            generator_version: cursor.read_cstring()?,
            target_platform: cursor.read::<u32>()?,
            ..Default::default()
        };

        if format.has_type_list() {
            let has_trees = cursor.read_bool()?;
            let count = cursor.read::<i32>()?.max(0) as usize;
            metadata.class_ids.reserve(count.min(cursor.remaining().len()));

            for _ in 0..count {
                let mut class_id = cursor.read::<i32>()?;
                if format.has_script_index() {
                    cursor.skip(1)?;
                    let script_index = cursor.read::<i16>()?;
                    class_id = remap_script_class_id(class_id, script_index);
                }

                metadata.class_ids.push(class_id);
                let hash = cursor.read_bytes(type_hash_len(class_id))?;
                metadata.hashes.insert(class_id, hash.to_vec());

                if has_trees {
                    let tree = TypeTreeNode::parse(cursor, format)?;
                    metadata.trees.insert(class_id, tree);
                }
            }
        } else {
            let count = cursor.read::<i32>()?.max(0) as usize;
            for _ in 0..count {
                let class_id = cursor.read::<i32>()?;
                let tree = TypeTreeNode::parse(cursor, format)?;
                metadata.trees.insert(class_id, tree);
            }
        }

        debug!(
            types = metadata.class_ids.len(),
            trees = metadata.trees.len(),
            "parsed type metadata"
        );
        Ok(metadata)
    }

    /// Schema registered for a class id
    pub fn find_type(&self, class_id: i32) -> Option<&Arc<TypeTreeNode>> {
        self.trees.get(&class_id)
    }

    /// Class id at a position in the type list
    pub fn find_class_id(&self, type_index: i32) -> Result<i32> {
        usize::try_from(type_index)
            .ok()
            .and_then(|i| self.class_ids.get(i).copied())
            .ok_or(Error::TypeIndexOutOfRange(type_index))
    }

    /// Hash recorded for a class id
    pub fn hash(&self, class_id: i32) -> Option<&[u8]> {
        self.hashes.get(&class_id).map(|h| h.as_slice())
    }

    /// Class ids in declaration order
    pub fn class_ids(&self) -> &[i32] {
        &self.class_ids
    }

    /// Whether the member embeds any schema
    pub fn has_type_trees(&self) -> bool {
        !self.trees.is_empty()
    }

    /// All schemas keyed by class id
    pub fn type_trees(&self) -> impl Iterator<Item = (i32, &Arc<TypeTreeNode>)> {
        self.trees.iter().map(|(id, tree)| (*id, tree))
    }
}
