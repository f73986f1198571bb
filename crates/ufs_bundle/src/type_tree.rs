//! Self-describing type schemas embedded in each member.
//!
//! A type tree is stored as a flat array of 24 byte node records, each tagged with its depth,
//! followed by a string buffer holding the type and field names. Names may instead point into
//! [`COMMON_STRINGS`], a table shared by every archive, when the high bit of the offset is set.
//!
//! | Offset (bytes) | Field        | Description                                      |
//! |----------------|--------------|--------------------------------------------------|
//! | 0x0000         | Version      | 2 bytes: schema version of the node              |
//! | 0x0002         | Depth        | 1 byte: distance from the root                   |
//! | 0x0003         | Is Array     | 1 byte: non-zero for array nodes                 |
//! | 0x0004         | Type         | 4 bytes: string offset of the type name          |
//! | 0x0008         | Name         | 4 bytes: string offset of the field name         |
//! | 0x000C         | Size         | 4 bytes: byte size of the value, -1 if variable  |
//! | 0x0010         | Index        | 4 bytes: declaration index                       |
//! | 0x0014         | Flags        | 4 bytes: meta flags, 0x4000 aligns after value   |

use std::{fmt, sync::Arc};

use tracing::{instrument, trace};

use crate::{
    cursor::ByteCursor,
    error::{Error, Result},
    format::FormatVersion,
};

/// Size of a single node record
pub const NODE_RECORD_LEN: usize = 24;

/// Node flag requesting 4 byte alignment after the value
pub const FLAG_ALIGN: i32 = 0x4000;

/// Prefix of every pointer type name
pub const POINTER_PREFIX: &str = "PPtr<";

const COMMON_OFFSET_BIT: u32 = 0x8000_0000;

/// Names shared by all archives, addressed by offset with the high bit set
pub const COMMON_STRINGS: &[u8] = concat!(
    "AABB\0AnimationClip\0AnimationCurve\0AnimationState\0Array\0Base\0BitField\0bitset\0",
    "bool\0char\0ColorRGBA\0Component\0data\0deque\0double\0dynamic_array\0",
    "FastPropertyName\0first\0float\0Font\0GameObject\0Generic Mono\0GradientNEW\0GUID\0",
    "GUIStyle\0int\0list\0long long\0map\0Matrix4x4f\0MdFour\0MonoBehaviour\0MonoScript\0",
    "m_ByteSize\0m_Curve\0m_EditorClassIdentifier\0m_EditorHideFlags\0m_Enabled\0",
    "m_ExtensionPtr\0m_GameObject\0m_Index\0m_IsArray\0m_IsStatic\0m_MetaFlag\0m_Name\0",
    "m_ObjectHideFlags\0m_PrefabInternal\0m_PrefabParentObject\0m_Script\0",
    "m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0PPtr<Component>\0",
    "PPtr<GameObject>\0PPtr<Material>\0PPtr<MonoBehaviour>\0PPtr<MonoScript>\0",
    "PPtr<Object>\0PPtr<Prefab>\0PPtr<Sprite>\0PPtr<TextAsset>\0PPtr<Texture>\0",
    "PPtr<Texture2D>\0PPtr<Transform>\0Prefab\0Quaternionf\0Rectf\0RectInt\0RectOffset\0",
    "second\0set\0short\0size\0SInt16\0SInt32\0SInt64\0SInt8\0staticvector\0string\0",
    "TextAsset\0TextMesh\0Texture\0Texture2D\0Transform\0TypelessData\0UInt16\0UInt32\0",
    "UInt64\0UInt8\0unsigned int\0unsigned long long\0unsigned short\0vector\0Vector2f\0",
    "Vector3f\0Vector4f\0m_ScriptingClassIdentifier\0Gradient\0",
)
.as_bytes();

/// One node of a type schema
///
/// Children are in declaration order, which is also the order their values are serialized in.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TypeTreeNode {
    /// Schema version of this node
    pub version: i16,
    /// Whether this node describes an array
    pub is_array: bool,
    /// Name of the type, such as `int` or `GameObject`
    pub type_name: String,
    /// Name of the field holding this value
    pub name: String,
    /// Byte size of the value, zero or negative when variable
    pub size: i32,
    /// Declaration index
    pub index: i32,
    /// Meta flags
    pub flags: i32,
    /// Fields of this node
    pub children: Vec<Arc<TypeTreeNode>>,
}

#[derive(Default)]
struct FlatNode {
    node: TypeTreeNode,
    children: Vec<usize>,
}

impl TypeTreeNode {
    /// Parse one type tree blob, returning its root
    #[instrument(skip(cursor), err)]
    pub fn parse(cursor: &mut ByteCursor<'_>, format: FormatVersion) -> Result<Arc<TypeTreeNode>> {
        if !format.supports_type_tree_blob() {
            return Err(Error::UnsupportedFormat(format.0));
        }

        let node_count = cursor.read::<u32>()? as usize;
        let buffer_len = cursor.read::<u32>()? as usize;
        let records = cursor.read_bytes(node_count.saturating_mul(NODE_RECORD_LEN))?;
        let strings = cursor.read_bytes(buffer_len)?;
        trace!(node_count, buffer_len, "parsing type tree");

        let mut records = ByteCursor::new(records, cursor.endian());
        let mut flat = vec![FlatNode::default()];
        let mut parents: Vec<usize> = vec![0];

        for _ in 0..node_count {
            let version = records.read::<i16>()?;
            let depth = records.read::<u8>()?;
            let node = TypeTreeNode {
                version,
                is_array: records.read_bool()?,
                type_name: lookup_string(records.read::<i32>()?, strings),
                name: lookup_string(records.read::<i32>()?, strings),
                size: records.read::<i32>()?,
                index: records.read::<i32>()?,
                flags: records.read::<i32>()?,
                children: Vec::new(),
            };

            if depth == 0 {
                flat[0].node = node;
                continue;
            }

            let depth = depth as usize;
            if depth > parents.len() {
                return Err(Error::InvalidTreeDepth {
                    depth: depth as u8,
                    open: parents.len(),
                });
            }
            parents.truncate(depth);
            let parent = parents[depth - 1];

            flat.push(FlatNode {
                node,
                children: Vec::new(),
            });
            let current = flat.len() - 1;
            flat[parent].children.push(current);
            parents.push(current);
        }

        Ok(assemble(&mut flat, 0))
    }

    /// Whether the stream is aligned to 4 bytes after this value
    pub fn post_align(&self) -> bool {
        self.flags & FLAG_ALIGN != 0
    }

    /// Whether this node is an object pointer
    pub fn is_pointer(&self) -> bool {
        self.type_name.starts_with(POINTER_PREFIX)
    }

    /// Find a direct child by field name
    pub fn child(&self, name: &str) -> Option<&Arc<TypeTreeNode>> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Number of nodes in this tree, including itself
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{} {}", "", self.type_name, self.name, indent = depth * 2)?;
        if self.size > 0 {
            write!(f, " // {} bytes", self.size)?;
        }
        if self.is_array {
            f.write_str(" [array]")?;
        }
        if self.post_align() {
            f.write_str(" [align]")?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn assemble(flat: &mut [FlatNode], index: usize) -> Arc<TypeTreeNode> {
    let children = std::mem::take(&mut flat[index].children);
    let mut node = std::mem::take(&mut flat[index].node);
    node.children = children
        .into_iter()
        .map(|child| assemble(flat, child))
        .collect();
    Arc::new(node)
}

/// Resolve a name offset against the shared table or the local buffer
///
/// Offsets past the end of their table produce `unknown(<offset>)` rather than failing.
fn lookup_string(offset: i32, local: &[u8]) -> String {
    let (table, start) = if offset as u32 & COMMON_OFFSET_BIT != 0 {
        (COMMON_STRINGS, (offset as u32 & !COMMON_OFFSET_BIT) as usize)
    } else {
        (local, offset as usize)
    };

    if start >= table.len() {
        return format!("unknown({offset})");
    }

    let tail = &table[start..];
    let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
    String::from_utf8_lossy(&tail[..end]).into_owned()
}
