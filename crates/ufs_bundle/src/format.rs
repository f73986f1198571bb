//! Layout differences between serialized member format versions.
//!
//! Each threshold is a separate predicate on [`FormatVersion`] so the parsers read as a list of
//! "does this version have X" checks instead of inline comparisons.

use std::fmt;

/// Class id used for script backed objects, remapped by script index from format 17
pub const SCRIPT_BEHAVIOUR_CLASS_ID: i32 = 114;

/// Width of an object id within a member
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdWidth {
    /// A 4 byte id widened to 64 bits
    Narrow,
    /// An 8 byte id
    Wide,
}

/// The serialized format version declared in a member header
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FormatVersion(pub i32);

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FormatVersion {
    /// Header carries an explicit endianness byte
    pub fn has_endian_flag(self) -> bool {
        self.0 >= 9
    }

    /// Type trees use the node blob layout this library understands
    pub fn supports_type_tree_blob(self) -> bool {
        self.0 == 10 || self.0 >= 12
    }

    /// Type directory is a typed list with hashes and an optional tree per type
    pub fn has_type_list(self) -> bool {
        self.0 >= 13
    }

    /// Type entries carry a script index used to remap script backed class ids
    pub fn has_script_index(self) -> bool {
        self.0 >= 17
    }

    /// Objects store an index into the type list rather than a separate type and class id
    pub fn uses_type_index(self) -> bool {
        self.0 >= 17
    }

    /// Header carries a flag forcing 8 byte object ids
    pub fn has_long_id_flag(self) -> bool {
        (7..=13).contains(&self.0)
    }

    /// Each object entry starts on a 4 byte boundary
    pub fn aligns_object_entries(self) -> bool {
        self.0 >= 14
    }

    /// A table of 12 byte records follows the object directory
    pub fn has_script_table(self) -> bool {
        self.0 >= 15
    }

    /// An external reference table follows the object directory
    pub fn has_external_refs(self) -> bool {
        self.0 >= 6
    }

    /// Width of object ids
    ///
    /// `long_ids_forced` is the member level flag present for formats 7 through 13. Pointers
    /// inside object data ignore that flag and use `object_id_width(false)`.
    pub fn object_id_width(self, long_ids_forced: bool) -> IdWidth {
        if long_ids_forced || self.0 >= 14 {
            IdWidth::Wide
        } else {
            IdWidth::Narrow
        }
    }

    /// Bytes that trail every object entry and are only read to stay in sync
    pub fn object_entry_padding(self) -> usize {
        let mut skip = 0;
        if self.0 <= 10 {
            skip += 2;
        }
        if (11..=16).contains(&self.0) {
            skip += 2;
        }
        if (15..=16).contains(&self.0) {
            skip += 1;
        }
        skip
    }
}

/// Remap a class id read from the type list when script identity replaces it
///
/// Script backed objects share one engine class, so they are keyed by `-1 - script_index`
/// instead (or `-1` when the script index is unset).
pub fn remap_script_class_id(class_id: i32, script_index: i16) -> i32 {
    if class_id != SCRIPT_BEHAVIOUR_CLASS_ID {
        return class_id;
    }
    if script_index >= 0 {
        -1 - script_index as i32
    } else {
        -1
    }
}

/// Length of the type hash for a class id, script types carry an extra 16 bytes
pub fn type_hash_len(class_id: i32) -> usize {
    if class_id < 0 {
        0x20
    } else {
        0x10
    }
}
