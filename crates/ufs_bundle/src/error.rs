//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// unsupported archive signature {0:?}
    #[error("unsupported archive signature {0:?}")]
    #[diagnostic(code(ufs::unsupported_signature))]
    UnsupportedSignature(String),

    /// unsupported compression type {0}
    #[error("unsupported compression type {0}")]
    #[diagnostic(code(ufs::unsupported_compression))]
    UnsupportedCompression(u32),

    /// unsupported member format {0}
    #[error("unsupported member format {0}")]
    #[diagnostic(code(ufs::unsupported_format))]
    UnsupportedFormat(i32),

    /// a block failed to decompress
    #[error("failed to decompress {method} block: {message}")]
    #[diagnostic(code(ufs::decompression))]
    Decompression {
        /// Name of the codec that failed
        method: &'static str,
        /// Message reported by the codec
        message: String,
    },

    /// block table and member table disagree
    #[error("block count {blocks} does not match member count {members}")]
    #[diagnostic(code(ufs::block_count_mismatch))]
    BlockCountMismatch {
        /// Number of entries in the block table
        blocks: usize,
        /// Number of entries in the member table
        members: usize,
    },

    /// a member points outside of the reassembled stream
    #[error("member {name:?} spans {offset}..{end} outside a stream of {len} bytes")]
    #[diagnostic(code(ufs::member_out_of_bounds))]
    MemberOutOfBounds {
        /// Name of the member
        name: String,
        /// Start of the member
        offset: i64,
        /// End of the member
        end: i64,
        /// Length of the reassembled stream
        len: usize,
    },

    /// two members share a name
    #[error("duplicate member name {0:?}")]
    #[diagnostic(code(ufs::duplicate_member))]
    DuplicateMember(String),

    /// duplicate object id {0}
    #[error("duplicate object id {0}")]
    #[diagnostic(code(ufs::duplicate_object))]
    DuplicateObject(i64),

    /// a type tree node is deeper than its open parents allow
    #[error("type tree node at depth {depth} has only {open} open parents")]
    #[diagnostic(code(ufs::invalid_tree_depth))]
    InvalidTreeDepth {
        /// Depth recorded on the node
        depth: u8,
        /// Number of currently open ancestors
        open: usize,
    },

    /// an array schema is missing its element node
    #[error("array type {0:?} has no element node")]
    #[diagnostic(code(ufs::malformed_array))]
    MalformedArray(String),

    /// a length prefix is negative
    #[error("invalid length {0}")]
    #[diagnostic(code(ufs::invalid_length))]
    InvalidLength(i32),

    /// a type index has no class id
    #[error("type index {0} is out of range")]
    #[diagnostic(code(ufs::type_index))]
    TypeIndexOutOfRange(i32),

    /// an object points outside of the object data
    #[error("object {path_id} spans past the end of the object data")]
    #[diagnostic(code(ufs::object_out_of_bounds))]
    ObjectOutOfBounds {
        /// Id of the offending object
        path_id: i64,
    },

    /// the value read was shorter than the schema declares
    #[error("expected {type_name:?} to span {expected} bytes, read {actual}")]
    #[diagnostic(code(ufs::size_mismatch))]
    SizeMismatch {
        /// Type name of the schema node
        type_name: String,
        /// Declared size of the schema node
        expected: i32,
        /// Bytes actually consumed
        actual: u64,
    },

    /// the object has no type tree in this archive
    #[error("no type tree available for type {type_id}")]
    #[diagnostic(code(ufs::missing_type_tree))]
    MissingTypeTree {
        /// Type id of the object
        type_id: i32,
    },

    /// pointer target is not available
    #[error("unresolved reference to object {path_id} in file slot {file_id}")]
    #[diagnostic(code(ufs::unresolved_reference))]
    UnresolvedReference {
        /// File slot of the pointer
        file_id: i32,
        /// Object id of the pointer
        path_id: i64,
    },

    /// external asset could not be located
    #[error("unable to locate external asset {path:?}: {reason}")]
    #[diagnostic(code(ufs::not_resolvable))]
    NotResolvable {
        /// File path of the external reference
        path: String,
        /// Why the locator gave up
        reason: String,
    },

    /// unable to find requested member
    #[error("unable to find requested member")]
    MemberNotFound(#[from] MemberNotFoundError),

    /// failure while parsing a single member
    #[error("failed to parse member {name:?}")]
    #[diagnostic(code(ufs::member))]
    Member {
        /// Name of the member being parsed
        name: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },
}

/// Error type to provide further information when a member has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested member")]
pub enum MemberNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Broad classification of an [`Error`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading the underlying source failed
    Io,
    /// The archive uses a layout this library does not understand
    Format,
    /// The archive contradicts itself, either corrupt or misinterpreted
    Structural,
    /// A pointer target is not available to this process
    UnresolvedReference,
}

impl Error {
    /// Classify the error, looking through member wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IOError(_) | Error::BinRWError(_) => ErrorKind::Io,
            Error::UnsupportedSignature(_)
            | Error::UnsupportedCompression(_)
            | Error::UnsupportedFormat(_) => ErrorKind::Format,
            Error::Decompression { .. }
            | Error::BlockCountMismatch { .. }
            | Error::MemberOutOfBounds { .. }
            | Error::DuplicateMember(_)
            | Error::DuplicateObject(_)
            | Error::InvalidTreeDepth { .. }
            | Error::MalformedArray(_)
            | Error::InvalidLength(_)
            | Error::TypeIndexOutOfRange(_)
            | Error::ObjectOutOfBounds { .. }
            | Error::SizeMismatch { .. }
            | Error::MemberNotFound(_) => ErrorKind::Structural,
            Error::MissingTypeTree { .. }
            | Error::UnresolvedReference { .. }
            | Error::NotResolvable { .. } => ErrorKind::UnresolvedReference,
            Error::Member { source, .. } => source.kind(),
        }
    }

    pub(crate) fn in_member(self, name: &str) -> Self {
        Error::Member {
            name: name.to_owned(),
            source: Box::new(self),
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
