//! Error types for bplusidx.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in bplusidx.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading or writing a tree image file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tree image is malformed.
    ///
    /// `offset` is the byte position in the image where decoding stopped.
    #[error("corrupt tree image at byte {offset}: {kind}")]
    Corrupt { offset: usize, kind: CorruptKind },

    /// NaN has no position in the key order and cannot be inserted.
    #[error("key must not be NaN")]
    NanKey,
}

/// Reason a tree image was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CorruptKind {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid node flag {0:#04x}")]
    InvalidFlag(u8),

    /// Zero keys, or more than `MAX_KEYS`.
    #[error("invalid key count {0}")]
    InvalidKeyCount(u32),

    #[error("NaN key")]
    NanKey,

    #[error("keys not strictly ascending")]
    UnsortedKeys,

    /// A key lies outside the range its parent's separators assign.
    #[error("key outside parent separator range")]
    KeyOutOfRange,

    #[error("empty record list")]
    EmptyRecordList,

    /// A leaf was found at a different depth than the first leaf.
    #[error("leaf at depth {found}, expected {expected}")]
    UnbalancedLeaf { expected: usize, found: usize },

    #[error("nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("{0} trailing bytes after root node")]
    TrailingBytes(usize),
}

impl Error {
    pub(crate) fn corrupt(offset: usize, kind: CorruptKind) -> Self {
        Error::Corrupt { offset, kind }
    }

    /// The corruption reason, if this is a format error.
    pub fn corrupt_kind(&self) -> Option<CorruptKind> {
        match self {
            Error::Corrupt { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
