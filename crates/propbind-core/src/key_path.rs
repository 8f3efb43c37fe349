#![forbid(unsafe_code)]

//! Dot-separated key paths.
//!
//! A [`KeyPath`] names a (possibly nested) location inside a value tree, e.g.
//! `"profile.displayName"` or `"items.0.label"`. Paths are validated once at
//! construction so every consumer can rely on a non-empty list of non-empty
//! segments.
//!
//! # Invariants
//!
//! 1. A `KeyPath` has at least one segment.
//! 2. No segment is empty (`"a..b"`, `".a"` and `"a."` are rejected).
//! 3. Equality and hashing are by the canonical dotted string.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Error |
//! |---------|-------|-------|
//! | Empty input | `""` | [`KeyPathError::Empty`] |
//! | Empty segment | doubled, leading or trailing `.` | [`KeyPathError::EmptySegment`] |
//! | Missing key | object lacks the segment | [`KeyPathError::NotFound`] |
//! | Scalar traversal | segment applied to a string/number/bool | [`KeyPathError::NotContainer`] |
//! | Bad index | array index past the end | [`KeyPathError::IndexOutOfBounds`] |
//! | Wrong value type | typed property rejects a value | [`KeyPathError::TypeMismatch`] |

use std::fmt;
use std::str::FromStr;

/// Separator between key path segments.
pub const SEPARATOR: char = '.';
const SEPARATOR_STR: &str = ".";

/// Errors produced while parsing or resolving a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPathError {
    /// The path string was empty.
    Empty,
    /// The segment at `index` was empty.
    EmptySegment { index: usize },
    /// No value exists at `path`.
    NotFound { path: String },
    /// `path` resolved to a scalar, which has no children.
    NotContainer { path: String },
    /// `index` was past the end of the array at `path` (length `len`).
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
    /// A typed property at `path` only accepts `expected` values.
    TypeMismatch {
        path: String,
        expected: &'static str,
    },
}

impl fmt::Display for KeyPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "key path is empty"),
            Self::EmptySegment { index } => write!(f, "key path segment {index} is empty"),
            Self::NotFound { path } => write!(f, "no value at key path '{path}'"),
            Self::NotContainer { path } => {
                write!(f, "value at '{path}' is not an object or array")
            }
            Self::IndexOutOfBounds { path, index, len } => {
                write!(f, "index {index} out of bounds at '{path}' (len {len})")
            }
            Self::TypeMismatch { path, expected } => {
                write!(f, "property '{path}' expects {expected}")
            }
        }
    }
}

impl std::error::Error for KeyPathError {}

/// A validated, dot-separated key path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    raw: Box<str>,
}

impl KeyPath {
    /// Parse a dotted path.
    ///
    /// # Errors
    ///
    /// [`KeyPathError::Empty`] for `""`, [`KeyPathError::EmptySegment`] when
    /// any segment between separators is empty.
    pub fn parse(raw: &str) -> Result<Self, KeyPathError> {
        if raw.is_empty() {
            return Err(KeyPathError::Empty);
        }
        if let Some(index) = raw.split(SEPARATOR).position(str::is_empty) {
            return Err(KeyPathError::EmptySegment { index });
        }
        Ok(Self { raw: raw.into() })
    }

    /// The canonical dotted form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.raw.split(SEPARATOR)
    }

    /// Number of segments (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments().count()
    }

    /// Always `false`; present for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the path is a single key (no nesting).
    #[must_use]
    pub fn is_single(&self) -> bool {
        !self.raw.contains(SEPARATOR)
    }

    /// The first segment.
    #[must_use]
    pub fn first(&self) -> &str {
        self.raw.split(SEPARATOR).next().unwrap_or(&self.raw)
    }

    /// The last segment.
    #[must_use]
    pub fn last(&self) -> &str {
        self.raw.rsplit(SEPARATOR).next().unwrap_or(&self.raw)
    }

    /// The path without its last segment, or `None` for a single key.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.raw.rsplit_once(SEPARATOR).map(|(head, _)| Self {
            raw: head.into(),
        })
    }

    /// Append `other` to this path.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            raw: format!("{}{SEPARATOR}{}", self.raw, other.raw).into(),
        }
    }

    /// Whether `prefix` names this path or one of its ancestors.
    ///
    /// Comparison is segment-wise: `"ab"` is not a prefix of `"abc.d"`.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        let mut own = self.segments();
        prefix.segments().all(|seg| own.next() == Some(seg))
    }

    /// Whether a write at one path can change the value at the other.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    /// The dotted form of the first `count` segments.
    #[must_use]
    pub fn prefix_str(&self, count: usize) -> String {
        self.segments()
            .take(count)
            .collect::<Vec<_>>()
            .join(SEPARATOR_STR)
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPath({:?})", self.raw)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for KeyPath {
    type Err = KeyPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for KeyPath {
    type Error = KeyPathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for KeyPath {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
