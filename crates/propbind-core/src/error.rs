#![forbid(unsafe_code)]

//! Error taxonomy of the binding engine.
//!
//! # Failure Modes
//!
//! | Error | Raised by | Surface |
//! |-------|-----------|---------|
//! | `InvalidName` | `bind` with an empty or disallowed name | returned |
//! | `InvalidPath` | `bind` with an empty or unresolvable key path | returned |
//! | `InvalidTarget` | `bind` on a released target | returned |
//! | `CapacityExceeded` | `bind` of a new name past the configured limit | returned |
//! | `WriteFailed` | owner rejects a bound value | returned from `bind`, failure channel otherwise |
//! | `OwnerReleased` | notification after the owner is gone | failure channel |
//! | `StaleNotification` | callback for a torn-down binding | swallowed |

use std::fmt;

use crate::key_path::KeyPathError;

/// Errors from binding operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The binding name was empty or not allowed by configuration.
    InvalidName { name: String, reason: String },
    /// The key path was empty or does not resolve on the target.
    InvalidPath {
        key_path: String,
        source: KeyPathError,
    },
    /// The target was already released.
    InvalidTarget,
    /// The owner was released while a binding still delivered values.
    OwnerReleased,
    /// Writing the bound value into the owner failed.
    WriteFailed { name: String, source: KeyPathError },
    /// Binding another name would exceed the configured limit.
    CapacityExceeded { limit: usize },
    /// A notification arrived for a binding that is no longer live.
    StaleNotification { token: u64 },
}

impl BindingError {
    /// Whether this error is internal to the engine and never surfaced.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::StaleNotification { .. })
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { name, reason } => {
                write!(f, "invalid binding name '{name}': {reason}")
            }
            Self::InvalidPath { key_path, source } => {
                write!(f, "invalid key path '{key_path}': {source}")
            }
            Self::InvalidTarget => write!(f, "binding target was released"),
            Self::OwnerReleased => write!(f, "binding owner was released"),
            Self::WriteFailed { name, source } => {
                write!(f, "failed to write bound property '{name}': {source}")
            }
            Self::CapacityExceeded { limit } => {
                write!(f, "binding limit of {limit} reached")
            }
            Self::StaleNotification { token } => {
                write!(f, "notification for stale observation token {token}")
            }
        }
    }
}

impl std::error::Error for BindingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPath { source, .. } | Self::WriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_includes_context() {
        let err = BindingError::InvalidPath {
            key_path: "profile.name".into(),
            source: KeyPathError::NotFound {
                path: "profile".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "invalid key path 'profile.name': no value at key path 'profile'"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn only_stale_is_internal() {
        assert!(BindingError::StaleNotification { token: 3 }.is_internal());
        assert!(!BindingError::InvalidTarget.is_internal());
        assert!(!BindingError::OwnerReleased.is_internal());
    }
}
