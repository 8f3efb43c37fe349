#![forbid(unsafe_code)]

//! Registry configuration.
//!
//! [`RegistryConfig`] is plain data with builder-style setters. With the
//! `policy-config` feature it can also be loaded from TOML:
//!
//! ```toml
//! nested_names = false
//! max_bindings = 32
//! trace_updates = true
//! ```
//!
//! Missing keys take their default; unknown keys are rejected.

/// Tunables for a [`BindingRegistry`](crate::BindingRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct RegistryConfig {
    /// Allow dotted binding names that write nested owner properties.
    pub nested_names: bool,
    /// Upper bound on simultaneously bound names. `None` is unbounded.
    pub max_bindings: Option<usize>,
    /// Emit a `trace!` event for every value written into the owner.
    pub trace_updates: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            nested_names: true,
            max_bindings: None,
            trace_updates: false,
        }
    }
}

impl RegistryConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether dotted binding names are allowed.
    #[must_use]
    pub fn nested_names(mut self, allowed: bool) -> Self {
        self.nested_names = allowed;
        self
    }

    /// Limit the number of bound names.
    #[must_use]
    pub fn max_bindings(mut self, limit: usize) -> Self {
        self.max_bindings = Some(limit);
        self
    }

    /// Set whether every owner write is traced.
    #[must_use]
    pub fn trace_updates(mut self, enabled: bool) -> Self {
        self.trace_updates = enabled;
        self
    }
}

#[cfg(feature = "policy-config")]
pub use loading::ConfigError;

#[cfg(feature = "policy-config")]
mod loading {
    use std::path::Path;

    use super::RegistryConfig;

    /// Errors from loading a [`RegistryConfig`].
    #[derive(Debug)]
    pub enum ConfigError {
        /// The file could not be read.
        Io(std::io::Error),
        /// The contents were not a valid configuration.
        Parse(String),
    }

    impl std::fmt::Display for ConfigError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Io(err) => write!(f, "failed to read registry config: {err}"),
                Self::Parse(msg) => write!(f, "invalid registry config: {msg}"),
            }
        }
    }

    impl std::error::Error for ConfigError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                Self::Io(err) => Some(err),
                Self::Parse(_) => None,
            }
        }
    }

    impl From<std::io::Error> for ConfigError {
        fn from(err: std::io::Error) -> Self {
            Self::Io(err)
        }
    }

    impl RegistryConfig {
        /// Parse a configuration from TOML text.
        ///
        /// # Errors
        ///
        /// [`ConfigError::Parse`] for malformed TOML, wrong types or unknown keys.
        pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
        }

        /// Load a configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// [`ConfigError::Io`] if the file cannot be read, otherwise as
        /// [`from_toml_str`](Self::from_toml_str).
        pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
            let text = std::fs::read_to_string(path)?;
            Self::from_toml_str(&text)
        }
    }

}
