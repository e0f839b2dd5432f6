#![forbid(unsafe_code)]

//! Composer policy configuration.
//!
//! [`ComposerConfig`] is plain data with builder-style setters. With the
//! `policy-config` feature it can also be loaded from TOML or JSON:
//!
//! ```toml
//! duplicate_bindings = "reject"
//! push_initial_state = true
//! ```

#[cfg(feature = "policy-config")]
use std::path::{Path, PathBuf};

/// What to do when a field is bound to the same state twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum DuplicateBindingPolicy {
    /// Register another listener; the field is notified once per binding.
    #[default]
    Allow,
    /// Fail with [`BindError::AlreadyBound`](crate::BindError::AlreadyBound).
    Reject,
}

/// Policy knobs for [`ViewModelComposer`](crate::ViewModelComposer).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct ComposerConfig {
    /// Repeated state bindings on one field.
    pub duplicate_bindings: DuplicateBindingPolicy,
    /// Push the current value into a widget as soon as it is bound.
    pub push_initial_state: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            duplicate_bindings: DuplicateBindingPolicy::Allow,
            push_initial_state: true,
        }
    }
}

impl ComposerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duplicate-binding policy.
    #[must_use]
    pub fn duplicate_bindings(mut self, policy: DuplicateBindingPolicy) -> Self {
        self.duplicate_bindings = policy;
        self
    }

    /// Set whether bound widgets receive the current value immediately.
    #[must_use]
    pub fn push_initial_state(mut self, push: bool) -> Self {
        self.push_initial_state = push;
        self
    }
}

// ---------------------------------------------------------------------------
// Loading (policy-config)
// ---------------------------------------------------------------------------

/// Failure to load a [`ComposerConfig`].
#[cfg(feature = "policy-config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// TOML syntax or schema error.
    #[error("invalid TOML policy: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON syntax or schema error.
    #[error("invalid JSON policy: {0}")]
    Json(#[from] serde_json::Error),
    /// The extension is neither `.toml` nor `.json`.
    #[error("unsupported policy file format: {path}")]
    UnknownFormat {
        /// File path.
        path: PathBuf,
    },
}

#[cfg(feature = "policy-config")]
impl ComposerConfig {
    /// Parse a TOML policy. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Toml`] on syntax errors or unknown keys.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Parse a JSON policy. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Json`] on syntax errors or unknown keys.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a policy file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Io`] if the file cannot be read.
    /// - [`ConfigError::UnknownFormat`] for other extensions.
    /// - Parse errors as for [`from_toml_str`](Self::from_toml_str) and
    ///   [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = path.extension().and_then(|ext| ext.to_str());
        if !matches!(format, Some("toml" | "json")) {
            return Err(ConfigError::UnknownFormat {
                path: path.to_path_buf(),
            });
        }
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match format {
            Some("json") => Self::from_json_str(&input),
            _ => Self::from_toml_str(&input),
        }
    }
}
