//! Error types
//!
//! Allocation failure in the region and the allocator handles is `None`;
//! these types cover the layers that report richer failures.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Interning failure; the interner is left exactly as before the call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InternError {
    /// The byte arena could not hold a copy of the input
    #[error("interner arena exhausted while copying {len} bytes")]
    ArenaExhausted { len: usize },

    /// The id -> slice table could not grow
    #[error("symbol table could not grow beyond {capacity} entries")]
    TableExhausted { capacity: usize },

    /// The slice -> id map could not grow
    #[error("symbol map could not grow beyond {capacity} slots")]
    MapExhausted { capacity: usize },

    /// Every 32-bit id has been issued
    #[error("symbol space exhausted")]
    SymbolSpaceExhausted,
}

/// Configuration loading or validation failure
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Create a validation error
    #[inline]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
