//! Memory configuration - TOML-backed settings for regions and interners
//!
//! Every field has a default, so partial documents are accepted; values
//! are validated on load.

use crate::error::ConfigError;
use crate::region::CHUNK_ALIGN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub region: RegionConfig,

    #[serde(default)]
    pub interner: InternerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Alignment every allocation receives at minimum
    #[serde(default = "default_min_align")]
    pub min_align: usize,

    /// Cap on bytes requested from the backing allocator
    #[serde(default)]
    pub allocation_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternerConfig {
    /// Map occupancy that triggers a resize
    #[serde(default = "default_load_factor")]
    pub load_factor: f64,

    /// Entries reserved up front in the symbol table
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Cap on bytes the string arena may request
    #[serde(default)]
    pub arena_limit: Option<usize>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            min_align: default_min_align(),
            allocation_limit: None,
        }
    }
}

impl Default for InternerConfig {
    fn default() -> Self {
        Self {
            load_factor: default_load_factor(),
            initial_capacity: default_initial_capacity(),
            arena_limit: None,
        }
    }
}

fn default_min_align() -> usize {
    1
}

fn default_load_factor() -> f64 {
    0.75
}

fn default_initial_capacity() -> usize {
    64
}

impl RegionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_align.is_power_of_two() {
            return Err(ConfigError::invalid(
                "region.min_align",
                format!("{} is not a power of two", self.min_align),
            ));
        }
        if self.min_align > CHUNK_ALIGN {
            return Err(ConfigError::invalid(
                "region.min_align",
                format!("{} exceeds the chunk alignment of {}", self.min_align, CHUNK_ALIGN),
            ));
        }
        Ok(())
    }
}

impl InternerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.load_factor > 0.0 && self.load_factor < 1.0) {
            return Err(ConfigError::invalid(
                "interner.load_factor",
                format!("{} is outside (0, 1)", self.load_factor),
            ));
        }
        if self.initial_capacity > u32::MAX as usize {
            return Err(ConfigError::invalid(
                "interner.initial_capacity",
                format!("{} exceeds the symbol space", self.initial_capacity),
            ));
        }
        Ok(())
    }
}

impl MemoryConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.region.validate()?;
        self.interner.validate()
    }
}
