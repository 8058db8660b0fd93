//! Strata - region allocation and string interning
//!
//! Provides the memory layer for compilers and other tools that build many
//! short-lived objects and compare many names:
//! - [`allocator`]: polymorphic allocator handles and the platform allocator
//! - [`region`]: chunked bump allocation with bulk release
//! - [`interner`]: byte strings to dense 32-bit symbols

pub mod allocator;
pub mod config;
pub mod error;
pub mod interner;
pub mod logging;
pub mod region;

// Re-export core types
pub use allocator::{system, AllocBox, Allocer, AllocerVTable, Layout, TrackingAllocer};
pub use config::{InternerConfig, MemoryConfig, RegionConfig};
pub use error::{ConfigError, InternError};
pub use interner::{Interner, Symbol};
pub use region::{Region, RegionStats, CHUNK_ALIGN, DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER, FOOTER_SIZE};
