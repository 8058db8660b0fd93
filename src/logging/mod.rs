//! Logging infrastructure - structured tracing for memory events
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per module
//! - Zero-cost when disabled
//! - Console or file output, human-readable or JSON
//!
//! Nothing is logged on the allocation fast path; events cover chunk
//! traffic, resets, limits and interner growth.

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::{debug, trace, warn, Level};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Enable file logging
    pub file_output: bool,
    /// Log file path (if file_output enabled)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // STRATA_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("STRATA_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        // STRATA_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("STRATA_LOG_FILE") {
            config.file_output = true;
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("STRATA_LOG_JSON").is_ok();
        config.show_spans = std::env::var("STRATA_LOG_SPANS").is_ok();

        config
    }

    /// Create high-performance config (minimal logging)
    pub fn performance() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Create debug config (verbose logging)
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            file_output: true,
            log_path: Some("strata.log".to_string()),
            json_format: false,
            show_spans: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with default configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
///
/// Only the first call installs a subscriber; later calls are ignored, as
/// is a subscriber installed elsewhere first.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("strata={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let writer = match (config.file_output, config.log_path.as_deref()) {
            (true, Some(path)) => file_writer(Path::new(path)),
            _ => BoxMakeWriter::new(io::stderr),
        };

        let base = fmt::layer()
            .with_writer(writer)
            .with_span_events(span_events)
            .with_target(true)
            .with_line_number(cfg!(debug_assertions));

        let registry = tracing_subscriber::registry().with(env_filter);
        let _ = if config.json_format {
            registry.with(base.json()).try_init()
        } else {
            registry.with(base.compact()).try_init()
        };
    });
}

fn file_writer(path: &Path) -> BoxMakeWriter {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "strata.log".into());
    BoxMakeWriter::new(tracing_appender::rolling::never(directory, file_name))
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Memory event helpers
// ============================================================================

/// A chunk was obtained from the backing allocator
#[inline]
pub fn log_chunk_acquired(size: usize, align: usize, watermark: usize) {
    trace!(
        target: "strata::region",
        event = "chunk_acquired",
        size_bytes = size,
        align,
        watermark,
        "chunk acquired"
    );
}

/// A chunk went back to the backing allocator
#[inline]
pub fn log_chunk_released(size: usize) {
    trace!(
        target: "strata::region",
        event = "chunk_released",
        size_bytes = size,
        "chunk released"
    );
}

/// A new chunk was refused by the allocation limit
pub fn log_allocation_limit(requested: usize, limit: usize, allocated: usize) {
    debug!(
        target: "strata::region",
        event = "allocation_limit",
        requested,
        limit,
        allocated,
        "allocation limit reached"
    );
}

/// The region rewound to its current chunk
pub fn log_region_reset(retained: usize) {
    debug!(
        target: "strata::region",
        event = "region_reset",
        retained_bytes = retained,
        "region reset"
    );
}

/// An interner buffer grew
pub fn log_interner_grow(what: &'static str, old_capacity: usize, new_capacity: usize) {
    debug!(
        target: "strata::interner",
        event = "interner_grow",
        buffer = what,
        old_capacity,
        new_capacity,
        "interner buffer grew"
    );
}

/// Interning failed for lack of memory
pub fn log_intern_failure(len: usize, error: &dyn std::fmt::Display) {
    warn!(
        target: "strata::interner",
        event = "intern_failure",
        len,
        error = %error,
        "intern failed"
    );
}
