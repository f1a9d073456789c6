//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_DIAGNOSTICS_ADDRESS: &str = "0.0.0.0:32388";

/// Root configuration for the engine.
///
/// Empty path/address strings mean "use the default" once the matching
/// toggle is on.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bind address of the HTTP server (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Debug mode: more verbose default log level.
    pub debug: bool,

    /// Attach the CORS middleware.
    pub cors: bool,

    /// Serve the Prometheus scrape endpoint.
    pub metrics: bool,

    /// Path of the scrape endpoint (default `/metrics`).
    pub metrics_path: String,

    /// Serve the runtime profiling endpoint.
    pub profiling: bool,

    /// Path of the profiling endpoint (default `/hostdebug/<local ip>/entry`).
    pub profiling_path: String,

    /// Start the background diagnostics listener.
    pub diagnostics: bool,

    /// Diagnostics listener address (default `0.0.0.0:32388`).
    pub diagnostics_address: String,

    /// Requests slower than this are flagged in the logs.
    pub slow_threshold_ms: u64,

    /// Paths excluded from access logging.
    pub skip_log_paths: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            debug: false,
            cors: false,
            metrics: false,
            metrics_path: String::new(),
            profiling: false,
            profiling_path: String::new(),
            diagnostics: false,
            diagnostics_address: String::new(),
            slow_threshold_ms: 3000,
            skip_log_paths: Vec::new(),
        }
    }
}
