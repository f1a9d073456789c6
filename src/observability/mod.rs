//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! access log middleware
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counter + latency histogram)
//!
//! Consumers:
//!     → stdout (uncoloured fmt output)
//!     → metrics endpoint (Prometheus scrape)
//!     → profiling endpoint / diagnostics listener (runtime statistics)
//! ```
//!
//! # Design Decisions
//! - The metrics registry is an explicit object, not a global recorder
//! - Runtime statistics are shared by the profiling endpoint and the
//!   diagnostics listener

pub mod logging;
pub mod metrics;
pub mod profiling;
