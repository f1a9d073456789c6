//! Request lifecycle middleware and response helpers for axum services.
//!
//! Wraps application routes with CORS, trace-ID propagation, structured access
//! logging with Prometheus metrics, and panic recovery, and renders every
//! response in one JSON envelope. Optional metrics, profiling and diagnostics
//! endpoints are wired by [`Engine`].

pub mod config;
pub mod diagnostics;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::EngineConfig;
pub use http::{ApiError, Engine, Envelope};
pub use lifecycle::Shutdown;
