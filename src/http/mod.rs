//! HTTP request lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! accepted connection (axum)
//!     → middleware/cors.rs (CORS headers, preflight short-circuit)
//!     → middleware/trace_id.rs (X-Trace-Id in, X-Trace-Id out)
//!     → middleware/access_log.rs (timing, structured log, metrics)
//!     → middleware/recovery.rs (catch failures, emit envelope)
//!     → application handler (request.rs helpers, error.rs, response.rs)
//! ```

pub mod error;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use error::ApiError;
pub use request::{Bind, Params, RequestContext, X_TRACE_ID};
pub use response::{render, respond, Envelope, RenderInput};
pub use server::{Engine, EngineError};
