//! Request lifecycle middleware.
//!
//! # Order (outermost to innermost)
//! ```text
//! cors → trace_id → access_log → recovery → application handler
//! ```
//!
//! Recovery sits innermost so it sees every failure raised by a handler, and
//! the access logger sees the response recovery produced.

pub mod access_log;
pub mod cors;
pub mod recovery;
pub mod trace_id;

pub use access_log::{access_log_middleware, AccessLogState};
pub use cors::cors_middleware;
pub use recovery::recovery_middleware;
pub use trace_id::{trace_id_layer, TraceIdLayer};
