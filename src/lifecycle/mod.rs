//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → HTTP server drains, diagnostics listener exits
//!
//! Signals (signals.rs):
//!     Ctrl+C → trigger shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
