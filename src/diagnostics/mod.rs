//! Remote diagnostics subsystem.
//!
//! # Data Flow
//! ```text
//! TCP client
//!     → listener.rs (accept, read one command byte)
//!     → protocol.rs (decode command, build text reply)
//!     → reply written, connection closed
//! ```
//!
//! # Design Decisions
//! - One command per connection keeps the protocol stateless
//! - The listener runs in the background and stops on the shutdown broadcast

pub mod listener;
pub mod protocol;

pub use listener::{DiagnosticsError, DiagnosticsListener};
pub use protocol::Command;
