//! Structured logging facility for layerorm
//!
//! - Single initialization point via `init(profile)` or `init_from_config(&config)`
//! - Structured boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - `log_diagnostic!` for rows, fields and hops skipped without failing
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use layerorm_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! The registry owns boundary logging. Row, table, binding and relation code
//! only emit diagnostics.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_from_config, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
