//! Shared error types for the AMC motion toolkit.
//!
//! The vendor driver reports every outcome as a bare integer. This crate gives
//! those outcomes, and the checks performed before a call ever reaches the
//! driver, a common shape:
//!
//! - [`common`]: the top-level [`AmcError`] with its [`ErrorCategory`] and
//!   [`ErrorSeverity`]
//! - [`device`]: driver and hardware failures, including non-zero status codes
//! - [`validation`]: parameter and configuration validation failures
//!
//! # Example
//!
//! ```
//! use amc_errors::prelude::*;
//!
//! fn check_speed(start: u32, target: u32) -> Result<()> {
//!     if start > target {
//!         return Err(ValidationError::constraint("start speed exceeds target speed").into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_speed(1000, 40000).is_ok());
//! assert!(check_speed(5000, 100).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod device;
pub mod prelude;
pub mod validation;

pub use common::{AmcError, ErrorCategory, ErrorSeverity};
pub use device::DeviceError;
pub use validation::ValidationError;

/// A specialized `Result` type for toolkit operations.
pub type Result<T> = std::result::Result<T, AmcError>;
