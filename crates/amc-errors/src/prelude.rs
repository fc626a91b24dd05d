//! Prelude module for convenient error handling imports.
//!
//! ```
//! use amc_errors::prelude::*;
//!
//! fn require_axis(axis: Option<u32>) -> Result<u32> {
//!     axis.ok_or_else(|| ValidationError::required("axis").into())
//! }
//!
//! assert!(require_axis(None).is_err());
//! ```

pub use crate::{
    Result,
    common::{AmcError, ErrorCategory, ErrorSeverity},
    device::DeviceError,
    validation::ValidationError,
};
