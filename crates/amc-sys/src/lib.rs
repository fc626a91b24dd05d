//! Runtime-loaded bindings to the `Usb_AMC1XE` motion-control library.
//!
//! The vendor library is closed source and ships as a Windows DLL together
//! with a C header that declares a flat `__stdcall` function table. This crate
//! mirrors that table one-to-one and resolves it at runtime with
//! [`libloading`], so that nothing links against the vendor binary at build
//! time and the rest of the workspace can be built and tested without it.
//!
//! # Calling convention
//!
//! Every function is declared `extern "system"`, which is `stdcall` on
//! 32-bit Windows and the platform C convention everywhere else. That matches
//! the header's `extern "C" __stdcall` declarations.
//!
//! # Safety
//!
//! The table is a raw binding: every call through [`AmcApi`] is `unsafe` and
//! out-pointers must be valid for writes. [`AmcLibrary`] also carries one
//! safe method per symbol that owns the out-parameters and returns the raw
//! status. Use the `amc-motion` crate for a checked, typed API.
//!
//! # Example
//!
//! ```rust,no_run
//! use amc_sys::AmcLibrary;
//!
//! let library = AmcLibrary::load_default()?;
//! // SAFETY: the library is loaded and `openUSB` takes no arguments.
//! let status = unsafe { (library.api().open_usb)() };
//! println!("openUSB returned {status}");
//! # Ok::<(), amc_sys::SysError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod calls;
pub mod error;
pub mod ffi;
pub mod loader;

pub use calls::{DeltMovArgs, RawPosition};
pub use error::{SysError, SysResult};
pub use ffi::{AmcApi, SYMBOLS};
pub use loader::{AmcLibrary, DEFAULT_LIBRARY_NAME, LIBRARY_PATH_ENV, default_library_path};
