//! Error types for loading the vendor library.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for library loading.
#[derive(Error, Debug)]
pub enum SysError {
    /// The shared library could not be opened.
    #[error("Failed to load motion library {path}: {source}")]
    LibraryLoadFailed {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying loader error.
        #[source]
        source: libloading::Error,
    },

    /// The library was opened but does not export a required symbol.
    #[error("Motion library does not export `{symbol}`: {source}")]
    MissingSymbol {
        /// C name of the missing function.
        symbol: &'static str,
        /// Underlying loader error.
        #[source]
        source: libloading::Error,
    },
}

impl SysError {
    /// C symbol name involved in the failure, if any.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            SysError::LibraryLoadFailed { .. } => None,
            SysError::MissingSymbol { symbol, .. } => Some(symbol),
        }
    }
}

/// Result alias for this crate.
pub type SysResult<T> = Result<T, SysError>;
