//! Loading the vendor library and resolving its function table.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::{SysError, SysResult};
use crate::ffi::AmcApi;

/// Environment variable overriding the library location.
pub const LIBRARY_PATH_ENV: &str = "AMC_LIBRARY_PATH";

/// File name searched on the platform library path when no override is given.
#[cfg(windows)]
pub const DEFAULT_LIBRARY_NAME: &str = "Usb_AMC1XE.dll";
/// File name searched on the platform library path when no override is given.
#[cfg(not(windows))]
pub const DEFAULT_LIBRARY_NAME: &str = "libUsb_AMC1XE.so";

/// The loaded vendor library together with its resolved function table.
pub struct AmcLibrary {
    api: AmcApi,
    path: PathBuf,
    // Declared last so the table is dropped before the code it points into.
    _library: Library,
}

impl AmcLibrary {
    /// Load the library at `path` and resolve every declared symbol.
    ///
    /// # Errors
    ///
    /// Returns [`SysError::LibraryLoadFailed`] if the file cannot be opened
    /// and [`SysError::MissingSymbol`] for the first symbol that is not
    /// exported.
    pub fn load(path: impl AsRef<Path>) -> SysResult<Self> {
        let path = path.as_ref().to_path_buf();

        // SAFETY: loading runs the library's initialisers. The vendor DLL is
        // a plain driver wrapper with no documented load-time side effects.
        let library = unsafe { Library::new(&path) }.map_err(|source| {
            SysError::LibraryLoadFailed {
                path: path.clone(),
                source,
            }
        })?;

        let api = AmcApi {
            open_usb: resolve(&library, "openUSB")?,
            close_usb: resolve(&library, "closeUSB")?,
            get_device_num: resolve(&library, "get_device_num")?,
            reset_usb_device: resolve(&library, "Reset_Usb_Device")?,
            read_port_in: resolve(&library, "Read_Port_In")?,
            read_port_out: resolve(&library, "Read_Port_Out")?,
            write_port_out: resolve(&library, "Write_Port_Out")?,
            set_port_out: resolve(&library, "Set_Port_Out")?,
            reset_port_out: resolve(&library, "Reset_Port_Out")?,
            read_position: resolve(&library, "Read_Position")?,
            read_speed: resolve(&library, "Read_Speed")?,
            set_axs: resolve(&library, "Set_Axs")?,
            axs_stop: resolve(&library, "AxsStop")?,
            mov_to_org: resolve(&library, "MovToOrg")?,
            fl_continue_mov: resolve(&library, "FL_ContinueMov")?,
            fh_continue_mov: resolve(&library, "FH_ContinueMov")?,
            fh_continue_adjust_speed: resolve(&library, "FH_ContinueAdjustSpeed")?,
            delt_mov: resolve(&library, "DeltMov")?,
            set_encoder: resolve(&library, "Set_Encorder")?,
            read_encoder: resolve(&library, "Read_Encorder")?,
        };

        tracing::info!(path = %path.display(), "Motion library loaded");

        Ok(Self {
            api,
            path,
            _library: library,
        })
    }

    /// Load from `AMC_LIBRARY_PATH`, or from [`DEFAULT_LIBRARY_NAME`] on the
    /// platform search path.
    ///
    /// # Errors
    ///
    /// Same as [`AmcLibrary::load`].
    pub fn load_default() -> SysResult<Self> {
        Self::load(default_library_path(std::env::var_os(LIBRARY_PATH_ENV)))
    }

    /// The resolved function table.
    pub fn api(&self) -> &AmcApi {
        &self.api
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for AmcLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmcLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Pick the library path from an optional override.
pub fn default_library_path(override_path: Option<OsString>) -> PathBuf {
    match override_path {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_LIBRARY_NAME),
    }
}

fn resolve<T: Copy>(library: &Library, symbol: &'static str) -> SysResult<T> {
    // SAFETY: every call site pairs `symbol` with the function-pointer type
    // declared for it in the vendor header (see `crate::ffi`).
    let resolved = unsafe { library.get::<T>(symbol.as_bytes()) }
        .map_err(|source| SysError::MissingSymbol { symbol, source })?;
    Ok(*resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_without_override() {
        assert_eq!(
            default_library_path(None),
            PathBuf::from(DEFAULT_LIBRARY_NAME)
        );
    }

    #[test]
    fn test_default_path_ignores_empty_override() {
        assert_eq!(
            default_library_path(Some(OsString::new())),
            PathBuf::from(DEFAULT_LIBRARY_NAME)
        );
    }

    #[test]
    fn test_default_path_uses_override() {
        let path = default_library_path(Some(OsString::from("/opt/amc/libUsb_AMC1XE.so")));
        assert_eq!(path, PathBuf::from("/opt/amc/libUsb_AMC1XE.so"));
    }

    #[test]
    fn test_load_missing_library_fails() {
        let result = AmcLibrary::load("/nonexistent/dir/libUsb_AMC1XE.so");
        match result {
            Err(SysError::LibraryLoadFailed { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/dir/libUsb_AMC1XE.so"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("loading a nonexistent library must fail"),
        }
    }
}
