//! Choosing a driver at runtime.

use std::path::PathBuf;

use amc_errors::Result;
use serde::{Deserialize, Serialize};

use crate::controller::Controller;
use crate::driver::MotionDriver;
use crate::sim::{SimConfig, SimulatedDriver};
use crate::usb::UsbDriver;

/// Controller over whichever driver a [`Backend`] produced.
pub type DynController = Controller<Box<dyn MotionDriver>>;

/// Where motion commands go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backend {
    /// The vendor library. `None` uses `AMC_LIBRARY_PATH` or the platform
    /// default name.
    Usb {
        /// Explicit library location.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        library_path: Option<PathBuf>,
    },
    /// The in-memory simulator.
    Simulated(SimConfig),
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Usb { library_path: None }
    }
}

impl Backend {
    /// Build the driver.
    ///
    /// # Errors
    ///
    /// Returns [`amc_errors::DeviceError::LibraryUnavailable`] if the vendor
    /// library cannot be loaded.
    pub fn connect(&self) -> Result<Box<dyn MotionDriver>> {
        match self {
            Backend::Usb {
                library_path: Some(path),
            } => Ok(Box::new(UsbDriver::load(path)?)),
            Backend::Usb { library_path: None } => Ok(Box::new(UsbDriver::load_default()?)),
            Backend::Simulated(config) => {
                tracing::info!(?config, "Using simulated controller");
                Ok(Box::new(SimulatedDriver::new(*config)))
            }
        }
    }

    /// Build the driver and wrap it in a [`Controller`].
    ///
    /// # Errors
    ///
    /// See [`Backend::connect`].
    pub fn controller(&self) -> Result<DynController> {
        Ok(Controller::new(self.connect()?))
    }
}
