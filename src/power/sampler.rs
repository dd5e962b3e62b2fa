//! Trait abstraction for the supply voltage ADC to enable testing

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackerError};

/// Raw analog-to-digital read of the supply voltage divider.
#[cfg_attr(test, mockall::automock)]
pub trait VoltageSampler: Send {
    /// Returns the raw ADC count.
    ///
    /// # Errors
    ///
    /// Returns error if the converter cannot be read
    fn read_raw(&mut self) -> Result<u32>;
}

impl<S: VoltageSampler + ?Sized> VoltageSampler for Box<S> {
    fn read_raw(&mut self) -> Result<u32> {
        (**self).read_raw()
    }
}

/// Linux IIO ADC channel exposed as a sysfs `in_voltageN_raw` file.
#[derive(Debug, Clone)]
pub struct SysfsAdc {
    path: PathBuf,
}

impl SysfsAdc {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl VoltageSampler for SysfsAdc {
    fn read_raw(&mut self) -> Result<u32> {
        let contents = fs::read_to_string(&self.path)?;
        contents.trim().parse().map_err(|e| {
            TrackerError::Sensor(format!(
                "Invalid ADC value {:?} in {}: {}",
                contents.trim(),
                self.path.display(),
                e
            ))
        })
    }
}
