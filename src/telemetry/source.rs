//! Telemetry data sources (GPS, modem, environment sensor).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::state::Readings;

/// Provides the latest readings of the opaque data sources.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySource: Send {
    /// Returns the current readings.
    ///
    /// # Errors
    ///
    /// Returns error if the readings cannot be obtained
    fn read(&mut self) -> Result<Readings>;
}

impl<S: TelemetrySource + ?Sized> TelemetrySource for Box<S> {
    fn read(&mut self) -> Result<Readings> {
        (**self).read()
    }
}

/// Reads a JSON snapshot of [`Readings`] written by the sensor daemons.
///
/// A missing file yields default readings, so the device keeps publishing
/// voltage and counters before the first snapshot appears.
#[derive(Debug, Clone)]
pub struct SnapshotFileSource {
    path: PathBuf,
}

impl SnapshotFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySource for SnapshotFileSource {
    fn read(&mut self) -> Result<Readings> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No telemetry snapshot at {}", self.path.display());
                return Ok(Readings::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }
}
