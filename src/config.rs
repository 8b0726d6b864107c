use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::Error, serial::SerialSettings};

/// The configuration used for running the acquisition pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// The serial device records are read from.
    pub device: String,

    /// Baud rate of the device.
    pub baud: u32,

    /// How many seconds the driver may block on a single read.
    pub read_timeout_seconds: u64,

    /// How many history readings to retain before the oldest is
    /// evicted.
    pub keep: usize,

    /// A projections file (`name=expression` per line) producing
    /// derived readings, if any.
    pub projections: Option<PathBuf>,

    /// An executable invoked with every accepted reading as its sole
    /// argument, if any.
    pub push_script: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".into(),
            baud: 9600,
            read_timeout_seconds: 5,
            keep: 60,
            projections: None,
            push_script: None,
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    /// Panics if the input is not valid .ron.
    pub fn deserialize(input: &str) -> Self {
        Self::ron().from_str::<Config>(input).unwrap()
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            projections: Some("pump-projections".into()),
            push_script: Some("/usr/local/bin/publish-reading".into()),
            ..Default::default()
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> String {
        Self::ron()
            .to_string_pretty(self, ron::ser::PrettyConfig::default())
            .unwrap()
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Self {
        let s = std::fs::read_to_string(p).unwrap();

        Self::deserialize(&s)
    }

    /// The serial transport parameters this configuration describes.
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            device: self.device.clone(),
            baud: self.baud,
            read_timeout: Duration::from_secs(self.read_timeout_seconds),
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.device.is_empty() {
            return Err(Error::BadConfig(
                "The serial device path is empty. Please point `device` at the controller's port."
                    .into(),
            ));
        }

        if self.baud == 0 {
            return Err(Error::BadConfig(
                "A baud rate of zero cannot work. The controller speaks 9600.".into(),
            ));
        }

        if self.keep == 0 {
            return Err(Error::BadConfig(
                "Keeping zero readings would evict each reading as it arrives. Please use `keep` of at least 1.".into(),
            ));
        }

        Ok(())
    }
}
