//! Configuration for the touch resampling pipeline.
//!
//! The document is KDL, decoded with `knuffel`:
//!
//! ```kdl
//! resample {
//!     compensation-ms 5
//!     max-horizon-ms 8
//! }
//! display {
//!     density 2.0
//! }
//! ```

#[macro_use]
extern crate tracing;

use std::ffi::OsStr;
use std::path::Path;

use miette::{Context as _, IntoDiagnostic as _};

pub mod resample;
pub mod utils;

pub use crate::resample::Resample;
pub use crate::utils::FloatOrInt;

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, default)]
    pub resample: Resample,
    #[knuffel(child, default)]
    pub display: Display,
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Display {
    /// Physical pixels per virtual pixel.
    #[knuffel(child, unwrap(argument), default = FloatOrInt(1.))]
    pub density: FloatOrInt<0, 16>,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            density: FloatOrInt(1.),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("config.kdl"),
            &contents,
        )
        .context("error parsing")?;
        debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = tracy_client::span!("Config::parse");
        knuffel::parse(filename, text)
    }
}
