use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::Level;

use crate::error::{Error, Result};

/// Length of one aggregation window, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Period(f64);

impl Period {
    pub fn new(secs: f64) -> Result<Self> {
        if secs.is_finite() && secs > 0.0 {
            Ok(Period(secs))
        } else {
            Err(Error::InvalidPeriod(secs))
        }
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Period {
    type Error = Error;

    fn try_from(secs: f64) -> Result<Self> {
        Period::new(secs)
    }
}

/// Settings read from a RON file, e.g.
///
/// ```ron
/// (
///     period: 3.0,
///     output_dir: Some("stats"),
///     log_level: "debug",
///     skip_invalid: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window length in seconds.
    pub period: f64,
    /// Where CSV tables go. Next to the input when unset.
    pub output_dir: Option<PathBuf>,
    pub log_level: String,
    /// Drop frames with a bad timestamp instead of failing the input.
    pub skip_invalid: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            period: 3.0,
            output_dir: None,
            log_level: "info".to_string(),
            skip_invalid: false,
        }
    }
}

impl Config {
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    pub fn period(&self) -> Result<Period> {
        Period::new(self.period)
    }

    pub fn level(&self) -> Result<Level> {
        Level::from_str(&self.log_level)
            .map_err(|_| Error::Config(format!("unknown log level `{}`", self.log_level)))
    }
}
