//! Error types shared by the windowing core and its collaborators.

use std::convert::Infallible;

use thiserror::Error;

/// Why a frame was rejected by the window driver.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FrameIssue {
    #[error("frame has no capture timestamp")]
    MissingTimestamp,

    #[error("timestamp {0} is not a finite number")]
    NonFiniteTimestamp(f64),

    #[error("timestamp {ts} precedes the previous frame at {previous}")]
    OutOfOrder { ts: f64, previous: f64 },
}

#[derive(Error, Debug)]
pub enum Error {
    /// A frame could not be placed on the timeline. The driver state is left
    /// untouched, so iteration may continue past it.
    #[error("invalid frame #{index}: {reason}")]
    InvalidFrame { index: usize, reason: FrameIssue },

    #[error("window period must be a positive number of seconds, got {0}")]
    InvalidPeriod(f64),

    /// Failure reported by a pcap / pcapng reader.
    #[error("capture source: {0}")]
    Source(String),

    #[cfg(feature = "live")]
    #[error("live capture: {0}")]
    Capture(#[from] pcap::Error),

    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn is_invalid_frame(&self) -> bool {
        matches!(self, Error::InvalidFrame { .. })
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
