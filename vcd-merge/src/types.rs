//! Core types for the VCD merge library
//!
//! This module defines the error type shared by every stage of the pipeline
//! (source reading, merging, dumping) and the supported time units.

use crate::registry::SourceHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Result type for merge library operations
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that can occur while reading, merging or dumping signals
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signal source not found: {0:?}")]
    SourceNotFound(PathBuf),

    #[error("Failed to read signal source {path:?}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Invalid source specification: {0}")]
    InvalidSourceSpec(String),

    #[error("Invalid time base: '{0}' (expected one of s, ms, us, ns, ps, fs)")]
    InvalidTimeBase(String),

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("Conflicting signal names.")]
    ConflictingNames {
        name: String,
        source_a: SourceHandle,
        source_b: SourceHandle,
    },

    #[error("There are at least {required} signal sources required, got {given}.")]
    NotEnoughSources { required: usize, given: usize },

    #[error("No signal sources to merge")]
    NoSources,

    #[error("Signal source has not been read yet: {0}")]
    SourceNotCreated(String),

    #[error("Signals requested before the merge has run")]
    NotMerged,

    #[error("Merge has already run")]
    AlreadyMerged,

    #[error("Cannot add sources after the merge has run")]
    MergeClosed,

    #[error("Timestamp {timestamp} overflows when converted from {from} to {to}")]
    TimestampOverflow {
        timestamp: u64,
        from: TimeUnit,
        to: TimeUnit,
    },

    #[error("Unknown source handle: {0}")]
    UnknownHandle(SourceHandle),

    #[error("Failed to write {path:?}: {reason}")]
    IoWriteError { path: PathBuf, reason: String },
}

/// Time units supported in VCD timescales, from the coarsest to the finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    S,
    Ms,
    Us,
    Ns,
    Ps,
    Fs,
}

impl TimeUnit {
    /// All units, ordered by decreasing magnitude
    pub const ALL: [TimeUnit; 6] = [
        TimeUnit::S,
        TimeUnit::Ms,
        TimeUnit::Us,
        TimeUnit::Ns,
        TimeUnit::Ps,
        TimeUnit::Fs,
    ];

    /// The unit as written in a `$timescale` declaration
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::S => "s",
            TimeUnit::Ms => "ms",
            TimeUnit::Us => "us",
            TimeUnit::Ns => "ns",
            TimeUnit::Ps => "ps",
            TimeUnit::Fs => "fs",
        }
    }

    /// Position in [`TimeUnit::ALL`]; each step is a factor of 1000.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The finer of two units
    pub fn finer(self, other: TimeUnit) -> TimeUnit {
        self.max(other)
    }

    /// Convert a timestamp expressed in `self` into `target` units.
    ///
    /// Converting to a finer unit multiplies and fails on overflow.
    /// Converting to a coarser unit divides and truncates.
    pub fn rescale(self, timestamp: u64, target: TimeUnit) -> Result<u64> {
        let overflow = || MergeError::TimestampOverflow {
            timestamp,
            from: self,
            to: target,
        };

        if target >= self {
            let steps = (target.index() - self.index()) as u32;
            let factor = 1000u64.checked_pow(steps).ok_or_else(overflow)?;
            timestamp.checked_mul(factor).ok_or_else(overflow)
        } else {
            let steps = (self.index() - target.index()) as u32;
            // 1000^5 fits in u64, so the divisor never overflows.
            Ok(timestamp / 1000u64.pow(steps))
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        TimeUnit::ALL
            .iter()
            .copied()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| MergeError::InvalidTimeBase(s.to_string()))
    }
}

impl From<TimeUnit> for vcd::TimescaleUnit {
    fn from(unit: TimeUnit) -> Self {
        match unit {
            TimeUnit::S => vcd::TimescaleUnit::S,
            TimeUnit::Ms => vcd::TimescaleUnit::MS,
            TimeUnit::Us => vcd::TimescaleUnit::US,
            TimeUnit::Ns => vcd::TimescaleUnit::NS,
            TimeUnit::Ps => vcd::TimescaleUnit::PS,
            TimeUnit::Fs => vcd::TimescaleUnit::FS,
        }
    }
}

impl From<vcd::TimescaleUnit> for TimeUnit {
    fn from(unit: vcd::TimescaleUnit) -> Self {
        match unit {
            vcd::TimescaleUnit::S => TimeUnit::S,
            vcd::TimescaleUnit::MS => TimeUnit::Ms,
            vcd::TimescaleUnit::US => TimeUnit::Us,
            vcd::TimescaleUnit::NS => TimeUnit::Ns,
            vcd::TimescaleUnit::PS => TimeUnit::Ps,
            vcd::TimescaleUnit::FS => TimeUnit::Fs,
        }
    }
}
