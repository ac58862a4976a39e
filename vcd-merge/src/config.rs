//! Source and merge configuration types
//!
//! A [`SourceSpec`] tells a signal source what to read and how to place it on
//! the common time axis. [`MergeConfig`] holds the options of the merge
//! itself.

use crate::types::{MergeError, Result, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Input file format of a signal source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Text log (`T`)
    #[serde(rename = "T", alias = "txt")]
    Txt,
    /// Value change dump (`V`)
    #[serde(rename = "V", alias = "vcd")]
    Vcd,
}

impl FromStr for SourceFormat {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "T" | "t" => Ok(SourceFormat::Txt),
            "V" | "v" => Ok(SourceFormat::Vcd),
            other => Err(MergeError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Txt => write!(f, "T"),
            SourceFormat::Vcd => write!(f, "V"),
        }
    }
}

/// Description of one input of a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Input file format
    pub format: SourceFormat,

    /// Timestamp (in the source's own unit) aligned with the other sources
    #[serde(default)]
    pub sync_point: u64,

    /// Time unit of a text log; VCD inputs use their `$timescale`
    #[serde(default)]
    pub time_unit: Option<TimeUnit>,

    /// Prepended to every signal name of this source
    #[serde(default)]
    pub prefix: String,

    /// Input file
    pub path: PathBuf,

    /// Name of the line counter signal (text logs only)
    #[serde(default)]
    pub line_counter: Option<String>,
}

impl SourceSpec {
    /// A text log source
    pub fn txt(path: impl Into<PathBuf>, time_unit: TimeUnit) -> Self {
        Self {
            format: SourceFormat::Txt,
            sync_point: 0,
            time_unit: Some(time_unit),
            prefix: String::new(),
            path: path.into(),
            line_counter: None,
        }
    }

    /// A VCD source
    pub fn vcd(path: impl Into<PathBuf>) -> Self {
        Self {
            format: SourceFormat::Vcd,
            sync_point: 0,
            time_unit: None,
            prefix: String::new(),
            path: path.into(),
            line_counter: None,
        }
    }

    /// Builder method: set the sync point
    pub fn with_sync_point(mut self, sync_point: u64) -> Self {
        self.sync_point = sync_point;
        self
    }

    /// Builder method: set the signal name prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Builder method: enable the line counter signal
    pub fn with_line_counter(mut self, name: impl Into<String>) -> Self {
        self.line_counter = Some(name.into());
        self
    }

    /// Check the combination of options
    pub fn validate(&self) -> Result<()> {
        match self.format {
            SourceFormat::Txt if self.time_unit.is_none() => Err(MergeError::InvalidSourceSpec(
                format!("text log {:?} needs a time unit", self.path),
            )),
            SourceFormat::Vcd if self.time_unit.is_some() => Err(MergeError::InvalidSourceSpec(
                format!("VCD {:?} takes its time unit from $timescale", self.path),
            )),
            SourceFormat::Vcd if self.line_counter.is_some() => Err(
                MergeError::InvalidSourceSpec(format!(
                    "line counter is only available for text logs: {:?}",
                    self.path
                )),
            ),
            _ => Ok(()),
        }
    }
}

/// Parses `FORMAT,SYNC_POINT,TIME_UNIT,PREFIX,FILE`, e.g. `T,100,ns,Cpu.,cpu.log`.
impl FromStr for SourceSpec {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.splitn(5, ',').collect();
        let [format, sync_point, time_unit, prefix, path] = fields[..] else {
            return Err(MergeError::InvalidSourceSpec(format!(
                "'{}' (expected FORMAT,SYNC_POINT,TIME_UNIT,PREFIX,FILE)",
                s
            )));
        };

        let sync_point = sync_point.trim().parse::<u64>().map_err(|_| {
            MergeError::InvalidSourceSpec(format!("invalid sync point '{}' in '{}'", sync_point, s))
        })?;

        let time_unit = match time_unit.trim() {
            "" => None,
            unit => Some(unit.parse::<TimeUnit>()?),
        };

        if path.is_empty() {
            return Err(MergeError::InvalidSourceSpec(format!("missing file in '{}'", s)));
        }

        let spec = SourceSpec {
            format: format.trim().parse()?,
            sync_point,
            time_unit,
            prefix: prefix.to_string(),
            path: PathBuf::from(path),
            line_counter: None,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Configuration of the merge engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Log per-source adjustments at info level
    #[serde(default)]
    pub verbose: bool,

    /// Common time unit of the output; the finest source unit if unset
    #[serde(default)]
    pub time_unit: Option<TimeUnit>,
}

impl MergeConfig {
    /// Create a merge configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Builder method: set the output time unit
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = Some(unit);
        self
    }
}
