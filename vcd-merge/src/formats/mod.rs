//! Input file readers (text logs, VCD)
//!
//! Each reader turns one input file into the raw signal changes of a
//! source, in file order, together with its record statistics.

use crate::config::SourceSpec;
use crate::registry::{SourceHandle, SourceRegistry};
use crate::signal::Signal;
use crate::types::{MergeError, Result, TimeUnit};
use std::path::Path;

pub mod txt;
pub mod vcd;

// Re-export reader types
pub use self::txt::{LineCounter, TxtReader};
pub use self::vcd::VcdReader;

/// Everything a reader extracted from one input
#[derive(Debug, Default)]
pub struct RawSignals {
    /// Signal changes in file order
    pub signals: Vec<Signal>,
    /// Time unit of the timestamps
    pub time_unit: Option<TimeUnit>,
    /// Number of records turned into signal changes
    pub valid_records: u64,
    /// Number of records skipped as malformed
    pub invalid_records: u64,
}

/// Common trait for all input readers
pub trait SignalReader {
    /// Read the input described by `spec`.
    ///
    /// `handle` is the source's own registry entry. Readers producing extra
    /// signal groups (the line counter) register them in `registry`.
    fn read(spec: &SourceSpec, handle: SourceHandle, registry: &mut SourceRegistry)
        -> Result<RawSignals>;
}

/// Fail with `SourceNotFound` before any reader touches a missing file
pub(crate) fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(MergeError::SourceNotFound(path.to_path_buf()));
    }
    Ok(())
}
