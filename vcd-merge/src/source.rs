//! Signal sources
//!
//! A [`SignalSource`] reads one input into an arena of signal changes,
//! ordered by timestamp, and keeps a map from each signal name to one
//! representative change for header generation and conflict detection.

use crate::config::{SourceFormat, SourceSpec};
use crate::formats::{RawSignals, SignalReader, TxtReader, VcdReader};
use crate::registry::{SourceHandle, SourceRegistry};
use crate::signal::Signal;
use crate::types::{MergeError, Result, TimeUnit};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Signal name to representative signal change
pub type UniqueSignals<'a> = BTreeMap<&'a str, &'a Signal>;

/// One input of a merge
#[derive(Debug)]
pub struct SignalSource {
    spec: SourceSpec,
    handle: SourceHandle,
    data: Option<SourceData>,
}

/// What a successful `create()` produced
#[derive(Debug)]
struct SourceData {
    /// All changes, stable-sorted by timestamp
    signals: Vec<Signal>,
    /// Name to index of its first change in `signals`
    unique: BTreeMap<String, usize>,
    /// Time unit of the input itself
    time_unit: TimeUnit,
    /// Unit the timestamps in `signals` are currently expressed in
    axis_unit: TimeUnit,
    valid_records: u64,
    invalid_records: u64,
}

/// Statistics of a read source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub handle: SourceHandle,
    pub path: String,
    pub format: String,
    pub valid_records: u64,
    pub invalid_records: u64,
    pub time_unit: TimeUnit,
    pub sync_point: u64,
    pub num_signals: usize,
    pub num_events: usize,
}

impl SignalSource {
    /// Register a new source. Nothing is read until [`SignalSource::create`].
    pub fn new(spec: SourceSpec, registry: &mut SourceRegistry) -> Result<Self> {
        spec.validate()?;
        let handle = registry.register(spec.path.display().to_string());

        Ok(Self {
            spec,
            handle,
            data: None,
        })
    }

    /// Read and parse the input.
    ///
    /// Malformed records are skipped and counted. A missing or unreadable
    /// file fails the whole source.
    pub fn create(&mut self, registry: &mut SourceRegistry) -> Result<()> {
        let raw = match self.spec.format {
            SourceFormat::Txt => TxtReader::read(&self.spec, self.handle, registry)?,
            SourceFormat::Vcd => VcdReader::read(&self.spec, self.handle, registry)?,
        };

        let data = self.build(raw)?;
        if data.valid_records == 0 {
            log::warn!("Source {:?} contains no valid records", self.spec.path);
        }

        self.data = Some(data);
        Ok(())
    }

    fn build(&self, raw: RawSignals) -> Result<SourceData> {
        let RawSignals {
            mut signals,
            time_unit,
            valid_records,
            invalid_records,
        } = raw;

        let time_unit = time_unit.ok_or_else(|| {
            MergeError::InvalidSourceSpec(format!("no time unit for {:?}", self.spec.path))
        })?;

        if !self.spec.prefix.is_empty() {
            for signal in signals.iter_mut() {
                let name = format!("{}{}", self.spec.prefix, signal.name());
                signal.set_name(name);
            }
        }

        // Stable: changes sharing a timestamp keep their file order.
        signals.sort_by_key(Signal::timestamp);

        // A line counter must not share a name with a signal of its log.
        let mut unique: BTreeMap<String, usize> = BTreeMap::new();
        for (index, signal) in signals.iter().enumerate() {
            let first = *unique.entry(signal.name().to_string()).or_insert(index);
            let first_source = signals[first].source();
            if first_source != signal.source() {
                let other = if first_source == self.handle {
                    signal.source()
                } else {
                    first_source
                };
                return Err(MergeError::ConflictingNames {
                    name: signal.name().to_string(),
                    source_a: self.handle,
                    source_b: other,
                });
            }
        }

        Ok(SourceData {
            signals,
            unique,
            time_unit,
            axis_unit: time_unit,
            valid_records,
            invalid_records,
        })
    }

    /// Registry handle of this source
    pub fn handle(&self) -> SourceHandle {
        self.handle
    }

    /// The input file
    pub fn path(&self) -> &Path {
        &self.spec.path
    }

    /// The specification this source was built from
    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    /// True once [`SignalSource::create`] has succeeded
    pub fn is_created(&self) -> bool {
        self.data.is_some()
    }

    fn data(&self) -> Result<&SourceData> {
        self.data
            .as_ref()
            .ok_or_else(|| MergeError::SourceNotCreated(self.spec.path.display().to_string()))
    }

    /// All signal changes, ordered by timestamp
    pub fn signals(&self) -> Result<&[Signal]> {
        Ok(&self.data()?.signals)
    }

    /// One representative change per signal name
    pub fn unique_signals(&self) -> Result<UniqueSignals<'_>> {
        let data = self.data()?;
        Ok(data
            .unique
            .iter()
            .map(|(name, &index)| (name.as_str(), &data.signals[index]))
            .collect())
    }

    /// True if this source declares a signal called `name`
    pub fn has_signal(&self, name: &str) -> Result<bool> {
        Ok(self.data()?.unique.contains_key(name))
    }

    /// Time unit of the input, as declared by the spec or `$timescale`
    pub fn time_unit(&self) -> Result<TimeUnit> {
        Ok(self.data()?.time_unit)
    }

    /// Unit of the timestamps returned by [`SignalSource::signals`].
    ///
    /// Same as [`SignalSource::time_unit`] until a merge has aligned the
    /// source, the merge's time unit afterwards.
    pub fn timestamp_unit(&self) -> Result<TimeUnit> {
        Ok(self.data()?.axis_unit)
    }

    /// Sync point expressed in `unit`
    pub fn sync_point_in(&self, unit: TimeUnit) -> Result<u64> {
        self.time_unit()?.rescale(self.spec.sync_point, unit)
    }

    /// Timestamps of every change moved onto the common time axis:
    /// rescaled to `unit`, then shifted by `offset`. Nothing is modified.
    pub(crate) fn aligned_timestamps(&self, unit: TimeUnit, offset: u64) -> Result<Vec<u64>> {
        let data = self.data()?;
        let from = data.axis_unit;

        data.signals
            .iter()
            .map(|signal| {
                from.rescale(signal.timestamp(), unit)?
                    .checked_add(offset)
                    .ok_or(MergeError::TimestampOverflow {
                        timestamp: signal.timestamp(),
                        from,
                        to: unit,
                    })
            })
            .collect()
    }

    /// Replace the timestamps with ones from [`SignalSource::aligned_timestamps`]
    pub(crate) fn apply_alignment(&mut self, unit: TimeUnit, timestamps: Vec<u64>) -> Result<()> {
        let data = self
            .data
            .as_mut()
            .ok_or_else(|| MergeError::SourceNotCreated(self.spec.path.display().to_string()))?;

        for (signal, timestamp) in data.signals.iter_mut().zip(timestamps) {
            signal.set_timestamp(timestamp);
        }
        data.axis_unit = unit;
        Ok(())
    }

    /// Record and signal statistics
    pub fn stats(&self) -> Result<SourceStats> {
        let data = self.data()?;
        Ok(SourceStats {
            handle: self.handle,
            path: self.spec.path.display().to_string(),
            format: self.spec.format.to_string(),
            valid_records: data.valid_records,
            invalid_records: data.invalid_records,
            time_unit: data.time_unit,
            sync_point: self.spec.sync_point,
            num_signals: data.unique.len(),
            num_events: data.signals.len(),
        })
    }

    /// Human-readable summary, available once the source has been read
    pub fn description(&self) -> Result<String> {
        let stats = self.stats()?;
        let mut text = format!(
            "Source {} ({}): {}\n",
            stats.handle, stats.format, stats.path
        );
        text.push_str(&format!("  Valid records:   {}\n", stats.valid_records));
        text.push_str(&format!("  Invalid records: {}\n", stats.invalid_records));
        text.push_str(&format!("  Time base:       {}\n", stats.time_unit));
        text.push_str(&format!("  Sync point:      {}\n", stats.sync_point));
        if !self.spec.prefix.is_empty() {
            text.push_str(&format!("  Prefix:          {}\n", self.spec.prefix));
        }
        text.push_str(&format!("  Signals:         {}", stats.num_signals));
        Ok(text)
    }
}
