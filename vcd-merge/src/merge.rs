//! Merge engine
//!
//! Combines several read signal sources into one time-ordered stream of
//! signal changes on a common time axis.
//!
//! # Algorithm
//! 1. Reject the merge if two sources declare the same signal name.
//! 2. Choose the output time unit: the configured one, or the finest unit
//!    among the sources.
//! 3. Rescale every source to that unit and shift it so that all sync
//!    points coincide with the latest one.
//! 4. Order all changes by timestamp. Ties keep source-addition order, then
//!    the source's own order, so repeated runs produce identical output.

use crate::config::MergeConfig;
use crate::registry::SourceHandle;
use crate::signal::Signal;
use crate::source::{SignalSource, SourceStats, UniqueSignals};
use crate::types::{MergeError, Result, TimeUnit};
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum number of sources accepted by a merge run
pub const MIN_MERGE_SOURCES: usize = 2;

/// Check the number of inputs of a merge run before any of them is opened
pub fn check_source_count(given: usize) -> Result<()> {
    if given < MIN_MERGE_SOURCES {
        return Err(MergeError::NotEnoughSources {
            required: MIN_MERGE_SOURCES,
            given,
        });
    }
    Ok(())
}

/// Lifecycle of a [`Merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    /// No source added yet
    Idle,
    /// At least one source added, not merged yet
    SourcesAdded,
    /// `run()` has completed; terminal
    Merged,
}

/// The merged signal collection, borrowed from the merge engine
#[derive(Debug)]
pub struct MergedSignals<'a> {
    /// Time unit of every timestamp below
    pub time_unit: TimeUnit,
    /// All changes of all sources, ordered by timestamp
    pub events: Vec<&'a Signal>,
    /// One representative change per signal name
    pub unique: UniqueSignals<'a>,
}

/// Per-source part of a [`MergeSummary`]
#[derive(Debug, Clone, Serialize)]
pub struct MergedSourceSummary {
    #[serde(flatten)]
    pub stats: SourceStats,
    /// Offset added to every timestamp after rescaling
    pub offset: u64,
}

/// Outcome of a merge run
#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub time_unit: TimeUnit,
    pub sources: Vec<MergedSourceSummary>,
    pub num_events: usize,
    pub num_signals: usize,
}

/// Location of a signal change: (source index, index in that source)
type EventRef = (usize, usize);

/// The merge engine. Owns its sources; results borrow from it.
#[derive(Debug)]
pub struct Merge {
    config: MergeConfig,
    sources: Vec<SignalSource>,
    state: MergeState,
    time_unit: Option<TimeUnit>,
    offsets: Vec<u64>,
    order: Vec<EventRef>,
}

impl Merge {
    /// Create an idle merge engine
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            sources: Vec::new(),
            state: MergeState::Idle,
            time_unit: None,
            offsets: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> MergeState {
        self.state
    }

    /// The added sources, in addition order
    pub fn sources(&self) -> &[SignalSource] {
        &self.sources
    }

    /// Add a source. Sources are merged in the order they are added.
    pub fn add_source(&mut self, source: SignalSource) -> Result<SourceHandle> {
        if self.state == MergeState::Merged {
            return Err(MergeError::MergeClosed);
        }

        let handle = source.handle();
        log::debug!("Adding source {} ({:?})", handle, source.path());
        self.sources.push(source);
        self.state = MergeState::SourcesAdded;
        Ok(handle)
    }

    /// Run the merge. Can be called once.
    pub fn run(&mut self) -> Result<()> {
        match self.state {
            MergeState::Idle => return Err(MergeError::NoSources),
            MergeState::Merged => return Err(MergeError::AlreadyMerged),
            MergeState::SourcesAdded => {}
        }

        for source in &self.sources {
            if !source.is_created() {
                return Err(MergeError::SourceNotCreated(
                    source.path().display().to_string(),
                ));
            }
        }

        self.check_conflicts()?;

        let time_unit = self.target_time_unit()?;
        let offsets = self.sync_offsets(time_unit)?;

        // All sources are aligned or none is.
        let mut aligned = Vec::with_capacity(self.sources.len());
        for (source, &offset) in self.sources.iter().zip(&offsets) {
            if self.config.verbose {
                log::info!(
                    "Source {}: rescaling to {}, offset {}",
                    source.handle(),
                    time_unit,
                    offset
                );
            } else {
                log::debug!(
                    "Source {}: rescaling to {}, offset {}",
                    source.handle(),
                    time_unit,
                    offset
                );
            }
            aligned.push(source.aligned_timestamps(time_unit, offset)?);
        }
        for (source, timestamps) in self.sources.iter_mut().zip(aligned) {
            source.apply_alignment(time_unit, timestamps)?;
        }

        let mut keyed: Vec<(u64, EventRef)> = Vec::new();
        for (source_index, source) in self.sources.iter().enumerate() {
            keyed.extend(
                source
                    .signals()?
                    .iter()
                    .enumerate()
                    .map(|(signal_index, signal)| (signal.timestamp(), (source_index, signal_index))),
            );
        }

        // Stable sort keeps source order, then per-source order, among equal timestamps.
        keyed.sort_by_key(|&(timestamp, _)| timestamp);
        let order: Vec<EventRef> = keyed.into_iter().map(|(_, event)| event).collect();

        log::info!(
            "Merged {} sources: {} events in {}",
            self.sources.len(),
            order.len(),
            time_unit
        );

        self.order = order;
        self.offsets = offsets;
        self.time_unit = Some(time_unit);
        self.state = MergeState::Merged;
        Ok(())
    }

    /// Fail with `ConflictingNames` on the first name declared by two sources.
    ///
    /// Sources are checked in addition order and names in lexicographic
    /// order, so the reported conflict is deterministic.
    fn check_conflicts(&self) -> Result<()> {
        let mut seen: BTreeMap<&str, &Signal> = BTreeMap::new();

        for source in &self.sources {
            for (name, signal) in source.unique_signals()? {
                if let Some(first) = seen.get(name) {
                    return Err(MergeError::ConflictingNames {
                        name: name.to_string(),
                        source_a: first.source(),
                        source_b: signal.source(),
                    });
                }
                seen.insert(name, signal);
            }
        }

        Ok(())
    }

    fn target_time_unit(&self) -> Result<TimeUnit> {
        if let Some(unit) = self.config.time_unit {
            return Ok(unit);
        }

        let mut finest = TimeUnit::S;
        for source in &self.sources {
            finest = finest.finer(source.time_unit()?);
        }
        Ok(finest)
    }

    fn sync_offsets(&self, unit: TimeUnit) -> Result<Vec<u64>> {
        let sync_points = self
            .sources
            .iter()
            .map(|source| source.sync_point_in(unit))
            .collect::<Result<Vec<u64>>>()?;

        let latest = sync_points.iter().copied().max().unwrap_or_default();
        Ok(sync_points.iter().map(|&sync| latest - sync).collect())
    }

    /// The merged changes and the union of the sources' unique signals
    pub fn signals(&self) -> Result<MergedSignals<'_>> {
        let time_unit = match (self.state, self.time_unit) {
            (MergeState::Merged, Some(unit)) => unit,
            _ => return Err(MergeError::NotMerged),
        };

        let mut events = Vec::with_capacity(self.order.len());
        for &(source_index, signal_index) in &self.order {
            events.push(&self.sources[source_index].signals()?[signal_index]);
        }

        // Disjoint by construction: conflicts were rejected in run().
        let mut unique = UniqueSignals::new();
        for source in &self.sources {
            unique.extend(source.unique_signals()?);
        }

        Ok(MergedSignals {
            time_unit,
            events,
            unique,
        })
    }

    /// Statistics of a completed merge
    pub fn summary(&self) -> Result<MergeSummary> {
        let merged = self.signals()?;

        let sources = self
            .sources
            .iter()
            .zip(&self.offsets)
            .map(|(source, &offset)| {
                Ok(MergedSourceSummary {
                    stats: source.stats()?,
                    offset,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(MergeSummary {
            time_unit: merged.time_unit,
            sources,
            num_events: merged.events.len(),
            num_signals: merged.unique.len(),
        })
    }
}
