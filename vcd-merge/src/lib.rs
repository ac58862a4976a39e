//! VCD Merge Library
//!
//! Turns timestamped signal changes from text logs and existing VCD files
//! into Value Change Dump output, merging several sources onto one time axis.
//!
//! # Architecture
//!
//! The pipeline has three fallible stages, each returning [`Result`]:
//! - [`SignalSource::create`] reads one input into an arena of [`Signal`]s
//! - [`Merge::run`] rejects name collisions between sources, aligns time
//!   units and sync points, and orders all changes by timestamp
//! - [`VcdTracer::dump`] writes the merged signals as VCD
//!
//! Malformed records inside an input are skipped and counted; every other
//! error aborts the run.
//!
//! # Example Usage
//!
//! ```no_run
//! use vcd_merge::{Merge, MergeConfig, SignalSource, SourceRegistry, SourceSpec, VcdTracer};
//! use std::path::Path;
//!
//! let mut registry = SourceRegistry::new();
//! let mut merge = Merge::new(MergeConfig::new());
//!
//! for spec in ["T,0,ns,Cpu.,cpu.log", "V,0,,,bus.vcd"] {
//!     let mut source = SignalSource::new(spec.parse::<SourceSpec>().unwrap(), &mut registry).unwrap();
//!     source.create(&mut registry).unwrap();
//!     merge.add_source(source).unwrap();
//! }
//!
//! merge.run().unwrap();
//! VcdTracer::new(merge.signals().unwrap())
//!     .dump(Path::new("merged.vcd"))
//!     .unwrap();
//! ```

// Public modules
pub mod config;
pub mod formats;
pub mod merge;
pub mod registry;
pub mod signal;
pub mod source;
pub mod tracer;
pub mod types;

// Re-export main types for convenience
pub use config::{MergeConfig, SourceFormat, SourceSpec};
pub use merge::{check_source_count, Merge, MergeState, MergeSummary, MergedSignals};
pub use registry::{SourceHandle, SourceRegistry};
pub use signal::{Signal, SignalType, SignalValue, SIGNAL_NAME_DELIM};
pub use source::{SignalSource, SourceStats, UniqueSignals};
pub use tracer::VcdTracer;
pub use types::{MergeError, Result, TimeUnit};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
