//! Text log reader
//!
//! One record per line:
//!
//! ```text
//! #<timestamp> <name> <value> <size> [comment...]   wire, value decimal or 0x hex
//! #<timestamp> <name> <value>f [comment...]         real
//! ```
//!
//! Blank lines are ignored. Any other line that does not match is counted
//! as an invalid record and skipped, as is a record that changes the type
//! or size a name was first seen with.

use super::{ensure_exists, RawSignals, SignalReader};
use crate::config::SourceSpec;
use crate::registry::{SourceHandle, SourceRegistry};
use crate::signal::{Signal, SignalType};
use crate::types::{MergeError, Result};
use std::collections::HashMap;

/// Maximum size of a wire signal in a text log
pub const MAX_WIRE_SIZE: usize = 64;

/// Suffix of the registry name of a line counter
pub const LINE_COUNTER_SUFFIX: &str = " (line counter)";

/// Produces a signal tracking the log line of every valid record
#[derive(Debug, Clone)]
pub struct LineCounter {
    name: String,
    handle: SourceHandle,
}

impl LineCounter {
    /// Size of the line counter signal in bits
    pub const SIZE: usize = 32;

    /// Create a line counter and register it as its own source
    pub fn new(name: impl Into<String>, log_name: &str, registry: &mut SourceRegistry) -> Self {
        Self {
            name: name.into(),
            handle: registry.register(format!("{}{}", log_name, LINE_COUNTER_SUFFIX)),
        }
    }

    /// Registry handle of the line counter
    pub fn handle(&self) -> SourceHandle {
        self.handle
    }

    /// Line counter change for a record on `line` (1-based)
    pub fn signal(&self, line: usize, timestamp: u64) -> Signal {
        Signal::wire(
            self.name.clone(),
            Self::SIZE,
            timestamp,
            line as u64,
            self.handle,
        )
    }
}

/// Text log reader
pub struct TxtReader;

impl SignalReader for TxtReader {
    fn read(
        spec: &SourceSpec,
        handle: SourceHandle,
        registry: &mut SourceRegistry,
    ) -> Result<RawSignals> {
        log::info!("Parsing text log: {:?}", spec.path);
        ensure_exists(&spec.path)?;

        let bytes = std::fs::read(&spec.path).map_err(|e| MergeError::SourceUnreadable {
            path: spec.path.clone(),
            reason: e.to_string(),
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let line_counter = spec.line_counter.as_ref().map(|name| {
            LineCounter::new(name.clone(), &spec.path.display().to_string(), registry)
        });

        let mut parser = LineParser::new(handle);
        let mut raw = RawSignals {
            time_unit: spec.time_unit,
            ..RawSignals::default()
        };

        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            if line.trim().is_empty() {
                continue;
            }

            match parser.parse(line) {
                Some(signal) => {
                    if let Some(counter) = &line_counter {
                        raw.signals.push(counter.signal(line_number, signal.timestamp()));
                    }
                    raw.signals.push(signal);
                    raw.valid_records += 1;
                }
                None => {
                    log::trace!("Skipping invalid record at line {}: {}", line_number, line);
                    raw.invalid_records += 1;
                }
            }
        }

        log::debug!(
            "Parsed {:?}: {} valid, {} invalid records",
            spec.path,
            raw.valid_records,
            raw.invalid_records
        );

        Ok(raw)
    }
}

/// Parses single records, remembering the declaration of every name seen
struct LineParser {
    handle: SourceHandle,
    declared: HashMap<String, (SignalType, usize)>,
}

impl LineParser {
    fn new(handle: SourceHandle) -> Self {
        Self {
            handle,
            declared: HashMap::new(),
        }
    }

    fn parse(&mut self, line: &str) -> Option<Signal> {
        let mut tokens = line.split_whitespace();

        let timestamp = tokens.next()?.strip_prefix('#')?.parse::<u64>().ok()?;
        let name = tokens.next()?;
        let value = tokens.next()?;

        let signal = if let Some(real) = parse_real(value) {
            Signal::real(name, timestamp, real, self.handle)
        } else {
            let value = parse_integer(value)?;
            let size = tokens.next()?.parse::<usize>().ok()?;
            if size == 0 || size > MAX_WIRE_SIZE {
                return None;
            }
            if size < MAX_WIRE_SIZE && value >> size != 0 {
                return None;
            }
            Signal::wire(name, size, timestamp, value, self.handle)
        };

        // Remaining tokens are a free-form comment.
        let declaration = (signal.signal_type(), signal.size());
        match self.declared.get(name) {
            Some(first) if *first != declaration => None,
            Some(_) => Some(signal),
            None => {
                self.declared.insert(name.to_string(), declaration);
                Some(signal)
            }
        }
    }
}

fn parse_real(token: &str) -> Option<f64> {
    if token.starts_with("0x") || token.starts_with("0X") {
        return None;
    }
    token
        .strip_suffix('f')
        .and_then(|number| number.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_integer(token: &str) -> Option<u64> {
    match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => token.parse::<u64>().ok(),
    }
}
