//! VCD file reader
//!
//! Reads an existing value change dump using the `vcd` crate. Scope paths
//! become dot-delimited signal names, the `$timescale` multiplier is folded
//! into the timestamps so that they are expressed in the plain unit.

use super::{ensure_exists, RawSignals, SignalReader};
use crate::config::SourceSpec;
use crate::registry::{SourceHandle, SourceRegistry};
use crate::signal::{Signal, SIGNAL_NAME_DELIM};
use crate::types::{MergeError, Result, TimeUnit};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

/// Timescale assumed when the file declares none
pub const DEFAULT_TIMESCALE: (u32, TimeUnit) = (1, TimeUnit::Ns);

/// VCD file reader
pub struct VcdReader;

/// A declared variable
#[derive(Debug, Clone)]
struct VarInfo {
    name: String,
    size: usize,
    is_real: bool,
}

impl SignalReader for VcdReader {
    fn read(
        spec: &SourceSpec,
        handle: SourceHandle,
        _registry: &mut SourceRegistry,
    ) -> Result<RawSignals> {
        log::info!("Parsing VCD file: {:?}", spec.path);
        ensure_exists(&spec.path)?;

        let unreadable = |e: std::io::Error| MergeError::SourceUnreadable {
            path: spec.path.clone(),
            reason: e.to_string(),
        };

        let file = File::open(&spec.path).map_err(unreadable)?;
        let mut parser = ::vcd::Parser::new(BufReader::new(file));
        let header = parser.parse_header().map_err(unreadable)?;

        let (multiplier, time_unit) = header
            .timescale
            .map(|(multiplier, unit)| (multiplier, TimeUnit::from(unit)))
            .unwrap_or(DEFAULT_TIMESCALE);
        log::debug!("VCD timescale: {} {}", multiplier, time_unit);

        let mut vars: HashMap<::vcd::IdCode, Vec<VarInfo>> = HashMap::new();
        let mut scope = Vec::new();
        collect_vars(&header.items, &mut scope, &mut vars);

        let mut raw = RawSignals {
            time_unit: Some(time_unit),
            ..RawSignals::default()
        };
        let mut now = 0u64;

        for command in parser {
            let command = match command {
                Ok(command) => command,
                Err(e) => {
                    log::trace!("Skipping malformed VCD command: {}", e);
                    raw.invalid_records += 1;
                    continue;
                }
            };

            let (id, change) = match command {
                ::vcd::Command::Timestamp(t) => {
                    now = t.checked_mul(u64::from(multiplier)).ok_or(
                        MergeError::TimestampOverflow {
                            timestamp: t,
                            from: time_unit,
                            to: time_unit,
                        },
                    )?;
                    continue;
                }
                ::vcd::Command::ChangeScalar(id, value) => (id, Change::Bits(value.to_string())),
                ::vcd::Command::ChangeVector(id, value) => (id, Change::Bits(value.to_string())),
                ::vcd::Command::ChangeReal(id, value) => (id, Change::Real(value)),
                ::vcd::Command::ChangeString(id, _) => {
                    log::trace!("Skipping string change of {}", id);
                    raw.invalid_records += 1;
                    continue;
                }
                _ => continue,
            };

            let Some(targets) = vars.get(&id) else {
                log::trace!("Skipping change of undeclared id code {}", id);
                raw.invalid_records += 1;
                continue;
            };

            let mut accepted = false;
            for var in targets {
                match (&change, var.is_real) {
                    (Change::Bits(bits), false) => {
                        raw.signals.push(Signal::wire_bits(
                            var.name.clone(),
                            var.size,
                            now,
                            bits.clone(),
                            handle,
                        ));
                        accepted = true;
                    }
                    (Change::Real(value), true) => {
                        raw.signals.push(Signal::real(var.name.clone(), now, *value, handle));
                        accepted = true;
                    }
                    _ => {}
                }
            }

            if accepted {
                raw.valid_records += 1;
            } else {
                log::trace!("Skipping change of {} with mismatching type", id);
                raw.invalid_records += 1;
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

enum Change {
    Bits(String),
    Real(f64),
}

fn collect_vars(
    items: &[::vcd::ScopeItem],
    scope: &mut Vec<String>,
    vars: &mut HashMap<::vcd::IdCode, Vec<VarInfo>>,
) {
    for item in items {
        match item {
            ::vcd::ScopeItem::Scope(inner) => {
                scope.push(inner.identifier.clone());
                collect_vars(&inner.items, scope, vars);
                scope.pop();
            }
            ::vcd::ScopeItem::Var(var) => {
                let mut reference = var.reference.clone();
                match var.index {
                    Some(::vcd::ReferenceIndex::BitSelect(bit)) => {
                        reference.push_str(&format!("[{}]", bit));
                    }
                    Some(::vcd::ReferenceIndex::Range(msb, lsb)) => {
                        reference.push_str(&format!("[{}:{}]", msb, lsb));
                    }
                    None => {}
                }

                let mut path = scope.clone();
                path.push(reference);

                vars.entry(var.code).or_default().push(VarInfo {
                    name: path.join(&SIGNAL_NAME_DELIM.to_string()),
                    size: var.size as usize,
                    is_real: var.var_type == ::vcd::VarType::Real,
                });
            }
            _ => {}
        }
    }
}
