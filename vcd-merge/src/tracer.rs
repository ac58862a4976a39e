//! VCD output
//!
//! Writes merged signals as a value change dump: a header with one
//! declaration per unique signal, nested into scopes by name fields, and a
//! body with the changes grouped under `#<timestamp>` markers.
//!
//! Identifier codes are assigned in name order: `!`, `"`, ... `~`, `!!`, ...

use crate::merge::MergedSignals;
use crate::signal::Signal;
use crate::types::{MergeError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serializes a merged signal collection
pub struct VcdTracer<'a> {
    signals: MergedSignals<'a>,
    date: Option<DateTime<Utc>>,
}

impl<'a> VcdTracer<'a> {
    /// Create a tracer. No `$date` section is written unless one is set.
    pub fn new(signals: MergedSignals<'a>) -> Self {
        Self {
            signals,
            date: None,
        }
    }

    /// Builder method: write a `$date` section
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Write the VCD file at `path`
    pub fn dump(&self, path: &Path) -> Result<()> {
        log::info!("Dumping {:?}", path);

        let write_error = |e: io::Error| MergeError::IoWriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let file = File::create(path).map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer).map_err(write_error)?;
        writer.flush().map_err(write_error)
    }

    /// Write header and body to `w`
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let ids: HashMap<&str, String> = self
            .signals
            .unique
            .keys()
            .enumerate()
            .map(|(index, &name)| (name, id_code(index)))
            .collect();

        self.write_header(w, &ids)?;
        self.write_body(w, &ids)
    }

    fn write_header<W: Write>(&self, w: &mut W, ids: &HashMap<&str, String>) -> io::Result<()> {
        if let Some(date) = &self.date {
            writeln!(w, "$date")?;
            writeln!(w, "\t{}", date.format("%Y-%m-%d %H:%M:%S UTC"))?;
            writeln!(w, "$end")?;
        }
        writeln!(w, "$version")?;
        writeln!(w, "\tvcd-merge {}", crate::VERSION)?;
        writeln!(w, "$end")?;
        writeln!(w, "$timescale 1 {} $end", self.signals.time_unit)?;

        // Names sharing a scope prefix are contiguous in name order.
        let mut open: Vec<&str> = Vec::new();
        for signal in self.signals.unique.values() {
            // Empty fields open no scope.
            let fields = signal.name_fields();
            let scopes: Vec<&str> = fields[..fields.len() - 1]
                .iter()
                .copied()
                .filter(|field| !field.is_empty())
                .collect();

            let common = open
                .iter()
                .zip(&scopes)
                .take_while(|(open, wanted)| open == wanted)
                .count();

            for _ in common..open.len() {
                writeln!(w, "$upscope $end")?;
            }
            open.truncate(common);

            for &scope in &scopes[common..] {
                writeln!(w, "$scope module {} $end", scope)?;
                open.push(scope);
            }

            writeln!(w, "{}", signal.footprint(&ids[signal.name()]))?;
        }
        for _ in 0..open.len() {
            writeln!(w, "$upscope $end")?;
        }

        writeln!(w, "$enddefinitions $end")
    }

    fn write_body<W: Write>(&self, w: &mut W, ids: &HashMap<&str, String>) -> io::Result<()> {
        let mut last: HashMap<&str, &Signal> = HashMap::new();
        let mut pending: Vec<String> = Vec::new();
        let mut current: Option<u64> = None;

        for &signal in &self.signals.events {
            if current != Some(signal.timestamp()) {
                flush_group(w, current, &mut pending)?;
                current = Some(signal.timestamp());
            }

            if let Some(&previous) = last.get(signal.name()) {
                if *previous == *signal {
                    continue;
                }
            }
            let id = ids.get(signal.name()).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("signal {} is not declared", signal.name()),
                )
            })?;
            last.insert(signal.name(), signal);
            pending.push(signal.print(id));
        }

        flush_group(w, current, &mut pending)
    }
}

const FIRST_ID_CHAR: u8 = b'!';
const NUM_ID_CHARS: usize = (b'~' - b'!' + 1) as usize;

/// Short VCD identifier code for the `index`-th declared signal
fn id_code(mut index: usize) -> String {
    let mut code = String::new();
    loop {
        code.push((FIRST_ID_CHAR + (index % NUM_ID_CHARS) as u8) as char);
        index /= NUM_ID_CHARS;
        if index == 0 {
            break;
        }
        index -= 1;
    }
    code
}

/// Write the changes of one timestamp, if any
fn flush_group<W: Write>(
    w: &mut W,
    timestamp: Option<u64>,
    pending: &mut Vec<String>,
) -> io::Result<()> {
    let Some(timestamp) = timestamp else {
        return Ok(());
    };
    if pending.is_empty() {
        return Ok(());
    }

    writeln!(w, "#{}", timestamp)?;
    for line in pending.drain(..) {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;
    use crate::source::UniqueSignals;
    use crate::types::TimeUnit;
    use chrono::TimeZone;

    fn render(tracer: &VcdTracer<'_>) -> String {
        let mut out = Vec::new();
        tracer.write(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_scopes() {
        let source = SourceRegistry::new().register("test");
        let signals = vec![
            Signal::wire("Top.A.x", 1, 0, 1, source),
            Signal::wire("Top.A.y", 2, 0, 1, source),
            Signal::real("Top.B.z", 0, 1.5, source),
            Signal::wire("flat", 1, 0, 0, source),
        ];
        let unique: UniqueSignals<'_> = signals.iter().map(|s| (s.name(), s)).collect();
        let tracer = VcdTracer::new(MergedSignals {
            time_unit: TimeUnit::Ps,
            events: Vec::new(),
            unique,
        });

        let expected = format!(
            "$version\n\tvcd-merge {}\n$end\n$timescale 1 ps $end\n\
             $scope module Top $end\n\
             $scope module A $end\n\
             $var wire 1 ! x $end\n\
             $var wire 2 \" y $end\n\
             $upscope $end\n\
             $scope module B $end\n\
             $var real 64 # z $end\n\
             $upscope $end\n\
             $upscope $end\n\
             $var wire 1 $ flat $end\n\
             $enddefinitions $end\n",
            crate::VERSION
        );
        assert_eq!(render(&tracer), expected);
    }

    #[test]
    fn test_body_suppresses_unchanged_values() {
        let source = SourceRegistry::new().register("test");
        let signals = vec![
            Signal::wire("M.x", 1, 10, 1, source),
            Signal::wire("M.y", 1, 10, 0, source),
            Signal::wire("M.x", 1, 20, 1, source),
            Signal::wire("M.x", 1, 30, 0, source),
            Signal::wire("M.y", 1, 30, 0, source),
        ];
        let unique: UniqueSignals<'_> = signals.iter().map(|s| (s.name(), s)).collect();
        let tracer = VcdTracer::new(MergedSignals {
            time_unit: TimeUnit::Ns,
            events: signals.iter().collect(),
            unique,
        });

        let output = render(&tracer);
        let body = output.split("$enddefinitions $end\n").nth(1).unwrap();
        assert_eq!(body, "#10\nb1 !\nb0 \"\n#30\nb0 !\n");
    }

    #[test]
    fn test_header_skips_empty_fields() {
        let source = SourceRegistry::new().register("test");
        let signals = vec![
            Signal::wire(".X", 1, 0, 1, source),
            Signal::wire("A..B", 1, 0, 1, source),
            Signal::wire("Y.", 1, 0, 1, source),
        ];
        let unique: UniqueSignals<'_> = signals.iter().map(|s| (s.name(), s)).collect();
        let tracer = VcdTracer::new(MergedSignals {
            time_unit: TimeUnit::Ns,
            events: Vec::new(),
            unique,
        });

        let output = render(&tracer);
        let header = output
            .split("$timescale 1 ns $end\n")
            .nth(1)
            .unwrap();
        assert_eq!(
            header,
            "$var wire 1 ! X $end\n\
             $scope module A $end\n\
             $var wire 1 \" B $end\n\
             $upscope $end\n\
             $scope module Y $end\n\
             $var wire 1 # Y. $end\n\
             $upscope $end\n\
             $enddefinitions $end\n"
        );
        assert!(!output.contains("module  $end"));
    }

    #[test]
    fn test_id_codes() {
        assert_eq!(id_code(0), "!");
        assert_eq!(id_code(93), "~");
        assert_eq!(id_code(94), "!!");
        assert_eq!(id_code(95), "\"!");
        let codes: std::collections::HashSet<String> = (0..20_000).map(id_code).collect();
        assert_eq!(codes.len(), 20_000);
    }

    #[test]
    fn test_date_section() {
        let tracer = VcdTracer::new(MergedSignals {
            time_unit: TimeUnit::Ns,
            events: Vec::new(),
            unique: UniqueSignals::new(),
        })
        .with_date(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());

        assert!(render(&tracer).starts_with("$date\n\t2024-05-01 12:30:00 UTC\n$end\n"));
    }

    #[test]
    fn test_dump_to_unwritable_path() {
        let tracer = VcdTracer::new(MergedSignals {
            time_unit: TimeUnit::Ns,
            events: Vec::new(),
            unique: UniqueSignals::new(),
        });
        let result = tracer.dump(Path::new("/nonexistent-dir/out.vcd"));
        assert!(matches!(result, Err(MergeError::IoWriteError { .. })));
    }
}
