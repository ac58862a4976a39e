//! JSON run report
//!
//! Writes the merge summary (per-source record counts, time units and
//! offsets, merged totals) next to the VCD output.

use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use vcd_merge::MergeSummary;

/// Write `summary` as pretty-printed JSON to `path`
pub fn write_report(summary: &MergeSummary, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    writer.flush()?;

    log::info!("Report written to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vcd_merge::{Merge, MergeConfig, SignalSource, SourceRegistry, SourceSpec, TimeUnit};

    #[test]
    fn test_report_contents() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        fs::write(&a, "#10 A.x 1 1\n#20 A.x 0 1\nbroken\n").unwrap();
        fs::write(&b, "#3 B.y 2.5f\n").unwrap();

        let mut registry = SourceRegistry::new();
        let mut merge = Merge::new(MergeConfig::new());
        for spec in [
            SourceSpec::txt(&a, TimeUnit::Ns).with_sync_point(10),
            SourceSpec::txt(&b, TimeUnit::Us),
        ] {
            let mut source = SignalSource::new(spec, &mut registry).unwrap();
            source.create(&mut registry).unwrap();
            merge.add_source(source).unwrap();
        }
        merge.run().unwrap();

        let path = dir.path().join("report.json");
        write_report(&merge.summary().unwrap(), &path).unwrap();
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(report["time_unit"], "ns");
        assert_eq!(report["num_events"], 3);
        assert_eq!(report["num_signals"], 2);

        let sources = report["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0]["path"], a.display().to_string());
        assert_eq!(sources[0]["valid_records"], 2);
        assert_eq!(sources[0]["invalid_records"], 1);
        assert_eq!(sources[0]["offset"], 0);
        assert_eq!(sources[1]["offset"], 10);

        // Each source keeps its own time base next to its own sync point
        assert_eq!(sources[0]["time_unit"], "ns");
        assert_eq!(sources[0]["sync_point"], 10);
        assert_eq!(sources[1]["time_unit"], "us");
        assert_eq!(sources[1]["sync_point"], 0);
    }

    #[test]
    fn test_report_to_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let report_path = dir.path().join("missing").join("report.json");

        let mut registry = SourceRegistry::new();
        let log = dir.path().join("a.log");
        fs::write(&log, "#1 X 1 1\n").unwrap();
        let mut source = SignalSource::new(SourceSpec::txt(&log, TimeUnit::Ns), &mut registry).unwrap();
        source.create(&mut registry).unwrap();
        let mut merge = Merge::new(MergeConfig::new());
        merge.add_source(source).unwrap();
        merge.run().unwrap();

        assert!(write_report(&merge.summary().unwrap(), &report_path).is_err());
    }
}
