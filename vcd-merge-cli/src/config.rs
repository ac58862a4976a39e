//! Merge configuration file loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vcd_merge::{SourceSpec, TimeUnit};

/// Contents of a merge.toml file.
///
/// Relative paths are resolved against the directory of the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MergeFileConfig {
    /// Output VCD file
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Time unit of the output
    #[serde(default)]
    pub time_base: Option<TimeUnit>,

    /// JSON report file
    #[serde(default)]
    pub report: Option<PathBuf>,

    /// Inputs, in merge order
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl MergeFileConfig {
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        if let Some(output) = &mut self.output {
            resolve(output);
        }
        if let Some(report) = &mut self.report {
            resolve(report);
        }
        for source in &mut self.sources {
            resolve(&mut source.path);
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<MergeFileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: MergeFileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for source in &config.sources {
        source
            .validate()
            .with_context(|| format!("Invalid source in config file: {:?}", path))?;
    }

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    log::debug!("Configuration lists {} sources", config.sources.len());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use vcd_merge::SourceFormat;

    const SAMPLE: &str = r#"
        output = "out/merged.vcd"
        time_base = "ps"

        [[sources]]
        format = "T"
        path = "cpu.log"
        time_unit = "ns"
        prefix = "Cpu."
        sync_point = 100
        line_counter = "Cpu.line"

        [[sources]]
        format = "vcd"
        path = "/data/bus.vcd"
    "#;

    #[test]
    fn test_config_deserialization() {
        let config: MergeFileConfig = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.time_base, Some(TimeUnit::Ps));
        assert_eq!(config.report, None);
        assert_eq!(config.sources.len(), 2);

        let cpu = &config.sources[0];
        assert_eq!(cpu.format, SourceFormat::Txt);
        assert_eq!(cpu.time_unit, Some(TimeUnit::Ns));
        assert_eq!(cpu.sync_point, 100);
        assert_eq!(cpu.line_counter.as_deref(), Some("Cpu.line"));

        let bus = &config.sources[1];
        assert_eq!(bus.format, SourceFormat::Vcd);
        assert_eq!(bus.time_unit, None);
        assert!(bus.prefix.is_empty());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merge.toml");
        fs::File::create(&path)
            .unwrap()
            .write_all(SAMPLE.as_bytes())
            .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.output, Some(dir.path().join("out/merged.vcd")));
        assert_eq!(config.sources[0].path, dir.path().join("cpu.log"));
        assert_eq!(config.sources[1].path, PathBuf::from("/data/bus.vcd"));
    }

    #[test]
    fn test_load_rejects_invalid_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merge.toml");
        fs::write(&path, "[[sources]]\nformat = \"T\"\npath = \"a.log\"\n").unwrap();

        let error = load_config(&path).unwrap_err();
        assert!(format!("{:#}", error).contains("needs a time unit"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_config(Path::new("no/such/merge.toml")).is_err());
    }
}
