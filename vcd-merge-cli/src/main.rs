//! VCD Merge CLI Application
//!
//! Command-line front end of the vcd-merge library:
//! - `merge`: combine text logs and VCD files onto one time axis
//! - `convert`: turn a single text log into a VCD
//! - optional TOML configuration and JSON run report

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use vcd_merge::{
    check_source_count, Merge, MergeConfig, MergeError, SignalSource, SourceRegistry, SourceSpec,
    TimeUnit, VcdTracer,
};

mod config;
mod report;

/// Output file of `merge` when neither the command line nor the config names one
const DEFAULT_MERGE_OUTPUT: &str = "merged.vcd";

/// VCD Merge - Combine signal logs into a value change dump
#[derive(Parser, Debug)]
#[command(name = "vcd-merge")]
#[command(about = "Merge text signal logs and VCD files into one VCD", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge two or more sources into one VCD
    Merge(MergeArgs),
    /// Convert a single text log into a VCD
    Convert(ConvertArgs),
}

#[derive(clap::Args, Debug)]
struct MergeArgs {
    /// Input sources as FORMAT,SYNC_POINT,TIME_UNIT,PREFIX,FILE
    /// (e.g. `T,100,ns,Cpu.,cpu.log` or `V,0,,,bus.vcd`)
    #[arg(value_name = "SOURCE")]
    sources: Vec<SourceSpec>,

    /// Output VCD file [default: merged.vcd]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Time unit of the output (s, ms, us, ns, ps, fs) [default: finest source unit]
    #[arg(short = 't', long = "timebase", value_name = "UNIT")]
    time_base: Option<TimeUnit>,

    /// Write a JSON summary of the run
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Path to a merge configuration file (merge.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not write a $date section
    #[arg(long)]
    no_date: bool,
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Text log to convert
    #[arg(value_name = "LOG")]
    log: PathBuf,

    /// Time unit of the log's timestamps
    #[arg(value_name = "LOG_UNIT")]
    log_unit: TimeUnit,

    /// Output VCD file [default: LOG with a .vcd extension]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Time unit of the output [default: LOG_UNIT]
    #[arg(short = 't', long = "timebase", value_name = "UNIT")]
    time_base: Option<TimeUnit>,

    /// Add a signal with this name carrying the line number of each record
    #[arg(short = 'c', long, value_name = "NAME")]
    line_counter: Option<String>,

    /// Prefix prepended to every signal name
    #[arg(short, long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Write a JSON summary of the run
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Do not write a $date section
    #[arg(long)]
    no_date: bool,
}

/// Everything a run needs, after command line and config file are combined
#[derive(Debug)]
struct RunPlan {
    sources: Vec<SourceSpec>,
    output: PathBuf,
    time_base: Option<TimeUnit>,
    report: Option<PathBuf>,
    date: bool,
    verbose: bool,
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("VCD Merge CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using merge library v{}", vcd_merge::VERSION);

    let plan = match args.command {
        Command::Merge(merge_args) => merge_plan(merge_args, args.verbose, args.quiet),
        Command::Convert(convert_args) => Ok(convert_plan(convert_args, args.verbose, args.quiet)),
    };

    let mut registry = SourceRegistry::new();
    match plan.and_then(|plan| execute(plan, &mut registry)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, &registry);
            ExitCode::FAILURE
        }
    }
}

/// Combine the `merge` arguments with the optional config file.
/// Command-line values win.
fn merge_plan(args: MergeArgs, verbose: u8, quiet: bool) -> Result<RunPlan> {
    let file = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::MergeFileConfig::default(),
    };

    let sources = if args.sources.is_empty() {
        file.sources
    } else {
        args.sources
    };
    check_source_count(sources.len())?;

    Ok(RunPlan {
        sources,
        output: args
            .output
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MERGE_OUTPUT)),
        time_base: args.time_base.or(file.time_base),
        report: args.report.or(file.report),
        date: !args.no_date,
        verbose: verbose > 0,
        quiet,
    })
}

/// A conversion is a merge of one text log
fn convert_plan(args: ConvertArgs, verbose: u8, quiet: bool) -> RunPlan {
    let mut spec = SourceSpec::txt(&args.log, args.log_unit);
    if let Some(name) = args.line_counter {
        spec = spec.with_line_counter(name);
    }
    if let Some(prefix) = args.prefix {
        spec = spec.with_prefix(prefix);
    }

    RunPlan {
        sources: vec![spec],
        output: args
            .output
            .unwrap_or_else(|| args.log.with_extension("vcd")),
        time_base: args.time_base,
        report: args.report,
        date: !args.no_date,
        verbose: verbose > 0,
        quiet,
    }
}

/// Read all sources, merge them and dump the result
fn execute(plan: RunPlan, registry: &mut SourceRegistry) -> Result<()> {
    let mut config = MergeConfig::new().with_verbose(plan.verbose);
    if let Some(unit) = plan.time_base {
        config = config.with_time_unit(unit);
    }

    let mut merge = Merge::new(config);
    for spec in plan.sources {
        let mut source = SignalSource::new(spec, registry)?;
        source.create(registry)?;
        if !plan.quiet {
            println!("{}", source.description()?);
        }
        merge.add_source(source)?;
    }

    merge.run()?;

    let mut tracer = VcdTracer::new(merge.signals()?);
    if plan.date {
        tracer = tracer.with_date(Utc::now());
    }
    tracer.dump(&plan.output)?;

    let summary = merge.summary()?;
    if !plan.quiet {
        println!(
            "✓ Wrote {:?}: {} signals, {} changes, time base {}",
            plan.output, summary.num_signals, summary.num_events, summary.time_unit
        );
    }

    if let Some(path) = &plan.report {
        report::write_report(&summary, path)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
    }

    Ok(())
}

/// Print a failed run to stderr. Name conflicts show both source names.
fn report_error(error: &anyhow::Error, registry: &SourceRegistry) {
    if let Some(MergeError::ConflictingNames {
        name,
        source_a,
        source_b,
    }) = error.downcast_ref::<MergeError>()
    {
        let name_of = |handle| {
            registry
                .source_name(handle)
                .unwrap_or(SourceRegistry::NO_SOURCE_NAME)
        };
        eprintln!(
            "Error: signal {} is defined in {} and in {}",
            name,
            name_of(*source_a),
            name_of(*source_b)
        );
    } else {
        eprintln!("Error: {:#}", error);
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_needs_two_sources() {
        let args = Args::try_parse_from(["vcd-merge", "merge", "T,0,ns,,a.log"]).unwrap();
        let Command::Merge(merge_args) = args.command else {
            panic!("expected merge");
        };
        let error = merge_plan(merge_args, 0, false).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<MergeError>(),
            Some(MergeError::NotEnoughSources { required: 2, given: 1 })
        ));
    }

    #[test]
    fn test_merge_defaults() {
        let args = Args::try_parse_from([
            "vcd-merge",
            "merge",
            "-t",
            "ps",
            "T,0,ns,,a.log",
            "V,5,,B.,b.vcd",
        ])
        .unwrap();
        let Command::Merge(merge_args) = args.command else {
            panic!("expected merge");
        };
        let plan = merge_plan(merge_args, 1, false).unwrap();

        assert_eq!(plan.sources.len(), 2);
        assert_eq!(plan.sources[1].prefix, "B.");
        assert_eq!(plan.sources[1].sync_point, 5);
        assert_eq!(plan.output, PathBuf::from(DEFAULT_MERGE_OUTPUT));
        assert_eq!(plan.time_base, Some(TimeUnit::Ps));
        assert!(plan.date);
        assert!(plan.verbose);
    }

    #[test]
    fn test_bad_source_spec_is_rejected_by_parser() {
        assert!(Args::try_parse_from(["vcd-merge", "merge", "X,0,ns,,a.log", "T,0,ns,,b.log"]).is_err());
        assert!(Args::try_parse_from(["vcd-merge", "merge", "T,0,ns,a.log", "T,0,ns,,b.log"]).is_err());
    }

    #[test]
    fn test_convert_plan() {
        let args = Args::try_parse_from([
            "vcd-merge",
            "convert",
            "-c",
            "Log.line",
            "--no-date",
            "trace.log",
            "us",
        ])
        .unwrap();
        let Command::Convert(convert_args) = args.command else {
            panic!("expected convert");
        };
        let plan = convert_plan(convert_args, 0, true);

        assert_eq!(plan.sources.len(), 1);
        assert_eq!(plan.sources[0].time_unit, Some(TimeUnit::Us));
        assert_eq!(plan.sources[0].line_counter.as_deref(), Some("Log.line"));
        assert_eq!(plan.output, PathBuf::from("trace.vcd"));
        assert!(!plan.date);
        assert!(plan.quiet);
    }
}
