//! Hypnocycle CLI
//!
//! Detect sleep cycles in scored hypnograms.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use hypnocycle::{
    analyze,
    config::{Config, ConfigError, CycleConfig},
    core::{resample, Analysis, CycleSummary, ReportBuilder},
    export, read_csv, VERSION,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hypnocycle")]
#[command(version = VERSION)]
#[command(about = "Rule-based sleep cycle detection for scored hypnograms", long_about = None)]
struct Cli {
    /// Log pipeline details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Detection thresholds in minutes. Unset values come from the saved config.
#[derive(Args, Debug, Default)]
struct Thresholds {
    /// Minimum NREM run length
    #[arg(long)]
    min_length: Option<f64>,

    /// Minimum gap between NREM runs that separates two cycles
    #[arg(long)]
    min_separation: Option<f64>,

    /// Wake entries longer than this are long awakenings
    #[arg(long)]
    wake_thresh: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect sleep cycles in a hypnogram CSV
    Detect {
        /// Hypnogram CSV (Entry, Onset, Duration, Stage[, StageN])
        file: PathBuf,

        #[command(flatten)]
        thresholds: Thresholds,

        /// Output format (table, json or csv)
        #[arg(long, default_value = "table")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Write the hypnogram with run, awakening and cycle columns
    Annotate {
        file: PathBuf,

        #[command(flatten)]
        thresholds: Thresholds,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Resample the hypnogram to 30 second epochs
    Resample {
        file: PathBuf,

        /// Add a cycle column to each epoch
        #[arg(long)]
        with_cycles: bool,

        #[command(flatten)]
        thresholds: Thresholds,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show (or update) configuration
    Config {
        #[command(flatten)]
        thresholds: Thresholds,

        /// Persist the given thresholds as new defaults
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Detect {
            file,
            thresholds,
            format,
            output,
        } => cmd_detect(&file, &thresholds, &format, output.as_deref()),
        Commands::Annotate {
            file,
            thresholds,
            output,
        } => cmd_annotate(&file, &thresholds, output.as_deref()),
        Commands::Resample {
            file,
            with_cycles,
            thresholds,
            output,
        } => cmd_resample(&file, with_cycles, &thresholds, output.as_deref()),
        Commands::Config { thresholds, save } => cmd_config(&thresholds, save),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn cmd_detect(
    file: &Path,
    thresholds: &Thresholds,
    format: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (config, analysis) = load_and_analyze(file, thresholds)?;
    let mut out = open_output(output)?;

    match format {
        "table" => print_table(&mut out, &analysis)?,
        "json" => {
            let mut builder = ReportBuilder::new();
            if let Some(name) = file.file_name() {
                builder = builder.with_source(name.to_string_lossy().into_owned());
            }
            let json = builder
                .build_json(&analysis.hypnogram, &analysis.cycles, &config)
                .context("failed to serialize report")?;
            writeln!(out, "{json}")?;
        }
        "csv" => export::write_cycles(&mut out, &analysis.cycles)?,
        other => bail!("unknown format {other:?} (expected table, json or csv)"),
    }
    out.flush()?;

    if let Some(path) = output {
        println!("Wrote {} cycle(s) to {path:?}", analysis.cycles.len());
    }
    Ok(())
}

fn cmd_annotate(file: &Path, thresholds: &Thresholds, output: Option<&Path>) -> anyhow::Result<()> {
    let (_, analysis) = load_and_analyze(file, thresholds)?;
    let mut out = open_output(output)?;
    export::write_entries(&mut out, analysis.hypnogram.entries())?;
    out.flush()?;
    Ok(())
}

fn cmd_resample(
    file: &Path,
    with_cycles: bool,
    thresholds: &Thresholds,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (_, analysis) = load_and_analyze(file, thresholds)?;
    let epochs = resample(&analysis.hypnogram).context("failed to resample hypnogram")?;

    let mut out = open_output(output)?;
    export::write_epochs(&mut out, &epochs, with_cycles)?;
    out.flush()?;
    Ok(())
}

fn cmd_config(thresholds: &Thresholds, save: bool) -> anyhow::Result<()> {
    let mut config = stored_config(Config::load(), save)?;
    config.detection = config.detection.with_overrides(
        thresholds.min_length,
        thresholds.min_separation,
        thresholds.wake_thresh,
    );

    if save {
        config.detection.validate()?;
        config.save()?;
        if let Err(e) = config.ensure_directories() {
            eprintln!("Warning: Could not create directories: {e}");
        }
        println!("Saved configuration.");
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}

/// Pick the config to show or update. An unreadable file is never replaced.
fn stored_config(loaded: Result<Config, ConfigError>, save: bool) -> anyhow::Result<Config> {
    match loaded {
        Ok(config) => Ok(config),
        Err(e) if save => bail!(
            "could not load config {:?}, not overwriting it: {e}",
            Config::config_path()
        ),
        Err(e) => {
            eprintln!("Warning: Could not load config, using defaults: {e}");
            Ok(Config::default())
        }
    }
}

/// Resolve thresholds: saved config first, command line flags on top.
fn effective_config(thresholds: &Thresholds) -> CycleConfig {
    let stored = match Config::load() {
        Ok(config) => config.detection,
        Err(e) => {
            eprintln!("Warning: Could not load config, using defaults: {e}");
            CycleConfig::default()
        }
    };
    stored.with_overrides(
        thresholds.min_length,
        thresholds.min_separation,
        thresholds.wake_thresh,
    )
}

fn load_and_analyze(file: &Path, thresholds: &Thresholds) -> anyhow::Result<(CycleConfig, Analysis)> {
    let config = effective_config(thresholds);
    config.validate()?;

    let entries =
        read_csv(file).with_context(|| format!("failed to load hypnogram {}", file.display()))?;
    if entries.is_empty() {
        eprintln!("Warning: {} contains no entries", file.display());
    }

    let analysis = analyze(entries, &config).context("cycle detection failed")?;
    Ok((config, analysis))
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn print_table(out: &mut dyn Write, analysis: &Analysis) -> io::Result<()> {
    writeln!(
        out,
        "{:<8} {:>9} {:>9} {:>9}  {:<26} {}",
        "Cycle", "Onset", "Offset", "Duration", "Offset mode", "Entries"
    )?;
    for cycle in &analysis.cycles {
        writeln!(
            out,
            "{:<8} {:>9.1} {:>9.1} {:>9.1}  {:<26} {}-{}",
            cycle.cycle_id.to_string(),
            cycle.onset_min,
            cycle.offset_min,
            cycle.duration_min,
            cycle.offset_mode.as_str(),
            cycle.onset_entry_id,
            cycle.offset_entry_id
        )?;
    }

    let summary = CycleSummary::compute(&analysis.hypnogram, &analysis.cycles);
    writeln!(out)?;
    writeln!(out, "{}", summary.headline())?;
    Ok(())
}
