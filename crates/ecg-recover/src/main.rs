//! ecg-recover-rs — recovers the ECG waveform and beat markers that a
//! report PDF draws as vector graphics.
//!
//! Supports two CLI modes:
//! - Legacy: `ecg-recover-rs report.pdf out.csv [--options]`
//! - Modern: `ecg-recover-rs recover report.pdf -o out.csv`

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};

use recover_core::options::{OutputFormat, ScanOptions};
use recover_core::pipeline::PipelineBuilder;
use recover_core::plugin::{RecordingOutput, ReportInput};

#[derive(Parser)]
#[command(
    name = "ecg-recover-rs",
    version,
    about = "Recover ECG data from AliveCor report PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input report PDF (legacy mode)
    #[arg(global = false)]
    input: Option<PathBuf>,

    /// Output file (legacy mode)
    #[arg(global = false)]
    output: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Chart speed in mm/s (default: 25)
    #[arg(long, global = true)]
    time_scale: Option<f64>,

    /// Chart gain in mm/mV (default: 10)
    #[arg(long, global = true)]
    amplitude_scale: Option<f64>,

    /// Output format: csv, json (default: detected from output extension)
    #[arg(long, global = true)]
    to: Option<String>,

    /// Dump effective merged config as TOML and exit
    #[arg(long, global = true)]
    dump_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover a recording from a report (modern interface)
    Recover {
        /// Input report PDF
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Load config from global and project-local TOML files.
/// Later files override earlier ones. Missing files are silently ignored.
fn load_config() -> ScanOptions {
    let mut opts = ScanOptions::default();

    // 1. Global config: ~/.config/ecg-recover-rs/config.toml
    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("ecg-recover-rs").join("config.toml");
        if let Ok(contents) = std::fs::read_to_string(&global_path) {
            match toml::from_str::<ScanOptions>(&contents) {
                Ok(parsed) => opts = parsed,
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", global_path.display(), e);
                }
            }
        }
    }

    // 2. Project-local config: ./.ecg-recover-rs.toml
    let local_path = PathBuf::from(".ecg-recover-rs.toml");
    if let Ok(contents) = std::fs::read_to_string(&local_path) {
        match toml::from_str::<ScanOptions>(&contents) {
            Ok(parsed) => opts = parsed,
            Err(e) => {
                log::warn!("Failed to parse {}: {}", local_path.display(), e);
            }
        }
    }

    opts
}

/// Apply CLI flags on top of config-loaded options.
/// Only overrides when the CLI flag was explicitly provided.
fn apply_cli_overrides(opts: &mut ScanOptions, cli: &Cli) {
    let matches = Cli::command().get_matches_from(std::env::args_os());

    if matches.value_source("verbose") == Some(clap::parser::ValueSource::CommandLine) {
        opts.verbose = cli.verbose;
    }

    if let Some(time_scale) = cli.time_scale {
        opts.time_scale = time_scale;
    }

    if let Some(amplitude_scale) = cli.amplitude_scale {
        opts.amplitude_scale = amplitude_scale;
    }

    if let Some(ref format_str) = cli.to {
        opts.output_format = OutputFormat::from_extension(format_str);
        if opts.output_format.is_none() {
            log::warn!("Unknown output format '{}', detecting from extension", format_str);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle --dump-config
    if cli.dump_config {
        let mut opts = load_config();
        apply_cli_overrides(&mut opts, &cli);
        match toml::to_string_pretty(&opts) {
            Ok(s) => {
                println!("{}", s);
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    }

    let result = match &cli.command {
        Some(Commands::Recover { input, output }) => {
            run_recovery(input.clone(), output.clone(), &cli)
        }
        None => {
            // Legacy mode: positional args
            match (&cli.input, &cli.output) {
                (Some(input), Some(output)) => {
                    run_recovery(input.clone(), output.clone(), &cli)
                }
                _ => {
                    eprintln!("Usage: ecg-recover-rs <report.pdf> <output> [options]");
                    eprintln!("   or: ecg-recover-rs recover <report.pdf> -o <output> [options]");
                    process::exit(1);
                }
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run_recovery(input: PathBuf, output: PathBuf, cli: &Cli) -> Result<()> {
    // Build options: config files → CLI overrides
    let mut options = load_config();
    apply_cli_overrides(&mut options, cli);

    let output_format = options
        .output_format
        .or_else(|| {
            output
                .extension()
                .and_then(|e| e.to_str())
                .and_then(OutputFormat::from_extension)
        })
        .context("Cannot detect output format. Use --to to specify.")?;
    options.output_format = Some(output_format);

    log::info!(
        "Recovering {} → {} ({})",
        input.display(),
        output.display(),
        output_format
    );

    let input_plugin = get_input_plugin(&input)?;
    let output_plugin = get_output_plugin(output_format);

    let pipeline = PipelineBuilder::new()
        .input(input_plugin)
        .output(output_plugin)
        .progress_reporter(Box::new(|frac, msg| {
            if frac < 1.0 {
                log::info!("[{:3.0}%] {}", frac * 100.0, msg);
            } else {
                log::info!("Done!");
            }
        }))
        .build()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    pipeline
        .run(&input, &output, &options)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

fn get_input_plugin(input: &Path) -> Result<Box<dyn ReportInput>> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => Ok(Box::new(recover_input_alivecor::AlivecorInput)),
        _ => anyhow::bail!(
            "Unsupported input format: {} (expected a report PDF)",
            input.display()
        ),
    }
}

fn get_output_plugin(format: OutputFormat) -> Box<dyn RecordingOutput> {
    match format {
        OutputFormat::Csv => Box::new(recover_output_csv::CsvOutputPlugin),
        OutputFormat::Json => Box::new(recover_output_json::JsonOutputPlugin),
    }
}
