//! Mouse Flux CLI
//!
//! Runs the whole pipeline once. With no arguments it reads
//! `Mouse_Data_Student_Copy.xlsx` and writes `processed_data.json.gz` in the
//! working directory.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use mouse_flux::{ComputeError, PipelineConfig, Stage, FLUX_VERSION};

/// Mouse Flux - reshape mouse activity and temperature workbooks
#[derive(Parser)]
#[command(name = "mouse-flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Reshape a mouse activity/temperature workbook into compressed JSON records", long_about = None)]
struct Cli {
    /// JSON configuration file (fields not given keep their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Workbook to read
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Gzip-compressed JSON file to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Gzip level (0-9)
    #[arg(long)]
    compression_level: Option<u32>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ComputeError> {
    let mut config = match cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(input) = cli.input {
        config.input = input;
    }
    if let Some(output) = cli.output {
        config.output = output;
    }
    if let Some(level) = cli.compression_level {
        config.compression_level = level;
    }

    let summary = mouse_flux::run(&config)?;
    tracing::info!(
        male = summary.male_records,
        female = summary.female_records,
        total = summary.total_records,
        output = %summary.output.display(),
        "done"
    );

    Ok(())
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    stage: Stage,
    message: String,
    hint: Option<String>,
}

impl From<ComputeError> for CliError {
    fn from(e: ComputeError) -> Self {
        let stage = e.stage();
        let (code, hint) = match &e {
            ComputeError::InputNotFound(_) => (
                "INPUT_NOT_FOUND",
                "Check the workbook path and that all four sheets exist",
            ),
            ComputeError::DataFormat { .. } => (
                "DATA_FORMAT_ERROR",
                "Fix the offending cell or duplicate subject column and retry",
            ),
            ComputeError::OutputWrite { .. } => (
                "OUTPUT_WRITE_ERROR",
                "Check the output directory exists and is writable",
            ),
            ComputeError::Config(_) => ("CONFIG_ERROR", "Check the configuration file"),
            ComputeError::JsonError(_) => ("ENCODING_ERROR", "Check output disk space"),
        };

        CliError {
            code: code.to_string(),
            stage,
            message: e.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}
