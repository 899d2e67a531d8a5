// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use frame_recorder::config::{apply_env_overrides, ConfigLoader, LoggingConfig};
use frame_recorder::{FrameReader, MultiWriter, RecorderConfig};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Frame Recorder - Split frame streams into size-limited compressed files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-record input files into a rotating series of output files
    Split {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Soft size limit in bytes (overrides config file)
        #[arg(short, long)]
        size_limit: Option<u64>,

        /// Output path template, e.g. "run-%04u.i3.gz" (overrides config file)
        #[arg(short, long)]
        output: Option<String>,

        /// Print a JSON summary of the written files
        #[arg(long)]
        summary: bool,

        /// Input frame files, read in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print one line per frame
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let log_level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(log_level.into()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

fn load_split_config(
    config_path: &Path,
    size_limit: Option<u64>,
    output: Option<String>,
) -> Result<RecorderConfig> {
    let mut config = if config_path.exists() {
        ConfigLoader::read(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?
    } else {
        RecorderConfig::default()
    };

    apply_env_overrides(&mut config)?;

    // Apply CLI overrides
    if let Some(size_limit) = size_limit {
        config.writer.size_limit = size_limit;
    }
    if let Some(output) = output {
        config.writer.path = output;
    }

    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn record(writer: &mut MultiWriter, inputs: &[PathBuf]) -> Result<()> {
    for input in inputs {
        info!("Reading frames from {}", input.display());
        let reader = FrameReader::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;

        for frame in reader {
            let frame = frame.with_context(|| format!("Failed to read {}", input.display()))?;
            writer.process_frame(&frame)?;
        }
    }
    Ok(())
}

fn split(
    config_path: PathBuf,
    size_limit: Option<u64>,
    output: Option<String>,
    summary: bool,
    inputs: Vec<PathBuf>,
) -> Result<()> {
    let config = load_split_config(&config_path, size_limit, output)?;
    init_tracing(&config.logging)?;

    info!("Starting Frame Recorder");
    if config_path.exists() {
        info!("Loaded configuration from: {:?}", config_path);
    } else {
        warn!("No config file at {:?}, using defaults", config_path);
    }
    info!("Output template: {}", config.writer.path);
    info!("Size limit: {} bytes", config.writer.size_limit);
    info!("Sync stream: {}", config.writer.sync_stream);

    let mut writer = MultiWriter::new(&config.writer)?;
    writer.configure()?;

    // Finish even when recording fails so the last file is closed
    let recorded = record(&mut writer, &inputs);
    let finished = writer.finish();
    recorded?;
    let report = finished?;

    info!(
        "Wrote {} frames ({} bytes) to {} files",
        report.frames_written,
        report.bytes_written,
        report.files_kept()
    );

    if summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize summary")?
        );
    }
    Ok(())
}

fn inspect(files: Vec<PathBuf>) -> Result<()> {
    init_tracing(&LoggingConfig::default())?;

    for file in files {
        let reader = FrameReader::open(&file)
            .with_context(|| format!("Failed to open {}", file.display()))?;

        println!("{}", file.display());
        for (index, frame) in reader.enumerate() {
            let frame = frame.with_context(|| format!("Failed to read {}", file.display()))?;
            let keys: Vec<&str> = frame.keys().collect();
            println!(
                "  {:>6}  {:<14} {:>10} bytes  [{}]",
                index,
                frame.stream().to_string(),
                frame.payload_len(),
                keys.join(", ")
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Split {
            config,
            size_limit,
            output,
            summary,
            inputs,
        } => split(config, size_limit, output, summary, inputs),
        Command::Inspect { files } => inspect(files),
    }
}
