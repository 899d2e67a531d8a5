// Configuration module for frame-recorder
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use types::*;
pub use loader::ConfigLoader;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
    let mut config = ConfigLoader::read(path).context("Failed to load configuration")?;
    apply_env_overrides(&mut config)?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

/// Let environment variables override config values
pub fn apply_env_overrides(config: &mut RecorderConfig) -> Result<()> {
    if let Ok(output_path) = std::env::var("FRAME_RECORDER_PATH") {
        config.writer.path = output_path;
    }

    if let Ok(size_limit) = std::env::var("FRAME_RECORDER_SIZE_LIMIT") {
        config.writer.size_limit = size_limit.trim().parse().with_context(|| {
            format!("FRAME_RECORDER_SIZE_LIMIT is not a byte count: '{}'", size_limit)
        })?;
    }

    Ok(())
}
