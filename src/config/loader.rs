// Configuration loader with environment variable substitution

use super::types::*;
use crate::compression::CompressionLevel;
use crate::template::PathTemplate;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
        let config = Self::read(path)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Read configuration without validating it, so overrides can be applied first
    pub fn read<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<RecorderConfig> {
        let config = Self::from_yaml(content)?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<RecorderConfig> {
        // Substitute environment variables
        let content = Self::substitute_env_vars(content);

        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${RUN_DIR:-/data/run} -> /data/run (if RUN_DIR not set)
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        })
        .to_string()
    }

    /// Validate configuration
    pub fn validate(config: &RecorderConfig) -> Result<()> {
        let writer = &config.writer;

        if writer.size_limit == 0 {
            bail!("writer.size_limit ({}) must be > 0", writer.size_limit);
        }

        if CompressionLevel::new(writer.compression_level).is_none() {
            bail!(
                "writer.compression_level must be 0-{}",
                CompressionLevel::MAX
            );
        }

        PathTemplate::parse(&writer.path).context("writer.path is not a valid path template")?;

        for pattern in &writer.skip_keys {
            Regex::new(pattern)
                .with_context(|| format!("writer.skip_keys entry '{}' is not a valid regex", pattern))?;
        }

        match config.logging.format.as_str() {
            "text" | "json" => {}
            unknown => bail!("Unknown logging.format: '{}'. Supported: text, json", unknown),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StreamType;

    fn valid_config() -> RecorderConfig {
        let mut config = RecorderConfig::default();
        config.writer.size_limit = 1024;
        config
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FRAME_TEST_DIR", "/data/run");

        let input = "path: ${FRAME_TEST_DIR}/out-%04u.gz";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "path: /data/run/out-%04u.gz");

        std::env::remove_var("FRAME_TEST_DIR");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("FRAME_TEST_LIMIT");

        let input = "size_limit: ${FRAME_TEST_LIMIT:-4096}";
        let output = ConfigLoader::substitute_env_vars(input);
        assert_eq!(output, "size_limit: 4096");
    }

    #[test]
    fn test_validation_zero_size_limit() {
        let config = RecorderConfig::default();

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("size_limit"));
    }

    #[test]
    fn test_validation_invalid_compression_level() {
        let mut config = valid_config();
        config.writer.compression_level = 10;

        let result = ConfigLoader::validate(&config);
        assert!(result.unwrap_err().to_string().contains("compression_level"));
    }

    #[test]
    fn test_validation_bad_template() {
        let mut config = valid_config();
        config.writer.path = "out.i3.gz".to_string();

        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("printf-style"));
    }

    #[test]
    fn test_parse_full_document() {
        let yaml = r#"
writer:
  path: "out-%03u.i3.zst"
  size_limit: 2048
  sync_stream: DetectorStatus
  compression_level: 3
  streams: [DAQ, Physics]
  skip_keys: ["Calibrated.*"]
logging:
  level: debug
"#;
        let config = ConfigLoader::parse(yaml).unwrap();
        assert_eq!(config.writer.size_limit, 2048);
        assert_eq!(config.writer.sync_stream, StreamType::DetectorStatus);
        assert_eq!(
            config.writer.streams,
            vec![StreamType::DAQ, StreamType::Physics]
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "text");
    }
}
