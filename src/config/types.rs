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

// Configuration types for frame-recorder

use crate::frame::StreamType;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecorderConfig {
    #[serde(default)]
    pub writer: WriterSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rotating writer settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WriterSettings {
    /// Output path template with one integer slot, e.g. "run-%04u.i3.gz"
    #[serde(default = "default_path")]
    pub path: String,

    /// Soft size limit in bytes. Files typically exceed it by part of one frame.
    /// Must be set; 0 is rejected.
    #[serde(default)]
    pub size_limit: u64,

    /// Stream type new files wait for; every file after the first begins with one
    #[serde(default)]
    pub sync_stream: StreamType,

    /// Compression level 0-9 (gzip scale)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Stream types to write; empty means all
    #[serde(default)]
    pub streams: Vec<StreamType>,

    /// Regular expressions for frame keys that are not written
    #[serde(default)]
    pub skip_keys: Vec<String>,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            path: default_path(),
            size_limit: 0,
            sync_stream: StreamType::DAQ,
            compression_level: default_compression_level(),
            streams: Vec::new(),
            skip_keys: Vec::new(),
        }
    }
}

impl WriterSettings {
    pub fn new(path: impl Into<String>, size_limit: u64) -> Self {
        Self {
            path: path.into(),
            size_limit,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,  // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String,  // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_path() -> String { "run-%04u.i3.gz".to_string() }
fn default_compression_level() -> u32 { 6 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
