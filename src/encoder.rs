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

/// Per-frame serialization and filtering
///
/// The rotating writer only decides where a frame goes; how the frame is
/// turned into bytes is delegated to a [`FrameEncoder`].
///
/// # Record Format
///
/// [`BinaryFrameEncoder`] writes one self-delimiting record per frame, all
/// integers little-endian:
///
/// ```text
/// [magic "FRAM":4B][version:1B][stream code:1B][item count:4B]
///   repeated: [key len:2B][key:NB][payload len:4B][payload:MB]
/// ```
///
/// Records are concatenated, so a file can be read from any record start.
use crate::error::{Result, WriterError};
use crate::frame::{Frame, StreamType};
use regex::Regex;
use std::io::Write;
use tracing::trace;

pub const RECORD_MAGIC: [u8; 4] = *b"FRAM";
pub const RECORD_VERSION: u8 = 1;
/// Magic, version, stream code and item count
pub const RECORD_HEADER_SIZE: usize = 4 + 1 + 1 + 4;
/// Key length and payload length prefixes
pub const ITEM_HEADER_SIZE: usize = 2 + 4;

/// Serializes a single frame into the currently open output
pub trait FrameEncoder {
    /// Write `frame` to `out`, returning the number of bytes appended
    ///
    /// Returning 0 means the frame was filtered out.
    fn write_frame(&mut self, frame: &Frame, out: &mut dyn Write) -> Result<u64>;

    /// Called after the writer switched to a new output file
    fn on_new_file(&mut self) {}
}

/// Default encoder with stream and key filters
///
/// - `streams`: when non-empty, only frames of these stream types are
///   written. TrayInfo frames are always written.
/// - `skip_keys`: items whose key fully matches one of these patterns are
///   dropped.
/// - Repeated identical TrayInfo frames are written once per file.
#[derive(Debug, Default)]
pub struct BinaryFrameEncoder {
    streams: Vec<StreamType>,
    skip_keys: Vec<Regex>,
    last_tray_info: Option<Frame>,
}

impl BinaryFrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filters(streams: Vec<StreamType>, skip_keys: &[String]) -> Result<Self> {
        let skip_keys = skip_keys
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                    WriterError::Config(format!("invalid skip key pattern '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            streams,
            skip_keys,
            last_tray_info: None,
        })
    }

    /// Size of the record for `frame` when no key is skipped
    pub fn encoded_len(frame: &Frame) -> u64 {
        let items: usize = frame
            .items()
            .iter()
            .map(|item| ITEM_HEADER_SIZE + item.key.len() + item.payload.len())
            .sum();
        (RECORD_HEADER_SIZE + items) as u64
    }

    fn wants_stream(&self, stream: StreamType) -> bool {
        stream == StreamType::TrayInfo || self.streams.is_empty() || self.streams.contains(&stream)
    }

    fn skips_key(&self, key: &str) -> bool {
        self.skip_keys.iter().any(|re| re.is_match(key))
    }

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        let code = frame.stream().code();
        if !code.is_ascii() {
            return Err(WriterError::Encode(format!(
                "stream code '{}' is not a single byte",
                code
            )));
        }

        let items: Vec<_> = frame
            .items()
            .iter()
            .filter(|item| !self.skips_key(&item.key))
            .collect();

        let mut buffer = Vec::with_capacity(Self::encoded_len(frame) as usize);
        buffer.extend_from_slice(&RECORD_MAGIC);
        buffer.push(RECORD_VERSION);
        buffer.push(code as u8);
        buffer.extend_from_slice(&(items.len() as u32).to_le_bytes());

        for item in items {
            let key_len = u16::try_from(item.key.len()).map_err(|_| {
                let head: String = item.key.chars().take(32).collect();
                WriterError::Encode(format!("key '{}...' is too long", head))
            })?;
            let payload_len = u32::try_from(item.payload.len()).map_err(|_| {
                WriterError::Encode(format!(
                    "payload of '{}' is too large: {} bytes",
                    item.key,
                    item.payload.len()
                ))
            })?;

            buffer.extend_from_slice(&key_len.to_le_bytes());
            buffer.extend_from_slice(item.key.as_bytes());
            buffer.extend_from_slice(&payload_len.to_le_bytes());
            buffer.extend_from_slice(&item.payload);
        }

        Ok(buffer)
    }
}

impl FrameEncoder for BinaryFrameEncoder {
    fn write_frame(&mut self, frame: &Frame, out: &mut dyn Write) -> Result<u64> {
        if !self.wants_stream(frame.stream()) {
            trace!("Skipping {} frame (stream not selected)", frame.stream());
            return Ok(0);
        }

        if frame.stream() == StreamType::TrayInfo {
            if self.last_tray_info.as_ref() == Some(frame) {
                trace!("Skipping repeated TrayInfo frame");
                return Ok(0);
            }
            self.last_tray_info = Some(frame.clone());
        }

        let record = self.encode(frame)?;
        out.write_all(&record)?;
        Ok(record.len() as u64)
    }

    fn on_new_file(&mut self) {
        self.last_tray_info = None;
    }
}
