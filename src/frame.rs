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

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stream type tag carried by every frame
///
/// Each stream has a one-character code used in the on-disk record. Codes
/// outside the well-known set are preserved as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StreamType {
    Geometry,
    Calibration,
    DetectorStatus,
    #[default]
    DAQ,
    Physics,
    TrayInfo,
    Other(char),
}

impl StreamType {
    pub fn code(self) -> char {
        match self {
            StreamType::Geometry => 'G',
            StreamType::Calibration => 'C',
            StreamType::DetectorStatus => 'D',
            StreamType::DAQ => 'Q',
            StreamType::Physics => 'P',
            StreamType::TrayInfo => 'I',
            StreamType::Other(c) => c,
        }
    }

    pub fn from_code(code: char) -> Self {
        match code {
            'G' => StreamType::Geometry,
            'C' => StreamType::Calibration,
            'D' => StreamType::DetectorStatus,
            'Q' => StreamType::DAQ,
            'P' => StreamType::Physics,
            'I' => StreamType::TrayInfo,
            other => StreamType::Other(other),
        }
    }

    pub fn name(self) -> String {
        match self {
            StreamType::Geometry => "Geometry".to_string(),
            StreamType::Calibration => "Calibration".to_string(),
            StreamType::DetectorStatus => "DetectorStatus".to_string(),
            StreamType::DAQ => "DAQ".to_string(),
            StreamType::Physics => "Physics".to_string(),
            StreamType::TrayInfo => "TrayInfo".to_string(),
            StreamType::Other(c) => c.to_string(),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for StreamType {
    type Err = String;

    /// Accepts a stream name (case-insensitive) or a single-character code
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_graphic() {
                return Ok(StreamType::from_code(c));
            }
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "geometry" => Ok(StreamType::Geometry),
            "calibration" => Ok(StreamType::Calibration),
            "detectorstatus" | "detector_status" => Ok(StreamType::DetectorStatus),
            "daq" => Ok(StreamType::DAQ),
            "physics" => Ok(StreamType::Physics),
            "trayinfo" | "tray_info" => Ok(StreamType::TrayInfo),
            _ => Err(format!(
                "unknown stream type '{}'. Supported: Geometry, Calibration, DetectorStatus, DAQ, Physics, TrayInfo or a one-character code",
                s
            )),
        }
    }
}

impl TryFrom<String> for StreamType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StreamType> for String {
    fn from(stream: StreamType) -> Self {
        stream.name()
    }
}

/// A single keyed payload inside a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameItem {
    pub key: String,
    pub payload: Bytes,
}

/// An ordered, typed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    stream: StreamType,
    items: Vec<FrameItem>,
}

impl Frame {
    pub fn new(stream: StreamType) -> Self {
        Self {
            stream,
            items: Vec::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        self.put(key, payload);
        self
    }

    /// Insert an item, replacing any existing item with the same key in place
    pub fn put(&mut self, key: impl Into<String>, payload: impl Into<Bytes>) {
        let key = key.into();
        let payload = payload.into();
        match self.items.iter_mut().find(|item| item.key == key) {
            Some(item) => item.payload = payload,
            None => self.items.push(FrameItem { key, payload }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.items
            .iter()
            .find(|item| item.key == key)
            .map(|item| &item.payload)
    }

    pub fn stream(&self) -> StreamType {
        self.stream
    }

    pub fn items(&self) -> &[FrameItem] {
        &self.items
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of payload sizes, excluding keys and record framing
    pub fn payload_len(&self) -> usize {
        self.items.iter().map(|item| item.payload.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping() {
        for stream in [
            StreamType::Geometry,
            StreamType::Calibration,
            StreamType::DetectorStatus,
            StreamType::DAQ,
            StreamType::Physics,
            StreamType::TrayInfo,
        ] {
            assert_eq!(StreamType::from_code(stream.code()), stream);
        }
        assert_eq!(StreamType::from_code('X'), StreamType::Other('X'));
    }

    #[test]
    fn test_parse_names_and_codes() {
        assert_eq!("DAQ".parse::<StreamType>().unwrap(), StreamType::DAQ);
        assert_eq!("daq".parse::<StreamType>().unwrap(), StreamType::DAQ);
        assert_eq!(
            "DetectorStatus".parse::<StreamType>().unwrap(),
            StreamType::DetectorStatus
        );
        assert_eq!("Q".parse::<StreamType>().unwrap(), StreamType::DAQ);
        assert_eq!("M".parse::<StreamType>().unwrap(), StreamType::Other('M'));
        assert!("NotAStream".parse::<StreamType>().is_err());
    }

    #[test]
    fn test_serde_as_name() {
        let yaml = serde_yaml::to_string(&StreamType::Physics).unwrap();
        assert_eq!(yaml.trim(), "Physics");

        let parsed: StreamType = serde_yaml::from_str("Geometry").unwrap();
        assert_eq!(parsed, StreamType::Geometry);
    }

    #[test]
    fn test_put_replaces_in_place() {
        let mut frame = Frame::new(StreamType::Physics)
            .with("a", vec![1u8])
            .with("b", vec![2u8]);
        frame.put("a", vec![3u8, 4]);

        let keys: Vec<_> = frame.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(frame.get("a").unwrap().as_ref(), &[3u8, 4]);
        assert_eq!(frame.payload_len(), 3);
    }
}
