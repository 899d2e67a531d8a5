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

// Sequential reader for recorded frame files

use crate::compression::open_input;
use crate::encoder::{RECORD_MAGIC, RECORD_VERSION};
use crate::error::{Result, WriterError};
use crate::frame::{Frame, StreamType};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Reads frames back from a file written by [`crate::BinaryFrameEncoder`]
///
/// Compression is detected from the file extension.
pub struct FrameReader {
    reader: Box<dyn Read>,
    path: PathBuf,
}

impl FrameReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = open_input(&path)?;
        Ok(Self { reader, path })
    }

    /// Wrap an already decompressed byte source
    pub fn from_reader(reader: Box<dyn Read>) -> Self {
        Self {
            reader,
            path: PathBuf::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next frame; `None` at a clean end of file
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        // EOF before the first byte is a clean end, anywhere later a truncation
        let mut magic = [0u8; 4];
        loop {
            match self.reader.read(&mut magic[..1]) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.read_body(&mut magic[1..])?;
        if magic != RECORD_MAGIC {
            return Err(WriterError::Decode(format!(
                "bad record magic {:02x?} in {}",
                magic,
                self.path.display()
            )));
        }

        let mut header = [0u8; 6];
        self.read_body(&mut header)?;
        if header[0] != RECORD_VERSION {
            return Err(WriterError::Decode(format!(
                "unsupported record version {}",
                header[0]
            )));
        }

        let mut frame = Frame::new(StreamType::from_code(header[1] as char));
        let count = u32::from_le_bytes([header[2], header[3], header[4], header[5]]);

        for _ in 0..count {
            let mut key_len = [0u8; 2];
            self.read_body(&mut key_len)?;
            let key = self.read_vec(u16::from_le_bytes(key_len) as u64)?;
            let key = String::from_utf8(key)
                .map_err(|e| WriterError::Decode(format!("key is not UTF-8: {}", e)))?;

            let mut payload_len = [0u8; 4];
            self.read_body(&mut payload_len)?;
            let payload = self.read_vec(u32::from_le_bytes(payload_len) as u64)?;

            frame.put(key, payload);
        }

        Ok(Some(frame))
    }

    /// Read all remaining frames
    pub fn read_all(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn read_body(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                WriterError::Decode(format!("truncated record in {}", self.path.display()))
            } else {
                e.into()
            }
        })
    }

    /// Read exactly `len` bytes, growing the buffer only as data arrives
    fn read_vec(&mut self, len: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.reader).take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(WriterError::Decode(format!(
                "truncated record in {}: expected {} bytes, got {}",
                self.path.display(),
                len,
                buf.len()
            )));
        }
        Ok(buf)
    }
}

impl Iterator for FrameReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}
