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

/// Rotating multi-file frame writer
///
/// Hooks for the host loop:
///
/// 1. [`MultiWriter::configure`] opens file 0
/// 2. [`MultiWriter::process_frame`] per frame: read the current byte
///    count, ask the [`RotationController`] whether to cut over, rotate if
///    told to, then hand the frame to the [`FrameEncoder`]
/// 3. [`MultiWriter::finish`] closes the last file and removes it if empty
///
/// # Examples
///
/// ```no_run
/// use frame_recorder::{Frame, MultiWriter, StreamType, WriterSettings};
///
/// let settings = WriterSettings::new("/data/run-%04u.i3.gz", 100 * 1024 * 1024);
/// let mut writer = MultiWriter::new(&settings)?;
/// writer.configure()?;
/// writer.process_frame(&Frame::new(StreamType::DAQ).with("raw", vec![0u8; 64]))?;
/// let summary = writer.finish()?;
/// println!("wrote {} files", summary.files_kept());
/// # Ok::<(), frame_recorder::WriterError>(())
/// ```
use crate::compression::CompressionLevel;
use crate::config::WriterSettings;
use crate::encoder::{BinaryFrameEncoder, FrameEncoder};
use crate::error::{Result, WriterError};
use crate::frame::Frame;
use crate::rotation::{RotationController, RotationPolicy};
use crate::session::{ClosedFile, FileSessionManager};
use crate::template::PathTemplate;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, trace};

/// Per-file record in a [`RecordingSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    #[serde(flatten)]
    pub file: ClosedFile,
    pub frames: u64,
}

/// What a writer produced, reported by [`MultiWriter::finish`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordingSummary {
    pub files: Vec<FileSummary>,
    pub frames_seen: u64,
    pub frames_written: u64,
    pub bytes_written: u64,
}

impl RecordingSummary {
    /// Files left on disk
    pub fn files_kept(&self) -> usize {
        self.files.iter().filter(|f| !f.file.deleted).count()
    }
}

pub struct MultiWriter {
    controller: RotationController,
    session: FileSessionManager,
    encoder: Box<dyn FrameEncoder>,
    summary: RecordingSummary,
    frames_in_file: u64,
    finished: bool,
}

impl MultiWriter {
    /// Validate `settings` and build a writer with the default encoder
    ///
    /// No file is created until [`MultiWriter::configure`].
    pub fn new(settings: &WriterSettings) -> Result<Self> {
        let encoder = BinaryFrameEncoder::with_filters(settings.streams.clone(), &settings.skip_keys)?;
        Self::with_encoder(settings, Box::new(encoder))
    }

    pub fn with_encoder(settings: &WriterSettings, encoder: Box<dyn FrameEncoder>) -> Result<Self> {
        let policy = RotationPolicy::new(settings.size_limit, settings.sync_stream)?;
        let level = CompressionLevel::new(settings.compression_level).ok_or_else(|| {
            WriterError::Config(format!(
                "compression level {} must be 0-{}",
                settings.compression_level,
                CompressionLevel::MAX
            ))
        })?;
        let template = PathTemplate::parse(&settings.path)?;

        Ok(Self {
            controller: RotationController::new(policy),
            session: FileSessionManager::new(template, level),
            encoder,
            summary: RecordingSummary::default(),
            frames_in_file: 0,
            finished: false,
        })
    }

    /// Open the first output file
    pub fn configure(&mut self) -> Result<()> {
        trace!("path={}", self.session.template());
        self.session.open_current(self.controller.file_index())?;
        Ok(())
    }

    /// Rotate if the controller says so, then write `frame`
    pub fn process_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.finished {
            return Err(WriterError::NotOpen("writer already finished"));
        }

        let bytes_written = self.session.bytes_written()?;
        trace!(
            "{} bytes: {}",
            bytes_written,
            self.session
                .current_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );

        self.summary.frames_seen += 1;
        if self.controller.check(frame.stream(), bytes_written) {
            self.rotate()?;
            // The triggering frame opens the new file
            self.controller.observe(frame.stream());
        }

        let appended = self
            .encoder
            .write_frame(frame, self.session.stream_mut()?)?;
        if appended > 0 {
            self.summary.frames_written += 1;
            self.frames_in_file += 1;
        }
        Ok(())
    }

    /// Close the last file, deleting it if it is empty
    ///
    /// Only the first call does anything; later calls return the same summary.
    pub fn finish(&mut self) -> Result<RecordingSummary> {
        if !self.finished {
            self.finished = true;
            if let Some(closed) = self.session.finish()? {
                self.record_closed(closed);
            }
        }
        Ok(self.summary.clone())
    }

    pub fn file_index(&self) -> u32 {
        self.controller.file_index()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.session.current_path()
    }

    pub fn bytes_written(&self) -> Result<u64> {
        self.session.bytes_written()
    }

    pub fn summary(&self) -> &RecordingSummary {
        &self.summary
    }

    fn rotate(&mut self) -> Result<()> {
        let next = self.controller.advance();
        let closed = self.session.close_current()?;
        info!(
            "Closed '{}' after {} bytes",
            closed.path.display(),
            closed.bytes_written
        );
        // Account for the closed file before the next open can fail
        self.record_closed(closed);
        self.session.open_current(next)?;
        self.encoder.on_new_file();
        Ok(())
    }

    fn record_closed(&mut self, file: ClosedFile) {
        self.summary.bytes_written += file.bytes_written;
        self.summary.files.push(FileSummary {
            file,
            frames: self.frames_in_file,
        });
        self.frames_in_file = 0;
    }
}

impl Drop for MultiWriter {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                error!("Failed to finish output file on drop: {}", e);
            }
        }
    }
}
