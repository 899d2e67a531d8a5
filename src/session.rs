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

// File session manager: owns the one open output file

use crate::compression::{CompressionLevel, OutputStream};
use crate::error::{Result, WriterError};
use crate::template::PathTemplate;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// A file that has been closed by a rotation or by finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosedFile {
    pub index: u32,
    pub path: PathBuf,
    pub bytes_written: u64,
    /// True when the file was empty and removed from disk
    pub deleted: bool,
}

struct FileSession {
    index: u32,
    path: PathBuf,
    stream: OutputStream,
}

enum SessionState {
    Unopened,
    Open(FileSession),
    Closed,
}

/// Opens, rotates and finalizes output files
///
/// `Unopened -> Open` on `open_current`, `Open -> Unopened` on
/// `close_current`, `Open -> Open` on `rotate`, `Open -> Closed` on
/// `finish`. Closed is terminal.
pub struct FileSessionManager {
    template: PathTemplate,
    compression_level: CompressionLevel,
    state: SessionState,
}

impl FileSessionManager {
    pub fn new(template: PathTemplate, compression_level: CompressionLevel) -> Self {
        Self {
            template,
            compression_level,
            state: SessionState::Unopened,
        }
    }

    /// Open the file for `index`
    pub fn open_current(&mut self, index: u32) -> Result<&Path> {
        match self.state {
            SessionState::Unopened => {}
            SessionState::Open(_) => {
                return Err(WriterError::AlreadyOpen("close the current file first"))
            }
            SessionState::Closed => return Err(WriterError::NotOpen("session already finished")),
        }

        let session = self.open_session(index)?;
        debug!("Starting new file '{}'", session.path.display());
        self.state = SessionState::Open(session);
        self.current_path()
            .ok_or(WriterError::NotOpen("session failed to open"))
    }

    /// Uncompressed bytes accepted by the current file
    pub fn bytes_written(&self) -> Result<u64> {
        match &self.state {
            SessionState::Open(session) => Ok(session.stream.bytes_written()),
            _ => Err(WriterError::NotOpen("no byte counter in the output pipeline")),
        }
    }

    /// Close the current file without deleting it
    ///
    /// The manager is left unopened, ready for `open_current`.
    pub fn close_current(&mut self) -> Result<ClosedFile> {
        let session = match std::mem::replace(&mut self.state, SessionState::Unopened) {
            SessionState::Open(session) => session,
            other => {
                self.state = other;
                return Err(WriterError::NotOpen("cannot close without an open file"));
            }
        };
        Self::close_session(session)
    }

    /// Close the current file and open the one for `new_index`
    ///
    /// The closed file is kept even if it is empty. If the next file cannot
    /// be opened the previous one is still closed and the manager is left
    /// unopened; callers that must account for the closed file use
    /// `close_current` and `open_current` directly.
    pub fn rotate(&mut self, new_index: u32) -> Result<ClosedFile> {
        let closed = self.close_current()?;
        self.open_current(new_index)?;
        info!("Rotated '{}' after {} bytes", closed.path.display(), closed.bytes_written);
        Ok(closed)
    }

    /// Close the current file, deleting it if nothing was written
    ///
    /// Returns `None` if the manager was never opened or is already closed.
    pub fn finish(&mut self) -> Result<Option<ClosedFile>> {
        let session = match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open(session) => session,
            _ => return Ok(None),
        };

        let mut closed = Self::close_session(session)?;
        trace!("lastfile bytes={}", closed.bytes_written);

        if closed.bytes_written == 0 {
            debug!("Removing empty file '{}'", closed.path.display());
            fs::remove_file(&closed.path)?;
            closed.deleted = true;
        }
        Ok(Some(closed))
    }

    /// The open stream, for the frame encoder
    pub fn stream_mut(&mut self) -> Result<&mut dyn Write> {
        match &mut self.state {
            SessionState::Open(session) => Ok(&mut session.stream),
            SessionState::Unopened => Err(WriterError::NotOpen("writer not configured")),
            SessionState::Closed => Err(WriterError::NotOpen("writer already finished")),
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        match &self.state {
            SessionState::Open(session) => Some(session.path.as_path()),
            _ => None,
        }
    }

    pub fn current_index(&self) -> Option<u32> {
        match &self.state {
            SessionState::Open(session) => Some(session.index),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    fn open_session(&self, index: u32) -> Result<FileSession> {
        let path = self.template.format(index);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!("Creating output directory: {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }

        let stream = OutputStream::create(&path, self.compression_level)?;
        Ok(FileSession {
            index,
            path,
            stream,
        })
    }

    fn close_session(session: FileSession) -> Result<ClosedFile> {
        let FileSession {
            index,
            path,
            stream,
        } = session;

        let bytes_written = stream.finish()?;
        trace!("Closed '{}' after {} bytes", path.display(), bytes_written);

        Ok(ClosedFile {
            index,
            path,
            bytes_written,
            deleted: false,
        })
    }
}
