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

/// Size-based file rotation at sync-frame boundaries
///
/// The controller is consulted once per frame, before the frame is written,
/// with the uncompressed byte count of the current file as of the previous
/// frame. It orders a rotation when the file is over the limit and the
/// incoming frame is a good place to start a new file:
///
/// - the frame is of the sync stream type, so the new file opens with it, or
/// - no sync frame has been seen in the current file at all, so there is no
///   sync position worth waiting for.
///
/// The limit is soft: a file may exceed it by up to one frame.
use crate::error::{Result, WriterError};
use crate::frame::StreamType;
use tracing::trace;

/// Immutable rotation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    size_limit_bytes: u64,
    sync_stream: StreamType,
}

impl RotationPolicy {
    /// A zero limit is rejected; it is not a "no limit" sentinel
    pub fn new(size_limit_bytes: u64, sync_stream: StreamType) -> Result<Self> {
        if size_limit_bytes == 0 {
            return Err(WriterError::Config(format!(
                "size limit ({}) must be > 0",
                size_limit_bytes
            )));
        }
        Ok(Self {
            size_limit_bytes,
            sync_stream,
        })
    }

    pub fn size_limit_bytes(&self) -> u64 {
        self.size_limit_bytes
    }

    pub fn sync_stream(&self) -> StreamType {
        self.sync_stream
    }
}

/// Per-file rotation bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationState {
    pub sync_seen: bool,
    pub file_index: u32,
}

#[derive(Debug, Clone)]
pub struct RotationController {
    policy: RotationPolicy,
    state: RotationState,
}

impl RotationController {
    pub fn new(policy: RotationPolicy) -> Self {
        Self {
            policy,
            state: RotationState::default(),
        }
    }

    /// Note an outgoing frame; a sync frame marks the current file as synced
    pub fn observe(&mut self, stream: StreamType) {
        if stream == self.policy.sync_stream {
            self.state.sync_seen = true;
        }
    }

    pub fn should_rotate(&self, stream: StreamType, bytes_written: u64) -> bool {
        bytes_written > self.policy.size_limit_bytes
            && (stream == self.policy.sync_stream || !self.state.sync_seen)
    }

    /// `observe` followed by `should_rotate`, the order the writer uses per frame
    pub fn check(&mut self, stream: StreamType, bytes_written: u64) -> bool {
        self.observe(stream);
        let rotate = self.should_rotate(stream, bytes_written);
        trace!(
            "{} frame at {} bytes (limit {}, sync seen: {}): rotate={}",
            stream,
            bytes_written,
            self.policy.size_limit_bytes,
            self.state.sync_seen,
            rotate
        );
        rotate
    }

    /// Advance to the next file and return its index
    pub fn advance(&mut self) -> u32 {
        self.state.sync_seen = false;
        self.state.file_index += 1;
        self.state.file_index
    }

    pub fn file_index(&self) -> u32 {
        self.state.file_index
    }

    pub fn sync_seen(&self) -> bool {
        self.state.sync_seen
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }
}
