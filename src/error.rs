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

// Error types for the rotating frame writer

use std::io;
use thiserror::Error;

/// Errors raised by the writer, its file sessions and the frame codec
#[derive(Debug, Error)]
pub enum WriterError {
    /// Invalid writer configuration (size limit, compression level, patterns)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The output path template has no usable integer placeholder
    #[error(
        "cannot format path template '{template}': {reason}. \
         Does the path contain a printf-style specifier where the file number should go, e.g. 'myfile-%04u.i3.gz'?"
    )]
    PathFormat { template: String, reason: String },

    /// The output stream is not open (before configure or after finish)
    #[error("no output stream is open ({0})")]
    NotOpen(&'static str),

    /// An output file is already open where none is expected
    #[error("an output stream is already open ({0})")]
    AlreadyOpen(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A frame could not be encoded
    #[error("failed to encode frame: {0}")]
    Encode(String),

    /// A recorded file could not be decoded
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, WriterError>;
