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


// Rotating frame recorder
//
// Writes a stream of typed frames into a numbered series of compressed files:
// - Splits files once a soft size limit is exceeded
// - Only splits where the new file can start with a sync-type frame
// - Counts uncompressed bytes in front of the gzip/zstd/lz4 codec
// - Removes the trailing file at shutdown if nothing was written to it
// - Filters streams and frame keys on the way out

pub mod compression;
pub mod config;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod reader;
pub mod rotation;
pub mod session;
pub mod template;
pub mod writer;

// Re-export main types
pub use compression::{CompressionLevel, CompressionType};
pub use config::{load_config, load_config_with_env, RecorderConfig, WriterSettings};
pub use encoder::{BinaryFrameEncoder, FrameEncoder};
pub use error::{Result, WriterError};
pub use frame::{Frame, FrameItem, StreamType};
pub use reader::FrameReader;
pub use rotation::{RotationController, RotationPolicy, RotationState};
pub use session::{ClosedFile, FileSessionManager};
pub use template::PathTemplate;
pub use writer::{FileSummary, MultiWriter, RecordingSummary};
