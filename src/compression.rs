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

/// Compressed output pipeline for recorded files
///
/// Every output file is written through a small filter chain:
///
/// ```text
/// frame encoder -> CountingWriter -> codec (gzip | zstd | lz4 | none) -> BufWriter<File>
/// ```
///
/// The counting stage sits in front of the codec, so the byte count it
/// reports is the uncompressed size of everything the file has accepted.
/// That count drives rotation and the delete-if-empty decision at finish.
///
/// The codec is chosen from the file extension.
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::trace;

const FILE_BUFFER_SIZE: usize = 64 * 1024;

/// Compression level on the gzip scale (0 = store, 9 = smallest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompressionLevel(u32);

impl CompressionLevel {
    pub const MAX: u32 = 9;

    pub fn new(level: u32) -> Option<Self> {
        (level <= Self::MAX).then_some(Self(level))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn to_gzip_level(self) -> flate2::Compression {
        flate2::Compression::new(self.0)
    }

    pub fn to_zstd_level(self) -> i32 {
        match self.0 {
            0 | 1 => 1,
            2 | 3 => 3,
            4..=6 => 5,
            7 | 8 => 10,
            _ => 19,
        }
    }

    pub fn to_lz4_level(self) -> u32 {
        match self.0 {
            0 | 1 => 1,
            2 | 3 => 3,
            4..=6 => 5,
            7 | 8 => 9,
            _ => 12,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(6)
    }
}

/// Codec selected from an output path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    None,
    Gzip,
    Zstd,
    Lz4,
}

impl CompressionType {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.ends_with(".gz") || name.ends_with(".gzip") {
            CompressionType::Gzip
        } else if name.ends_with(".zst") || name.ends_with(".zstd") {
            CompressionType::Zstd
        } else if name.ends_with(".lz4") {
            CompressionType::Lz4
        } else {
            CompressionType::None
        }
    }
}

/// Write stage that counts bytes on their way to the inner writer
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes accepted so far
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

enum Codec {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
    Lz4(lz4::Encoder<BufWriter<File>>),
}

impl Codec {
    fn open(file: File, kind: CompressionType, level: CompressionLevel) -> io::Result<Self> {
        let sink = BufWriter::with_capacity(FILE_BUFFER_SIZE, file);
        Ok(match kind {
            CompressionType::None => Codec::Plain(sink),
            CompressionType::Gzip => Codec::Gzip(GzEncoder::new(sink, level.to_gzip_level())),
            CompressionType::Zstd => Codec::Zstd(zstd::Encoder::new(sink, level.to_zstd_level())?),
            CompressionType::Lz4 => Codec::Lz4(
                lz4::EncoderBuilder::new()
                    .level(level.to_lz4_level())
                    .build(sink)?,
            ),
        })
    }

    /// Write the codec trailer and flush the file buffer
    fn finish(self) -> io::Result<()> {
        let mut sink = match self {
            Codec::Plain(sink) => sink,
            Codec::Gzip(encoder) => encoder.finish()?,
            Codec::Zstd(encoder) => encoder.finish()?,
            Codec::Lz4(encoder) => {
                let (sink, result) = encoder.finish();
                result?;
                sink
            }
        };
        sink.flush()
    }
}

impl Write for Codec {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Codec::Plain(w) => w.write(buf),
            Codec::Gzip(w) => w.write(buf),
            Codec::Zstd(w) => w.write(buf),
            Codec::Lz4(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Codec::Plain(w) => w.flush(),
            Codec::Gzip(w) => w.flush(),
            Codec::Zstd(w) => w.flush(),
            Codec::Lz4(w) => w.flush(),
        }
    }
}

/// An open, counted and compressed output file
pub struct OutputStream {
    writer: CountingWriter<Codec>,
    compression: CompressionType,
}

impl OutputStream {
    /// Create (or truncate) `path` and open the codec implied by its extension
    pub fn create(path: &Path, level: CompressionLevel) -> io::Result<Self> {
        let compression = CompressionType::from_path(path);
        let file = File::create(path)?;
        let codec = Codec::open(file, compression, level)?;

        trace!(
            "Opened {:?} stream at level {} for {}",
            compression,
            level.get(),
            path.display()
        );

        Ok(Self {
            writer: CountingWriter::new(codec),
            compression,
        })
    }

    /// Uncompressed bytes accepted by this stream
    pub fn bytes_written(&self) -> u64 {
        self.writer.count()
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Flush and close the stream, returning the final uncompressed count
    pub fn finish(self) -> io::Result<u64> {
        let count = self.writer.count();
        self.writer.into_inner().finish()?;
        Ok(count)
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Open `path` for reading, decompressing according to its extension
pub fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    let file = BufReader::with_capacity(FILE_BUFFER_SIZE, File::open(path)?);
    let reader: Box<dyn Read> = match CompressionType::from_path(path) {
        CompressionType::None => Box::new(file),
        CompressionType::Gzip => Box::new(MultiGzDecoder::new(file)),
        CompressionType::Zstd => Box::new(zstd::Decoder::with_buffer(file)?),
        CompressionType::Lz4 => Box::new(lz4::Decoder::new(file)?),
    };
    Ok(reader)
}
