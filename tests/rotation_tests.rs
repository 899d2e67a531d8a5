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

/// Rotation behaviour of the multi-file writer, checked against files on disk
///
use frame_recorder::{
    BinaryFrameEncoder, Frame, FrameReader, MultiWriter, RecordingSummary, StreamType,
    WriterSettings,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PAYLOAD_KEY: &str = "payload";

/// A frame whose encoded record is exactly `size` bytes
fn frame_of_size(stream: StreamType, size: u64) -> Frame {
    let overhead = BinaryFrameEncoder::encoded_len(&Frame::new(stream).with(PAYLOAD_KEY, Vec::<u8>::new()));
    assert!(size >= overhead, "frame size {} below record overhead {}", size, overhead);
    let frame = Frame::new(stream).with(PAYLOAD_KEY, vec![0x5Au8; (size - overhead) as usize]);
    assert_eq!(BinaryFrameEncoder::encoded_len(&frame), size);
    frame
}

fn settings(temp_dir: &TempDir, size_limit: u64, sync_stream: StreamType) -> WriterSettings {
    let mut settings = WriterSettings::new(
        temp_dir.path().join("out-%04u.i3.gz").to_string_lossy(),
        size_limit,
    );
    settings.sync_stream = sync_stream;
    settings
}

fn record(settings: &WriterSettings, frames: &[Frame]) -> RecordingSummary {
    let mut writer = MultiWriter::new(settings).expect("Failed to create writer");
    writer.configure().expect("Failed to open first file");
    for frame in frames {
        writer.process_frame(frame).expect("Failed to write frame");
    }
    writer.finish().expect("Failed to finish")
}

fn read_file(path: &Path) -> Vec<Frame> {
    FrameReader::open(path)
        .and_then(|mut reader| reader.read_all())
        .expect("Failed to read back file")
}

fn file_path(temp_dir: &TempDir, index: u32) -> PathBuf {
    temp_dir.path().join(format!("out-{:04}.i3.gz", index))
}

/// Deterministic pseudo-random source (64-bit LCG)
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn random_frames(rng: &mut Lcg, count: usize) -> Vec<Frame> {
    let streams = [
        StreamType::Geometry,
        StreamType::Calibration,
        StreamType::DetectorStatus,
        StreamType::DAQ,
        StreamType::Physics,
        StreamType::Physics,
        StreamType::Physics,
    ];
    (0..count)
        .map(|_| {
            let stream = streams[rng.below(streams.len() as u64) as usize];
            frame_of_size(stream, 30 + rng.below(400))
        })
        .collect()
}

#[test]
fn test_rotates_before_sync_frame_after_limit() {
    let temp_dir = TempDir::new().unwrap();
    let frames = vec![
        frame_of_size(StreamType::DAQ, 900),
        frame_of_size(StreamType::Physics, 200),
        frame_of_size(StreamType::DAQ, 50),
    ];

    let summary = record(&settings(&temp_dir, 1000, StreamType::DAQ), &frames);

    let first = read_file(&file_path(&temp_dir, 0));
    let second = read_file(&file_path(&temp_dir, 1));
    assert_eq!(first, frames[..2].to_vec());
    assert_eq!(second, frames[2..].to_vec());

    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.files[0].file.bytes_written, 1100);
    assert_eq!(summary.files[0].frames, 2);
    assert_eq!(summary.files[1].file.bytes_written, 50);
    assert_eq!(summary.files[1].frames, 1);
    assert!(!file_path(&temp_dir, 2).exists());
}

#[test]
fn test_limit_is_strictly_exceeded_before_rotation() {
    let temp_dir = TempDir::new().unwrap();
    let frames = vec![
        frame_of_size(StreamType::DAQ, 600),
        frame_of_size(StreamType::Physics, 400),
        frame_of_size(StreamType::DAQ, 100),
    ];

    // Exactly at the limit is not over it
    let summary = record(&settings(&temp_dir, 1000, StreamType::DAQ), &frames);
    assert_eq!(summary.files.len(), 1);
    assert_eq!(read_file(&file_path(&temp_dir, 0)).len(), 3);
}

#[test]
fn test_defers_rotation_until_sync_frame() {
    let temp_dir = TempDir::new().unwrap();
    let frames = vec![
        frame_of_size(StreamType::DAQ, 500),
        frame_of_size(StreamType::Physics, 500),
        frame_of_size(StreamType::Physics, 500),
        frame_of_size(StreamType::Physics, 500),
        frame_of_size(StreamType::DAQ, 100),
        frame_of_size(StreamType::Physics, 100),
    ];

    record(&settings(&temp_dir, 1000, StreamType::DAQ), &frames);

    let first = read_file(&file_path(&temp_dir, 0));
    let second = read_file(&file_path(&temp_dir, 1));
    assert_eq!(first.len(), 4);
    assert_eq!(second, frames[4..].to_vec());
    assert_eq!(second[0].stream(), StreamType::DAQ);
}

#[test]
fn test_rotates_immediately_when_no_sync_seen() {
    let temp_dir = TempDir::new().unwrap();
    let frames = vec![
        frame_of_size(StreamType::Geometry, 800),
        frame_of_size(StreamType::Calibration, 300),
        frame_of_size(StreamType::Physics, 50),
        frame_of_size(StreamType::Physics, 50),
    ];

    record(&settings(&temp_dir, 1000, StreamType::DAQ), &frames);

    assert_eq!(read_file(&file_path(&temp_dir, 0)), frames[..2].to_vec());
    assert_eq!(read_file(&file_path(&temp_dir, 1)), frames[2..].to_vec());
}

#[test]
fn test_sync_frame_heading_new_file_counts_as_seen() {
    let temp_dir = TempDir::new().unwrap();
    let frames = vec![
        frame_of_size(StreamType::DAQ, 1100),
        frame_of_size(StreamType::DAQ, 1100),
        // Over the limit in file 1, which already has its DAQ frame
        frame_of_size(StreamType::Physics, 100),
        frame_of_size(StreamType::Physics, 100),
        frame_of_size(StreamType::DAQ, 100),
    ];

    let summary = record(&settings(&temp_dir, 1000, StreamType::DAQ), &frames);

    assert_eq!(summary.files.len(), 3);
    assert_eq!(read_file(&file_path(&temp_dir, 0)), frames[..1].to_vec());
    assert_eq!(read_file(&file_path(&temp_dir, 1)), frames[1..4].to_vec());
    assert_eq!(read_file(&file_path(&temp_dir, 2)), frames[4..].to_vec());
}

#[test]
fn test_custom_sync_stream() {
    let temp_dir = TempDir::new().unwrap();
    let frames = vec![
        frame_of_size(StreamType::DetectorStatus, 200),
        frame_of_size(StreamType::DAQ, 900),
        frame_of_size(StreamType::DAQ, 100),
        frame_of_size(StreamType::DetectorStatus, 200),
        frame_of_size(StreamType::DAQ, 100),
    ];

    record(&settings(&temp_dir, 1000, StreamType::DetectorStatus), &frames);

    assert_eq!(read_file(&file_path(&temp_dir, 0)).len(), 3);
    let second = read_file(&file_path(&temp_dir, 1));
    assert_eq!(second[0].stream(), StreamType::DetectorStatus);
    assert_eq!(second.len(), 2);
}

#[test]
fn test_file_indices_are_contiguous() {
    let temp_dir = TempDir::new().unwrap();
    let frames: Vec<_> = (0..10)
        .map(|_| frame_of_size(StreamType::DAQ, 150))
        .collect();

    let summary = record(&settings(&temp_dir, 100, StreamType::DAQ), &frames);

    let indices: Vec<u32> = summary.files.iter().map(|f| f.file.index).collect();
    assert_eq!(indices, (0..10).collect::<Vec<u32>>());
    for index in 0..10 {
        assert_eq!(read_file(&file_path(&temp_dir, index)).len(), 1);
    }
    assert!(!file_path(&temp_dir, 10).exists());
}

#[test]
fn test_random_streams_follow_rotation_rule() {
    let sync = StreamType::DAQ;
    let mut rng = Lcg(0x5EED);

    for round in 0..20 {
        let temp_dir = TempDir::new().unwrap();
        let limit = 500 + rng.below(3000);
        let frames = random_frames(&mut rng, 200);

        let summary = record(&settings(&temp_dir, limit, sync), &frames);

        let files: Vec<Vec<Frame>> = summary
            .files
            .iter()
            .filter(|f| !f.file.deleted)
            .map(|f| read_file(&f.file.path))
            .collect();

        // Nothing lost, nothing reordered
        let flattened: Vec<Frame> = files.iter().flatten().cloned().collect();
        assert_eq!(flattened, frames, "round {}: frames lost or reordered", round);

        for (i, file) in files.iter().enumerate() {
            let sizes: Vec<u64> = file.iter().map(BinaryFrameEncoder::encoded_len).collect();
            assert_eq!(
                sizes.iter().sum::<u64>(),
                summary.files[i].file.bytes_written,
                "round {}: byte count mismatch in file {}",
                round,
                i
            );

            // No frame inside a file should have triggered a rotation
            let mut before = 0u64;
            let mut sync_seen = false;
            for (j, frame) in file.iter().enumerate() {
                sync_seen |= frame.stream() == sync;
                if j > 0 {
                    assert!(
                        !(before > limit && (frame.stream() == sync || !sync_seen)),
                        "round {}: file {} should have rotated before frame {}",
                        round,
                        i,
                        j
                    );
                }
                before += sizes[j];
            }

            // Every rotation happened at an eligible frame
            if let Some(next) = files.get(i + 1) {
                let head = next[0].stream();
                let file_had_sync = file.iter().any(|f| f.stream() == sync);
                assert!(before > limit, "round {}: file {} rotated under the limit", round, i);
                assert!(
                    head == sync || !file_had_sync,
                    "round {}: file {} starts with {} although a sync frame was pending",
                    round,
                    i + 1,
                    head
                );
            }
        }
    }
}
