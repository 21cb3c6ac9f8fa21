// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-collection append-only `.fdb` file: a sequence of length-framed records with
//! sequential scan, truncate-and-rewrite, and truncation-tolerant recovery on a crash-damaged
//! tail.

use crate::codec;
use crate::record::Record;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// An append-only, length-framed record log backed by a single file.
#[derive(Debug)]
pub struct SegmentLog {
    path: PathBuf,
}

impl SegmentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn create_empty(&self) -> std::io::Result<()> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        Ok(())
    }

    /// Appends a batch of already-encoded frames to end-of-file in a single write.
    pub fn append(&self, frames: &[Vec<u8>]) -> std::io::Result<()> {
        if frames.is_empty() {
            return Ok(());
        }
        let total_len: usize = frames.iter().map(Vec::len).sum();
        let mut batch = Vec::with_capacity(total_len);
        for frame in frames {
            batch.extend_from_slice(frame);
        }
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(&batch)?;
        file.flush()
    }

    /// Truncates the file and rewrites it with a new sequence of frames.
    pub fn rewrite(&self, frames: &[Vec<u8>]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        for frame in frames {
            file.write_all(frame)?;
        }
        file.flush()
    }

    pub fn clear(&self) -> std::io::Result<()> {
        self.rewrite(&[])
    }

    pub fn remove(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Sequentially scans every frame, skipping corrupted/truncated ones. If `wanted_ids` is
    /// given, only records whose `_id` is in the set are returned.
    pub fn scan(&self, wanted_ids: Option<&HashSet<String>>) -> std::io::Result<Vec<Record>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let mut records = Vec::new();
        let mut offset = 0usize;
        while offset + 4 <= data.len() {
            let body_len = u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
            let body_start = offset + 4;
            let body_end = body_start + body_len;
            if body_end > data.len() {
                tracing::warn!(path = %self.path.display(), offset, "truncated record tail, stopping scan");
                break;
            }
            match codec::decode_body(&data[body_start..body_end]) {
                Some(record) => {
                    let keep = match wanted_ids {
                        Some(ids) => ids.contains(record.id()),
                        None => true,
                    };
                    if keep {
                        records.push(record);
                    }
                }
                None => {
                    tracing::warn!(path = %self.path.display(), offset, "failed to decode record, skipping");
                }
            }
            offset = body_end;
        }
        Ok(records)
    }
}
