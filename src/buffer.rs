// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-collection queue of already-encoded frames awaiting flush to the segment log.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct WriteBuffer {
    buffer_size: usize,
    frames: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl WriteBuffer {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            frames: Mutex::new(HashMap::new()),
        }
    }

    pub fn append(&self, collection: &str, frame: Vec<u8>) {
        self.frames
            .lock()
            .entry(collection.to_string())
            .or_default()
            .push(frame);
    }

    pub fn is_full(&self, collection: &str) -> bool {
        self.frames
            .lock()
            .get(collection)
            .map(|f| f.len() >= self.buffer_size)
            .unwrap_or(false)
    }

    /// Drains and returns the pending frames for `collection`, leaving it empty.
    pub fn take(&self, collection: &str) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .get_mut(collection)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Names of collections with at least one pending frame.
    pub fn pending_collections(&self) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .filter(|(_, frames)| !frames.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn snapshot_state(&self) -> HashMap<String, Vec<Vec<u8>>> {
        self.frames.lock().clone()
    }

    pub fn restore_state(&self, state: HashMap<String, Vec<Vec<u8>>>) {
        *self.frames.lock() = state;
    }
}
