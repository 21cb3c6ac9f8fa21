// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter};

lazy_static! {
    pub static ref FRAMES_APPENDED: Box<IntCounter> = {
        let counter = Box::new(
            IntCounter::new("fdb_frames_appended_total", "Frames appended to segment logs")
                .unwrap(),
        );
        prometheus::default_registry()
            .register(counter.clone())
            .expect("registering fdb_frames_appended_total must succeed");
        counter
    };
    pub static ref FLUSHES_TOTAL: Box<IntCounter> = {
        let counter =
            Box::new(IntCounter::new("fdb_flushes_total", "Write buffer flushes").unwrap());
        prometheus::default_registry()
            .register(counter.clone())
            .expect("registering fdb_flushes_total must succeed");
        counter
    };
    pub static ref INDEX_REBUILDS_TOTAL: Box<IntCounter> = {
        let counter = Box::new(
            IntCounter::new("fdb_index_rebuilds_total", "Full index rebuilds").unwrap(),
        );
        prometheus::default_registry()
            .register(counter.clone())
            .expect("registering fdb_index_rebuilds_total must succeed");
        counter
    };
    pub static ref FRAME_SIZE_BYTES: Box<Histogram> = {
        let histogram = Box::new(
            Histogram::with_opts(
                HistogramOpts::new("fdb_frame_size_bytes", "Histogram of encoded frame size")
                    .buckets(vec![
                        32., 64., 128., 256., 512., 1024., 2048., 4096., 8192., 16384.,
                    ]),
            )
            .unwrap(),
        );
        prometheus::default_registry()
            .register(histogram.clone())
            .expect("registering fdb_frame_size_bytes must succeed");
        histogram
    };
}
