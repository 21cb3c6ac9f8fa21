// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fdb::{Config, Engine, Record};
use rand::{rngs::OsRng, RngCore};

fn segment_log_bench(c: &mut Criterion) {
    const N_RECORD: usize = 2000;

    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::open(dir.path(), Some(Config::with_buffer_size(256))).unwrap();
    engine.create_collection("bench", Some(vec!["bucket".to_string()])).unwrap();

    c.bench_function("insert 2000 records into an indexed collection", |b| {
        b.iter(|| {
            for i in 0..N_RECORD {
                let mut rec = Record::new();
                let mut payload = [0u8; 64];
                OsRng.fill_bytes(&mut payload);
                let payload_hex: String = payload.iter().map(|b| format!("{b:02x}")).collect();
                rec.set("bucket", (i % 10).to_string());
                rec.set("payload", payload_hex);
                black_box(engine.insert("bench", rec).unwrap());
            }
        })
    });

    c.bench_function("indexed equality lookup", |b| {
        let query = fdb::Query::Fields(vec![(
            "bucket".to_string(),
            vec![fdb::Condition::Eq("3".to_string())],
        )]);
        b.iter(|| black_box(engine.find("bench", Some(&query), None, 0, None).unwrap()))
    });
}

criterion_group!(benches, segment_log_bench);
criterion_main!(benches);
