// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deferred-execution envelope around mutating operations.
//!
//! Pending operations are modelled as a list of tagged operation records rather than captured
//! closures, interpreted by `Engine::commit`.

use crate::index::IndexStore;
use std::collections::{BTreeMap, HashMap};

/// One field-level schema operation applied to every record in a collection.
#[derive(Debug, Clone)]
pub enum FieldOpKind {
    Add { field: String, default_value: String },
    Remove { field: String },
    Rename { old_field: String, new_field: String },
}

/// A single deferred mutation, captured with everything `Engine` needs to replay it at commit
/// time.
#[derive(Debug, Clone)]
pub enum PendingOp {
    Insert {
        collection: String,
        id: String,
        fields: BTreeMap<String, String>,
    },
    Update {
        collection: String,
        id: String,
        patch: crate::engine::Patch,
        upsert: bool,
    },
    Delete {
        collection: String,
        id: String,
    },
    FieldOp {
        collection: String,
        op: FieldOpKind,
    },
}

/// Open transaction state: pending ops plus the buffer/index snapshots taken at `begin`.
pub struct TransactionState {
    pub pending: Vec<PendingOp>,
    pub buffer_snapshot: HashMap<String, Vec<Vec<u8>>>,
    pub index_snapshot: HashMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>,
}

impl TransactionState {
    pub fn begin(
        buffer_snapshot: HashMap<String, Vec<Vec<u8>>>,
        index_store: &IndexStore,
    ) -> Self {
        Self {
            pending: Vec::new(),
            buffer_snapshot,
            index_snapshot: index_store.snapshot_state(),
        }
    }
}
