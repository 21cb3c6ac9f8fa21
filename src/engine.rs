// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public façade: collection lifecycle, mutations, queries, aggregation, and the transaction
//! journal.
//!
//! Concurrency note: the Transaction Journal is a single per-`Engine` state. This implementation
//! does not make it per-thread; instead `begin_transaction`/`commit`/`rollback` serialise through
//! one engine-wide [`parking_lot::Mutex`]. Concurrent transaction use from multiple threads is
//! therefore well-defined but contends on that single mutex — a deliberate simplicity-over-
//! throughput choice.

use crate::aggregate::{self, Stage};
use crate::buffer::WriteBuffer;
use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::IndexStore;
use crate::metrics;
use crate::query::{self, Query, Sort};
use crate::record::Record;
use crate::transaction::{FieldOpKind, PendingOp, TransactionState};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single patch operator applied by [`Engine::update`].
#[derive(Debug, Clone)]
pub enum PatchOp {
    Set(BTreeMap<String, String>),
    Unset(Vec<String>),
    Inc(BTreeMap<String, f64>),
}

/// The patch passed to [`Engine::update`]. A patch containing any `$`-prefixed top-level key is
/// an `Operators` patch; otherwise the whole map is `$set`-equivalent.
#[derive(Debug, Clone)]
pub enum Patch {
    Operators(Vec<PatchOp>),
    DirectSet(BTreeMap<String, String>),
}

impl Patch {
    fn set_fields(&self) -> BTreeMap<String, String> {
        match self {
            Patch::DirectSet(fields) => fields.clone(),
            Patch::Operators(ops) => ops
                .iter()
                .filter_map(|op| match op {
                    PatchOp::Set(fields) => Some(fields.clone()),
                    _ => None,
                })
                .next()
                .unwrap_or_default(),
        }
    }
}

fn apply_patch(record: &mut Record, patch: &Patch) {
    match patch {
        Patch::DirectSet(fields) => record.merge(fields),
        Patch::Operators(ops) => {
            for op in ops {
                match op {
                    PatchOp::Set(fields) => record.merge(fields),
                    PatchOp::Unset(keys) => {
                        for key in keys {
                            if key != crate::record::ID_FIELD {
                                record.remove(key);
                            }
                        }
                    }
                    PatchOp::Inc(incs) => {
                        for (key, delta) in incs {
                            if key == crate::record::ID_FIELD {
                                continue;
                            }
                            let current = record.get(key).and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0);
                            record.set(key.clone(), format_number(current + delta));
                        }
                    }
                }
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// The embedded document store. One `Engine` owns one database directory.
pub struct Engine {
    root: PathBuf,
    #[allow(dead_code)]
    config: Config,
    buffer: WriteBuffer,
    index_store: IndexStore,
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    txn: Mutex<Option<TransactionState>>,
}

impl Engine {
    /// Opens (creating if necessary) the database directory at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>, config: Option<Config>) -> Result<Self> {
        let root = db_path.into();
        std::fs::create_dir_all(&root)?;
        let index_store = IndexStore::open(root.join("indexes"))?;
        let config = config.unwrap_or_default();
        Ok(Self {
            buffer: WriteBuffer::new(config.buffer_size),
            config,
            index_store,
            locks: RwLock::new(HashMap::new()),
            txn: Mutex::new(None),
            root,
        })
    }

    fn segment_log(&self, name: &str) -> crate::segment::SegmentLog {
        crate::segment::SegmentLog::new(self.root.join(format!("{name}.fdb")))
    }

    fn collection_lock(&self, name: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().get(name) {
            return lock.clone();
        }
        self.locks
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ---- collection lifecycle ----

    pub fn create_collection(&self, name: &str, indexed_fields: Option<Vec<String>>) -> Result<bool> {
        if name.is_empty() {
            return Err(Error::ValueError("collection name cannot be empty".to_string()));
        }
        let log = self.segment_log(name);
        if log.exists() {
            return Ok(false);
        }
        let lock = self.collection_lock(name);
        let _guard = lock.lock();
        log.create_empty()?;
        if let Some(fields) = indexed_fields {
            if !fields.is_empty() {
                self.index_store.create_index(name, &fields)?;
            }
        }
        Ok(true)
    }

    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        let log = self.segment_log(name);
        if !log.exists() {
            return Ok(false);
        }
        let lock = self.collection_lock(name);
        let _guard = lock.lock();
        log.remove()?;
        self.index_store.drop_index(name)?;
        Ok(true)
    }

    pub fn clear_collection(&self, name: &str) -> Result<bool> {
        let log = self.segment_log(name);
        if !log.exists() {
            return Ok(false);
        }
        let lock = self.collection_lock(name);
        let _guard = lock.lock();
        log.clear()?;
        self.index_store.clear_index(name)?;
        Ok(true)
    }

    pub fn list_collections(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("fdb") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn export_collection(&self, name: &str, output_file: impl AsRef<Path>) -> Result<bool> {
        let log = self.segment_log(name);
        if !log.exists() {
            return Ok(false);
        }
        self.flush(name)?;
        let lock = self.collection_lock(name);
        let _guard = lock.lock();
        std::fs::copy(log.path(), output_file.as_ref())?;
        Ok(true)
    }

    pub fn import_collection(&self, name: &str, input_file: impl AsRef<Path>) -> Result<bool> {
        let log = self.segment_log(name);
        {
            let lock = self.collection_lock(name);
            let _guard = lock.lock();
            std::fs::copy(input_file.as_ref(), log.path())?;
        }
        self.rebuild_index(name)?;
        Ok(true)
    }

    fn rebuild_index(&self, name: &str) -> Result<()> {
        if !self.index_store.has_index(name) {
            return Ok(());
        }
        self.index_store.clear_index(name)?;
        let records = self.segment_log(name).scan(None)?;
        for record in &records {
            self.index_store.update_index(name, record)?;
        }
        metrics::INDEX_REBUILDS_TOTAL.inc();
        Ok(())
    }

    // ---- buffering ----

    fn flush(&self, name: &str) -> Result<()> {
        let lock = self.collection_lock(name);
        let _guard = lock.lock();
        self.flush_locked(name)
    }

    fn flush_locked(&self, name: &str) -> Result<()> {
        let frames = self.buffer.take(name);
        if frames.is_empty() {
            return Ok(());
        }
        self.segment_log(name).append(&frames)?;
        metrics::FLUSHES_TOTAL.inc();
        Ok(())
    }

    // ---- transaction plumbing ----

    fn push_pending_if_active(&self, op: PendingOp) -> bool {
        let mut guard = self.txn.lock();
        match guard.as_mut() {
            Some(state) => {
                state.pending.push(op);
                true
            }
            None => false,
        }
    }

    pub fn begin_transaction(&self) -> Result<()> {
        let mut guard = self.txn.lock();
        if guard.is_some() {
            return Err(Error::TransactionError("transaction already active".to_string()));
        }
        *guard = Some(TransactionState::begin(self.buffer.snapshot_state(), &self.index_store));
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        let pending = {
            let guard = self.txn.lock();
            match guard.as_ref() {
                Some(state) => state.pending.clone(),
                None => return Err(Error::TransactionError("no active transaction".to_string())),
            }
        };

        for op in &pending {
            if let Err(e) = self.run_pending_op(op) {
                tracing::error!(error = %e, "transaction op failed during commit, rolling back");
                self.rollback()?;
                return Err(Error::TransactionError(format!("failed to commit transaction: {e}")));
            }
        }

        self.txn.lock().take();
        for name in self.buffer.pending_collections() {
            self.flush(&name)?;
        }
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        let mut guard = self.txn.lock();
        match guard.take() {
            Some(state) => {
                self.buffer.restore_state(state.buffer_snapshot);
                self.index_store.restore_state(state.index_snapshot);
                Ok(())
            }
            None => Err(Error::TransactionError("no active transaction to roll back".to_string())),
        }
    }

    fn run_pending_op(&self, op: &PendingOp) -> Result<()> {
        match op {
            PendingOp::Insert { collection, fields, .. } => {
                let record = Record::from_fields(fields.clone());
                let lock = self.collection_lock(collection);
                let _guard = lock.lock();
                self.do_insert(collection, record)
            }
            PendingOp::Update { collection, id, patch, upsert } => {
                self.do_update(collection, id, patch, *upsert).map(|_| ())
            }
            PendingOp::Delete { collection, id } => self.do_delete(collection, id).map(|_| ()),
            PendingOp::FieldOp { collection, op } => self.do_field_op(collection, op).map(|_| ()),
        }
    }

    // ---- mutations ----

    fn do_insert(&self, collection: &str, mut record: Record) -> Result<()> {
        let frame = codec::encode(&mut record)?;
        metrics::FRAME_SIZE_BYTES.observe(frame.len() as f64);
        self.buffer.append(collection, frame);
        self.index_store.update_index(collection, &record)?;
        metrics::FRAMES_APPENDED.inc();
        Ok(())
    }

    pub fn insert(&self, collection: &str, mut record: Record) -> Result<String> {
        if !self.segment_log(collection).exists() {
            self.create_collection(collection, None)?;
        }
        if record.id().is_empty() {
            record.set_id(uuid::Uuid::new_v4().to_string());
        }
        let id = record.id().to_string();

        let pending = PendingOp::Insert {
            collection: collection.to_string(),
            id: id.clone(),
            fields: record.fields().clone(),
        };
        if self.push_pending_if_active(pending) {
            return Ok(id);
        }

        let lock = self.collection_lock(collection);
        let _guard = lock.lock();
        self.do_insert(collection, record)?;
        if self.buffer.is_full(collection) {
            self.flush_locked(collection)?;
        }
        Ok(id)
    }

    pub fn insert_many(&self, collection: &str, records: Vec<Record>) -> Result<Vec<String>> {
        records.into_iter().map(|r| self.insert(collection, r)).collect()
    }

    fn do_update(&self, collection: &str, id: &str, patch: &Patch, upsert: bool) -> Result<bool> {
        self.flush(collection)?;
        let lock = self.collection_lock(collection);
        let _guard = lock.lock();
        let log = self.segment_log(collection);
        let mut records = log.scan(None)?;

        let mut updated: Option<Record> = None;
        for record in records.iter_mut() {
            if record.id() == id {
                apply_patch(record, patch);
                record.set_id(id);
                updated = Some(record.clone());
                break;
            }
        }

        if updated.is_none() && upsert {
            let mut new_record = Record::new();
            new_record.set_id(id);
            new_record.merge(&patch.set_fields());
            records.push(new_record.clone());
            updated = Some(new_record);
        }

        match updated {
            Some(record) => {
                let mut frames = Vec::with_capacity(records.len());
                for r in records.iter_mut() {
                    frames.push(codec::encode(r)?);
                }
                log.rewrite(&frames)?;
                self.index_store.remove_from_index(collection, id)?;
                self.index_store.update_index(collection, &record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns `true` iff a record was modified or upserted. Under an active transaction the
    /// mutation is deferred, so this optimistically returns `true` before the patch is known to
    /// apply — mirroring how `insert` returns a pre-allocated id before the frame is persisted.
    pub fn update(&self, collection: &str, id: &str, patch: Patch, upsert: bool) -> Result<bool> {
        if !self.segment_log(collection).exists() {
            return Err(Error::CollectionNotFound(collection.to_string()));
        }
        let pending = PendingOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch: patch.clone(),
            upsert,
        };
        if self.push_pending_if_active(pending) {
            return Ok(true);
        }
        self.do_update(collection, id, &patch, upsert)
    }

    fn do_delete(&self, collection: &str, id: &str) -> Result<bool> {
        self.flush(collection)?;
        let lock = self.collection_lock(collection);
        let _guard = lock.lock();
        let log = self.segment_log(collection);
        let records = log.scan(None)?;
        let initial_len = records.len();
        let mut kept: Vec<Record> = records.into_iter().filter(|r| r.id() != id).collect();
        if kept.len() == initial_len {
            return Ok(false);
        }
        let mut frames = Vec::with_capacity(kept.len());
        for r in kept.iter_mut() {
            frames.push(codec::encode(r)?);
        }
        log.rewrite(&frames)?;
        self.index_store.remove_from_index(collection, id)?;
        Ok(true)
    }

    pub fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        if !self.segment_log(collection).exists() {
            return Err(Error::CollectionNotFound(collection.to_string()));
        }
        let pending = PendingOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        if self.push_pending_if_active(pending) {
            return Ok(true);
        }
        self.do_delete(collection, id)
    }

    fn do_field_op(&self, collection: &str, op: &FieldOpKind) -> Result<bool> {
        self.flush(collection)?;
        let lock = self.collection_lock(collection);
        let _guard = lock.lock();
        let log = self.segment_log(collection);
        let mut records = log.scan(None)?;

        for record in records.iter_mut() {
            match op {
                FieldOpKind::Add { field, default_value } => {
                    if field != crate::record::ID_FIELD && record.get(field).is_none() {
                        record.set(field.clone(), default_value.clone());
                    }
                }
                FieldOpKind::Remove { field } => {
                    if field != crate::record::ID_FIELD {
                        record.remove(field);
                    }
                }
                FieldOpKind::Rename { old_field, new_field } => {
                    if old_field != crate::record::ID_FIELD && new_field != crate::record::ID_FIELD {
                        if let Some(value) = record.get(old_field).map(str::to_string) {
                            record.remove(old_field);
                            record.set(new_field.clone(), value);
                        }
                    }
                }
            }
        }

        let mut frames = Vec::with_capacity(records.len());
        for r in records.iter_mut() {
            frames.push(codec::encode(r)?);
        }
        log.rewrite(&frames)?;
        for record in &records {
            self.index_store.remove_from_index(collection, record.id())?;
            self.index_store.update_index(collection, record)?;
        }
        Ok(true)
    }

    fn field_op(&self, collection: &str, op: FieldOpKind) -> Result<bool> {
        if !self.segment_log(collection).exists() {
            return Ok(false);
        }
        let pending = PendingOp::FieldOp {
            collection: collection.to_string(),
            op: op.clone(),
        };
        if self.push_pending_if_active(pending) {
            return Ok(true);
        }
        self.do_field_op(collection, &op)
    }

    /// Adds `field` to every record in `collection` that doesn't already carry it, set to
    /// `default_value`. Returns `false` if the collection doesn't exist.
    pub fn add_field(&self, collection: &str, field: &str, default_value: &str) -> Result<bool> {
        self.field_op(
            collection,
            FieldOpKind::Add {
                field: field.to_string(),
                default_value: default_value.to_string(),
            },
        )
    }

    /// Removes `field` from every record in `collection`. Returns `false` if the collection
    /// doesn't exist.
    pub fn remove_field(&self, collection: &str, field: &str) -> Result<bool> {
        self.field_op(collection, FieldOpKind::Remove { field: field.to_string() })
    }

    /// Renames `old_field` to `new_field` on every record in `collection` that carries it.
    /// Returns `false` if the collection doesn't exist.
    pub fn rename_field(&self, collection: &str, old_field: &str, new_field: &str) -> Result<bool> {
        self.field_op(
            collection,
            FieldOpKind::Rename {
                old_field: old_field.to_string(),
                new_field: new_field.to_string(),
            },
        )
    }

    // ---- queries ----

    pub fn find(
        &self,
        collection: &str,
        query: Option<&Query>,
        limit: Option<usize>,
        skip: usize,
        sort: Option<&Sort>,
    ) -> Result<Vec<Record>> {
        if !self.segment_log(collection).exists() {
            return Err(Error::CollectionNotFound(collection.to_string()));
        }
        self.flush(collection)?;
        let log = self.segment_log(collection);

        let equalities = query.map(|q| q.top_level_equalities()).unwrap_or_default();
        let keys: Vec<&str> = equalities.iter().map(|(k, _)| *k).collect();
        let use_index = !equalities.is_empty() && self.index_store.can_use_index(collection, &keys);

        let mut records = if use_index {
            let ids = self.index_store.query_index(collection, &equalities);
            log.scan(Some(&ids))?
        } else {
            log.scan(None)?
        };

        if let Some(q) = query {
            records.retain(|r| query::matches(r, q));
        }
        if let Some(sort) = sort {
            query::sort_records(&mut records, sort);
        }

        let iter = records.into_iter().skip(skip);
        Ok(match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        })
    }

    pub fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        let query = Query::Fields(vec![("_id".to_string(), vec![query::Condition::Eq(id.to_string())])]);
        Ok(!self.find(collection, Some(&query), Some(1), 0, None)?.is_empty())
    }

    pub fn count(&self, collection: &str, query: Option<&Query>) -> Result<usize> {
        match self.find(collection, query, None, 0, None) {
            Ok(records) => Ok(records.len()),
            Err(Error::CollectionNotFound(_)) => Ok(0),
            Err(e) => Err(e),
        }
    }

    pub fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Record>> {
        match self.find(collection, None, None, 0, None) {
            Ok(records) => Ok(aggregate::aggregate(&records, pipeline)),
            Err(Error::CollectionNotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Accumulator, GroupStage};
    use crate::query::Condition;
    use tempfile::tempdir;

    fn engine() -> (tempfile::TempDir, Engine) {
        let dir = tempdir().unwrap();
        let engine = Engine::open(dir.path(), Some(Config::with_buffer_size(2))).unwrap();
        (dir, engine)
    }

    fn record(fields: &[(&str, &str)]) -> Record {
        let mut r = Record::new();
        for (k, v) in fields {
            r.set(*k, *v);
        }
        r
    }

    #[test]
    fn s1_insert_and_query() {
        let (_dir, engine) = engine();
        engine.create_collection("users", None).unwrap();
        let id = engine.insert("users", record(&[("name", "ada"), ("age", "36")])).unwrap();

        let query = Query::Fields(vec![("name".to_string(), vec![Condition::Eq("ada".to_string())])]);
        let found = engine.find("users", Some(&query), None, 0, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), id);
        assert_eq!(found[0].get_or_empty("age"), "36");
    }

    #[test]
    fn s2_indexed_equality_and_in() {
        let (_dir, engine) = engine();
        engine
            .create_collection("items", Some(vec!["sku".to_string()]))
            .unwrap();
        engine.insert("items", record(&[("sku", "A")])).unwrap();
        engine.insert("items", record(&[("sku", "B")])).unwrap();

        let eq = Query::Fields(vec![("sku".to_string(), vec![Condition::Eq("A".to_string())])]);
        let found = engine.find("items", Some(&eq), None, 0, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_or_empty("sku"), "A");

        let in_q = Query::Fields(vec![(
            "sku".to_string(),
            vec![Condition::In(vec!["A".to_string(), "B".to_string()])],
        )]);
        let found = engine.find("items", Some(&in_q), None, 0, None).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn s3_numeric_range() {
        let (_dir, engine) = engine();
        engine.create_collection("prices", None).unwrap();
        engine.insert("prices", record(&[("price", "5")])).unwrap();
        engine.insert("prices", record(&[("price", "15")])).unwrap();
        engine.insert("prices", record(&[("price", "25")])).unwrap();

        let q = Query::Fields(vec![("price".to_string(), vec![Condition::Gt(10.0)])]);
        let found = engine.find("prices", Some(&q), None, 0, None).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn s4_update_with_inc() {
        let (_dir, engine) = engine();
        engine.create_collection("stock", None).unwrap();
        let id = engine.insert("stock", record(&[("stock", "10")])).unwrap();

        let mut incs = BTreeMap::new();
        incs.insert("stock".to_string(), 3.0);
        engine
            .update("stock", &id, Patch::Operators(vec![PatchOp::Inc(incs)]), false)
            .unwrap();

        let q = Query::Fields(vec![("_id".to_string(), vec![Condition::Eq(id.clone())])]);
        let found = engine.find("stock", Some(&q), None, 0, None).unwrap();
        assert_eq!(found[0].get_or_empty("stock").parse::<f64>().unwrap(), 13.0);
    }

    #[test]
    fn s5_transaction_rollback_restores_pre_transaction_state() {
        let (_dir, engine) = engine();
        engine.create_collection("c", None).unwrap();

        engine.begin_transaction().unwrap();
        engine.insert("c", record(&[("a", "1")])).unwrap();
        engine.insert("c", record(&[("a", "2")])).unwrap();
        engine.insert("c", record(&[("a", "3")])).unwrap();
        assert_eq!(engine.count("c", None).unwrap(), 3);

        engine.rollback().unwrap();
        assert_eq!(engine.count("c", None).unwrap(), 0);
    }

    #[test]
    fn s6_aggregation() {
        let (_dir, engine) = engine();
        engine.create_collection("emp", None).unwrap();
        engine.insert("emp", record(&[("dept", "A"), ("salary", "100")])).unwrap();
        engine.insert("emp", record(&[("dept", "A"), ("salary", "200")])).unwrap();
        engine.insert("emp", record(&[("dept", "B"), ("salary", "300")])).unwrap();
        engine.insert("emp", record(&[("dept", "B"), ("salary", "400")])).unwrap();

        let stage = Stage::Group(GroupStage {
            group_field: "dept".to_string(),
            outputs: vec![
                ("total".to_string(), Accumulator::Sum("salary".to_string())),
                ("n".to_string(), Accumulator::Count),
                ("avg".to_string(), Accumulator::Avg("salary".to_string())),
            ],
        });
        let out = engine.aggregate("emp", &[stage]).unwrap();
        assert_eq!(out.len(), 2);
        let a = out.iter().find(|r| r.get_or_empty("_id") == "A").unwrap();
        assert_eq!(a.get_or_empty("total"), "300");
        assert_eq!(a.get_or_empty("n"), "2");
    }

    #[test]
    fn insert_auto_creates_collection() {
        let (_dir, engine) = engine();
        let id = engine.insert("auto", record(&[("k", "v")])).unwrap();
        assert!(engine.exists("auto", &id).unwrap());
    }

    #[test]
    fn count_swallows_missing_collection_to_zero() {
        let (_dir, engine) = engine();
        assert_eq!(engine.count("missing", None).unwrap(), 0);
    }

    #[test]
    fn find_on_missing_collection_errors() {
        let (_dir, engine) = engine();
        let err = engine.find("missing", None, None, 0, None).unwrap_err();
        assert!(matches!(err, Error::CollectionNotFound(_)));
    }

    #[test]
    fn upsert_creates_when_missing() {
        let (_dir, engine) = engine();
        engine.create_collection("c", None).unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), "ada".to_string());
        let did_update = engine
            .update("c", "new-id", Patch::Operators(vec![PatchOp::Set(fields)]), true)
            .unwrap();
        assert!(did_update);
        assert!(engine.exists("c", "new-id").unwrap());
    }

    #[test]
    fn delete_removes_record_and_index_entry() {
        let (_dir, engine) = engine();
        engine
            .create_collection("c", Some(vec!["sku".to_string()]))
            .unwrap();
        let id = engine.insert("c", record(&[("sku", "A")])).unwrap();
        assert!(engine.delete("c", &id).unwrap());
        assert!(!engine.exists("c", &id).unwrap());

        let q = Query::Fields(vec![("sku".to_string(), vec![Condition::Eq("A".to_string())])]);
        assert_eq!(engine.find("c", Some(&q), None, 0, None).unwrap().len(), 0);
    }

    #[test]
    fn update_refreshes_stale_index_postings() {
        let (_dir, engine) = engine();
        engine
            .create_collection("c", Some(vec!["sku".to_string()]))
            .unwrap();
        let id = engine.insert("c", record(&[("sku", "A")])).unwrap();

        let mut fields = BTreeMap::new();
        fields.insert("sku".to_string(), "B".to_string());
        engine
            .update("c", &id, Patch::Operators(vec![PatchOp::Set(fields)]), false)
            .unwrap();

        let stale = Query::Fields(vec![("sku".to_string(), vec![Condition::Eq("A".to_string())])]);
        assert_eq!(engine.find("c", Some(&stale), None, 0, None).unwrap().len(), 0);

        let fresh = Query::Fields(vec![("sku".to_string(), vec![Condition::Eq("B".to_string())])]);
        assert_eq!(engine.find("c", Some(&fresh), None, 0, None).unwrap().len(), 1);
    }

    #[test]
    fn add_field_backfills_only_missing_records() {
        let (_dir, engine) = engine();
        engine.create_collection("c", None).unwrap();
        let with_tier = engine.insert("c", record(&[("tier", "gold")])).unwrap();
        let without_tier = engine.insert("c", record(&[("name", "x")])).unwrap();

        assert!(engine.add_field("c", "tier", "standard").unwrap());

        let q = Query::Fields(vec![("_id".to_string(), vec![Condition::Eq(with_tier.clone())])]);
        assert_eq!(engine.find("c", Some(&q), None, 0, None).unwrap()[0].get_or_empty("tier"), "gold");

        let q = Query::Fields(vec![("_id".to_string(), vec![Condition::Eq(without_tier.clone())])]);
        assert_eq!(
            engine.find("c", Some(&q), None, 0, None).unwrap()[0].get_or_empty("tier"),
            "standard"
        );
    }

    #[test]
    fn remove_field_drops_it_from_every_record() {
        let (_dir, engine) = engine();
        engine.create_collection("c", None).unwrap();
        let id = engine.insert("c", record(&[("temp", "1"), ("name", "x")])).unwrap();

        assert!(engine.remove_field("c", "temp").unwrap());

        let q = Query::Fields(vec![("_id".to_string(), vec![Condition::Eq(id)])]);
        let found = engine.find("c", Some(&q), None, 0, None).unwrap();
        assert_eq!(found[0].get("temp"), None);
        assert_eq!(found[0].get_or_empty("name"), "x");
    }

    #[test]
    fn rename_field_updates_index_postings() {
        let (_dir, engine) = engine();
        engine
            .create_collection("c", Some(vec!["sku".to_string(), "code".to_string()]))
            .unwrap();
        let id = engine.insert("c", record(&[("sku", "A")])).unwrap();

        assert!(engine.rename_field("c", "sku", "code").unwrap());

        let old = Query::Fields(vec![("sku".to_string(), vec![Condition::Eq("A".to_string())])]);
        assert_eq!(engine.find("c", Some(&old), None, 0, None).unwrap().len(), 0);

        let new = Query::Fields(vec![("code".to_string(), vec![Condition::Eq("A".to_string())])]);
        let found = engine.find("c", Some(&new), None, 0, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), id);
    }

    #[test]
    fn field_op_on_missing_collection_returns_false() {
        let (_dir, engine) = engine();
        assert!(!engine.add_field("missing", "f", "v").unwrap());
    }
}
