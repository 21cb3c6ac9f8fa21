// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-collection inverted index over a fixed set of fields: `field -> value -> record ids`,
//! cached in memory and persisted to disk.

use crate::record::Record;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// `field -> (value -> posting list)`.
type CollectionIndex = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// On-disk shape of a single collection's index, serialised with `bincode`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexSnapshot {
    fields: CollectionIndex,
}

/// In-memory cache of every collection's index, persisted under `<root>/indexes/<collection>.idx`.
pub struct IndexStore {
    indexes_dir: PathBuf,
    cache: RwLock<HashMap<String, CollectionIndex>>,
}

impl IndexStore {
    pub fn open(indexes_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let indexes_dir = indexes_dir.into();
        std::fs::create_dir_all(&indexes_dir)?;
        Ok(Self {
            indexes_dir,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn index_path(&self, collection: &str) -> PathBuf {
        self.indexes_dir.join(format!("{collection}.idx"))
    }

    /// Replaces any prior index definition for `collection` with a fresh, empty one over `fields`.
    pub fn create_index(&self, collection: &str, fields: &[String]) -> std::io::Result<()> {
        let index: CollectionIndex = fields.iter().cloned().map(|f| (f, BTreeMap::new())).collect();
        self.cache.write().insert(collection.to_string(), index.clone());
        self.save(collection, &index)
    }

    pub fn has_index(&self, collection: &str) -> bool {
        if self.cache.read().contains_key(collection) {
            return true;
        }
        self.index_path(collection).exists()
    }

    /// Indexes every indexed field of `record`. Never removes stale postings on its own — callers
    /// that are re-indexing a modified record must call `remove_from_index` first.
    pub fn update_index(&self, collection: &str, record: &Record) -> std::io::Result<()> {
        let mut index = match self.load(collection)? {
            Some(i) => i,
            None => return Ok(()),
        };
        let id = record.id().to_string();
        for (field, postings) in index.iter_mut() {
            let value = record.get_or_empty(field).to_string();
            let ids = postings.entry(value).or_default();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
        }
        self.cache.write().insert(collection.to_string(), index.clone());
        self.save(collection, &index)
    }

    /// Removes `record_id` from every posting list, dropping now-empty value entries.
    pub fn remove_from_index(&self, collection: &str, record_id: &str) -> std::io::Result<()> {
        let mut index = match self.load(collection)? {
            Some(i) => i,
            None => return Ok(()),
        };
        for postings in index.values_mut() {
            postings.retain(|_, ids| {
                ids.retain(|id| id != record_id);
                !ids.is_empty()
            });
        }
        self.cache.write().insert(collection.to_string(), index.clone());
        self.save(collection, &index)
    }

    pub fn clear_index(&self, collection: &str) -> std::io::Result<()> {
        let mut index = match self.load(collection)? {
            Some(i) => i,
            None => return Ok(()),
        };
        for postings in index.values_mut() {
            postings.clear();
        }
        self.cache.write().insert(collection.to_string(), index.clone());
        self.save(collection, &index)
    }

    pub fn drop_index(&self, collection: &str) -> std::io::Result<()> {
        self.cache.write().remove(collection);
        let path = self.index_path(collection);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// True iff an index exists and at least one top-level query key names an indexed field.
    pub fn can_use_index(&self, collection: &str, query_keys: &[&str]) -> bool {
        let index = match self.load(collection) {
            Ok(Some(i)) => i,
            _ => return false,
        };
        query_keys.iter().any(|k| index.contains_key(*k))
    }

    /// Intersects posting lists for every query key that names an indexed field with an
    /// equality (scalar) value.
    pub fn query_index(&self, collection: &str, equalities: &[(&str, &str)]) -> HashSet<String> {
        let index = match self.load(collection) {
            Ok(Some(i)) => i,
            _ => return HashSet::new(),
        };
        let mut result: Option<HashSet<String>> = None;
        for (key, value) in equalities {
            if let Some(postings) = index.get(*key) {
                let ids: HashSet<String> = postings
                    .get(*value)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .collect();
                result = Some(match result {
                    Some(acc) => acc.intersection(&ids).cloned().collect(),
                    None => ids,
                });
            }
        }
        result.unwrap_or_default()
    }

    fn load(&self, collection: &str) -> std::io::Result<Option<CollectionIndex>> {
        if let Some(index) = self.cache.read().get(collection).cloned() {
            return Ok(Some(index));
        }
        let path = self.index_path(collection);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let snapshot: IndexSnapshot = match bincode::deserialize(&bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(collection, error = %e, "failed to decode index, treating as absent");
                return Ok(None);
            }
        };
        self.cache
            .write()
            .insert(collection.to_string(), snapshot.fields.clone());
        Ok(Some(snapshot.fields))
    }

    fn save(&self, collection: &str, index: &CollectionIndex) -> std::io::Result<()> {
        let snapshot = IndexSnapshot { fields: index.clone() };
        let bytes = bincode::serialize(&snapshot)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(self.index_path(collection), bytes)
    }

    /// Deep snapshot of the whole in-memory cache, for transaction rollback.
    pub fn snapshot_state(&self) -> HashMap<String, CollectionIndex> {
        self.cache.read().clone()
    }

    pub fn restore_state(&self, state: HashMap<String, CollectionIndex>) {
        *self.cache.write() = state;
    }

    pub fn index_path_for(&self, collection: &str) -> PathBuf {
        self.index_path(collection)
    }
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("indexes_dir", &self.indexes_dir)
            .finish()
    }
}
