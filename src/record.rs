// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

/// The `_id` field every record carries.
pub const ID_FIELD: &str = "_id";

/// A flat, string-keyed, string-valued record. Always carries `_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn id(&self) -> &str {
        self.fields.get(ID_FIELD).map(String::as_str).unwrap_or("")
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.fields.insert(ID_FIELD.to_string(), id.into());
    }

    /// Returns the field value, or an empty string if absent.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.fields.remove(key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn merge(&mut self, other: &BTreeMap<String, String>) {
        for (k, v) in other {
            if k == ID_FIELD {
                continue;
            }
            self.fields.insert(k.clone(), v.clone());
        }
    }
}

impl From<BTreeMap<String, String>> for Record {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self::from_fields(fields)
    }
}
