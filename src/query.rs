// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filter operators and multi-key sort over [`Record`]s.
//!
//! Sort direction is applied independently per field (ascending/descending sort keys don't
//! interact), not by reversing the whole ordering whenever any field is descending. See
//! DESIGN.md for the rationale.

use crate::record::Record;
use regex::Regex;

/// A single filter condition against one field.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Scalar equality: `str(record[key]) == str(condition)`.
    Eq(String),
    Gt(f64),
    Lt(f64),
    In(Vec<String>),
    Regex(String),
}

/// A full query: either a flat map of field -> condition, or a boolean combinator.
#[derive(Debug, Clone)]
pub enum Query {
    /// `{ field: condition, ... }` — every entry must hold (implicit AND across fields).
    Fields(Vec<(String, Vec<Condition>)>),
    Or(Vec<Query>),
    And(Vec<Query>),
}

impl Query {
    /// Top-level equality clauses usable by the Index Store's `query_index`: scalar `Eq` only,
    /// one level deep (nested `$or`/`$and` clauses are never index-assisted).
    pub fn top_level_equalities(&self) -> Vec<(&str, &str)> {
        match self {
            Query::Fields(entries) => entries
                .iter()
                .filter_map(|(k, conds)| match conds.as_slice() {
                    [Condition::Eq(v)] => Some((k.as_str(), v.as_str())),
                    _ => None,
                })
                .collect(),
            Query::Or(_) | Query::And(_) => Vec::new(),
        }
    }
}

/// Evaluates `query` against `record`.
pub fn matches(record: &Record, query: &Query) -> bool {
    match query {
        Query::Fields(entries) => entries.iter().all(|(key, conditions)| {
            conditions.iter().all(|c| eval_condition(record, key, c))
        }),
        Query::Or(subs) => subs.iter().any(|q| matches(record, q)),
        Query::And(subs) => subs.iter().all(|q| matches(record, q)),
    }
}

fn eval_condition(record: &Record, key: &str, condition: &Condition) -> bool {
    let value = record.get_or_empty(key);
    match condition {
        Condition::Eq(expected) => value == expected,
        Condition::Gt(threshold) => parse_numeric(value).map(|n| n > *threshold).unwrap_or(false),
        Condition::Lt(threshold) => parse_numeric(value).map(|n| n < *threshold).unwrap_or(false),
        Condition::In(options) => options.iter().any(|o| o == value),
        Condition::Regex(pattern) => match Regex::new(&format!("^(?:{pattern})")) {
            Ok(re) => re.is_match(value),
            Err(e) => {
                tracing::warn!(pattern, error = %e, "invalid $regex pattern, treating as non-match");
                false
            }
        },
    }
}

fn parse_numeric(value: &str) -> Option<f64> {
    if value.is_empty() {
        Some(0.0)
    } else {
        value.parse::<f64>().ok()
    }
}

/// Sort direction: `+1` ascending, `-1` descending.
pub type Sort = Vec<(String, i8)>;

/// Stable multi-key sort, direction applied independently per field.
pub fn sort_records(records: &mut [Record], sort: &Sort) {
    records.sort_by(|a, b| {
        for (field, direction) in sort {
            let av = a.get_or_empty(field);
            let bv = b.get_or_empty(field);
            let ord = av.cmp(bv);
            let ord = if *direction < 0 { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
}
