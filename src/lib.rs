// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fdb`: an embeddable, file-based document store.
//!
//! A database is a directory. Each collection is one append-only `.fdb` segment log plus an
//! optional on-disk inverted index; an in-memory write buffer batches inserts before they hit
//! the log. See [`Engine`] for the public surface.

mod aggregate;
mod buffer;
mod codec;
mod config;
mod engine;
mod error;
mod index;
mod metrics;
mod query;
mod record;
mod segment;
mod transaction;

pub use aggregate::{Accumulator, GroupStage, Stage};
pub use config::Config;
pub use engine::{Engine, Patch, PatchOp};
pub use error::{Error, Result};
pub use query::{Condition, Query, Sort};
pub use record::Record;
