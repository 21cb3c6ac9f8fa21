// Copyright 2019-2026 fdb contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// Database error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("transaction error: {0}")]
    TransactionError(String),
    #[error("record encoding error: {0}")]
    RecordEncodingError(String),
    #[error(transparent)]
    StorageError(#[from] std::io::Error),
    #[error("invalid argument: {0}")]
    ValueError(String),
}

impl From<Error> for String {
    fn from(e: Error) -> Self {
        e.to_string()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
