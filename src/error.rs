// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use crate::models::RecordId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no document with id {id} in '{collection}'")]
    NotFound {
        collection: &'static str,
        id: RecordId,
    },
    #[error("store unavailable: {0}")]
    Connectivity(String),
    #[error("corrupt document in '{collection}': {reason}")]
    Corrupt {
        collection: &'static str,
        reason: String,
    },
    #[error("unusable search in '{collection}': {reason}")]
    Query {
        collection: &'static str,
        reason: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Connectivity(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Connectivity(format!("store task aborted: {err}"))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Rejections raised before any store call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("category '{0}' does not exist")]
    UnknownCategory(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("page {page} is out of range (1..={last})")]
    PageOutOfRange { page: usize, last: usize },
}

/// Outcome of a mutation issued through an editor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
