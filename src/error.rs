// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::LogicalField;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Every transport in the chain failed. One message per attempt, in order.
    #[error("all transports failed: {}", attempts.join("; "))]
    NetworkError { attempts: Vec<String> },

    #[error("downloaded file {path:?} is an HTML page, not tabular data")]
    AuthenticationWall { path: PathBuf },

    #[error("local storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("only {columns} columns detected; delimiter or encoding guess is likely wrong")]
    SchemaTooNarrow { columns: usize },

    #[error("unparseable dataset (strict: {strict}; permissive: {permissive})")]
    Unparseable { strict: String, permissive: String },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("dataset not loaded yet")]
    NotReady,

    #[error("field `{field}` has no matching column; available columns: {columns:?}")]
    FieldUnsupported {
        field: LogicalField,
        columns: Vec<String>,
    },

    #[error("no records found: {detail}")]
    NotFound { detail: String },
}

impl QueryError {
    /// Stable identifier used by collaborators to pick a response class.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::NotReady => "not_ready",
            QueryError::FieldUnsupported { .. } => "field_unsupported",
            QueryError::NotFound { .. } => "not_found",
        }
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        QueryError::NotFound {
            detail: detail.into(),
        }
    }
}

/// Why a load attempt left the dataset absent. Never fatal to the process.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
}
