use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Failure of a read, or of building a repository. Reads fail loudly: the
/// caller always gets this back as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    Store(StoreError),
    /// A stored document could not be decoded into the entity type.
    Serde(String),
    InvalidConnectionString(String),
    /// The background task running a blocking call did not complete.
    Interrupted(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::Store(err) => write!(f, "{}", err),
            RepositoryError::Serde(message) => write!(f, "document decode error: {}", message),
            RepositoryError::InvalidConnectionString(message) => {
                write!(f, "invalid connection string: {}", message)
            }
            RepositoryError::Interrupted(message) => {
                write!(f, "repository task interrupted: {}", message)
            }
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Store(err)
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serde(err.to_string())
    }
}

/// Failure of a write. Writes fail softly: the error is returned as a value
/// and reported to the repository's write-failure listeners.
///
/// Duplicate-identifier collisions on insert are retried and never show up
/// here unless the retries run out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteError {
    Store(StoreError),
    /// The entity could not be encoded as a document.
    Serde(String),
    RetriesExhausted {
        collection: String,
        attempts: u32,
    },
    /// The background task running a blocking call did not complete.
    Interrupted(String),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Store(err) => write!(f, "{}", err),
            WriteError::Serde(message) => write!(f, "document encode error: {}", message),
            WriteError::RetriesExhausted {
                collection,
                attempts,
            } => write!(
                f,
                "insert into {} kept colliding on the identifier ({} attempts)",
                collection, attempts
            ),
            WriteError::Interrupted(message) => {
                write!(f, "repository task interrupted: {}", message)
            }
        }
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriteError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for WriteError {
    fn from(err: StoreError) -> Self {
        WriteError::Store(err)
    }
}

impl From<serde_json::Error> for WriteError {
    fn from(err: serde_json::Error) -> Self {
        WriteError::Serde(err.to_string())
    }
}

/// The write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOperation {
    Insert,
    Update,
    Delete,
    DeleteMany,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteOperation::Insert => "insert",
            WriteOperation::Update => "update",
            WriteOperation::Delete => "delete",
            WriteOperation::DeleteMany => "delete many",
        };
        f.write_str(name)
    }
}
