use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a document-store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreErrorKind {
    /// A unique index rejected the write.
    DuplicateKey,
    /// The store could not be reached.
    Connection,
    /// The document was not acceptable to the store (not an object, bad index spec).
    InvalidDocument,
    /// Anything else the driver reports.
    Backend,
}

/// Error reported by a document-store driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::DuplicateKey, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Connection, message)
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::InvalidDocument, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Backend, message)
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.kind == StoreErrorKind::DuplicateKey
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StoreErrorKind::DuplicateKey => write!(f, "duplicate key: {}", self.message),
            StoreErrorKind::Connection => write!(f, "store connection error: {}", self.message),
            StoreErrorKind::InvalidDocument => write!(f, "invalid document: {}", self.message),
            StoreErrorKind::Backend => write!(f, "store error: {}", self.message),
        }
    }
}

impl std::error::Error for StoreError {}
