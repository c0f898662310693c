//! Store - The document-store capability repositories are built on.
//!
//! A driver exposes databases, databases expose named collections, and
//! collections execute finds and writes over `serde_json::Value` documents.
//! Every handle must be safe to share across threads; repositories clone the
//! `Arc`s freely.

mod error;
pub mod memory;
mod options;

use std::sync::Arc;

use serde_json::Value;

use crate::filter::Filter;

pub use error::{StoreError, StoreErrorKind};
pub use options::{FindOptions, IndexSpec, SortKey, SortOrder};

/// Entry point of a driver: one client per connection target.
pub trait StoreClient: Send + Sync {
    fn database(&self, name: &str) -> Result<Arc<dyn StoreDatabase>, StoreError>;
}

/// A named database holding collections.
pub trait StoreDatabase: Send + Sync {
    fn name(&self) -> &str;

    /// Get a collection handle, creating the collection if needed.
    fn collection(&self, name: &str) -> Result<Arc<dyn StoreCollection>, StoreError>;
}

/// A named, schemaless set of documents.
pub trait StoreCollection: Send + Sync {
    fn name(&self) -> &str;

    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Cursor, StoreError>;

    fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError>;

    /// Insert one document. Fails with `StoreErrorKind::DuplicateKey` when a
    /// unique index already holds one of its values.
    fn insert_one(&self, document: Value) -> Result<(), StoreError>;

    /// Replace the first document matching `filter`. Returns the matched count.
    fn replace_one(&self, filter: &Filter, document: Value) -> Result<u64, StoreError>;

    /// Returns the deleted count.
    fn delete_one(&self, filter: &Filter) -> Result<u64, StoreError>;

    /// Returns the deleted count.
    fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError>;

    /// Create an index unless an identical one exists.
    fn create_index(&self, index: &IndexSpec) -> Result<(), StoreError>;
}

/// Documents produced by a find, in store order.
#[derive(Debug, Default)]
pub struct Cursor {
    documents: std::vec::IntoIter<Value>,
}

impl Cursor {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: documents.into_iter(),
        }
    }
}

impl Iterator for Cursor {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.documents.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.documents.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}
