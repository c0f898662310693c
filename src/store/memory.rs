//! MemoryClient - In-process document store for testing and development.
//!
//! Behaves like a single-node MongoDB for the operations repositories use:
//! documents keep insertion order, `_id` is assigned when absent and is always
//! unique, and unique indexes reject duplicate values with
//! `StoreErrorKind::DuplicateKey`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Cursor, FindOptions, IndexSpec, StoreClient, StoreCollection, StoreDatabase, StoreError};
use crate::filter::{lookup, sort_order, Filter};

const PRIMARY_KEY: &str = "_id";

/// In-memory client. Clone-friendly via Arc; clones see the same databases.
#[derive(Clone, Default)]
pub struct MemoryClient {
    databases: Arc<RwLock<HashMap<String, Arc<MemoryDatabase>>>>,
}

impl MemoryClient {
    /// Create a new client with no databases.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreClient for MemoryClient {
    fn database(&self, name: &str) -> Result<Arc<dyn StoreDatabase>, StoreError> {
        if let Some(database) = self
            .databases
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?
            .get(name)
        {
            return Ok(database.clone());
        }

        let mut databases = self
            .databases
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        let database = databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryDatabase::new(name)));
        Ok(database.clone())
    }
}

pub struct MemoryDatabase {
    name: String,
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Names of the collections created so far.
    pub fn collection_names(&self) -> Vec<String> {
        self.collections
            .read()
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl StoreDatabase for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn collection(&self, name: &str) -> Result<Arc<dyn StoreCollection>, StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)));
        Ok(collection.clone())
    }
}

#[derive(Default)]
struct CollectionState {
    documents: Vec<Value>,
    indexes: Vec<IndexSpec>,
}

impl CollectionState {
    fn unique_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(PRIMARY_KEY).chain(
            self.indexes
                .iter()
                .filter(|index| index.unique)
                .map(|index| index.field.as_str()),
        )
    }

    /// Find a unique field whose value in `document` is already held by
    /// another document. `skip` excludes the document being replaced.
    fn conflict(&self, document: &Value, skip: Option<usize>) -> Option<String> {
        for field in self.unique_fields() {
            let value = lookup(document, field).unwrap_or(&Value::Null);
            let taken = self.documents.iter().enumerate().any(|(position, existing)| {
                Some(position) != skip
                    && lookup(existing, field).unwrap_or(&Value::Null) == value
            });
            if taken {
                return Some(format!("{} = {}", field, value));
            }
        }
        None
    }
}

/// A collection held in memory. Writes are serialized by an `RwLock`, so the
/// unique-index check and the insert happen atomically.
pub struct MemoryCollection {
    name: String,
    state: RwLock<CollectionState>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// Indexes created on this collection, excluding the implicit `_id` index.
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.state
            .read()
            .map(|state| state.indexes.clone())
            .unwrap_or_default()
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, CollectionState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, CollectionState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }
}

impl StoreCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Cursor, StoreError> {
        let state = self.read_state()?;

        let mut matched: Vec<&Value> = state
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .collect();

        if !options.sort.is_empty() {
            // stable: ties keep insertion order
            matched.sort_by(|a, b| {
                options
                    .sort
                    .iter()
                    .map(|key| {
                        let ordering = sort_order(lookup(a, &key.field), lookup(b, &key.field));
                        match key.order {
                            super::SortOrder::Ascending => ordering,
                            super::SortOrder::Descending => ordering.reverse(),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let take = options
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        let documents = matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|document| match &options.projection {
                Some(fields) => project(document, fields),
                None => document.clone(),
            })
            .collect();

        Ok(Cursor::new(documents))
    }

    fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError> {
        let state = self.read_state()?;
        Ok(state
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .count() as u64)
    }

    fn insert_one(&self, mut document: Value) -> Result<(), StoreError> {
        let object = document
            .as_object_mut()
            .ok_or_else(|| StoreError::invalid_document("documents must be JSON objects"))?;
        if !object.contains_key(PRIMARY_KEY) {
            object.insert(
                PRIMARY_KEY.to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }

        let mut state = self.write_state()?;
        if let Some(conflict) = state.conflict(&document, None) {
            return Err(StoreError::duplicate_key(format!(
                "{} already contains {}",
                self.name, conflict
            )));
        }
        state.documents.push(document);
        Ok(())
    }

    fn replace_one(&self, filter: &Filter, mut document: Value) -> Result<u64, StoreError> {
        if !document.is_object() {
            return Err(StoreError::invalid_document("documents must be JSON objects"));
        }

        let mut state = self.write_state()?;
        let Some(position) = state.documents.iter().position(|d| filter.matches(d)) else {
            return Ok(0);
        };

        // the replacement keeps the stored primary key unless it brings its own
        if let (Some(object), Some(primary)) = (
            document.as_object_mut(),
            state.documents[position].get(PRIMARY_KEY).cloned(),
        ) {
            object.entry(PRIMARY_KEY).or_insert(primary);
        }

        if let Some(conflict) = state.conflict(&document, Some(position)) {
            return Err(StoreError::duplicate_key(format!(
                "{} already contains {}",
                self.name, conflict
            )));
        }
        state.documents[position] = document;
        Ok(1)
    }

    fn delete_one(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut state = self.write_state()?;
        match state.documents.iter().position(|d| filter.matches(d)) {
            Some(position) => {
                state.documents.remove(position);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut state = self.write_state()?;
        let before = state.documents.len();
        state.documents.retain(|d| !filter.matches(d));
        Ok((before - state.documents.len()) as u64)
    }

    fn create_index(&self, index: &IndexSpec) -> Result<(), StoreError> {
        if index.field.is_empty() {
            return Err(StoreError::invalid_document("index field must not be empty"));
        }

        let mut state = self.write_state()?;
        if state.indexes.contains(index) {
            return Ok(());
        }

        if index.unique {
            let mut seen: Vec<&Value> = Vec::with_capacity(state.documents.len());
            for document in &state.documents {
                let value = lookup(document, &index.field).unwrap_or(&Value::Null);
                if seen.contains(&value) {
                    return Err(StoreError::duplicate_key(format!(
                        "cannot create unique index on {}.{}: {} appears twice",
                        self.name, index.field, value
                    )));
                }
                seen.push(value);
            }
        }

        state.indexes.push(index.clone());
        Ok(())
    }
}

/// Keep only the given (possibly dotted) fields of a document.
fn project(document: &Value, fields: &[String]) -> Value {
    let mut projected = Map::new();
    for path in fields {
        let Some(value) = lookup(document, path) else {
            continue;
        };

        let mut segments = path.split('.').peekable();
        let mut target = &mut projected;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                target.insert(segment.to_string(), value.clone());
                break;
            }
            let entry = target
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(inner) => target = inner,
                _ => break,
            }
        }
    }
    Value::Object(projected)
}
