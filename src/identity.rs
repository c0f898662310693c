//! Identity kinds and how new identifiers are allocated.

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::filter::Filter;
use crate::store::{FindOptions, StoreCollection, StoreError};

/// An identifier type a repository knows how to assign.
pub trait Identity:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// True when the entity has not been stored yet.
    fn is_unset(&self) -> bool;

    /// Value returned by sentinel-style writes when they fail.
    fn sentinel() -> Self;

    /// Pick the identifier for the next insert into `collection`.
    fn allocate(collection: &dyn StoreCollection, id_field: &str) -> Result<Self, StoreError>;
}

/// Highest numeric id currently stored, 0 when the collection is empty.
fn current_max(collection: &dyn StoreCollection, id_field: &str) -> Result<i64, StoreError> {
    let options = FindOptions::new()
        .project([id_field])
        .sort_descending(id_field)
        .limit(1);

    let max = collection
        .find(&Filter::All, &options)?
        .next()
        .and_then(|document| crate::filter::lookup(&document, id_field).and_then(Value::as_i64))
        .unwrap_or(0);
    Ok(max.max(0))
}

impl Identity for i64 {
    fn is_unset(&self) -> bool {
        *self <= 0
    }

    fn sentinel() -> Self {
        -1
    }

    fn allocate(collection: &dyn StoreCollection, id_field: &str) -> Result<Self, StoreError> {
        let max = current_max(collection, id_field)?;
        max.checked_add(1)
            .ok_or_else(|| StoreError::backend(format!("{} ids exhausted", collection.name())))
    }
}

impl Identity for i32 {
    fn is_unset(&self) -> bool {
        *self <= 0
    }

    fn sentinel() -> Self {
        -1
    }

    fn allocate(collection: &dyn StoreCollection, id_field: &str) -> Result<Self, StoreError> {
        let max = current_max(collection, id_field)?;
        i32::try_from(max.saturating_add(1))
            .map_err(|_| StoreError::backend(format!("{} ids exhausted", collection.name())))
    }
}

impl Identity for Uuid {
    fn is_unset(&self) -> bool {
        self.is_nil()
    }

    fn sentinel() -> Self {
        Uuid::nil()
    }

    fn allocate(_collection: &dyn StoreCollection, _id_field: &str) -> Result<Self, StoreError> {
        Ok(Uuid::new_v4())
    }
}

/// Opaque text ids: a fresh hyphenated UUID per insert.
impl Identity for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }

    fn sentinel() -> Self {
        String::new()
    }

    fn allocate(_collection: &dyn StoreCollection, _id_field: &str) -> Result<Self, StoreError> {
        Ok(Uuid::new_v4().to_string())
    }
}
