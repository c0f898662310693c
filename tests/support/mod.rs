//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use entity_repository::store::memory::MemoryCollection;
use entity_repository::store::{
    Cursor, FindOptions, IndexSpec, StoreCollection, StoreError,
};
use entity_repository::{Document, Filter, Uuid};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[ctor::ctor]
fn init() {
    colog::init();
}

/// Numeric ids, collection name pluralized from the type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub rank: u32,
}

impl Category {
    pub fn new(name: &str, rank: u32) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            rank,
        }
    }
}

/// Opaque ids stored as `_id`, explicit collection name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "people")]
pub struct Person {
    #[document(id)]
    #[serde(rename = "_id")]
    pub key: Uuid,
    pub name: String,
    pub age: u32,
}

impl Person {
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            key: Uuid::nil(),
            name: name.to_string(),
            age,
        }
    }
}

/// No identifier at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
pub struct Address {
    pub street: String,
    pub city: String,
}

impl Address {
    pub fn new(street: &str, city: &str) -> Self {
        Self {
            street: street.to_string(),
            city: city.to_string(),
        }
    }
}

/// Wraps a collection and injects failures on demand.
pub struct FaultyCollection {
    inner: Arc<dyn StoreCollection>,
    lose_inserts: AtomicUsize,
    always_collide: AtomicBool,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    insert_calls: AtomicUsize,
}

impl FaultyCollection {
    pub fn new(name: &str) -> Arc<Self> {
        Self::wrap(Arc::new(MemoryCollection::new(name)))
    }

    pub fn wrap(inner: Arc<dyn StoreCollection>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            lose_inserts: AtomicUsize::new(0),
            always_collide: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            insert_calls: AtomicUsize::new(0),
        })
    }

    /// The next `n` inserts lose a race: a competing writer stores a document
    /// with the same values first.
    pub fn lose_next_inserts(&self, n: usize) {
        self.lose_inserts.store(n, Ordering::SeqCst);
    }

    pub fn always_collide(&self, on: bool) {
        self.always_collide.store(on, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::backend("write refused"));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::connection("connection reset"));
        }
        Ok(())
    }
}

impl StoreCollection for FaultyCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Cursor, StoreError> {
        self.check_read()?;
        self.inner.find(filter, options)
    }

    fn count_documents(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.check_read()?;
        self.inner.count_documents(filter)
    }

    fn insert_one(&self, document: Value) -> Result<(), StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        if self.always_collide.load(Ordering::SeqCst) {
            return Err(StoreError::duplicate_key("always taken"));
        }

        let lose = self
            .lose_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            let mut competitor = document.clone();
            if let Some(object) = competitor.as_object_mut() {
                object.insert("competitor".to_string(), Value::Bool(true));
            }
            self.inner.insert_one(competitor)?;
        }

        self.inner.insert_one(document)
    }

    fn replace_one(&self, filter: &Filter, document: Value) -> Result<u64, StoreError> {
        self.check_write()?;
        self.inner.replace_one(filter, document)
    }

    fn delete_one(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.check_write()?;
        self.inner.delete_one(filter)
    }

    fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.check_write()?;
        self.inner.delete_many(filter)
    }

    fn create_index(&self, index: &IndexSpec) -> Result<(), StoreError> {
        self.inner.create_index(index)
    }
}
