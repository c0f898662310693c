use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::config::RepositoryConfig;
use crate::connection::ConnectionString;
use crate::document::Document;
use crate::error::{RepositoryError, WriteError, WriteOperation};
use crate::filter::Filter;
#[cfg(feature = "emitter")]
use crate::observer::{FailureObservers, WriteFailure};
use crate::paging::{PageWindow, PagedResult};
use crate::registry::ConnectionRegistry;
use crate::store::{FindOptions, StoreCollection, StoreDatabase, StoreError};

/// Generic repository over the collection holding `D`.
///
/// Clones share the collection handle and the write-failure listeners.
pub struct EntityRepository<D> {
    pub(super) collection: Arc<dyn StoreCollection>,
    max_insert_attempts: u32,
    #[cfg(feature = "emitter")]
    observers: FailureObservers,
    _marker: PhantomData<fn() -> D>,
}

impl<D> Clone for EntityRepository<D> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            max_insert_attempts: self.max_insert_attempts,
            #[cfg(feature = "emitter")]
            observers: self.observers.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D> fmt::Debug for EntityRepository<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRepository")
            .field("collection", &self.collection.name())
            .finish()
    }
}

impl<D: Document> EntityRepository<D> {
    /// Connect through `registry` using `config.connection_string`.
    pub fn connect(
        registry: &ConnectionRegistry,
        config: &RepositoryConfig,
    ) -> Result<Self, RepositoryError> {
        let connection = ConnectionString::parse(&config.connection_string)?;
        let client = registry.client(&connection)?;
        let database = client.database(&connection.database)?;
        Self::open(database.as_ref(), config)
    }

    /// Open `D`'s collection in `database`.
    pub fn open(database: &dyn StoreDatabase, config: &RepositoryConfig) -> Result<Self, RepositoryError> {
        let name = config.collection_name::<D>();
        let collection = database.collection(&name)?;
        Self::with_collection(collection, config)
    }

    /// Wrap an existing collection handle.
    pub fn with_collection(
        collection: Arc<dyn StoreCollection>,
        config: &RepositoryConfig,
    ) -> Result<Self, RepositoryError> {
        for index in &config.indexes {
            log::debug!("ensuring index {:?} on {}", index, collection.name());
            collection.create_index(index)?;
        }

        Ok(Self {
            collection,
            max_insert_attempts: config.max_insert_attempts.max(1),
            #[cfg(feature = "emitter")]
            observers: FailureObservers::new(),
            _marker: PhantomData,
        })
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    pub fn collection(&self) -> &Arc<dyn StoreCollection> {
        &self.collection
    }

    /// Every entity when `limit == 0`, otherwise page `page` (1-based) of
    /// `limit` entities. Store order; no sort is applied.
    pub fn get_all(&self, limit: u64, page: u64) -> Result<Vec<D>, RepositoryError> {
        self.find_by(&Filter::All, limit, page)
    }

    pub fn count(&self) -> Result<u64, RepositoryError> {
        self.count_where(&Filter::All)
    }

    pub fn count_where(&self, filter: &Filter) -> Result<u64, RepositoryError> {
        self.collection
            .count_documents(filter)
            .map_err(|err| self.read_failed("count", err))
    }

    /// First entity matching `filter`, `None` when nothing matches.
    pub fn get_single(&self, filter: &Filter) -> Result<Option<D>, RepositoryError> {
        let options = FindOptions::new().limit(1);
        let mut cursor = self
            .collection
            .find(filter, &options)
            .map_err(|err| self.read_failed("find", err))?;
        cursor.next().map(decode::<D>).transpose()
    }

    /// Entities matching `filter`, windowed like [`EntityRepository::get_all`].
    pub fn find_by(&self, filter: &Filter, limit: u64, page: u64) -> Result<Vec<D>, RepositoryError> {
        self.query(filter, PageWindow::new(page, limit))
    }

    /// Page `page` of all entities with its page metadata. `page_size == 0`
    /// returns everything as a single page.
    pub fn get_paged(&self, page: u64, page_size: u64) -> Result<PagedResult<D>, RepositoryError> {
        self.find_paged(&Filter::All, page, page_size)
    }

    pub fn find_paged(
        &self,
        filter: &Filter,
        page: u64,
        page_size: u64,
    ) -> Result<PagedResult<D>, RepositoryError> {
        let window = PageWindow::new(page, page_size);
        let row_count = self.count_where(filter)?;
        let results = self.query(filter, window)?;
        Ok(PagedResult::new(window, row_count, results))
    }

    /// Delete every entity matching `filter`. Returns how many were deleted;
    /// matching nothing is not an error.
    pub fn delete_where(&self, filter: &Filter) -> Result<u64, WriteError> {
        self.collection
            .delete_many(filter)
            .map_err(|err| self.write_failed(WriteOperation::DeleteMany, err.into()))
    }

    /// Register a listener for failed writes on this repository and its clones.
    #[cfg(feature = "emitter")]
    pub fn on_write_failure<F>(&self, listener: F) -> String
    where
        F: Fn(WriteFailure) + Send + Sync + 'static,
    {
        self.observers.on(listener)
    }

    #[cfg(feature = "emitter")]
    pub fn remove_write_failure_listener(&self, id: &str) -> bool {
        self.observers.remove(id)
    }

    pub(crate) fn max_insert_attempts(&self) -> u32 {
        self.max_insert_attempts
    }

    fn query(&self, filter: &Filter, window: PageWindow) -> Result<Vec<D>, RepositoryError> {
        let mut options = FindOptions::new().skip(window.skip());
        if let Some(take) = window.take() {
            options = options.limit(take);
        }

        self.collection
            .find(filter, &options)
            .map_err(|err| self.read_failed("find", err))?
            .map(decode::<D>)
            .collect()
    }

    fn read_failed(&self, operation: &str, err: StoreError) -> RepositoryError {
        log::error!("{} on {} failed: {}", operation, self.collection.name(), err);
        err.into()
    }

    /// Log a write failure and hand it to the listeners.
    pub(crate) fn write_failed(&self, operation: WriteOperation, err: WriteError) -> WriteError {
        log::warn!("{} on {} failed: {}", operation, self.collection.name(), err);
        #[cfg(feature = "emitter")]
        self.observers.notify(self.collection.name(), operation, &err);
        err
    }
}

fn decode<D: Document>(document: Value) -> Result<D, RepositoryError> {
    Ok(serde_json::from_value(document)?)
}
