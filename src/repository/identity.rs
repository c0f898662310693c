use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::RepositoryConfig;
use crate::document::Identified;
use crate::error::{RepositoryError, WriteError, WriteOperation};
use crate::filter::Filter;
use crate::identity::Identity;
use crate::registry::ConnectionRegistry;
use crate::store::{IndexSpec, StoreCollection, StoreDatabase};

const PRIMARY_KEY: &str = "_id";

/// Repository for documents with their own identifier.
///
/// Dereferences to [`EntityRepository`](super::EntityRepository) for listing,
/// finding, counting and bulk deletes.
pub struct IdentityRepository<D> {
    entities: super::EntityRepository<D>,
}

impl<D> Clone for IdentityRepository<D> {
    fn clone(&self) -> Self {
        Self {
            entities: self.entities.clone(),
        }
    }
}

impl<D> fmt::Debug for IdentityRepository<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRepository")
            .field("collection", &self.entities.collection.name())
            .finish()
    }
}

impl<D> Deref for IdentityRepository<D> {
    type Target = super::EntityRepository<D>;

    fn deref(&self) -> &Self::Target {
        &self.entities
    }
}

impl<D: Identified> IdentityRepository<D> {
    pub fn connect(
        registry: &ConnectionRegistry,
        config: &RepositoryConfig,
    ) -> Result<Self, RepositoryError> {
        Self::from_entities(super::EntityRepository::connect(registry, config)?)
    }

    pub fn open(database: &dyn StoreDatabase, config: &RepositoryConfig) -> Result<Self, RepositoryError> {
        Self::from_entities(super::EntityRepository::open(database, config)?)
    }

    pub fn with_collection(
        collection: Arc<dyn StoreCollection>,
        config: &RepositoryConfig,
    ) -> Result<Self, RepositoryError> {
        Self::from_entities(super::EntityRepository::with_collection(collection, config)?)
    }

    /// Collisions on insert are detected through a unique index on the id
    /// field; `_id` is unique already.
    fn from_entities(entities: super::EntityRepository<D>) -> Result<Self, RepositoryError> {
        if D::ID_FIELD != PRIMARY_KEY {
            entities
                .collection()
                .create_index(&IndexSpec::unique(D::ID_FIELD))?;
        }
        Ok(Self { entities })
    }

    /// Entity with exactly this id, `None` if there is none.
    pub fn get(&self, id: &D::Id) -> Result<Option<D>, RepositoryError> {
        let filter = Filter::eq_serialized(D::ID_FIELD, id)?;
        self.entities.get_single(&filter)
    }

    /// Insert the entity when its id is unset, replace the stored one
    /// otherwise. Returns the id; a fresh id is also written into `entity`.
    pub fn save(&self, entity: &mut D) -> Result<D::Id, WriteError> {
        if entity.id().is_unset() {
            self.insert(entity)
                .map_err(|err| self.entities.write_failed(WriteOperation::Insert, err))
        } else {
            self.update(entity)
                .map_err(|err| self.entities.write_failed(WriteOperation::Update, err))
        }
    }

    /// [`IdentityRepository::save`], reporting failure as `Identity::sentinel()`
    /// (`-1` for numeric ids, the nil UUID for opaque ones).
    pub fn save_or_sentinel(&self, entity: &mut D) -> D::Id {
        self.save(entity).unwrap_or_else(|_| D::Id::sentinel())
    }

    /// Delete the stored entity with this entity's id. Returns the deleted
    /// count; 0 when it was not stored.
    pub fn delete(&self, entity: &D) -> Result<u64, WriteError> {
        Filter::eq_serialized(D::ID_FIELD, &entity.id())
            .map_err(WriteError::from)
            .and_then(|filter| self.entities.collection().delete_one(&filter).map_err(WriteError::from))
            .map_err(|err| self.entities.write_failed(WriteOperation::Delete, err))
    }

    /// Allocate an id and insert. Losing a race for the id to another writer
    /// shows up as a duplicate key; allocate again and retry.
    fn insert(&self, entity: &mut D) -> Result<D::Id, WriteError> {
        let previous = entity.id();
        let result = self.try_insert(entity);
        if result.is_err() {
            entity.set_id(previous);
        }
        result
    }

    fn try_insert(&self, entity: &mut D) -> Result<D::Id, WriteError> {
        let collection = self.entities.collection();
        let attempts = self.entities.max_insert_attempts();

        for attempt in 1..=attempts {
            let id = D::Id::allocate(collection.as_ref(), D::ID_FIELD)?;
            entity.set_id(id.clone());
            let document = serde_json::to_value(&*entity)?;

            match collection.insert_one(document) {
                Ok(()) => return Ok(id),
                Err(err) if err.is_duplicate_key() => {
                    log::debug!(
                        "id {:?} already taken in {} (attempt {}/{}), retrying",
                        id,
                        collection.name(),
                        attempt,
                        attempts
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(WriteError::RetriesExhausted {
            collection: collection.name().to_string(),
            attempts,
        })
    }

    fn update(&self, entity: &D) -> Result<D::Id, WriteError> {
        let id = entity.id();
        let filter = Filter::eq_serialized(D::ID_FIELD, &id)?;
        let document = serde_json::to_value(entity)?;

        let matched = self.entities.collection().replace_one(&filter, document)?;
        if matched == 0 {
            log::debug!(
                "update of {:?} in {} matched no document",
                id,
                self.entities.collection().name()
            );
        }
        Ok(id)
    }
}
