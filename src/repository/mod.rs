//! Repositories - Typed CRUD over one collection.
//!
//! `EntityRepository<D>` covers listing, counting, finding and bulk deletes
//! for any `Document`. `IdentityRepository<D>` adds id lookup, save and
//! delete for documents carrying their own identifier: sequential numbers
//! (`i64`, `i32`) or random UUIDs.
//!
//! Reads return `Err(RepositoryError)` when the store fails. Writes return
//! `Err(WriteError)` and also notify the repository's write-failure
//! listeners; `IdentityRepository::save_or_sentinel` turns that into a
//! sentinel id for callers that only check return values.
//!
//! ## Example
//!
//! ```ignore
//! let registry = ConnectionRegistry::in_memory();
//! let config = RepositoryConfig::new("mongodb://localhost/shop");
//! let products = IdentityRepository::<Product>::connect(&registry, &config)?;
//!
//! let mut product = Product::new("Lamp");
//! let id = products.save(&mut product)?;
//! let page = products.get_paged(1, 20)?;
//! ```

#[cfg(feature = "async")]
mod asynchronous;
mod entity;
mod identity;

pub use entity::EntityRepository;
pub use identity::IdentityRepository;
