mod config;
mod connection;
mod document;
mod error;
mod filter;
mod identity;
mod naming;
#[cfg(feature = "emitter")]
mod observer;
mod paging;
mod registry;
mod repository;
pub mod store;

pub use config::{RepositoryConfig, DEFAULT_MAX_INSERT_ATTEMPTS};
pub use connection::{ConnectionString, Credentials, Host};
pub use document::{Document, Identified};
pub use error::{RepositoryError, WriteError, WriteOperation};
pub use filter::{field, FieldFilter, Filter};
pub use identity::Identity;
pub use naming::{resolve_collection_name, CollectionNaming, Fixed, Pluralize};
#[cfg(feature = "emitter")]
pub use observer::{FailureObservers, WriteFailure};
pub use paging::{PageWindow, PagedResult, Paginate};
pub use registry::ConnectionRegistry;
pub use repository::{EntityRepository, IdentityRepository};

// Derive macro for `Document` (and `Identified` when an id field exists)
pub use entity_repository_macros::Document;

// Re-export the UUID type used for opaque identifiers
pub use uuid::Uuid;
