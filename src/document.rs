//! Documents - Entity types a repository can store.
//!
//! ## Example
//!
//! ```ignore
//! use entity_repository::Document;
//!
//! #[derive(Serialize, Deserialize, Clone, Document)]
//! #[document(collection = "people")]
//! struct Person {
//!     pub id: i64,
//!     pub name: String,
//! }
//! ```
//!
//! The derive is a convenience; implementing the traits by hand is the same
//! thing:
//!
//! ```ignore
//! impl Document for Person {
//!     const TYPE_NAME: &'static str = "Person";
//!     const COLLECTION: Option<&'static str> = Some("people");
//! }
//!
//! impl Identified for Person {
//!     type Id = i64;
//!     fn id(&self) -> i64 { self.id }
//!     fn set_id(&mut self, id: i64) { self.id = id; }
//! }
//! ```

use serde::{de::DeserializeOwned, Serialize};

use crate::identity::Identity;

/// Trait for types that can be stored in a collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Bare type name, pluralized into the collection name unless
    /// `COLLECTION` is set.
    const TYPE_NAME: &'static str;

    /// Explicit collection name. Maps to a collection in MongoDB, a table in
    /// SQL stores, etc.
    const COLLECTION: Option<&'static str> = None;
}

/// A document carrying its own unique identifier.
pub trait Identified: Document {
    /// `i64`/`i32` for sequential ids, `uuid::Uuid` or `String` for random ones.
    type Id: Identity;

    /// Name of the stored field holding the id.
    const ID_FIELD: &'static str = "id";

    fn id(&self) -> Self::Id;

    fn set_id(&mut self, id: Self::Id);
}
