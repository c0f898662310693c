mod document;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Document)]
// ============================================================================

/// Derive macro for storing a struct in a document collection.
///
/// Implements `entity_repository::Document` and, when the struct has an id
/// field, `entity_repository::Identified`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Document)]
/// #[document(collection = "people")]
/// pub struct Person {
///     #[document(id)]
///     pub person_id: i64,
///     pub name: String,
/// }
/// ```
///
/// The macro supports:
/// - `#[document(collection = "...")]`: explicit collection name, otherwise the
///   repository pluralizes the type name (`Category` -> `Categories`)
/// - `#[document(id)]`: marks the id field, otherwise a field named `id` is used
/// - `#[serde(rename = "...")]` on the id field: used as the stored id field name
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    document::derive_document(input)
}
