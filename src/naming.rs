//! Collection naming.
//!
//! A collection name is derived from the entity type alone: an explicit name
//! declared on the type wins, otherwise the type name is pluralized by a small
//! fixed heuristic. Irregular plurals (`Person` -> `Persons`) are not handled;
//! declare the name explicitly for those.

use std::fmt;

use crate::document::Document;

/// Strategy that turns an entity type into a collection name.
pub trait CollectionNaming: Send + Sync + fmt::Debug {
    /// `declared` is the type's explicit collection name, if any.
    fn collection_name(&self, type_name: &str, declared: Option<&str>) -> String;
}

/// Declared name verbatim, else `type_name + "s"` with trailing `ys` -> `ies`
/// and then trailing `ss` -> `ses`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pluralize;

impl CollectionNaming for Pluralize {
    fn collection_name(&self, type_name: &str, declared: Option<&str>) -> String {
        match declared {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => pluralize(type_name),
        }
    }
}

/// Always the same name, regardless of the entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed(pub String);

impl CollectionNaming for Fixed {
    fn collection_name(&self, _type_name: &str, _declared: Option<&str>) -> String {
        self.0.clone()
    }
}

/// Collection name for `D` under the default [`Pluralize`] strategy.
pub fn resolve_collection_name<D: Document>() -> String {
    Pluralize.collection_name(D::TYPE_NAME, D::COLLECTION)
}

fn pluralize(type_name: &str) -> String {
    let name = format!("{}s", bare_name(type_name));
    let name = replace_end(&name, "ys", "ies");
    replace_end(&name, "ss", "ses")
}

/// Strip a module path (`crate::model::User` -> `User`) and generic arguments.
fn bare_name(type_name: &str) -> &str {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

fn replace_end(source: &str, suffix: &str, replacement: &str) -> String {
    match source.strip_suffix(suffix) {
        Some(stem) => format!("{}{}", stem, replacement),
        None => source.to_string(),
    }
}
