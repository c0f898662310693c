//! Query composition passed to `StoreCollection::find`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction for a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

/// Projection, sort, skip and limit for a find.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Fields to keep. `None` returns whole documents.
    pub projection: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    /// `None` means no limit.
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort_ascending(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            order: SortOrder::Ascending,
        });
        self
    }

    pub fn sort_descending(mut self, field: impl Into<String>) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            order: SortOrder::Descending,
        });
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the sort keys as a MongoDB sort document (`{ field: 1 | -1 }`).
    pub fn render_sort(&self) -> Value {
        let mut sort = serde_json::Map::new();
        for key in &self.sort {
            let direction = match key.order {
                SortOrder::Ascending => 1,
                SortOrder::Descending => -1,
            };
            sort.insert(key.field.clone(), Value::from(direction));
        }
        Value::Object(sort)
    }
}

/// An index the repository makes sure exists when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub field: String,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
        }
    }

    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: true,
        }
    }
}
