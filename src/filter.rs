//! Filter - Predicates over stored documents.
//!
//! A `Filter` is handed to the document store as-is. It can be rendered to a
//! MongoDB-style query document for a real driver, or evaluated directly
//! against a `serde_json::Value` by in-process stores and tests.
//!
//! ## Example
//!
//! ```ignore
//! use entity_repository::{field, Filter};
//!
//! let adults = field("age").gte(18);
//! let named = Filter::and([adults, field("name").exists(true)]);
//!
//! assert_eq!(named.render(), json!({ "$and": [
//!     { "age": { "$gte": 18 } },
//!     { "name": { "$exists": true } },
//! ]}));
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

/// A boolean expression over document fields. Field names may be dotted paths
/// into nested objects (`"address.city"`).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// Start a fluent filter on a field.
pub fn field(name: impl Into<String>) -> FieldFilter {
    FieldFilter { name: name.into() }
}

/// Fluent builder returned by [`field`].
#[derive(Debug, Clone)]
pub struct FieldFilter {
    name: String,
}

impl FieldFilter {
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        Filter::Eq(self.name, value.into())
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter {
        Filter::Ne(self.name, value.into())
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter {
        Filter::Gt(self.name, value.into())
    }

    pub fn gte(self, value: impl Into<Value>) -> Filter {
        Filter::Gte(self.name, value.into())
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter {
        Filter::Lt(self.name, value.into())
    }

    pub fn lte(self, value: impl Into<Value>) -> Filter {
        Filter::Lte(self.name, value.into())
    }

    pub fn is_in<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In(self.name, values.into_iter().map(Into::into).collect())
    }

    pub fn exists(self, exists: bool) -> Filter {
        Filter::Exists(self.name, exists)
    }
}

impl Filter {
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Filter {
        Filter::Or(filters.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Filter {
        Filter::Not(Box::new(filter))
    }

    /// Equality on a field against any serializable value (ids, enums, ...).
    pub fn eq_serialized<T: Serialize>(
        name: impl Into<String>,
        value: &T,
    ) -> Result<Filter, serde_json::Error> {
        Ok(Filter::Eq(name.into(), serde_json::to_value(value)?))
    }

    /// Render as a MongoDB query document.
    pub fn render(&self) -> Value {
        match self {
            Filter::All => Value::Object(Map::new()),
            Filter::Eq(f, v) => json!({ f.as_str(): v }),
            Filter::Ne(f, v) => json!({ f.as_str(): { "$ne": v } }),
            Filter::Gt(f, v) => json!({ f.as_str(): { "$gt": v } }),
            Filter::Gte(f, v) => json!({ f.as_str(): { "$gte": v } }),
            Filter::Lt(f, v) => json!({ f.as_str(): { "$lt": v } }),
            Filter::Lte(f, v) => json!({ f.as_str(): { "$lte": v } }),
            Filter::In(f, vs) => json!({ f.as_str(): { "$in": vs } }),
            Filter::Exists(f, b) => json!({ f.as_str(): { "$exists": b } }),
            Filter::And(fs) => json!({ "$and": fs.iter().map(Filter::render).collect::<Vec<_>>() }),
            Filter::Or(fs) => json!({ "$or": fs.iter().map(Filter::render).collect::<Vec<_>>() }),
            Filter::Not(inner) => json!({ "$nor": [inner.render()] }),
        }
    }

    /// Evaluate against a stored document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(f, v) => values_equal(lookup(document, f).unwrap_or(&Value::Null), v),
            Filter::Ne(f, v) => !values_equal(lookup(document, f).unwrap_or(&Value::Null), v),
            Filter::Gt(f, v) => compare_at(document, f, v) == Some(Ordering::Greater),
            Filter::Gte(f, v) => matches!(
                compare_at(document, f, v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(f, v) => compare_at(document, f, v) == Some(Ordering::Less),
            Filter::Lte(f, v) => matches!(
                compare_at(document, f, v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::In(f, vs) => {
                let actual = lookup(document, f).unwrap_or(&Value::Null);
                vs.iter().any(|v| values_equal(actual, v))
            }
            Filter::Exists(f, b) => lookup(document, f).is_some() == *b,
            Filter::And(fs) => fs.iter().all(|f| f.matches(document)),
            Filter::Or(fs) => fs.iter().any(|f| f.matches(document)),
            Filter::Not(inner) => !inner.matches(document),
        }
    }

    /// Evaluate against an entity by serializing it first. Entities that fail
    /// to serialize never match.
    pub fn matches_entity<T: Serialize>(&self, entity: &T) -> bool {
        serde_json::to_value(entity)
            .map(|document| self.matches(&document))
            .unwrap_or(false)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Resolve a dotted path inside a document.
pub(crate) fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

fn compare_at(document: &Value, path: &str, expected: &Value) -> Option<Ordering> {
    compare_values(lookup(document, path)?, expected)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Compare two values of the same kind. Values of different kinds are not
/// comparable.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order used for sorting: missing and null first, then numbers,
/// strings, objects, arrays, booleans.
pub(crate) fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }

    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => match (a, b) {
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        other => other,
    }
}
