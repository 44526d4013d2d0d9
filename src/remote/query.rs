//! Live query descriptors.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Collection;

use super::RawDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Describes which documents a repository subscribes to and where its
/// adds are written.
///
/// ```
/// use optimistic_repository::{Direction, Query};
///
/// let query = Query::path("users/u1/todos")
///     .where_eq("done", false)
///     .order_by("due", Direction::Asc)
///     .limit(20);
/// assert_eq!(query.collection_path(), "users/u1/todos");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    path: String,
    #[serde(default)]
    filters: Vec<Filter>,
    #[serde(default)]
    order_by: Option<OrderBy>,
    #[serde(default)]
    limit: Option<usize>,
}

impl Query {
    /// Query every document of the collection at `path`.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Query the default collection of `T`.
    pub fn collection<T: Collection>() -> Self {
        Self::path(T::COLLECTION)
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn collection_path(&self) -> &str {
        &self.path
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Whether `document` passes every filter.
    pub fn matches(&self, document: &RawDocument) -> bool {
        self.filters
            .iter()
            .all(|filter| document.data.get(&filter.field) == Some(&filter.value))
    }

    /// Filter, order and limit `documents` the way a remote store evaluates
    /// this query. Ties keep their input order.
    pub fn evaluate<'a, I>(&self, documents: I) -> Vec<RawDocument>
    where
        I: IntoIterator<Item = &'a RawDocument>,
    {
        let mut results: Vec<RawDocument> = documents
            .into_iter()
            .filter(|doc| self.matches(doc))
            .cloned()
            .collect();

        if let Some(order) = &self.order_by {
            results.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            results.truncate(limit);
        }

        results
    }
}

/// Missing < null < bool < number < string; arrays and objects compare equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
