//! Query model and in-process evaluation.
//!
//! A [`Query`] selects documents from one collection
//! ([`Scope::Collection`]) or from every collection sharing an id anywhere
//! in the tree ([`Scope::Group`]), filters them, orders them, and optionally
//! truncates the result.
//!
//! Evaluation rules, matching the hosted store:
//!
//! - A document missing a filtered or ordered field never matches.
//! - Values only compare within a type (numbers, strings, booleans, nulls);
//!   a range filter against a value of another type does not match.
//! - Ordering across mixed types follows type rank: null, bool, number,
//!   string, then everything else.
//! - Ties after all `order` clauses are broken by document path.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

use crate::document::Document;
use crate::error::{DocError, DocResult};
use crate::path::{CollectionPath, DocumentPath};

/// Which documents a query ranges over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Direct children of one collection.
    Collection(CollectionPath),
    /// Every collection whose last segment equals this id.
    Group(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Returns `true` if `doc` satisfies this filter.
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        let Some(ord) = compare_same_type(actual, &self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ord == Ordering::Equal,
            FilterOp::Lt => ord == Ordering::Less,
            FilterOp::Le => ord != Ordering::Greater,
            FilterOp::Gt => ord == Ordering::Greater,
            FilterOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A filtered, ordered selection of documents.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub scope: Scope,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    /// Query the direct children of `collection`.
    pub fn collection(collection: CollectionPath) -> Self {
        Self::with_scope(Scope::Collection(collection))
    }

    /// Query every collection named `collection_id`, at any depth.
    pub fn group(collection_id: impl Into<String>) -> Self {
        Self::with_scope(Scope::Group(collection_id.into()))
    }

    fn with_scope(scope: Scope) -> Self {
        Self {
            scope,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Shorthand for an equality filter.
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reject queries no backend could evaluate.
    pub fn validate(&self) -> DocResult<()> {
        if let Scope::Group(id) = &self.scope {
            if id.is_empty() || id.contains('/') {
                return Err(DocError::InvalidQuery(format!(
                    "collection group id {id:?} must be a single non-empty segment"
                )));
            }
        }
        if self.limit == Some(0) {
            return Err(DocError::InvalidQuery("limit must be positive".into()));
        }
        for f in &self.filters {
            if f.field.is_empty() {
                return Err(DocError::InvalidQuery("filter field must not be empty".into()));
            }
            if f.op != FilterOp::Eq && !is_rangeable(&f.value) {
                return Err(DocError::InvalidQuery(format!(
                    "range filter {} {} needs a number, string or bool",
                    f.field, f.op
                )));
            }
        }
        if self.order.iter().any(|o| o.field.is_empty()) {
            return Err(DocError::InvalidQuery("order field must not be empty".into()));
        }
        Ok(())
    }

    /// Returns `true` if a document at `path` could belong to the result.
    pub fn in_scope(&self, path: &DocumentPath) -> bool {
        match &self.scope {
            Scope::Collection(collection) => &path.parent() == collection,
            Scope::Group(id) => path.collection_id() == id,
        }
    }

    /// Returns `true` if `doc` belongs to the result, ignoring `limit`.
    pub fn matches(&self, doc: &Document) -> bool {
        self.in_scope(&doc.path)
            && self.filters.iter().all(|f| f.matches(doc))
            && self.order.iter().all(|o| doc.get(&o.field).is_some())
    }

    /// Evaluate the query over a set of candidate documents.
    pub fn run<'a>(&self, docs: impl IntoIterator<Item = &'a Document>) -> Vec<Document> {
        let mut result: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.matches(doc))
            .cloned()
            .collect();
        result.sort_by(|a, b| self.compare(a, b));
        if let Some(limit) = self.limit {
            result.truncate(limit);
        }
        result
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for order in &self.order {
            let ord = match (a.get(&order.field), b.get(&order.field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                _ => Ordering::Equal,
            };
            let ord = match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.path.cmp(&b.path)
    }
}

fn is_rangeable(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::String(_) | Value::Bool(_))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two values of the same type; `None` across types.
fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

/// Total order used for sorting.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    compare_same_type(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b)))
}
