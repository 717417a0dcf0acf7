//! Native store queries.
//!
//! A [`Query`] is what a document store can execute directly: a conjunction of
//! field filters, an optional ordering, an offset and a limit. Anything the store
//! cannot express (disjunctions, exclusion lists, suffix and substring matching)
//! never reaches this type; the adapter evaluates those in process.
//!
//! # Query Building
//!
//! ```ignore
//! use authdoc::query::{Query, FilterOp, SortDirection};
//!
//! let query = Query::new()
//!     .filter("status", FilterOp::Eq, "active")
//!     .filter("age", FilterOp::Gte, 18)
//!     .order_by_field("createdAt", SortDirection::Desc)
//!     .limit(10);
//! ```
//!
//! Backends consume a query either by evaluating the filters against stored
//! documents or by translating them into their own filter language, in both cases
//! through a [`QueryVisitor`].

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Comparison operators the store filter language supports natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Field value is one of the listed values.
    In,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
}

/// A single native constraint on a storage field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// The storage field name.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: Bson,
}

/// What a query is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPath {
    /// A storage field.
    Field(String),
    /// The document key, which is store metadata rather than a field.
    DocumentKey,
}

/// Ordering specification for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub path: OrderPath,
    pub direction: SortDirection,
}

/// A query a document store can execute in a single call.
///
/// All filters must hold for a document to match. Offset and limit apply after
/// ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conjunctive field filters.
    pub filters: Vec<FieldFilter>,
    /// Optional ordering.
    pub order: Option<Order>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates an unconstrained query over a whole collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field filter.
    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Bson>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Orders by a storage field.
    pub fn order_by_field(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order = Some(Order {
            path: OrderPath::Field(field.into()),
            direction,
        });
        self
    }

    /// Orders by document key, ascending.
    pub fn order_by_key(mut self) -> Self {
        self.order = Some(Order {
            path: OrderPath::DocumentKey,
            direction: SortDirection::Asc,
        });
        self
    }

    /// Skips the first `offset` matching documents.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns at most `limit` documents.
    /// Caps the number of results. Zero means no limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` when the query has no filters.
    pub fn is_unconstrained(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Walks the filters of a [`Query`], producing a backend-specific output.
///
/// Evaluating backends return `bool`, translating backends return their own
/// filter representation.
pub trait QueryVisitor {
    type Output;
    type Error: Into<AdapterError>;

    fn visit_and(&mut self, filters: &[FieldFilter]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: FilterOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_filter(&mut self, filter: &FieldFilter) -> Result<Self::Output, Self::Error> {
        self.visit_field(&filter.field, filter.op, &filter.value)
    }

    fn visit_query(&mut self, query: &Query) -> Result<Self::Output, Self::Error> {
        self.visit_and(&query.filters)
    }
}
