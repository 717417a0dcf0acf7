//! Framework-side predicates and their execution semantics.
//!
//! The authentication framework describes what it wants with an ordered list of
//! [`Predicate`]s over canonical field names. Each predicate carries an
//! [`Operator`], and each operator has exactly one [`ExecutionClass`]: it is either
//! compiled into a native store filter or evaluated in process against
//! materialized records. [`Predicate::execution_class`] is the only place that
//! decision is made; every executor consumes it.
//!
//! # Example
//!
//! ```ignore
//! use authdoc::predicate::Where;
//!
//! let predicates = vec![
//!     Where::eq("status", "active"),
//!     Where::gte("age", 18),
//!     Where::ends_with("email", "@example.com").or(),
//! ];
//! ```

use std::{fmt, str::FromStr};

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AdapterError, AdapterResult},
    query::{FieldFilter, FilterOp, SortDirection},
    value::{as_list, as_text, compare_values, values_equal},
};

/// The canonical name of the identifier field. It is document metadata (the
/// store key), never a stored attribute.
pub const ID_FIELD: &str = "id";

/// Upper bound appended to a prefix to turn `startsWith` into a range.
const PREFIX_SENTINEL: char = '\u{f8ff}';

/// Predicate operators understood by the adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    #[default]
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    In,
    #[serde(alias = "not_in")]
    NotIn,
    #[serde(alias = "array-contains")]
    Contains,
    #[serde(alias = "starts-with", alias = "starts_with")]
    StartsWith,
    #[serde(alias = "ends-with", alias = "ends_with")]
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Where a predicate is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionClass {
    /// Compiled into the store query.
    Native,
    /// Evaluated in process after documents are fetched.
    ClientSide,
}

impl Operator {
    /// Operators the store filter language cannot express are client-side only.
    pub fn execution_class(&self) -> ExecutionClass {
        match self {
            Operator::NotIn | Operator::EndsWith | Operator::Contains => ExecutionClass::ClientSide,
            _ => ExecutionClass::Native,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
        }
    }

    /// Compiles a native operator into store filters on `field`.
    pub fn native_filters(&self, field: &str, value: &Bson) -> AdapterResult<Vec<FieldFilter>> {
        let filter = |op, value: Bson| FieldFilter {
            field: field.to_string(),
            op,
            value,
        };

        Ok(match self {
            Operator::Eq => vec![filter(FilterOp::Eq, value.clone())],
            Operator::Ne => vec![filter(FilterOp::Ne, value.clone())],
            Operator::In => vec![filter(
                FilterOp::In,
                Bson::Array(as_list(value).into_iter().cloned().collect()),
            )],
            Operator::Gt => vec![filter(FilterOp::Gt, value.clone())],
            Operator::Gte => vec![filter(FilterOp::Gte, value.clone())],
            Operator::Lt => vec![filter(FilterOp::Lt, value.clone())],
            Operator::Lte => vec![filter(FilterOp::Lte, value.clone())],
            Operator::StartsWith => {
                let prefix = value
                    .as_str()
                    .ok_or_else(|| AdapterError::InvalidPredicate(
                        format!("startsWith on {field} requires a string value")
                    ))?;

                vec![
                    filter(FilterOp::Gte, Bson::String(prefix.to_string())),
                    filter(FilterOp::Lt, Bson::String(format!("{prefix}{PREFIX_SENTINEL}"))),
                ]
            },
            Operator::NotIn | Operator::EndsWith | Operator::Contains => {
                return Err(AdapterError::InvalidPredicate(
                    format!("{} cannot be compiled into a store query", self.as_str())
                ));
            },
        })
    }

    /// Evaluates the operator against a field value taken from a record.
    ///
    /// A missing field matches only `notIn`.
    pub fn matches(&self, actual: Option<&Bson>, expected: &Bson) -> bool {
        let Some(actual) = actual else {
            return matches!(self, Operator::NotIn);
        };

        match self {
            Operator::Eq => values_equal(actual, expected),
            Operator::Ne => !values_equal(actual, expected),
            Operator::In => as_list(expected)
                .into_iter()
                .any(|item| values_equal(actual, item)),
            Operator::NotIn => !as_list(expected)
                .into_iter()
                .any(|item| values_equal(actual, item)),
            Operator::Contains => match actual {
                Bson::Array(items) => items.iter().any(|item| values_equal(item, expected)),
                other => match (as_text(other), as_text(expected)) {
                    (Some(haystack), Some(needle)) => haystack.contains(needle.as_ref()),
                    _ => false,
                },
            },
            Operator::StartsWith => match (as_text(actual), as_text(expected)) {
                (Some(value), Some(prefix)) => value.starts_with(prefix.as_ref()),
                _ => false,
            },
            Operator::EndsWith => match (as_text(actual), as_text(expected)) {
                (Some(value), Some(suffix)) => value.ends_with(suffix.as_ref()),
                _ => false,
            },
            Operator::Gt => compare_values(actual, expected).is_some_and(|o| o.is_gt()),
            Operator::Gte => compare_values(actual, expected).is_some_and(|o| o.is_ge()),
            Operator::Lt => compare_values(actual, expected).is_some_and(|o| o.is_lt()),
            Operator::Lte => compare_values(actual, expected).is_some_and(|o| o.is_le()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" | "==" => Operator::Eq,
            "ne" | "!=" => Operator::Ne,
            "in" => Operator::In,
            "notIn" | "not_in" => Operator::NotIn,
            "contains" | "array-contains" => Operator::Contains,
            "startsWith" | "starts-with" | "starts_with" => Operator::StartsWith,
            "endsWith" | "ends-with" | "ends_with" => Operator::EndsWith,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            other => return Err(AdapterError::InvalidPredicate(format!("unknown operator {other}"))),
        })
    }
}

/// How a predicate joins the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    #[default]
    And,
    Or,
}

/// One condition of a framework `where` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Canonical field name.
    pub field: String,
    #[serde(default)]
    pub operator: Operator,
    pub value: Bson,
    #[serde(default)]
    pub connector: Connector,
}

impl Predicate {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Bson>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            connector: Connector::And,
        }
    }

    /// Marks this predicate as starting a new OR group.
    pub fn or(mut self) -> Self {
        self.connector = Connector::Or;
        self
    }

    pub fn is_identifier(&self) -> bool {
        self.field == ID_FIELD
    }

    /// Identifier predicates are always client-side: the document key is
    /// metadata and cannot be filtered like a field.
    pub fn execution_class(&self) -> ExecutionClass {
        if self.is_identifier() {
            ExecutionClass::ClientSide
        } else {
            self.operator.execution_class()
        }
    }

    /// `true` for exactly `id eq <value>`.
    pub fn is_identifier_equality(&self) -> bool {
        self.is_identifier() && self.operator == Operator::Eq
    }
}

/// Returns the key when the predicate set is exactly one identifier equality.
pub fn single_identifier(predicates: &[Predicate]) -> Option<&Bson> {
    match predicates {
        [only] if only.is_identifier_equality() => Some(&only.value),
        _ => None,
    }
}

/// Converts an identifier value into a store key.
pub fn key_from_value(value: &Bson) -> AdapterResult<String> {
    match value {
        Bson::String(key) => Ok(key.clone()),
        Bson::Int32(key) => Ok(key.to_string()),
        Bson::Int64(key) => Ok(key.to_string()),
        other => Err(AdapterError::InvalidPredicate(format!("{other} is not a valid document key"))),
    }
}

/// Sort specification over a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

/// Helper for constructing predicates.
pub struct Where;

impl Where {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::Ne, value)
    }

    pub fn is_in(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::In, value)
    }

    pub fn not_in(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::NotIn, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::Contains, value)
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::StartsWith, value)
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::EndsWith, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Predicate {
        Predicate::new(field, Operator::Lte, value)
    }
}
