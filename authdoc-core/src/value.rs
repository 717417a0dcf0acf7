//! Comparison semantics shared by in-process filtering and in-memory stores.
//!
//! BSON values are wrapped in [`Comparable`], which normalizes all numeric types
//! to `f64` so that an `Int32` stored by one writer equals an `Int64` or `Double`
//! supplied by another.

use std::{borrow::Cow, cmp::Ordering, collections::HashMap};

use bson::{Bson, DateTime};

/// Type-erased, comparable representation of BSON values.
#[derive(Debug)]
pub enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other BSON type. Equal only to an identical value, never ordered.
    Opaque(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            Bson::Undefined => Comparable::Null,
            other => Comparable::Opaque(other),
        }
    }
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::DateTime(_) => 3,
            Comparable::String(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Map(_) => 6,
            Comparable::Opaque(_) => 7,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Opaque(a), Comparable::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Returns `true` when two BSON values are equal under [`Comparable`] semantics.
pub fn values_equal(left: &Bson, right: &Bson) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

/// Orders two BSON values, or `None` when they are not comparable.
pub fn compare_values(left: &Bson, right: &Bson) -> Option<Ordering> {
    Comparable::from(left).partial_cmp(&Comparable::from(right))
}

/// Orders two optional values for sorting.
///
/// A total order: values of different kinds are ranked by kind, missing values
/// sort last, and arrays, maps and other BSON types tie within their kind.
pub fn sort_order(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    match (left.map(Comparable::from), right.map(Comparable::from)) {
        (Some(left), Some(right)) => match (&left, &right) {
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            _ => left
                .rank()
                .cmp(&right.rank())
                .then_with(|| left.partial_cmp(&right).unwrap_or(Ordering::Equal)),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Renders scalar values as text for prefix/suffix/substring matching.
pub fn as_text(value: &Bson) -> Option<Cow<'_, str>> {
    match value {
        Bson::String(s) => Some(Cow::Borrowed(s.as_str())),
        Bson::Int32(v) => Some(Cow::Owned(v.to_string())),
        Bson::Int64(v) => Some(Cow::Owned(v.to_string())),
        Bson::Double(v) => Some(Cow::Owned(v.to_string())),
        Bson::Boolean(v) => Some(Cow::Owned(v.to_string())),
        _ => None,
    }
}

/// Interprets a membership operand: arrays are used as-is, scalars as a single item.
pub fn as_list(value: &Bson) -> Vec<&Bson> {
    match value {
        Bson::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_widths() {
        assert!(values_equal(&Bson::Int32(18), &Bson::Int64(18)));
        assert!(values_equal(&Bson::Int64(2), &Bson::Double(2.0)));
        assert_eq!(compare_values(&Bson::Int32(17), &Bson::Double(18.5)), Some(Ordering::Less));
    }

    #[test]
    fn mixed_types_are_incomparable() {
        assert_eq!(compare_values(&Bson::String("1".into()), &Bson::Int32(1)), None);
        assert!(!values_equal(&Bson::String("1".into()), &Bson::Int32(1)));
    }

    #[test]
    fn other_bson_types_equal_only_themselves() {
        let first = Bson::ObjectId(bson::oid::ObjectId::new());
        let second = Bson::ObjectId(bson::oid::ObjectId::new());
        let binary = Bson::Binary(bson::Binary {
            subtype: bson::spec::BinarySubtype::Generic,
            bytes: vec![1, 2],
        });

        assert!(values_equal(&first, &first));
        assert!(!values_equal(&first, &second));
        assert!(!values_equal(&first, &Bson::Null));
        assert!(!values_equal(&binary, &Bson::Null));
        assert_eq!(compare_values(&first, &second), None);
        assert_eq!(sort_order(Some(&first), Some(&Bson::Null)), Ordering::Greater);
    }

    #[test]
    fn sort_order_is_total() {
        let one = Bson::Int32(1);
        let two = Bson::Double(2.0);
        let text = Bson::String("a".into());

        assert_eq!(sort_order(Some(&one), Some(&two)), Ordering::Less);
        assert_eq!(sort_order(Some(&one), None), Ordering::Less);
        assert_eq!(sort_order(None, Some(&one)), Ordering::Greater);
        assert_eq!(sort_order(None, None), Ordering::Equal);
        assert_eq!(sort_order(Some(&text), Some(&two)), Ordering::Greater);
    }

    #[test]
    fn scalars_become_single_item_lists() {
        let scalar = Bson::String("a".into());
        assert_eq!(as_list(&scalar).len(), 1);

        let list = Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)]);
        assert_eq!(as_list(&list).len(), 2);
    }
}
