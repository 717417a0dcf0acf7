//! Native query evaluation for in-memory document filtering.
//!
//! Filters follow the document store's native semantics: a filter on a field
//! the document does not have never matches, numbers compare across widths, and
//! `In` against an array field matches when any element is listed.

use bson::{Bson, Document};

use authdoc_core::{
    error::{AdapterError, AdapterResult},
    query::{FieldFilter, FilterOp, Query, QueryVisitor},
    value::{as_list, compare_values, values_equal},
};

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, query: &Query) -> AdapterResult<bool> {
        self.visit_query(query)
    }

    /// Returns `true` when the document satisfies every filter of `query`.
    pub fn matches(document: &'a Document, query: &Query) -> bool {
        DocumentEvaluator::new(document)
            .evaluate(query)
            .unwrap_or(false)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = AdapterError;

    fn visit_and(&mut self, filters: &[FieldFilter]) -> Result<Self::Output, Self::Error> {
        for filter in filters {
            if !self.visit_filter(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_field(&mut self, field: &str, op: FilterOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.document.get(field) else {
            return Ok(false);
        };

        Ok(match op {
            FilterOp::Eq => values_equal(field_value, value),
            FilterOp::Ne => !values_equal(field_value, value),
            FilterOp::In => {
                let listed = as_list(value);
                match field_value {
                    Bson::Array(items) => items
                        .iter()
                        .any(|item| listed.iter().any(|candidate| values_equal(item, candidate))),
                    single => listed
                        .iter()
                        .any(|candidate| values_equal(single, candidate)),
                }
            },
            FilterOp::Gt => compare_values(field_value, value).is_some_and(|o| o.is_gt()),
            FilterOp::Gte => compare_values(field_value, value).is_some_and(|o| o.is_ge()),
            FilterOp::Lt => compare_values(field_value, value).is_some_and(|o| o.is_lt()),
            FilterOp::Lte => compare_values(field_value, value).is_some_and(|o| o.is_le()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{bson, doc};

    #[test]
    fn filters_are_conjunctive() {
        let document = doc! { "age": 21, "status": "active" };

        let query = Query::new()
            .filter("age", FilterOp::Gte, 18_i64)
            .filter("status", FilterOp::Eq, "active");
        assert!(DocumentEvaluator::matches(&document, &query));

        let query = query.filter("status", FilterOp::Ne, "active");
        assert!(!DocumentEvaluator::matches(&document, &query));
    }

    #[test]
    fn missing_fields_never_match() {
        let document = doc! { "name": "Ann" };
        assert!(!DocumentEvaluator::matches(&document, &Query::new().filter("email", FilterOp::Ne, "x")));
        assert!(DocumentEvaluator::matches(&document, &Query::new()));
    }

    #[test]
    fn membership_accepts_array_fields() {
        let document = doc! { "roles": ["a", "b"], "role": "b" };

        assert!(DocumentEvaluator::matches(&document, &Query::new().filter("roles", FilterOp::In, bson!(["b", "c"]))));
        assert!(DocumentEvaluator::matches(&document, &Query::new().filter("role", FilterOp::In, bson!(["b"]))));
        assert!(!DocumentEvaluator::matches(&document, &Query::new().filter("role", FilterOp::In, bson!(["c"]))));
    }

    #[test]
    fn prefix_ranges_match_like_starts_with() {
        let query = Query::new()
            .filter("name", FilterOp::Gte, "ann")
            .filter("name", FilterOp::Lt, "ann\u{f8ff}");

        assert!(DocumentEvaluator::matches(&doc! { "name": "anna" }, &query));
        assert!(!DocumentEvaluator::matches(&doc! { "name": "banana" }, &query));
    }
}
