//! Translation of native queries into MongoDB filter and find options.

use bson::{Bson, Document, doc};
use mongodb::options::FindOptions;

use authdoc_core::{
    error::AdapterError,
    query::{FieldFilter, FilterOp, OrderPath, Query, QueryVisitor, SortDirection},
};

use crate::sanitizer::ValueSanitizer;

pub(crate) const KEY_FIELD: &str = "_id";

/// Translates query filters into a MongoDB filter document.
///
/// `Ne` also requires the field to exist, so a document missing the field never
/// matches, as with every other filter.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    pub(crate) fn filter(query: &Query) -> Result<Document, AdapterError> {
        MongoQueryTranslator.visit_query(query)
    }

    pub(crate) fn find_options(query: &Query) -> FindOptions {
        let mut options = FindOptions::default();

        if let Some(order) = &query.order {
            let direction = match order.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            };
            options.sort = Some(match &order.path {
                // Ties fall back to ascending key order.
                OrderPath::Field(field) => {
                    let field = ValueSanitizer::sanitize_string(field);
                    doc! { field: direction, KEY_FIELD: 1 }
                },
                OrderPath::DocumentKey => doc! { KEY_FIELD: direction },
            });
        }
        options.skip = query.offset.map(|offset| u64::try_from(offset).unwrap_or(u64::MAX));
        // Zero already means no limit to MongoDB.
        options.limit = query.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

        options
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = AdapterError;

    fn visit_and(&mut self, filters: &[FieldFilter]) -> Result<Self::Output, Self::Error> {
        if filters.is_empty() {
            return Ok(Document::new());
        }

        Ok(doc! {
            "$and": filters
                .iter()
                .map(|filter| self.visit_filter(filter))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_field(&mut self, field: &str, op: FilterOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field = ValueSanitizer::sanitize_string(field);

        Ok(doc! {
            field: match op {
                FilterOp::Eq => doc! { "$eq": value },
                FilterOp::Ne => doc! { "$ne": value, "$exists": true },
                FilterOp::In => match value {
                    Bson::Array(_) => doc! { "$in": value },
                    single => doc! { "$in": [single] },
                },
                FilterOp::Gt => doc! { "$gt": value },
                FilterOp::Gte => doc! { "$gte": value },
                FilterOp::Lt => doc! { "$lt": value },
                FilterOp::Lte => doc! { "$lte": value },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_queries_match_everything() {
        assert_eq!(MongoQueryTranslator::filter(&Query::new()).unwrap(), doc! {});
    }

    #[test]
    fn filters_become_a_conjunction() {
        let query = Query::new()
            .filter("user_id", FilterOp::Eq, "u1")
            .filter("role", FilterOp::In, "admin")
            .filter("status", FilterOp::Ne, "banned");

        assert_eq!(MongoQueryTranslator::filter(&query).unwrap(), doc! {
            "$and": [
                { "user_id": { "$eq": "u1" } },
                { "role": { "$in": ["admin"] } },
                { "status": { "$ne": "banned", "$exists": true } },
            ]
        });
    }

    #[test]
    fn ordering_and_pagination_become_find_options() {
        let options = MongoQueryTranslator::find_options(
            &Query::new()
                .order_by_field("createdAt", SortDirection::Desc)
                .offset(2)
                .limit(5)
        );

        assert_eq!(options.sort, Some(doc! { "createdAt": -1, "_id": 1 }));
        assert_eq!(options.skip, Some(2));
        assert_eq!(options.limit, Some(5));

        let options = MongoQueryTranslator::find_options(&Query::new().order_by_key());
        assert_eq!(options.sort, Some(doc! { "_id": 1 }));

        let options = MongoQueryTranslator::find_options(&Query::new().limit(usize::MAX));
        assert_eq!(options.limit, Some(i64::MAX));
    }
}
