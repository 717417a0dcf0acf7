//! Conversion of store-native timestamps into portable dates.

use bson::{Bson, DateTime, Document};

/// Recursively replaces every store-native timestamp with a generic date.
///
/// Arrays and plain documents are walked; every other value, including values
/// that carry nested documents of their own (JavaScript code with scope, DB
/// pointers), is returned unchanged.
pub fn normalize(value: Bson) -> Bson {
    match value {
        Bson::Timestamp(ts) => Bson::DateTime(DateTime::from_millis(i64::from(ts.time) * 1000)),
        Bson::Array(items) => Bson::Array(
            items
                .into_iter()
                .map(normalize)
                .collect()
        ),
        Bson::Document(doc) => Bson::Document(normalize_document(doc)),
        other => other,
    }
}

/// Applies [`normalize`] to every value of a document.
pub fn normalize_document(document: Document) -> Document {
    document
        .into_iter()
        .map(|(key, value)| (key, normalize(value)))
        .collect()
}
