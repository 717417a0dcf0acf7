//! Field name sanitization for MongoDB compatibility.
//!
//! MongoDB restricts field names: dots address nested fields and a leading
//! dollar sign marks an operator. Field names are escaped on the way in and
//! restored on the way out; values are stored untouched.

use bson::{Bson, Document};

/// Escapes and restores document field names.
///
/// MongoDB does not allow field names (document keys) to contain:
/// - Dots (`.`) - used for nested field access in queries
/// - Dollar signs (`$`) - used for operators in queries
/// - Null bytes (`\0`) - field name terminators
pub(crate) struct ValueSanitizer;

impl ValueSanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Escapes the field names of a document, recursing into nested documents
    /// and arrays.
    pub(crate) fn sanitize_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::sanitize_string(&key), Self::sanitize_value(value)))
            .collect()
    }

    fn sanitize_value(value: Bson) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(Self::sanitize_document(document)),
            Bson::Array(items) => Bson::Array(items.into_iter().map(Self::sanitize_value).collect()),
            other => other,
        }
    }

    pub(crate) fn sanitize_string(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    /// Inverse of [`ValueSanitizer::sanitize_document`].
    pub(crate) fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| (Self::restore_string(&key), Self::restore_value(value)))
            .collect()
    }

    fn restore_value(value: Bson) -> Bson {
        match value {
            Bson::Document(document) => Bson::Document(Self::restore_document(document)),
            Bson::Array(items) => Bson::Array(items.into_iter().map(Self::restore_value).collect()),
            other => other,
        }
    }

    pub(crate) fn restore_string(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn only_field_names_are_escaped() {
        let document = doc! {
            "profile.url": "https://x.com/a.b",
            "meta": { "$kind": "user" },
            "list": [{ "a.b": 1 }],
        };

        let sanitized = ValueSanitizer::sanitize_document(document.clone());
        assert_eq!(sanitized, doc! {
            "profile__dot__url": "https://x.com/a.b",
            "meta": { "__dollar__kind": "user" },
            "list": [{ "a__dot__b": 1 }],
        });

        assert_eq!(ValueSanitizer::restore_document(sanitized), document);
    }
}
