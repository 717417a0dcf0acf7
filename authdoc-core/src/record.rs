//! Stored documents and canonical records.
//!
//! A [`StoredDocument`] is what a backend hands back: the document key plus its
//! data under storage field names. A [`Record`] is what the framework receives:
//! the key as `id` plus the data under canonical field names, with store-native
//! timestamps normalized.

use bson::{Bson, Document, de::deserialize_from_bson};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    error::AdapterResult,
    naming::FieldMapper,
    predicate::ID_FIELD,
    timestamp::normalize,
};

/// Store-internal field that never belongs to a record.
const RESERVED_NAME_FIELD: &str = "__name__";

/// A document as returned by a store backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// The document key.
    pub key: String,
    /// Document data under storage field names.
    pub data: Document,
}

impl StoredDocument {
    pub fn new(key: impl Into<String>, data: Document) -> Self {
        Self { key: key.into(), data }
    }
}

/// A canonical record: the document key as `id` plus canonical fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Document,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Document) -> Self {
        Self { id: id.into(), fields }
    }

    /// Builds a record from a stored document, or `None` when the document has
    /// no data.
    pub fn materialize(document: StoredDocument, mapper: &FieldMapper) -> Option<Self> {
        if document.data.is_empty() {
            return None;
        }

        let fields = document.data
            .into_iter()
            .filter(|(key, _)| key != RESERVED_NAME_FIELD)
            .map(|(key, value)| (mapper.from_db(&key).to_string(), normalize(value)))
            .collect::<Document>();

        Some(Self { id: document.key, fields })
    }

    /// Returns a field by canonical name; `id` yields the key.
    pub fn get(&self, field: &str) -> Option<Bson> {
        if field == ID_FIELD {
            return Some(Bson::String(self.id.clone()));
        }

        self.fields.get(field).cloned()
    }

    /// Returns a date field as a chrono timestamp.
    pub fn get_datetime(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(field) {
            Some(Bson::DateTime(value)) => Some(value.to_chrono()),
            _ => None,
        }
    }

    /// Keeps `id` plus the listed fields that are present.
    pub fn select(self, fields: &[String]) -> Self {
        if fields.is_empty() {
            return self;
        }

        let selected = self.fields
            .into_iter()
            .filter(|(key, _)| fields.iter().any(|field| field == key))
            .collect::<Document>();

        Self { id: self.id, fields: selected }
    }

    /// Overlays `other` onto this record's fields; `other` wins on shared keys.
    pub fn merged_with(mut self, other: Document) -> Self {
        for (key, value) in other {
            if key != ID_FIELD {
                self.fields.insert(key, value);
            }
        }
        self
    }

    /// Flattens the record into one document with `id` first.
    pub fn into_document(self) -> Document {
        let mut document = Document::new();
        document.insert(ID_FIELD, self.id);
        for (key, value) in self.fields {
            document.insert(key, value);
        }
        document
    }

    /// Deserializes the record into a caller-defined model type.
    pub fn deserialize<T: DeserializeOwned>(self) -> AdapterResult<T> {
        Ok(deserialize_from_bson(Bson::Document(self.into_document()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NamingStrategy;
    use bson::{Timestamp, doc};

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Session {
        id: String,
        user_id: String,
        session_token: String,
    }

    #[test]
    fn empty_documents_are_absent() {
        let mapper = FieldMapper::default();
        assert!(Record::materialize(StoredDocument::new("a", Document::new()), &mapper).is_none());
    }

    #[test]
    fn materialize_maps_names_and_timestamps() {
        let mapper = FieldMapper::new(NamingStrategy::SnakeCase);
        let stored = StoredDocument::new("s1", doc! {
            "user_id": "u1",
            "expiresAt": Bson::Timestamp(Timestamp { time: 60, increment: 0 }),
            "__name__": "sessions/s1",
        });

        let record = Record::materialize(stored, &mapper).unwrap();

        assert_eq!(record.id, "s1");
        assert_eq!(record.get("userId"), Some(Bson::String("u1".into())));
        assert_eq!(record.get("id"), Some(Bson::String("s1".into())));
        assert!(record.fields.get("__name__").is_none());
        assert_eq!(record.get_datetime("expiresAt").unwrap().timestamp(), 60);
    }

    #[test]
    fn select_keeps_id_and_requested_fields() {
        let record = Record::new("u1", doc! { "name": "Ann", "email": "a@x.com" })
            .select(&["email".to_string(), "missing".to_string()]);

        assert_eq!(record.id, "u1");
        assert_eq!(record.fields, doc! { "email": "a@x.com" });
    }

    #[test]
    fn deserializes_into_models() {
        let record = Record::new("s1", doc! { "userId": "u1", "sessionToken": "t" });
        let session: Session = record.deserialize().unwrap();

        assert_eq!(session.id, "s1");
        assert_eq!(session.user_id, "u1");
        assert_eq!(session.session_token, "t");
    }
}
