use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::Error as MongoError,
    options::ClientOptions,
};
use tracing::debug;

use authdoc_core::{
    backend::{StoreBackend, StoreBackendBuilder, StoreTransaction},
    error::{AdapterError, AdapterResult},
    query::Query,
    record::StoredDocument,
};

use crate::{
    query::{KEY_FIELD, MongoQueryTranslator},
    sanitizer::ValueSanitizer,
    transaction::MongoTransaction,
};

pub(crate) const TARGET: &str = "authdoc::mongodb";

pub(crate) fn backend_error(error: MongoError) -> AdapterError {
    AdapterError::Backend(error.to_string())
}

/// Stored form of a document: sanitized field names plus the key as `_id`.
pub(crate) fn prepare_document(key: &str, data: Document) -> Document {
    let mut prepared = doc! { KEY_FIELD: key };
    for (field, value) in ValueSanitizer::sanitize_document(data) {
        prepared.insert(field, value);
    }
    prepared
}

/// Inverse of [`prepare_document`].
pub(crate) fn restore_document(mut document: Document) -> AdapterResult<StoredDocument> {
    let key = match document.remove(KEY_FIELD) {
        Some(Bson::String(key)) => key,
        Some(Bson::ObjectId(id)) => id.to_hex(),
        Some(other) => other.to_string(),
        None => return Err(AdapterError::InvalidDocument("document has no _id".to_string())),
    };

    Ok(StoredDocument::new(key, ValueSanitizer::restore_document(document)))
}

pub(crate) fn key_filter(key: &str) -> Document {
    doc! { KEY_FIELD: key }
}

/// MongoDB-backed document store. Document keys are stored as `_id`.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&ValueSanitizer::sanitize_string(collection_name))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    fn generate_key(&self) -> String {
        ObjectId::new().to_hex()
    }

    async fn get_document(
        &self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>> {
        self.get_collection(collection)
            .find_one(key_filter(key))
            .await
            .map_err(backend_error)?
            .map(restore_document)
            .transpose()
    }

    async fn get_documents(
        &self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>> {
        let mut found = self.get_collection(collection)
            .find(doc! { KEY_FIELD: { "$in": keys.to_vec() } })
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(restore_document)
            .collect::<AdapterResult<Vec<_>>>()?;

        Ok(keys
            .iter()
            .map(|key| {
                found
                    .iter()
                    .position(|document| &document.key == key)
                    .map(|index| found.swap_remove(index))
            })
            .collect())
    }

    async fn set_document(
        &self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()> {
        self.get_collection(collection)
            .replace_one(key_filter(key), prepare_document(key, data))
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()> {
        let collection_ref = self.get_collection(collection);

        // `$set` rejects an empty document.
        let matched = if patch.is_empty() {
            collection_ref
                .count_documents(key_filter(key))
                .await
                .map_err(backend_error)?
        } else {
            collection_ref
                .update_one(key_filter(key), doc! { "$set": ValueSanitizer::sanitize_document(patch) })
                .await
                .map_err(backend_error)?
                .matched_count
        };

        if matched == 0 {
            return Err(AdapterError::DocumentNotFound(key.to_string(), collection.to_string()));
        }

        Ok(())
    }

    async fn delete_document(&self, collection: &str, key: &str) -> AdapterResult<()> {
        self.get_collection(collection)
            .delete_one(key_filter(key))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>> {
        self.get_collection(collection)
            .find(MongoQueryTranslator::filter(query)?)
            .with_options(MongoQueryTranslator::find_options(query))
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(restore_document)
            .collect()
    }

    async fn count_documents(&self, collection: &str, query: &Query) -> AdapterResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(query)?)
            .await
            .map_err(backend_error)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn StoreTransaction>> {
        let mut session = self.client
            .start_session()
            .await
            .map_err(backend_error)?;
        session
            .start_transaction()
            .await
            .map_err(backend_error)?;

        debug!(target: TARGET, database = %self.database, "Transaction started");
        Ok(Box::new(MongoTransaction::new(
            self.client.database(&self.database),
            session,
        )))
    }

    async fn shutdown(self) -> AdapterResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> AdapterResult<Self::Backend> {
        if self.database.is_empty() {
            return Err(AdapterError::Initialization("database name is empty".to_string()));
        }

        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| AdapterError::Initialization(e.to_string()))?,
            )
            .map_err(|e| AdapterError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
