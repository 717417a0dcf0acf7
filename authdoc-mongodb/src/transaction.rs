use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{
    ClientSession, Collection as MongoCollection, Database,
    error::{Error as MongoError, TRANSIENT_TRANSACTION_ERROR},
};
use tracing::debug;

use authdoc_core::{
    backend::StoreTransaction,
    error::{AdapterError, AdapterResult},
    query::Query,
    record::StoredDocument,
};

use crate::{
    query::MongoQueryTranslator,
    sanitizer::ValueSanitizer,
    store::{TARGET, backend_error, key_filter, prepare_document, restore_document},
};

/// Transient transaction errors mean another writer got there first.
fn transaction_error(error: MongoError) -> AdapterError {
    if error.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        AdapterError::TransactionConflict(error.to_string())
    } else {
        backend_error(error)
    }
}

/// A multi-document transaction bound to a client session.
pub(crate) struct MongoTransaction {
    database: Database,
    session: ClientSession,
}

impl MongoTransaction {
    pub(crate) fn new(database: Database, session: ClientSession) -> Self {
        Self { database, session }
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.database
            .collection(&ValueSanitizer::sanitize_string(collection_name))
    }
}

#[async_trait]
impl StoreTransaction for MongoTransaction {
    async fn get_document(
        &mut self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>> {
        self.get_collection(collection)
            .find_one(key_filter(key))
            .session(&mut self.session)
            .await
            .map_err(transaction_error)?
            .map(restore_document)
            .transpose()
    }

    async fn query_documents(
        &mut self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>> {
        let mut cursor = self.get_collection(collection)
            .find(MongoQueryTranslator::filter(query)?)
            .with_options(MongoQueryTranslator::find_options(query))
            .session(&mut self.session)
            .await
            .map_err(transaction_error)?;

        cursor
            .stream(&mut self.session)
            .try_collect::<Vec<Document>>()
            .await
            .map_err(transaction_error)?
            .into_iter()
            .map(restore_document)
            .collect()
    }

    async fn set_document(
        &mut self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()> {
        self.get_collection(collection)
            .replace_one(key_filter(key), prepare_document(key, data))
            .upsert(true)
            .session(&mut self.session)
            .await
            .map_err(transaction_error)?;

        Ok(())
    }

    async fn update_document(
        &mut self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()> {
        let collection_ref = self.get_collection(collection);

        let matched = if patch.is_empty() {
            collection_ref
                .count_documents(key_filter(key))
                .session(&mut self.session)
                .await
                .map_err(transaction_error)?
        } else {
            collection_ref
                .update_one(key_filter(key), doc! { "$set": ValueSanitizer::sanitize_document(patch) })
                .session(&mut self.session)
                .await
                .map_err(transaction_error)?
                .matched_count
        };

        if matched == 0 {
            return Err(AdapterError::DocumentNotFound(key.to_string(), collection.to_string()));
        }

        Ok(())
    }

    async fn delete_document(&mut self, collection: &str, key: &str) -> AdapterResult<()> {
        self.get_collection(collection)
            .delete_one(key_filter(key))
            .session(&mut self.session)
            .await
            .map_err(transaction_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let Self { database, mut session } = *self;
        session
            .commit_transaction()
            .await
            .map_err(transaction_error)?;

        debug!(target: TARGET, database = %database.name(), "Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        let Self { database, mut session } = *self;
        session
            .abort_transaction()
            .await
            .map_err(backend_error)?;

        debug!(target: TARGET, database = %database.name(), "Transaction rolled back");
        Ok(())
    }
}
