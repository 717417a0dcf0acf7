//! Uniform store access for the executors.
//!
//! The find, count and mutation executors run both directly against a backend
//! and inside a transaction. [`StoreAccess`] is the seam between them: it is
//! implemented for any borrowed [`StoreBackend`] and for [`TransactionAccess`].

use async_trait::async_trait;
use bson::Document;

use crate::{
    backend::{StoreBackend, StoreTransaction},
    error::AdapterResult,
    query::Query,
    record::StoredDocument,
};

#[async_trait]
pub trait StoreAccess: Send {
    fn generate_key(&self) -> String;

    /// Whether a read issued after a write observes that write.
    fn reads_own_writes(&self) -> bool {
        true
    }

    async fn get(&mut self, collection: &str, key: &str) -> AdapterResult<Option<StoredDocument>>;

    async fn get_many(
        &mut self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>>;

    async fn query(&mut self, collection: &str, query: &Query) -> AdapterResult<Vec<StoredDocument>>;

    async fn count(&mut self, collection: &str, query: &Query) -> AdapterResult<u64>;

    async fn set(&mut self, collection: &str, key: &str, data: Document) -> AdapterResult<()>;

    async fn update(&mut self, collection: &str, key: &str, patch: Document) -> AdapterResult<()>;

    async fn delete(&mut self, collection: &str, key: &str) -> AdapterResult<()>;
}

#[async_trait]
impl<'a, B> StoreAccess for &'a B
where
    B: StoreBackend + ?Sized,
{
    fn generate_key(&self) -> String {
        (**self).generate_key()
    }

    async fn get(&mut self, collection: &str, key: &str) -> AdapterResult<Option<StoredDocument>> {
        self.get_document(collection, key).await
    }

    async fn get_many(
        &mut self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>> {
        self.get_documents(collection, keys).await
    }

    async fn query(&mut self, collection: &str, query: &Query) -> AdapterResult<Vec<StoredDocument>> {
        self.query_documents(collection, query).await
    }

    async fn count(&mut self, collection: &str, query: &Query) -> AdapterResult<u64> {
        self.count_documents(collection, query).await
    }

    async fn set(&mut self, collection: &str, key: &str, data: Document) -> AdapterResult<()> {
        self.set_document(collection, key, data).await
    }

    async fn update(&mut self, collection: &str, key: &str, patch: Document) -> AdapterResult<()> {
        self.update_document(collection, key, patch).await
    }

    async fn delete(&mut self, collection: &str, key: &str) -> AdapterResult<()> {
        self.delete_document(collection, key).await
    }
}

/// An open store transaction plus the backend that generates its keys.
pub struct TransactionAccess<'a> {
    transaction: Box<dyn StoreTransaction>,
    backend: &'a dyn StoreBackend,
}

impl<'a> TransactionAccess<'a> {
    pub fn new(transaction: Box<dyn StoreTransaction>, backend: &'a dyn StoreBackend) -> Self {
        Self { transaction, backend }
    }

    pub async fn commit(self) -> AdapterResult<()> {
        self.transaction.commit().await
    }

    pub async fn rollback(self) -> AdapterResult<()> {
        self.transaction.rollback().await
    }
}

#[async_trait]
impl StoreAccess for TransactionAccess<'_> {
    fn generate_key(&self) -> String {
        self.backend.generate_key()
    }

    /// Transactional writes are buffered until commit.
    fn reads_own_writes(&self) -> bool {
        false
    }

    async fn get(&mut self, collection: &str, key: &str) -> AdapterResult<Option<StoredDocument>> {
        self.transaction.get_document(collection, key).await
    }

    async fn get_many(
        &mut self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>> {
        let mut documents = Vec::with_capacity(keys.len());
        for key in keys {
            documents.push(self.transaction.get_document(collection, key).await?);
        }
        Ok(documents)
    }

    async fn query(&mut self, collection: &str, query: &Query) -> AdapterResult<Vec<StoredDocument>> {
        self.transaction.query_documents(collection, query).await
    }

    async fn count(&mut self, collection: &str, query: &Query) -> AdapterResult<u64> {
        let mut query = query.clone();
        query.offset = None;
        query.limit = None;

        Ok(self.transaction.query_documents(collection, &query).await?.len() as u64)
    }

    async fn set(&mut self, collection: &str, key: &str, data: Document) -> AdapterResult<()> {
        self.transaction.set_document(collection, key, data).await
    }

    async fn update(&mut self, collection: &str, key: &str, patch: Document) -> AdapterResult<()> {
        self.transaction.update_document(collection, key, patch).await
    }

    async fn delete(&mut self, collection: &str, key: &str) -> AdapterResult<()> {
        self.transaction.delete_document(collection, key).await
    }
}
