//! Document store abstraction consumed by the adapter.
//!
//! The adapter needs very little from a store: key lookups, conjunctive queries
//! with ordering and pagination, aggregate counts, single-document writes and a
//! transaction primitive. [`StoreBackend`] captures exactly that, so any document
//! database with those capabilities can back the authentication framework.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreTransaction`]: An open transaction on a backend
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use authdoc::backend::StoreBackend;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! backend.set_document("users", "u1", doc! { "name": "Alice" }).await?;
//! let stored = backend.get_document("users", "u1").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::Document;
use futures::future::try_join_all;
use uuid::Uuid;

use crate::{error::AdapterResult, query::Query, record::StoredDocument};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from
/// multiple async tasks.
///
/// # Error Handling
///
/// Backends report I/O and protocol failures as
/// [`AdapterError::Backend`](crate::error::AdapterError::Backend). The adapter
/// passes them to the caller unchanged.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Produces a fresh store-assigned document key.
    fn generate_key(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Retrieves a document by key, or `None` when it does not exist.
    async fn get_document(
        &self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>>;

    /// Retrieves several documents by key, preserving request order.
    ///
    /// The default implementation issues one concurrent lookup per key.
    async fn get_documents(
        &self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>> {
        try_join_all(
            keys
                .iter()
                .map(|key| self.get_document(collection, key))
        )
        .await
    }

    /// Creates a document or replaces an existing one entirely.
    async fn set_document(
        &self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()>;

    /// Merges `patch` into an existing document.
    ///
    /// Returns [`AdapterError::DocumentNotFound`](crate::error::AdapterError::DocumentNotFound)
    /// when the key does not exist.
    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()>;

    /// Deletes a document. Deleting a missing key is a no-op.
    async fn delete_document(&self, collection: &str, key: &str) -> AdapterResult<()>;

    /// Executes a native query.
    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>>;

    /// Counts the documents matching the query's filters. Ordering, offset and
    /// limit are ignored.
    async fn count_documents(&self, collection: &str, query: &Query) -> AdapterResult<u64>;

    /// Opens a transaction. Reads and writes made through it are applied or
    /// rejected as a unit by [`StoreTransaction::commit`].
    async fn begin_transaction(&self) -> AdapterResult<Box<dyn StoreTransaction>>;

    /// Cleanly shuts down the backend, releasing all resources.
    async fn shutdown(self) -> AdapterResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// An open transaction against a store.
///
/// Implementations may require every read to happen before the first write.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get_document(
        &mut self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>>;

    async fn query_documents(
        &mut self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>>;

    async fn set_document(
        &mut self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()>;

    async fn update_document(
        &mut self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()>;

    async fn delete_document(&mut self, collection: &str, key: &str) -> AdapterResult<()>;

    /// Applies every buffered write atomically.
    async fn commit(self: Box<Self>) -> AdapterResult<()>;

    /// Discards every buffered write.
    async fn rollback(self: Box<Self>) -> AdapterResult<()>;
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    fn generate_key(&self) -> String {
        (**self).generate_key()
    }

    async fn get_document(
        &self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>> {
        (**self).get_document(collection, key).await
    }

    async fn get_documents(
        &self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>> {
        (**self).get_documents(collection, keys).await
    }

    async fn set_document(
        &self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()> {
        (**self).set_document(collection, key, data).await
    }

    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()> {
        (**self).update_document(collection, key, patch).await
    }

    async fn delete_document(&self, collection: &str, key: &str) -> AdapterResult<()> {
        (**self).delete_document(collection, key).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>> {
        (**self).query_documents(collection, query).await
    }

    async fn count_documents(&self, collection: &str, query: &Query) -> AdapterResult<u64> {
        (**self).count_documents(collection, query).await
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn StoreTransaction>> {
        (**self).begin_transaction().await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    fn generate_key(&self) -> String {
        (**self).generate_key()
    }

    async fn get_document(
        &self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>> {
        (**self).get_document(collection, key).await
    }

    async fn get_documents(
        &self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>> {
        (**self).get_documents(collection, keys).await
    }

    async fn set_document(
        &self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()> {
        (**self).set_document(collection, key, data).await
    }

    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()> {
        (**self).update_document(collection, key, patch).await
    }

    async fn delete_document(&self, collection: &str, key: &str) -> AdapterResult<()> {
        (**self).delete_document(collection, key).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>> {
        (**self).query_documents(collection, query).await
    }

    async fn count_documents(&self, collection: &str, query: &Query) -> AdapterResult<u64> {
        (**self).count_documents(collection, query).await
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn StoreTransaction>> {
        (**self).begin_transaction().await
    }
}

/// Factory for backends that need asynchronous setup.
///
/// Connection and credential problems surface from [`StoreBackendBuilder::build`]
/// as [`AdapterError::Initialization`](crate::error::AdapterError::Initialization),
/// before any adapter operation runs.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> AdapterResult<Self::Backend>;
}
