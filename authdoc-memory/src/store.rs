//! In-memory storage implementation.
//!
//! Documents are kept per collection in key order behind an async-aware
//! read-write lock. Key order doubles as the natural fetch order.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use tracing::debug;

use authdoc_core::{
    backend::{StoreBackend, StoreBackendBuilder, StoreTransaction},
    error::{AdapterError, AdapterResult},
    query::{OrderPath, Query, SortDirection},
    record::StoredDocument,
    value::sort_order,
};

use crate::{evaluator::DocumentEvaluator, transaction::InMemoryTransaction};

pub(crate) type CollectionMap = BTreeMap<String, Document>;
pub(crate) type StoreMap = HashMap<String, CollectionMap>;

pub(crate) const TARGET: &str = "authdoc::memory";

/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan every document of a collection. It is meant for tests and
/// development, not production data sets.
///
/// # Example
///
/// ```ignore
/// use authdoc_memory::InMemoryStore;
/// use authdoc::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.set_document("users", "u1", doc! { "name": "Alice" }).await?;
/// assert!(store.get_document("users", "u1").await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document key -> document)
    pub(crate) store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Number of documents in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

/// Evaluates a native query against one collection.
pub(crate) fn run_query(collection: Option<&CollectionMap>, query: &Query) -> Vec<StoredDocument> {
    let Some(collection) = collection else {
        return Vec::new();
    };

    let mut matched = collection
        .iter()
        .filter(|(_, document)| DocumentEvaluator::matches(document, query))
        .map(|(key, document)| StoredDocument::new(key.clone(), document.clone()))
        .collect::<Vec<_>>();

    if let Some(order) = &query.order {
        match (&order.path, order.direction) {
            // Ties keep key order in both directions.
            (OrderPath::Field(field), direction) => matched.sort_by(|a, b| {
                let ordering = sort_order(a.data.get(field), b.data.get(field));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }),
            // Keys are unique and already ascending.
            (OrderPath::DocumentKey, SortDirection::Asc) => {},
            (OrderPath::DocumentKey, SortDirection::Desc) => matched.reverse(),
        }
    }

    matched
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.filter(|limit| *limit > 0).unwrap_or(usize::MAX))
        .collect()
}

/// Overlays `patch` onto `document`.
pub(crate) fn merge_patch(document: &mut Document, patch: Document) {
    for (field, value) in patch {
        document.insert(field, value);
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn get_document(
        &self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>> {
        Ok(self.store
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(key))
            .map(|document| StoredDocument::new(key, document.clone())))
    }

    async fn get_documents(
        &self,
        collection: &str,
        keys: &[String],
    ) -> AdapterResult<Vec<Option<StoredDocument>>> {
        let store = self.store.read().await;
        let documents = store.get(collection);

        Ok(keys
            .iter()
            .map(|key| {
                documents
                    .and_then(|documents| documents.get(key))
                    .map(|document| StoredDocument::new(key.clone(), document.clone()))
            })
            .collect())
    }

    async fn set_document(
        &self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()> {
        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), data);

        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        let document = store
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(key))
            .ok_or_else(|| AdapterError::DocumentNotFound(key.to_string(), collection.to_string()))?;

        merge_patch(document, patch);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, key: &str) -> AdapterResult<()> {
        if let Some(documents) = self.store.write().await.get_mut(collection) {
            documents.remove(key);
        }

        Ok(())
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>> {
        Ok(run_query(self.store.read().await.get(collection), query))
    }

    async fn count_documents(&self, collection: &str, query: &Query) -> AdapterResult<u64> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(0);
        };

        Ok(documents
            .values()
            .filter(|document| DocumentEvaluator::matches(document, query))
            .count() as u64)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn StoreTransaction>> {
        let snapshot = StoreMap::clone(&*self.store.read().await);
        debug!(target: TARGET, collections = snapshot.len(), "Transaction started");

        Ok(Box::new(InMemoryTransaction::new(self.clone(), snapshot)))
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use authdoc_memory::InMemoryStore;
/// use authdoc::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    seed: StoreMap,
}

impl InMemoryStoreBuilder {
    /// Seeds a document into the store being built.
    pub fn document(mut self, collection: &str, key: &str, data: Document) -> Self {
        self.seed
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), data);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] holding the seeded documents.
    async fn build(self) -> AdapterResult<Self::Backend> {
        Ok(InMemoryStore {
            store: Arc::new(RwLock::new(self.seed)),
        })
    }
}
