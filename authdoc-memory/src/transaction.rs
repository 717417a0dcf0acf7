//! Optimistic transactions for the in-memory store.
//!
//! A transaction reads from a snapshot taken when it begins and buffers its
//! writes. At commit, every document it read is compared with the live store;
//! if any changed in the meantime the commit fails with
//! [`AdapterError::TransactionConflict`] and nothing is applied.

use std::collections::{HashMap, hash_map::Entry};

use async_trait::async_trait;
use bson::Document;
use tracing::debug;

use authdoc_core::{
    backend::StoreTransaction,
    error::{AdapterError, AdapterResult},
    query::Query,
    record::StoredDocument,
};

use crate::store::{InMemoryStore, StoreMap, TARGET, merge_patch, run_query};

type DocumentPath = (String, String);

enum Write {
    Set(Document),
    Update(Document),
    Delete,
}

pub(crate) struct InMemoryTransaction {
    store: InMemoryStore,
    snapshot: StoreMap,
    /// What each read document looked like when it was first read.
    reads: HashMap<DocumentPath, Option<Document>>,
    writes: Vec<(DocumentPath, Write)>,
}

impl InMemoryTransaction {
    pub(crate) fn new(store: InMemoryStore, snapshot: StoreMap) -> Self {
        Self {
            store,
            snapshot,
            reads: HashMap::new(),
            writes: Vec::new(),
        }
    }

    fn snapshot_document(&self, collection: &str, key: &str) -> Option<&Document> {
        self.snapshot
            .get(collection)
            .and_then(|documents| documents.get(key))
    }

    fn record_read(&mut self, collection: &str, key: &str) {
        let observed = self.snapshot_document(collection, key).cloned();
        if let Entry::Vacant(entry) = self.reads.entry((collection.to_string(), key.to_string())) {
            entry.insert(observed);
        }
    }

    fn path(collection: &str, key: &str) -> DocumentPath {
        (collection.to_string(), key.to_string())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn get_document(
        &mut self,
        collection: &str,
        key: &str,
    ) -> AdapterResult<Option<StoredDocument>> {
        self.record_read(collection, key);

        Ok(self
            .snapshot_document(collection, key)
            .map(|document| StoredDocument::new(key, document.clone())))
    }

    async fn query_documents(
        &mut self,
        collection: &str,
        query: &Query,
    ) -> AdapterResult<Vec<StoredDocument>> {
        let documents = run_query(self.snapshot.get(collection), query);
        for document in &documents {
            self.record_read(collection, &document.key);
        }

        Ok(documents)
    }

    async fn set_document(
        &mut self,
        collection: &str,
        key: &str,
        data: Document,
    ) -> AdapterResult<()> {
        self.writes.push((Self::path(collection, key), Write::Set(data)));
        Ok(())
    }

    async fn update_document(
        &mut self,
        collection: &str,
        key: &str,
        patch: Document,
    ) -> AdapterResult<()> {
        self.writes.push((Self::path(collection, key), Write::Update(patch)));
        Ok(())
    }

    async fn delete_document(&mut self, collection: &str, key: &str) -> AdapterResult<()> {
        self.writes.push((Self::path(collection, key), Write::Delete));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let Self { store, reads, writes, .. } = *self;
        let mut live = store.store.write().await;

        let current = |live: &StoreMap, (collection, key): &DocumentPath| {
            live.get(collection)
                .and_then(|documents| documents.get(key))
                .cloned()
        };

        for (path, observed) in &reads {
            if current(&*live, path) != *observed {
                debug!(target: TARGET, collection = %path.0, key = %path.1, "Transaction conflict");
                return Err(AdapterError::TransactionConflict(format!(
                    "{}/{} changed after it was read",
                    path.0, path.1,
                )));
            }
        }

        // Stage every write first so a failing update leaves the store untouched.
        let mut staged: Vec<(DocumentPath, Option<Document>)> = Vec::new();
        for (path, write) in writes {
            let existing = match staged.iter().rev().find(|(staged_path, _)| *staged_path == path) {
                Some((_, document)) => document.clone(),
                None => current(&*live, &path),
            };

            let next = match write {
                Write::Set(data) => Some(data),
                Write::Delete => None,
                Write::Update(patch) => match existing {
                    Some(mut document) => {
                        merge_patch(&mut document, patch);
                        Some(document)
                    },
                    None => return Err(AdapterError::DocumentNotFound(path.1, path.0)),
                },
            };

            staged.push((path, next));
        }

        let applied = staged.len();
        for ((collection, key), document) in staged {
            match document {
                Some(document) => {
                    live.entry(collection).or_default().insert(key, document);
                },
                None => {
                    if let Some(documents) = live.get_mut(&collection) {
                        documents.remove(&key);
                    }
                },
            }
        }

        debug!(target: TARGET, reads = reads.len(), writes = applied, "Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        debug!(target: TARGET, discarded = self.writes.len(), "Transaction rolled back");
        Ok(())
    }
}
