//! The adapter facade.
//!
//! [`Adapter`] implements the authentication framework's data-access operations
//! over any [`StoreBackend`]. Each call resolves the model's collection, plans the
//! request and hands it to the find, count or mutation executor.
//! [`TransactionAdapter`] exposes the transactional subset inside
//! [`Adapter::transaction`].
//!
//! # Example
//!
//! ```ignore
//! use authdoc::{Adapter, AdapterConfig, memory::InMemoryStore, predicate::Where};
//! use bson::doc;
//!
//! let adapter = Adapter::new(InMemoryStore::new(), AdapterConfig::default());
//! let user = adapter.create("user", doc! { "name": "Ann", "email": "a@x.com" }).await?;
//! let found = adapter.find_one("user", &[Where::eq("id", user.id.as_str())], &[]).await?;
//! ```

use bson::Document;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::{
    access::{StoreAccess, TransactionAccess},
    backend::StoreBackend,
    collections::CollectionNames,
    compiler::{self, Plan, describe},
    config::{AdapterConfig, Operation},
    count,
    error::AdapterResult,
    find::{self, FindManyOptions},
    mutate,
    naming::FieldMapper,
    predicate::{Predicate, single_identifier},
    record::Record,
};

const TARGET: &str = "authdoc::adapter";

/// Configuration-derived state shared by the adapter and its transactions.
#[derive(Debug, Clone)]
struct Context {
    config: AdapterConfig,
    mapper: FieldMapper,
    collections: CollectionNames,
}

impl Context {
    fn new(config: AdapterConfig) -> Self {
        let collections = CollectionNames::resolve(
            config.naming_strategy,
            &config.collections,
            config.isolation_suffix,
        );

        Self {
            mapper: FieldMapper::new(config.naming_strategy),
            collections,
            config,
        }
    }

    fn logs(&self, operation: Operation) -> bool {
        self.config.debug_logs.enabled_for(operation)
    }

    fn log_plan(
        &self,
        operation: Operation,
        model: &str,
        collection: &str,
        plan: &Plan,
        predicates: &[Predicate],
    ) {
        if self.logs(operation) {
            debug!(
                target: TARGET,
                operation = operation.as_str(),
                model,
                collection,
                shape = plan.shape(),
                predicates = ?describe(predicates),
                ?plan,
                "Planned request"
            );
        }
    }

    async fn create<A>(&self, access: &mut A, model: &str, data: Document) -> AdapterResult<Record>
    where
        A: StoreAccess + ?Sized,
    {
        let collection = self.collections.collection_for(model);
        if self.logs(Operation::Create) {
            debug!(target: TARGET, model, collection, ?data, "Creating record");
        }

        let record = mutate::create(access, collection, data, &self.mapper).await?;

        if self.logs(Operation::Create) {
            debug!(target: TARGET, model, id = %record.id, ?record, "Created record");
        }
        Ok(record)
    }

    async fn update<A>(
        &self,
        access: &mut A,
        model: &str,
        predicates: &[Predicate],
        patch: Document,
    ) -> AdapterResult<Option<Record>>
    where
        A: StoreAccess + ?Sized,
    {
        let collection = self.collections.collection_for(model);
        if self.logs(Operation::Update) {
            debug!(
                target: TARGET,
                model,
                collection,
                direct = single_identifier(predicates).is_some(),
                predicates = ?describe(predicates),
                ?patch,
                "Updating record"
            );
        }

        let record = mutate::update(access, collection, predicates, patch, &self.mapper).await?;

        if self.logs(Operation::Update) {
            debug!(target: TARGET, model, ?record, "Updated record");
        }
        Ok(record)
    }

    async fn find_one<A>(
        &self,
        access: &mut A,
        model: &str,
        predicates: &[Predicate],
        select: &[String],
    ) -> AdapterResult<Option<Record>>
    where
        A: StoreAccess + ?Sized,
    {
        let collection = self.collections.collection_for(model);
        if self.logs(Operation::FindOne) {
            debug!(
                target: TARGET,
                model,
                collection,
                direct = single_identifier(predicates).is_some(),
                predicates = ?describe(predicates),
                ?select,
                "Finding record"
            );
        }

        let record = find::find_one(access, collection, predicates, &self.mapper)
            .await?
            .map(|record| record.select(select));

        if self.logs(Operation::FindOne) {
            debug!(target: TARGET, model, found = record.is_some(), ?record, "Found record");
        }
        Ok(record)
    }
}

/// Data-access adapter over a document store.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct Adapter<B: StoreBackend> {
    backend: B,
    context: Context,
}

impl<B: StoreBackend> Adapter<B> {
    /// Creates an adapter over `backend`. The configuration is fixed for the
    /// adapter's lifetime.
    pub fn new(backend: B, config: AdapterConfig) -> Self {
        Self {
            backend,
            context: Context::new(config),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.context.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Physical collection name for a model.
    pub fn collection(&self, model: &str) -> String {
        self.context.collections.collection_for(model).to_string()
    }

    /// Creates a record.
    ///
    /// # Arguments
    ///
    /// * `model` - The framework model name
    /// * `data` - Canonical fields; a non-empty `id` becomes the document key
    ///
    /// # Returns
    ///
    /// The caller's input overlaid with the stored document, including `id`.
    pub async fn create(&self, model: &str, data: Document) -> AdapterResult<Record> {
        self.context
            .create(&mut &self.backend, model, data)
            .await
    }

    /// Updates the first record matching `predicates`.
    ///
    /// # Returns
    ///
    /// The updated record as re-read from the store, or `None` when nothing
    /// matches.
    pub async fn update(
        &self,
        model: &str,
        predicates: &[Predicate],
        patch: Document,
    ) -> AdapterResult<Option<Record>> {
        self.context
            .update(&mut &self.backend, model, predicates, patch)
            .await
    }

    /// Updates every record matching `predicates` and returns how many were
    /// updated.
    ///
    /// `notIn`, `endsWith` and `contains` predicates on ordinary fields do not
    /// constrain bulk mutations: they are dropped with a warning. Identifier
    /// predicates of any operator are honored.
    pub async fn update_many(
        &self,
        model: &str,
        predicates: &[Predicate],
        patch: Document,
    ) -> AdapterResult<u64> {
        let collection = self.context.collections.collection_for(model);
        let plan = self.bulk_plan(Operation::UpdateMany, model, collection, predicates)?;
        if self.context.logs(Operation::UpdateMany) {
            debug!(target: TARGET, model, ?patch, "Updating records");
        }

        let updated = mutate::update_many(
            &mut &self.backend,
            collection,
            &plan,
            patch,
            &self.context.mapper,
        ).await?;

        if self.context.logs(Operation::UpdateMany) {
            debug!(target: TARGET, model, updated, "Updated records");
        }
        Ok(updated)
    }

    /// Deletes the first record matching `predicates`. No match is a no-op.
    pub async fn delete(&self, model: &str, predicates: &[Predicate]) -> AdapterResult<()> {
        let collection = self.context.collections.collection_for(model);
        if self.context.logs(Operation::Delete) {
            debug!(
                target: TARGET,
                model,
                collection,
                direct = single_identifier(predicates).is_some(),
                predicates = ?describe(predicates),
                "Deleting record"
            );
        }

        let deleted = mutate::delete(&mut &self.backend, collection, predicates, &self.context.mapper).await?;

        if self.context.logs(Operation::Delete) {
            debug!(target: TARGET, model, ?deleted, "Deleted record");
        }
        Ok(())
    }

    /// Deletes every record matching `predicates` and returns how many were
    /// deleted.
    ///
    /// The same predicate limitation as [`Adapter::update_many`] applies.
    pub async fn delete_many(&self, model: &str, predicates: &[Predicate]) -> AdapterResult<u64> {
        let collection = self.context.collections.collection_for(model);
        let plan = self.bulk_plan(Operation::DeleteMany, model, collection, predicates)?;

        let deleted = mutate::delete_many(
            &mut &self.backend,
            collection,
            &plan,
            &self.context.mapper,
        ).await?;

        if self.context.logs(Operation::DeleteMany) {
            debug!(target: TARGET, model, deleted, "Deleted records");
        }
        Ok(deleted)
    }

    /// Finds the first record matching `predicates`.
    ///
    /// # Arguments
    ///
    /// * `model` - The framework model name
    /// * `predicates` - The `where` clause
    /// * `select` - Fields to keep besides `id`; empty keeps everything
    pub async fn find_one(
        &self,
        model: &str,
        predicates: &[Predicate],
        select: &[String],
    ) -> AdapterResult<Option<Record>> {
        self.context
            .find_one(&mut &self.backend, model, predicates, select)
            .await
    }

    /// Finds every record matching `predicates`, sorted and paginated.
    pub async fn find_many(
        &self,
        model: &str,
        predicates: &[Predicate],
        options: &FindManyOptions,
    ) -> AdapterResult<Vec<Record>> {
        let collection = self.context.collections.collection_for(model);
        let plan = compiler::plan(predicates, &self.context.mapper)?;
        self.context.log_plan(Operation::FindMany, model, collection, &plan, predicates);
        if self.context.logs(Operation::FindMany) {
            debug!(target: TARGET, model, ?options, "Finding records");
        }

        let records = find::find_many(&mut &self.backend, collection, &plan, options, &self.context.mapper)
            .await?
            .into_iter()
            .map(|record| record.select(&options.select))
            .collect::<Vec<_>>();

        if self.context.logs(Operation::FindMany) {
            debug!(target: TARGET, model, returned = records.len(), ?records, "Found records");
        }
        Ok(records)
    }

    /// Counts the records matching `predicates`.
    pub async fn count(&self, model: &str, predicates: &[Predicate]) -> AdapterResult<u64> {
        let collection = self.context.collections.collection_for(model);
        let plan = compiler::plan(predicates, &self.context.mapper)?;
        self.context.log_plan(Operation::Count, model, collection, &plan, predicates);

        let total = count::count(&mut &self.backend, collection, &plan, &self.context.mapper).await?;

        if self.context.logs(Operation::Count) {
            debug!(target: TARGET, model, total, "Counted records");
        }
        Ok(total)
    }

    /// Runs `run` inside a store transaction.
    ///
    /// The transaction commits when `run` returns `Ok` and rolls back when it
    /// returns `Err`; the error is returned unchanged.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let user = adapter.transaction(|tx| Box::pin(async move {
    ///     let user = tx.create("user", doc! { "name": "Ann" }).await?;
    ///     tx.create("account", doc! { "userId": user.id.as_str() }).await?;
    ///     Ok(user)
    /// })).await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the error of `run`, or the commit failure (for example
    /// [`AdapterError::TransactionConflict`](crate::error::AdapterError::TransactionConflict)).
    pub async fn transaction<'a, F, T>(&'a self, run: F) -> AdapterResult<T>
    where
        F: for<'t> FnOnce(&'t mut TransactionAdapter<'a>) -> BoxFuture<'t, AdapterResult<T>>,
    {
        let transaction = self.backend.begin_transaction().await?;
        let mut adapter = TransactionAdapter {
            access: TransactionAccess::new(transaction, &self.backend),
            context: &self.context,
        };

        let outcome = run(&mut adapter).await;
        let logs = self.context.logs(Operation::Transaction);

        match outcome {
            Ok(value) => {
                adapter.access.commit().await?;
                if logs {
                    debug!(target: TARGET, "Transaction committed");
                }
                Ok(value)
            },
            Err(error) => {
                if let Err(rollback) = adapter.access.rollback().await {
                    warn!(target: TARGET, error = %rollback, "Transaction rollback failed");
                }
                if logs {
                    debug!(target: TARGET, error = %error, "Transaction rolled back");
                }
                Err(error)
            },
        }
    }

    /// Shuts down the backend.
    pub async fn shutdown(self) -> AdapterResult<()> {
        self.backend.shutdown().await
    }

    fn bulk_plan(
        &self,
        operation: Operation,
        model: &str,
        collection: &str,
        predicates: &[Predicate],
    ) -> AdapterResult<Plan> {
        let (honored, ignored) = compiler::without_client_side(predicates);

        if !ignored.is_empty() {
            warn!(
                target: TARGET,
                operation = operation.as_str(),
                model,
                ignored = ?describe(&ignored),
                "Bulk mutations ignore notIn, endsWith and contains predicates on ordinary fields"
            );
        }

        let plan = compiler::plan(&honored, &self.context.mapper)?;
        self.context.log_plan(operation, model, collection, &plan, &honored);
        Ok(plan)
    }
}

/// The transactional subset of the adapter, valid for one
/// [`Adapter::transaction`] call.
///
/// Reads must precede writes. Writes become visible when the transaction
/// commits, so [`TransactionAdapter::update`] returns the existing record merged
/// with the patch rather than a re-read.
pub struct TransactionAdapter<'a> {
    access: TransactionAccess<'a>,
    context: &'a Context,
}

impl TransactionAdapter<'_> {
    pub async fn create(&mut self, model: &str, data: Document) -> AdapterResult<Record> {
        self.context
            .create(&mut self.access, model, data)
            .await
    }

    pub async fn update(
        &mut self,
        model: &str,
        predicates: &[Predicate],
        patch: Document,
    ) -> AdapterResult<Option<Record>> {
        self.context
            .update(&mut self.access, model, predicates, patch)
            .await
    }

    pub async fn find_one(
        &mut self,
        model: &str,
        predicates: &[Predicate],
        select: &[String],
    ) -> AdapterResult<Option<Record>> {
        self.context
            .find_one(&mut self.access, model, predicates, select)
            .await
    }
}
