//! Main authdoc crate: a document store adapter for an authentication
//! framework's data-access contract.
//!
//! The framework talks in models (`user`, `session`, `account`,
//! `verificationToken`), canonical camelCase field names and `where` clauses of
//! [`Predicate`](predicate::Predicate)s. [`Adapter`] serves that contract from
//! any [`StoreBackend`](backend::StoreBackend): it resolves collections, maps
//! field names, pushes what the store can evaluate into native queries and
//! finishes the rest in process.
//!
//! # Quick Start
//!
//! ```ignore
//! use authdoc::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> AdapterResult<()> {
//!     let adapter = Adapter::new(
//!         InMemoryStore::builder().build().await?,
//!         AdapterConfig::builder()
//!             .naming_strategy(NamingStrategy::SnakeCase)
//!             .build(),
//!     );
//!
//!     let user = adapter.create("user", doc! { "name": "Ann", "email": "ann@example.com" }).await?;
//!     adapter.create("session", doc! { "userId": user.id.as_str(), "sessionToken": "t1" }).await?;
//!
//!     let sessions = adapter
//!         .find_many(
//!             "session",
//!             &[Where::eq("userId", user.id.as_str())],
//!             &FindManyOptions::new().sort(SortBy::desc("createdAt")).limit(10),
//!         )
//!         .await?;
//!     println!("{} sessions", sessions.len());
//!
//!     adapter.shutdown().await
//! }
//! ```
//!
//! # Transactions
//!
//! ```ignore
//! let user = adapter.transaction(|tx| Box::pin(async move {
//!     let user = tx.create("user", doc! { "name": "Ann" }).await?;
//!     tx.create("account", doc! { "userId": user.id.as_str(), "providerId": "github" }).await?;
//!     Ok(user)
//! })).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB storage (requires the `mongodb` feature)

pub mod prelude;

pub use authdoc_core::{
    access, adapter, backend, collections, compiler, config, count, error, find, mutate, naming,
    predicate, query, record, timestamp, value,
};
pub use authdoc_core::{
    adapter::{Adapter, TransactionAdapter},
    config::AdapterConfig,
    error::{AdapterError, AdapterResult},
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use authdoc_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use authdoc_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
