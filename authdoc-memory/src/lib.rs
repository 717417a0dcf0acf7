//! In-memory document storage backend for authdoc.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `StoreBackend` trait. It evaluates native queries in process and supports
//! optimistic transactions, which makes it the backend of choice for tests and
//! development.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Native query evaluation** - Filters, ordering, offset and limit
//! - **Optimistic transactions** - Snapshot reads, buffered writes, conflict detection at commit
//!
//! # Quick Start
//!
//! ```ignore
//! use authdoc::{Adapter, AdapterConfig, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = Adapter::new(InMemoryStore::new(), AdapterConfig::default());
//!     let user = adapter.create("user", doc! { "name": "Alice" }).await?;
//!     println!("created {}", user.id);
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as authdoc_memory;

pub mod store;
mod evaluator;
mod transaction;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
