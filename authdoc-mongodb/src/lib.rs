//! MongoDB backend for authdoc.
//!
//! Provides a [`StoreBackend`](authdoc_core::backend::StoreBackend) over a
//! MongoDB database. Native queries run on the server; transactions use client
//! sessions and need a replica set or sharded cluster.
//!
//! Enable it through the `mongodb` feature of the `authdoc` crate:
//!
//! ```toml
//! [dependencies]
//! authdoc = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Storage layout
//!
//! - Each collection name maps to a MongoDB collection of the same name.
//! - The document key is stored as `_id`.
//! - Field names containing `.`, `$` or NUL are escaped on write and restored on read.
//!
//! # Example
//!
//! ```ignore
//! use authdoc::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "auth")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as authdoc_mongodb;

pub mod store;
mod query;
mod sanitizer;
mod transaction;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
