//! Core of the authdoc project: an adapter that serves an authentication
//! framework's data-access contract from a document database.
//!
//! This crate provides:
//!
//! - **Adapter facade** ([`adapter`]) - The framework's operation set over any store
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Native queries** ([`query`]) - What a store evaluates directly
//! - **Predicates** ([`predicate`]) - Framework `where` clauses and their execution classes
//! - **Planning** ([`compiler`]) - Native/residual partitioning and request shapes
//! - **Executors** ([`find`], [`count`], [`mutate`]) - Fetching, merging, counting and mutating
//! - **Records** ([`record`]) - Stored documents and canonical records
//! - **Naming** ([`naming`], [`collections`]) - Field and collection name resolution
//! - **Configuration** ([`config`]) - Adapter options
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use authdoc::{Adapter, AdapterConfig, predicate::Where};
//! use bson::doc;
//!
//! let adapter = Adapter::new(backend, AdapterConfig::default());
//! let session = adapter.create("session", doc! { "userId": "u1", "token": "t" }).await?;
//! let sessions = adapter.find_many("session", &[Where::eq("userId", "u1")], &Default::default()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as authdoc_core;

pub mod access;
pub mod adapter;
pub mod backend;
pub mod collections;
pub mod compiler;
pub mod config;
pub mod count;
pub mod error;
pub mod find;
pub mod mutate;
pub mod naming;
pub mod predicate;
pub mod query;
pub mod record;
pub mod timestamp;
pub mod value;
