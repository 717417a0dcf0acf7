//! Convenient re-exports of commonly used types from authdoc.
//!
//! ```ignore
//! use authdoc::prelude::*;
//! ```

pub use authdoc_core::{
    adapter::{Adapter, TransactionAdapter},
    backend::{StoreBackend, StoreBackendBuilder, StoreTransaction},
    collections::CollectionsOverride,
    config::{AdapterConfig, DebugLogs, Operation},
    error::{AdapterError, AdapterResult},
    find::FindManyOptions,
    naming::NamingStrategy,
    predicate::{Connector, Operator, Predicate, SortBy, Where},
    query::SortDirection,
    record::Record,
};
