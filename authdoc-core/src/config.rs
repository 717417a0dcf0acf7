//! Adapter configuration.
//!
//! Configuration is fixed when the adapter is constructed. It can be built in
//! code or deserialized from the framework's JSON shape:
//!
//! ```ignore
//! use authdoc::config::AdapterConfig;
//!
//! let config: AdapterConfig = serde_json::from_str(r#"{
//!     "namingStrategy": "snake_case",
//!     "collections": { "users": "auth_users" },
//!     "debugLogs": { "findMany": true }
//! }"#)?;
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{collections::CollectionsOverride, naming::NamingStrategy};

/// Adapter operations, used to scope debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Update,
    UpdateMany,
    Delete,
    DeleteMany,
    FindOne,
    FindMany,
    Count,
    Transaction,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::UpdateMany => "updateMany",
            Operation::Delete => "delete",
            Operation::DeleteMany => "deleteMany",
            Operation::FindOne => "findOne",
            Operation::FindMany => "findMany",
            Operation::Count => "count",
            Operation::Transaction => "transaction",
        }
    }
}

/// Which operations emit debug logs.
///
/// Deserializes from `true`/`false` or from a map of operation name to flag,
/// e.g. `{ "create": true, "findMany": true }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DebugLogs {
    #[default]
    Off,
    All,
    Only(HashSet<Operation>),
}

impl DebugLogs {
    pub fn enabled_for(&self, operation: Operation) -> bool {
        match self {
            DebugLogs::Off => false,
            DebugLogs::All => true,
            DebugLogs::Only(operations) => operations.contains(&operation),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DebugLogsRepr {
    Flag(bool),
    Operations(std::collections::HashMap<Operation, bool>),
}

impl<'de> Deserialize<'de> for DebugLogs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match DebugLogsRepr::deserialize(deserializer)? {
            DebugLogsRepr::Flag(true) => DebugLogs::All,
            DebugLogsRepr::Flag(false) => DebugLogs::Off,
            DebugLogsRepr::Operations(map) => DebugLogs::Only(
                map
                    .into_iter()
                    .filter_map(|(operation, enabled)| enabled.then_some(operation))
                    .collect()
            ),
        })
    }
}

impl Serialize for DebugLogs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DebugLogs::Off => serializer.serialize_bool(false),
            DebugLogs::All => serializer.serialize_bool(true),
            DebugLogs::Only(operations) => serializer.collect_map(
                operations
                    .iter()
                    .map(|operation| (operation.as_str(), true))
            ),
        }
    }
}

/// Immutable adapter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    /// Storage naming convention.
    pub naming_strategy: NamingStrategy,
    /// Per-model collection name overrides.
    pub collections: CollectionsOverride,
    /// Debug logging scope.
    pub debug_logs: DebugLogs,
    /// Suffix default collection names by naming strategy, so test suites
    /// sharing one store do not collide.
    pub isolation_suffix: bool,
}

impl AdapterConfig {
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::default()
    }
}

/// Fluent construction of an [`AdapterConfig`].
#[derive(Debug, Clone, Default)]
pub struct AdapterConfigBuilder {
    config: AdapterConfig,
}

impl AdapterConfigBuilder {
    pub fn naming_strategy(mut self, strategy: NamingStrategy) -> Self {
        self.config.naming_strategy = strategy;
        self
    }

    pub fn collections(mut self, collections: CollectionsOverride) -> Self {
        self.config.collections = collections;
        self
    }

    pub fn debug_logs(mut self, debug_logs: DebugLogs) -> Self {
        self.config.debug_logs = debug_logs;
        self
    }

    pub fn isolation_suffix(mut self, enabled: bool) -> Self {
        self.config.isolation_suffix = enabled;
        self
    }

    pub fn build(self) -> AdapterConfig {
        self.config
    }
}
