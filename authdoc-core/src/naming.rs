//! Field and collection naming conventions.
//!
//! The authentication framework speaks camelCase field names. Stores configured
//! with [`NamingStrategy::SnakeCase`] keep a small set of multi-word fields in
//! snake_case instead; [`FieldMapper`] translates between the two.

use serde::{Deserialize, Serialize};

/// Naming convention for storage field and collection names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Canonical names are stored verbatim.
    #[default]
    Default,
    /// Known multi-word fields are stored snake_cased.
    SnakeCase,
}

impl NamingStrategy {
    pub fn is_snake_case(&self) -> bool {
        matches!(self, NamingStrategy::SnakeCase)
    }
}

/// Canonical name → storage name under the snake_case convention.
const SNAKE_CASE_FIELDS: [(&str, &str); 4] = [
    ("userId", "user_id"),
    ("sessionToken", "session_token"),
    ("providerAccountId", "provider_account_id"),
    ("emailVerified", "email_verified"),
];

/// Bidirectional translation between canonical and storage field names.
///
/// Under [`NamingStrategy::Default`] both directions are the identity. Under
/// [`NamingStrategy::SnakeCase`] the fixed table applies and every other name
/// passes through unchanged, so `from_db(to_db(f)) == f` for every `f`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper {
    strategy: NamingStrategy,
}

impl FieldMapper {
    pub fn new(strategy: NamingStrategy) -> Self {
        Self { strategy }
    }

    /// Maps a canonical field name to its storage name.
    pub fn to_db<'a>(&self, field: &'a str) -> &'a str {
        if !self.strategy.is_snake_case() {
            return field;
        }

        SNAKE_CASE_FIELDS
            .iter()
            .find(|(canonical, _)| *canonical == field)
            .map(|(_, stored)| *stored)
            .unwrap_or(field)
    }

    /// Maps a storage field name back to its canonical name.
    pub fn from_db<'a>(&self, field: &'a str) -> &'a str {
        if !self.strategy.is_snake_case() {
            return field;
        }

        SNAKE_CASE_FIELDS
            .iter()
            .find(|(_, stored)| *stored == field)
            .map(|(canonical, _)| *canonical)
            .unwrap_or(field)
    }
}
