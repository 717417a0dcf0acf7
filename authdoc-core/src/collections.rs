//! Mapping of abstract model names to physical collection names.

use serde::{Deserialize, Serialize};

use crate::naming::NamingStrategy;

/// Per-model collection name overrides. Overrides are used verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsOverride {
    pub users: Option<String>,
    pub sessions: Option<String>,
    pub accounts: Option<String>,
    pub verification_tokens: Option<String>,
}

/// Resolved physical collection names for the four known models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub users: String,
    pub sessions: String,
    pub accounts: String,
    pub verification_tokens: String,
}

impl CollectionNames {
    /// Computes collection names from the naming strategy and overrides.
    ///
    /// When `isolate` is set, default names get a `_snake` or `_default` suffix so
    /// test suites using different strategies can share one store. Overrides never
    /// receive the suffix.
    pub fn resolve(
        strategy: NamingStrategy,
        overrides: &CollectionsOverride,
        isolate: bool,
    ) -> Self {
        let suffix = match (isolate, strategy) {
            (false, _) => "",
            (true, NamingStrategy::SnakeCase) => "_snake",
            (true, NamingStrategy::Default) => "_default",
        };
        let verification = match strategy {
            NamingStrategy::SnakeCase => "verification_tokens",
            NamingStrategy::Default => "verificationTokens",
        };
        let pick = |value: &Option<String>, default: &str| {
            value
                .clone()
                .unwrap_or_else(|| format!("{default}{suffix}"))
        };

        Self {
            users: pick(&overrides.users, "users"),
            sessions: pick(&overrides.sessions, "sessions"),
            accounts: pick(&overrides.accounts, "accounts"),
            verification_tokens: pick(&overrides.verification_tokens, verification),
        }
    }

    /// Maps a model name to its collection.
    ///
    /// The model is lower-cased and a single trailing `s` is stripped before
    /// matching, so `User`, `users` and `user` resolve alike. Unknown models map
    /// to a collection named after the raw model string.
    pub fn collection_for<'a>(&'a self, model: &'a str) -> &'a str {
        let lowered = model.to_lowercase();
        let normalized = lowered
            .strip_suffix('s')
            .unwrap_or(&lowered);

        match normalized {
            "user" => self.users.as_str(),
            "session" => self.sessions.as_str(),
            "account" => self.accounts.as_str(),
            "verificationtoken" => self.verification_tokens.as_str(),
            _ => model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_depend_on_strategy() {
        let default = CollectionNames::resolve(NamingStrategy::Default, &Default::default(), false);
        assert_eq!(default.users, "users");
        assert_eq!(default.verification_tokens, "verificationTokens");

        let snake = CollectionNames::resolve(NamingStrategy::SnakeCase, &Default::default(), false);
        assert_eq!(snake.sessions, "sessions");
        assert_eq!(snake.verification_tokens, "verification_tokens");
    }

    #[test]
    fn isolation_suffixes_defaults_only() {
        let overrides = CollectionsOverride {
            accounts: Some("auth_accounts".to_string()),
            ..Default::default()
        };
        let names = CollectionNames::resolve(NamingStrategy::SnakeCase, &overrides, true);

        assert_eq!(names.users, "users_snake");
        assert_eq!(names.verification_tokens, "verification_tokens_snake");
        assert_eq!(names.accounts, "auth_accounts");

        let names = CollectionNames::resolve(NamingStrategy::Default, &Default::default(), true);
        assert_eq!(names.sessions, "sessions_default");
    }

    #[test]
    fn model_names_are_normalized() {
        let names = CollectionNames::resolve(NamingStrategy::Default, &Default::default(), false);

        assert_eq!(names.collection_for("user"), "users");
        assert_eq!(names.collection_for("Users"), "users");
        assert_eq!(names.collection_for("session"), "sessions");
        assert_eq!(names.collection_for("account"), "accounts");
        assert_eq!(names.collection_for("verificationToken"), "verificationTokens");
        assert_eq!(names.collection_for("VerificationTokens"), "verificationTokens");
    }

    #[test]
    fn unknown_models_use_the_raw_name() {
        let names = CollectionNames::resolve(NamingStrategy::Default, &Default::default(), false);
        assert_eq!(names.collection_for("passkey"), "passkey");
        assert_eq!(names.collection_for("Jwks"), "Jwks");
    }
}
