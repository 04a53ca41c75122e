//! Account model types.

use serde::{Deserialize, Serialize};

/// Stable identifier for an account (its provider URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability advertised by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountCapability {
    /// Server-side search is available.
    Search,
}

/// A mail account as seen by the control layer.
///
/// Equality is by identifier only: two snapshots of the same account with
/// different display data compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier.
    pub id: AccountId,
    /// Display name for the account.
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Capabilities the backing store advertises for this account.
    #[serde(default)]
    pub capabilities: Vec<AccountCapability>,
    /// Handle to the account's settings resource, if it has one.
    #[serde(default)]
    pub settings_uri: Option<String>,
    /// Handle to the account's recent-folders resource, if it has one.
    #[serde(default)]
    pub recent_folders_uri: Option<String>,
}

impl Account {
    /// Create an account with the given identifier and display name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            name: name.into(),
            email: String::new(),
            capabilities: Vec::new(),
            settings_uri: None,
            recent_folders_uri: None,
        }
    }

    /// Adds a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: AccountCapability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Sets the settings resource handle.
    #[must_use]
    pub fn with_settings_uri(mut self, uri: impl Into<String>) -> Self {
        self.settings_uri = Some(uri.into());
        self
    }

    /// Sets the recent-folders resource handle.
    #[must_use]
    pub fn with_recent_folders_uri(mut self, uri: impl Into<String>) -> Self {
        self.recent_folders_uri = Some(uri.into());
        self
    }

    /// Returns true if the account advertises the capability.
    #[must_use]
    pub fn supports(&self, capability: AccountCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Account {}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    mod account_id_tests {
        use super::*;

        #[test]
        fn display() {
            let id = AccountId::new("content://accounts/1");
            assert_eq!(format!("{id}"), "content://accounts/1");
        }

        #[test]
        fn serializes_as_plain_string() {
            let id = AccountId::new("acct-1");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"acct-1\"");
        }
    }

    mod account_tests {
        use super::*;

        #[test]
        fn equality_is_by_identifier() {
            let a = Account::new("acct-1", "Work");
            let mut b = Account::new("acct-1", "Renamed");
            b.email = "someone@example.com".to_string();
            assert_eq!(a, b);
            assert_ne!(a, Account::new("acct-2", "Work"));
        }

        #[test]
        fn capabilities() {
            let account = Account::new("acct-1", "Work")
                .with_capability(AccountCapability::Search)
                .with_capability(AccountCapability::Search);
            assert!(account.supports(AccountCapability::Search));
            assert!(!Account::new("acct-2", "Home").supports(AccountCapability::Search));
            assert_eq!(account.capabilities.len(), 1);
        }

        #[test]
        fn resource_handles_default_to_none() {
            let account = Account::new("acct-1", "Work");
            assert!(account.settings_uri.is_none());
            assert!(account.recent_folders_uri.is_none());
            let account = account.with_settings_uri("settings://1");
            assert_eq!(account.settings_uri.as_deref(), Some("settings://1"));
        }

        #[test]
        fn deserializes_with_defaults() {
            let account: Account =
                serde_json::from_str(r#"{"id":"acct-1","name":"Work"}"#).unwrap();
            assert_eq!(account.id.as_str(), "acct-1");
            assert!(account.capabilities.is_empty());
        }
    }
}
