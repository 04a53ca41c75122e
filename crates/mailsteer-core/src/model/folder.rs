//! Folder (mailbox) data model.

use serde::{Deserialize, Serialize};

use super::AccountId;

/// Stable identifier for a folder (its provider URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub String);

impl FolderId {
    /// Create a new folder ID.
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

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Synchronization status of a folder.
///
/// Moves from `NotSyncing` to `Syncing`, then to `Synced` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// No sync has run yet.
    #[default]
    NotSyncing,
    /// A sync is in progress.
    Syncing,
    /// The last sync completed.
    Synced,
    /// The last sync failed.
    Failed,
}

impl SyncStatus {
    /// Returns true while a sync is running.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, Self::Syncing)
    }

    /// Returns true if moving to `next` is a legal status change.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotSyncing | Self::Synced | Self::Failed, Self::Syncing)
                | (Self::Syncing, Self::Synced | Self::Failed)
        )
    }
}

/// Capability declared by a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FolderCapability {
    /// Muting a conversation removes it from this folder's list.
    DestructiveMute,
}

/// A mail folder (mailbox).
///
/// Equality is by identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    /// Stable identifier.
    pub id: FolderId,
    /// Owning account.
    pub account: AccountId,
    /// Display name.
    pub name: String,
    /// Current sync status.
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Declared capabilities.
    #[serde(default)]
    pub capabilities: Vec<FolderCapability>,
    /// Whether this is the account's inbox.
    #[serde(default)]
    pub is_inbox: bool,
}

impl Folder {
    /// Creates a new folder.
    #[must_use]
    pub fn new(id: impl Into<String>, account: AccountId, name: impl Into<String>) -> Self {
        Self {
            id: FolderId::new(id),
            account,
            name: name.into(),
            sync_status: SyncStatus::NotSyncing,
            capabilities: Vec::new(),
            is_inbox: false,
        }
    }

    /// Marks the folder as the account's inbox.
    #[must_use]
    pub fn inbox(mut self) -> Self {
        self.is_inbox = true;
        self
    }

    /// Adds a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: FolderCapability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Sets the sync status.
    #[must_use]
    pub fn with_sync_status(mut self, status: SyncStatus) -> Self {
        self.sync_status = status;
        self
    }

    /// Returns true if the folder declares the capability.
    #[must_use]
    pub fn supports(&self, capability: FolderCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Returns true if the folder belongs to `account`.
    #[must_use]
    pub fn belongs_to(&self, account: &AccountId) -> bool {
        &self.account == account
    }
}

impl PartialEq for Folder {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Folder {}

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

    fn account() -> AccountId {
        AccountId::new("acct-1")
    }

    mod sync_status_tests {
        use super::*;

        #[test]
        fn default_is_not_syncing() {
            assert_eq!(SyncStatus::default(), SyncStatus::NotSyncing);
        }

        #[test]
        fn legal_transitions() {
            assert!(SyncStatus::NotSyncing.can_become(SyncStatus::Syncing));
            assert!(SyncStatus::Syncing.can_become(SyncStatus::Synced));
            assert!(SyncStatus::Syncing.can_become(SyncStatus::Failed));
            assert!(SyncStatus::Failed.can_become(SyncStatus::Syncing));
        }

        #[test]
        fn illegal_transitions() {
            assert!(!SyncStatus::NotSyncing.can_become(SyncStatus::Synced));
            assert!(!SyncStatus::Synced.can_become(SyncStatus::Failed));
            assert!(!SyncStatus::Syncing.can_become(SyncStatus::Syncing));
        }

        #[test]
        fn in_progress() {
            assert!(SyncStatus::Syncing.is_in_progress());
            assert!(!SyncStatus::Synced.is_in_progress());
        }
    }

    mod folder_tests {
        use super::*;

        #[test]
        fn equality_is_by_identifier() {
            let a = Folder::new("folder-1", account(), "Inbox");
            let b = Folder::new("folder-1", account(), "Renamed")
                .with_sync_status(SyncStatus::Syncing);
            assert_eq!(a, b);
        }

        #[test]
        fn capabilities() {
            let folder = Folder::new("folder-1", account(), "Inbox")
                .with_capability(FolderCapability::DestructiveMute);
            assert!(folder.supports(FolderCapability::DestructiveMute));
            let sent = Folder::new("folder-2", account(), "Sent");
            assert!(!sent.supports(FolderCapability::DestructiveMute));
        }

        #[test]
        fn ownership() {
            let folder = Folder::new("folder-1", account(), "Inbox");
            assert!(folder.belongs_to(&account()));
            assert!(!folder.belongs_to(&AccountId::new("acct-2")));
        }

        #[test]
        fn inbox_marker() {
            assert!(Folder::new("folder-1", account(), "Inbox").inbox().is_inbox);
        }
    }
}
