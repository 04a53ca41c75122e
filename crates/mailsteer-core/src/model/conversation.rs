//! Conversation data model.

use serde::{Deserialize, Serialize};

use super::FolderId;

/// Stable identifier for a conversation (its provider URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Create a new conversation ID.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of folders a conversation is filed under.
///
/// The provider stores membership as a comma-separated list of folder
/// identifiers; empty entries are ignored and duplicates collapse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderMembership(Vec<FolderId>);

impl FolderMembership {
    /// Creates a membership from folder identifiers.
    #[must_use]
    pub fn new(folders: impl IntoIterator<Item = FolderId>) -> Self {
        let mut membership = Self::default();
        for folder in folders {
            membership.insert(folder);
        }
        membership
    }

    /// Parses the provider's comma-separated form.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|uri| !uri.is_empty())
                .map(FolderId::new),
        )
    }

    /// Adds a folder if not already present.
    pub fn insert(&mut self, folder: FolderId) {
        if !self.0.contains(&folder) {
            self.0.push(folder);
        }
    }

    /// Returns true if the folder is a member.
    #[must_use]
    pub fn contains(&self, folder: &FolderId) -> bool {
        self.0.contains(folder)
    }

    /// Returns true if there are no folders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the member folders in order.
    pub fn iter(&self) -> impl Iterator<Item = &FolderId> {
        self.0.iter()
    }

    /// Formats the membership in the provider's comma-separated form.
    #[must_use]
    pub fn to_list_string(&self) -> String {
        self.0
            .iter()
            .map(FolderId::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Conversation priority as stored by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    /// Not important.
    #[default]
    Low,
    /// Important.
    High,
}

impl Priority {
    /// Integer value of the provider's priority column.
    #[must_use]
    pub const fn as_int(self) -> i32 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

/// A conversation (thread) the user can select.
///
/// Equality is by identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Stable identifier.
    pub id: ConversationId,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// Folders this conversation is filed under.
    #[serde(default)]
    pub folders: FolderMembership,
    /// Whether the conversation has been read.
    #[serde(default)]
    pub read: bool,
    /// Priority marker.
    #[serde(default)]
    pub priority: Priority,
    /// Set when a destructive action has begun; list renderers drop the row
    /// on their next update instead of waiting for the store to catch up.
    #[serde(default, skip_serializing)]
    pub pending_local_delete: bool,
}

impl Conversation {
    /// Creates a conversation filed under the given folders.
    #[must_use]
    pub fn new(id: impl Into<String>, subject: impl Into<String>, folders: FolderMembership) -> Self {
        Self {
            id: ConversationId::new(id),
            subject: subject.into(),
            folders,
            read: false,
            priority: Priority::Low,
            pending_local_delete: false,
        }
    }
}

impl PartialEq for Conversation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Conversation {}

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

    mod membership_tests {
        use super::*;

        #[test]
        fn parse_splits_on_commas() {
            let membership = FolderMembership::parse("inbox,starred");
            assert!(membership.contains(&FolderId::new("inbox")));
            assert!(membership.contains(&FolderId::new("starred")));
            assert!(!membership.contains(&FolderId::new("trash")));
        }

        #[test]
        fn parse_empty_string() {
            assert!(FolderMembership::parse("").is_empty());
            assert!(FolderMembership::parse(" , ,").is_empty());
        }

        #[test]
        fn parse_collapses_duplicates() {
            let membership = FolderMembership::parse("a,b,a");
            assert_eq!(membership.to_list_string(), "a,b");
        }

        #[test]
        fn list_string_keeps_order() {
            let membership =
                FolderMembership::new([FolderId::new("work"), FolderId::new("inbox")]);
            assert_eq!(membership.to_list_string(), "work,inbox");
        }
    }

    mod conversation_tests {
        use super::*;

        #[test]
        fn new_is_not_pending_delete() {
            let conversation = Conversation::new("c1", "Hello", FolderMembership::default());
            assert!(!conversation.pending_local_delete);
            assert!(!conversation.read);
        }

        #[test]
        fn equality_ignores_transient_flag() {
            let a = Conversation::new("c1", "Hello", FolderMembership::default());
            let mut b = a.clone();
            b.pending_local_delete = true;
            assert_eq!(a, b);
        }

        #[test]
        fn priority_values() {
            assert_eq!(Priority::High.as_int(), 1);
            assert_eq!(Priority::Low.as_int(), 0);
        }
    }
}
