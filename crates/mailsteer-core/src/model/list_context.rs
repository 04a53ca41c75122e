//! What a conversation list is showing.

use serde::{Deserialize, Serialize};

use super::{AccountId, Folder};

/// Target of a conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ListTarget {
    /// The contents of a folder.
    Folder {
        /// Folder being listed.
        folder: Folder,
    },
    /// The results of a search.
    Search {
        /// Search query.
        query: String,
        /// Provider folder holding the results.
        results: Folder,
    },
}

/// Description of the list the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListContext {
    /// Account the list belongs to.
    pub account: AccountId,
    /// Folder or search being listed.
    pub target: ListTarget,
}

impl ListContext {
    /// A list of a folder's conversations.
    #[must_use]
    pub fn folder(account: AccountId, folder: Folder) -> Self {
        Self {
            account,
            target: ListTarget::Folder { folder },
        }
    }

    /// A list of search results.
    #[must_use]
    pub fn search(account: AccountId, results: Folder, query: impl Into<String>) -> Self {
        Self {
            account,
            target: ListTarget::Search {
                query: query.into(),
                results,
            },
        }
    }

    /// Returns true if the list shows search results.
    #[must_use]
    pub const fn is_search(&self) -> bool {
        matches!(self.target, ListTarget::Search { .. })
    }

    /// The folder whose conversations are listed.
    #[must_use]
    pub const fn list_folder(&self) -> &Folder {
        match &self.target {
            ListTarget::Folder { folder } => folder,
            ListTarget::Search { results, .. } => results,
        }
    }

    /// The search query, for search lists.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match &self.target {
            ListTarget::Folder { .. } => None,
            ListTarget::Search { query, .. } => Some(query),
        }
    }
}
