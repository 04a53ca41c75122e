//! Recently viewed folders.

use mailsteer_core::{AccountId, Folder};

/// Default number of recent folders offered for quick navigation.
pub const DEFAULT_RECENT_FOLDER_LIMIT: usize = 10;

/// Most-recently-touched folders of the current account.
///
/// Touching a folder moves it to the front; entries are unique by folder
/// identifier. The structure keeps every touched folder and applies its
/// limit only when the list is published. The provider holds the durable
/// copy and pushes it back through the recent-folders resource.
#[derive(Debug, Clone)]
pub struct RecentFolders {
    account: Option<AccountId>,
    folders: Vec<Folder>,
    limit: usize,
}

impl Default for RecentFolders {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_FOLDER_LIMIT)
    }
}

impl RecentFolders {
    /// Creates an empty list publishing at most `limit` folders.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            account: None,
            folders: Vec::new(),
            limit,
        }
    }

    /// Account the list belongs to.
    #[must_use]
    pub const fn account(&self) -> Option<&AccountId> {
        self.account.as_ref()
    }

    /// Switches to another account's list, dropping the old entries.
    pub fn set_account(&mut self, account: Option<AccountId>) {
        if self.account != account {
            self.account = account;
            self.folders.clear();
        }
    }

    /// Moves `folder` to the front.
    ///
    /// Returns false, leaving the list alone, if the folder belongs to
    /// another account.
    pub fn touch(&mut self, folder: &Folder) -> bool {
        match &self.account {
            Some(account) if folder.belongs_to(account) => {
                self.folders.retain(|existing| existing != folder);
                self.folders.insert(0, folder.clone());
                true
            }
            _ => false,
        }
    }

    /// Replaces the entries with the provider's copy.
    ///
    /// Returns false if `account` is not the list's account.
    pub fn replace(&mut self, account: &AccountId, folders: Vec<Folder>) -> bool {
        if self.account.as_ref() != Some(account) {
            return false;
        }
        self.folders.clear();
        for folder in folders {
            if folder.belongs_to(account) && !self.folders.contains(&folder) {
                self.folders.push(folder);
            }
        }
        true
    }

    /// The folders to offer, most recent first, bounded by the limit.
    #[must_use]
    pub fn published(&self) -> &[Folder] {
        &self.folders[..self.folders.len().min(self.limit)]
    }

    /// Number of stored folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Returns true if no folder has been touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone)]
mod tests {
    use super::*;

    fn folder(id: &str) -> Folder {
        Folder::new(id, AccountId::new("work"), id)
    }

    fn names(recent: &RecentFolders) -> Vec<&str> {
        recent.published().iter().map(|f| f.id.as_str()).collect()
    }

    fn recent(limit: usize) -> RecentFolders {
        let mut recent = RecentFolders::new(limit);
        recent.set_account(Some(AccountId::new("work")));
        recent
    }

    #[test]
    fn touch_moves_to_front() {
        let mut recent = recent(10);
        recent.touch(&folder("a"));
        recent.touch(&folder("b"));
        recent.touch(&folder("a"));
        assert_eq!(names(&recent), vec!["a", "b"]);
    }

    #[test]
    fn limit_applies_on_publish() {
        let mut recent = recent(2);
        for id in ["a", "b", "c"] {
            recent.touch(&folder(id));
        }
        assert_eq!(names(&recent), vec!["c", "b"]);
        assert_eq!(recent.len(), 3);
    }

    #[test]
    fn foreign_folder_is_ignored() {
        let mut recent = recent(10);
        assert!(!recent.touch(&Folder::new("x", AccountId::new("home"), "x")));
        assert!(recent.is_empty());
    }

    #[test]
    fn account_switch_clears() {
        let mut recent = recent(10);
        recent.touch(&folder("a"));
        recent.set_account(Some(AccountId::new("home")));
        assert!(recent.is_empty());
    }

    #[test]
    fn replace_requires_matching_account() {
        let mut recent = recent(10);
        assert!(!recent.replace(&AccountId::new("home"), vec![folder("a")]));
        assert!(recent.replace(&AccountId::new("work"), vec![folder("b"), folder("b"), folder("a")]));
        assert_eq!(names(&recent), vec!["b", "a"]);
    }
}
