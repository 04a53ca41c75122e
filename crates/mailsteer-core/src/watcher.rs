//! Push channel for data-resource snapshots.
//!
//! The provider calls [`DataWatcher::notify`] whenever the content of a
//! watched resource may have changed. Every snapshot is forwarded to every
//! subscriber of its kind, including empty ones: "no settings" is a signal,
//! not an absence of one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::model::{Account, AccountId, Folder, FolderId, Settings};

/// Kind of data resource the control layer watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The list of accounts.
    Accounts,
    /// The currently selected folder.
    Folder,
    /// The current account's settings.
    Settings,
    /// The current account's recent-folders list.
    RecentFolders,
}

/// Latest content of a watched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// All accounts, in provider order. Empty when the provider has none.
    Accounts(Vec<Account>),
    /// A folder's current state, or `None` if it no longer exists.
    Folder {
        /// Folder the snapshot is for.
        id: FolderId,
        /// Current folder data.
        folder: Option<Folder>,
    },
    /// An account's settings, or `None` if they were cleared.
    Settings {
        /// Account the settings belong to.
        account: AccountId,
        /// Current settings.
        settings: Option<Settings>,
    },
    /// An account's recently viewed folders, most recent first.
    RecentFolders {
        /// Account the list belongs to.
        account: AccountId,
        /// Folders in the list.
        folders: Vec<Folder>,
    },
}

impl Snapshot {
    /// Returns the resource kind this snapshot belongs to.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Accounts(_) => ResourceKind::Accounts,
            Self::Folder { .. } => ResourceKind::Folder,
            Self::Settings { .. } => ResourceKind::Settings,
            Self::RecentFolders { .. } => ResourceKind::RecentFolders,
        }
    }
}

type Subscriber = Arc<dyn Fn(Snapshot) + Send + Sync>;

/// Fan-out of resource snapshots to subscribers.
///
/// Cheap to clone; clones share subscribers. Safe to notify from any thread.
#[derive(Clone, Default)]
pub struct DataWatcher {
    subscribers: Arc<Mutex<HashMap<ResourceKind, Vec<Subscriber>>>>,
}

impl DataWatcher {
    /// Creates a watcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceKind, Vec<Subscriber>>> {
        // A panicking subscriber cannot leave the map half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Registers interest in a resource kind.
    pub fn subscribe<F>(&self, kind: ResourceKind, callback: F)
    where
        F: Fn(Snapshot) + Send + Sync + 'static,
    {
        self.lock().entry(kind).or_default().push(Arc::new(callback));
    }

    /// Delivers a snapshot to every subscriber of its kind.
    ///
    /// Returns the number of subscribers that received it.
    pub fn notify(&self, snapshot: Snapshot) -> usize {
        let kind = snapshot.kind();
        let subscribers = self.lock().get(&kind).cloned().unwrap_or_default();
        trace!(?kind, subscribers = subscribers.len(), "Delivering snapshot");

        let delivered = subscribers.len();
        if let Some((last, rest)) = subscribers.split_last() {
            for subscriber in rest {
                subscriber(snapshot.clone());
            }
            last(snapshot);
        }
        delivered
    }

    /// Returns the number of subscribers for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: ResourceKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for DataWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<ResourceKind, usize> = self
            .lock()
            .iter()
            .map(|(kind, subs)| (*kind, subs.len()))
            .collect();
        f.debug_struct("DataWatcher")
            .field("subscribers", &counts)
            .finish()
    }
}

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

    fn collector(watcher: &DataWatcher, kind: ResourceKind) -> Arc<Mutex<Vec<Snapshot>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        watcher.subscribe(kind, move |snapshot| sink.lock().unwrap().push(snapshot));
        seen
    }

    #[test]
    fn delivers_to_matching_kind_only() {
        let watcher = DataWatcher::new();
        let accounts = collector(&watcher, ResourceKind::Accounts);
        let settings = collector(&watcher, ResourceKind::Settings);

        let delivered = watcher.notify(Snapshot::Accounts(vec![Account::new("a", "A")]));

        assert_eq!(delivered, 1);
        assert_eq!(accounts.lock().unwrap().len(), 1);
        assert!(settings.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_settings_are_forwarded() {
        let watcher = DataWatcher::new();
        let settings = collector(&watcher, ResourceKind::Settings);

        watcher.notify(Snapshot::Settings {
            account: AccountId::new("a"),
            settings: None,
        });

        let seen = settings.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            &[Snapshot::Settings {
                account: AccountId::new("a"),
                settings: None,
            }]
        );
    }

    #[test]
    fn empty_account_list_is_forwarded() {
        let watcher = DataWatcher::new();
        let accounts = collector(&watcher, ResourceKind::Accounts);
        watcher.notify(Snapshot::Accounts(Vec::new()));
        assert_eq!(accounts.lock().unwrap().len(), 1);
    }

    #[test]
    fn fans_out_to_every_subscriber() {
        let watcher = DataWatcher::new();
        let first = collector(&watcher, ResourceKind::Folder);
        let second = collector(&watcher, ResourceKind::Folder);

        let delivered = watcher.notify(Snapshot::Folder {
            id: FolderId::new("inbox"),
            folder: None,
        });

        assert_eq!(delivered, 2);
        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
        assert_eq!(watcher.subscriber_count(ResourceKind::Folder), 2);
    }

    #[test]
    fn clones_share_subscribers() {
        let watcher = DataWatcher::new();
        let seen = collector(&watcher, ResourceKind::RecentFolders);
        let clone = watcher.clone();

        clone.notify(Snapshot::RecentFolders {
            account: AccountId::new("a"),
            folders: Vec::new(),
        });

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn notify_without_subscribers() {
        let watcher = DataWatcher::new();
        assert_eq!(watcher.notify(Snapshot::Accounts(Vec::new())), 0);
    }
}
