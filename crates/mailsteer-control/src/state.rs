//! Control state that survives a restart.
//!
//! Only identifiers are persisted: the selected account and a descriptor of
//! the list being shown. Everything else is re-resolved through the provider
//! when the state is restored.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mailsteer_core::{AccountId, FolderId, ListContext, ListTarget};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// What a list shows, by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ListDescriptor {
    /// A folder.
    Folder {
        /// Folder identifier.
        folder: FolderId,
    },
    /// A search.
    Search {
        /// Search query.
        query: String,
    },
}

impl From<&ListContext> for ListDescriptor {
    fn from(list: &ListContext) -> Self {
        match &list.target {
            ListTarget::Folder { folder } => Self::Folder {
                folder: folder.id.clone(),
            },
            ListTarget::Search { query, .. } => Self::Search {
                query: query.clone(),
            },
        }
    }
}

/// Persisted control state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    /// Selected account.
    pub account: Option<AccountId>,
    /// List being shown.
    pub list: Option<ListDescriptor>,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}

impl ControlSnapshot {
    /// The folder to restore, if the list showed one.
    #[must_use]
    pub const fn folder(&self) -> Option<&FolderId> {
        match &self.list {
            Some(ListDescriptor::Folder { folder }) => Some(folder),
            _ => None,
        }
    }

    /// The search to restore, if the list showed one.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match &self.list {
            Some(ListDescriptor::Search { query }) => Some(query),
            _ => None,
        }
    }
}

/// Reads and writes a [`ControlSnapshot`] as JSON.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location of the state file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        crate::config::config_dir().join("control-state.json")
    }

    /// File the store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored snapshot, or `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<ControlSnapshot>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Saves a snapshot, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, snapshot: &ControlSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&self.path, contents).await?;
        info!("Control state saved to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mailsteer_core::Folder;

    use super::*;

    #[test]
    fn descriptor_from_list() {
        let account = AccountId::new("work");
        let folder = Folder::new("work/inbox", account.clone(), "Inbox");

        let list = ListContext::folder(account.clone(), folder.clone());
        assert_eq!(
            ListDescriptor::from(&list),
            ListDescriptor::Folder {
                folder: FolderId::new("work/inbox")
            }
        );

        let list = ListContext::search(account, folder, "invoices");
        assert_eq!(
            ListDescriptor::from(&list),
            ListDescriptor::Search {
                query: "invoices".into()
            }
        );
    }

    #[tokio::test]
    async fn load_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));
        let snapshot = ControlSnapshot {
            account: Some(AccountId::new("work")),
            list: Some(ListDescriptor::Search {
                query: "from:alice".into(),
            }),
            saved_at: Utc::now(),
        };

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.query(), Some("from:alice"));
        assert_eq!(loaded.folder(), None);
    }

    #[test]
    fn descriptor_json_shape() {
        let json = serde_json::to_value(ListDescriptor::Folder {
            folder: FolderId::new("f"),
        })
        .unwrap();
        assert_eq!(json["kind"], "folder");
        assert_eq!(json["folder"], "f");
    }
}
