//! In-memory data provider.
//!
//! Backs the headless driver and the test suites. Every call is journaled so
//! callers can assert on the order in which the control layer reached the
//! store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::model::{
    Account, AccountId, Conversation, ConversationId, Folder, FolderId, FolderMembership,
    Settings, SyncStatus,
};
use crate::provider::{BooleanField, DataProvider, IntField, Resource};
use crate::watcher::{DataWatcher, ResourceKind, Snapshot};
use crate::{Error, Result};

/// Initial content for a [`MemoryProvider`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Accounts, in display order.
    pub accounts: Vec<Account>,
    /// Folders of all accounts.
    pub folders: Vec<Folder>,
    /// Conversations of all accounts.
    pub conversations: Vec<Conversation>,
    /// Settings per account.
    pub settings: HashMap<AccountId, Settings>,
    /// Recent folders per account, most recent first.
    pub recent_folders: HashMap<AccountId, Vec<FolderId>>,
}

impl Fixture {
    /// Parses a fixture from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a fixture.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A call the provider received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    /// `watch`.
    Watch(Resource),
    /// `resolve_folder`.
    ResolveFolder {
        /// Account resolved for.
        account: AccountId,
        /// Folder hint passed in.
        hint: Option<FolderId>,
    },
    /// `resolve_inbox`.
    ResolveInbox(AccountId),
    /// `search_folder`.
    SearchFolder {
        /// Account searched.
        account: AccountId,
        /// Query string.
        query: String,
    },
    /// `refresh_folder`.
    RefreshFolder(FolderId),
    /// `archive`.
    Archive(Vec<ConversationId>),
    /// `delete`.
    Delete(Vec<ConversationId>),
    /// `mute`.
    Mute(Vec<ConversationId>),
    /// `report_spam`.
    ReportSpam(Vec<ConversationId>),
    /// `update_boolean_field`.
    UpdateBoolean {
        /// Conversations updated.
        conversations: Vec<ConversationId>,
        /// Column.
        field: BooleanField,
        /// New value.
        value: bool,
    },
    /// `update_int_field`.
    UpdateInt {
        /// Conversations updated.
        conversations: Vec<ConversationId>,
        /// Column.
        field: IntField,
        /// New value.
        value: i32,
    },
    /// `update_folder_membership`.
    UpdateFolders {
        /// Conversations updated.
        conversations: Vec<ConversationId>,
        /// New membership, comma-separated.
        membership: String,
    },
    /// `record_recent_folder`.
    RecordRecent {
        /// Account whose list changed.
        account: AccountId,
        /// Folder touched.
        folder: FolderId,
    },
}

#[derive(Debug, Default)]
struct State {
    accounts: Vec<Account>,
    folders: Vec<Folder>,
    conversations: Vec<Conversation>,
    settings: HashMap<AccountId, Settings>,
    recent_folders: HashMap<AccountId, Vec<FolderId>>,
    watches: HashMap<ResourceKind, (Resource, DataWatcher)>,
    calls: Vec<ProviderCall>,
    latency: HashMap<AccountId, Duration>,
    failure: Option<Error>,
}

impl State {
    fn folder(&self, id: &FolderId) -> Option<&Folder> {
        self.folders.iter().find(|folder| &folder.id == id)
    }

    fn snapshot(&self, resource: &Resource) -> Snapshot {
        match resource {
            Resource::Accounts => Snapshot::Accounts(self.accounts.clone()),
            Resource::Folder(id) => Snapshot::Folder {
                id: id.clone(),
                folder: self.folder(id).cloned(),
            },
            Resource::Settings(account) => Snapshot::Settings {
                account: account.clone(),
                settings: self.settings.get(account).copied(),
            },
            Resource::RecentFolders(account) => Snapshot::RecentFolders {
                account: account.clone(),
                folders: self
                    .recent_folders
                    .get(account)
                    .map(|ids| ids.iter().filter_map(|id| self.folder(id).cloned()).collect())
                    .unwrap_or_default(),
            },
        }
    }

    /// Snapshot for the active watch of `kind`, if it matches `filter`.
    fn watched(
        &self,
        kind: ResourceKind,
        filter: impl Fn(&Resource) -> bool,
    ) -> Option<(DataWatcher, Snapshot)> {
        self.watches
            .get(&kind)
            .filter(|(resource, _)| filter(resource))
            .map(|(resource, watcher)| (watcher.clone(), self.snapshot(resource)))
    }

    fn check_failure(&self) -> Result<()> {
        self.failure.clone().map_or(Ok(()), Err)
    }
}

/// A [`DataProvider`] holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: Mutex<State>,
}

impl MemoryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider seeded from a fixture.
    #[must_use]
    pub fn from_fixture(fixture: Fixture) -> Self {
        let state = State {
            accounts: fixture.accounts,
            folders: fixture.folders,
            conversations: fixture.conversations,
            settings: fixture.settings,
            recent_folders: fixture.recent_folders,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// Forgets the calls received so far.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Returns a conversation's current stored state.
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.lock()
            .conversations
            .iter()
            .find(|conversation| &conversation.id == id)
            .cloned()
    }

    /// Makes every following mutation fail with `error` (or succeed again).
    pub fn set_failure(&self, error: Option<Error>) {
        self.lock().failure = error;
    }

    /// Delays folder resolutions for `account`.
    pub fn set_latency(&self, account: AccountId, latency: Duration) {
        self.lock().latency.insert(account, latency);
    }

    /// Adds a folder.
    pub fn add_folder(&self, folder: Folder) {
        self.lock().folders.push(folder);
    }

    /// Replaces the account list and pushes it to the account watcher.
    pub fn set_accounts(&self, accounts: Vec<Account>) {
        let push = {
            let mut state = self.lock();
            state.accounts = accounts;
            state.watched(ResourceKind::Accounts, |_| true)
        };
        Self::push(push);
    }

    /// Changes a folder's sync status and pushes it if the folder is watched.
    ///
    /// Returns false, changing nothing, if the folder is unknown or the
    /// status cannot follow its current one.
    pub fn set_sync_status(&self, id: &FolderId, status: SyncStatus) -> bool {
        let push = {
            let mut state = self.lock();
            let Some(folder) = state.folders.iter_mut().find(|folder| &folder.id == id) else {
                return false;
            };
            if !folder.sync_status.can_become(status) {
                debug!(
                    folder = %id,
                    from = ?folder.sync_status,
                    to = ?status,
                    "Rejected sync status change"
                );
                return false;
            }
            folder.sync_status = status;
            state.watched(ResourceKind::Folder, |resource| {
                resource == &Resource::Folder(id.clone())
            })
        };
        Self::push(push);
        true
    }

    /// Removes a folder and pushes its disappearance if it is watched.
    pub fn remove_folder(&self, id: &FolderId) {
        let push = {
            let mut state = self.lock();
            state.folders.retain(|folder| &folder.id != id);
            state.watched(ResourceKind::Folder, |resource| {
                resource == &Resource::Folder(id.clone())
            })
        };
        Self::push(push);
    }

    /// Replaces an account's settings and pushes them if they are watched.
    pub fn set_settings(&self, account: &AccountId, settings: Option<Settings>) {
        let push = {
            let mut state = self.lock();
            match settings {
                Some(settings) => {
                    state.settings.insert(account.clone(), settings);
                }
                None => {
                    state.settings.remove(account);
                }
            }
            state.watched(ResourceKind::Settings, |resource| {
                resource == &Resource::Settings(account.clone())
            })
        };
        Self::push(push);
    }

    fn push(push: Option<(DataWatcher, Snapshot)>) {
        if let Some((watcher, snapshot)) = push {
            watcher.notify(snapshot);
        }
    }

    fn record(&self, call: ProviderCall) {
        debug!(?call, "Provider call");
        self.lock().calls.push(call);
    }

    async fn latency_for(&self, account: &AccountId) {
        let latency = self.lock().latency.get(account).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn ids(conversations: &[Conversation]) -> Vec<ConversationId> {
        conversations.iter().map(|c| c.id.clone()).collect()
    }

    /// Applies `change` to every stored conversation in `conversations`.
    fn mutate(
        &self,
        call: ProviderCall,
        conversations: &[Conversation],
        change: impl Fn(&mut State, &ConversationId),
    ) -> Result<()> {
        self.record(call);
        let mut state = self.lock();
        state.check_failure()?;
        for conversation in conversations {
            change(&mut state, &conversation.id);
        }
        Ok(())
    }

    fn inbox_ids(state: &State) -> Vec<FolderId> {
        state
            .folders
            .iter()
            .filter(|folder| folder.is_inbox)
            .map(|folder| folder.id.clone())
            .collect()
    }

    fn drop_from_inbox(state: &mut State, id: &ConversationId) {
        let inboxes = Self::inbox_ids(state);
        if let Some(conversation) = state.conversations.iter_mut().find(|c| &c.id == id) {
            conversation.folders = FolderMembership::new(
                conversation
                    .folders
                    .iter()
                    .filter(|folder| !inboxes.contains(folder))
                    .cloned(),
            );
        }
    }

    fn remove(state: &mut State, id: &ConversationId) {
        state.conversations.retain(|c| &c.id != id);
    }
}

impl DataProvider for MemoryProvider {
    fn watch(&self, resource: Resource, watcher: DataWatcher) {
        self.record(ProviderCall::Watch(resource.clone()));
        let snapshot = {
            let mut state = self.lock();
            let snapshot = state.snapshot(&resource);
            state
                .watches
                .insert(resource.kind(), (resource, watcher.clone()));
            snapshot
        };
        watcher.notify(snapshot);
    }

    async fn resolve_folder(&self, account: &Account, hint: Option<&FolderId>) -> Result<Folder> {
        self.record(ProviderCall::ResolveFolder {
            account: account.id.clone(),
            hint: hint.cloned(),
        });
        self.latency_for(&account.id).await;

        let Some(id) = hint else {
            return self.find_inbox(&account.id);
        };
        let state = self.lock();
        state
            .folder(id)
            .filter(|folder| folder.belongs_to(&account.id))
            .cloned()
            .ok_or_else(|| Error::FolderNotFound(id.clone()))
    }

    async fn resolve_inbox(&self, account: &Account) -> Result<Folder> {
        self.record(ProviderCall::ResolveInbox(account.id.clone()));
        self.latency_for(&account.id).await;
        self.find_inbox(&account.id)
    }

    async fn search_folder(&self, account: &Account, query: &str) -> Result<Folder> {
        self.record(ProviderCall::SearchFolder {
            account: account.id.clone(),
            query: query.to_string(),
        });
        self.latency_for(&account.id).await;
        let results = Folder::new(
            format!("search:{}:{query}", account.id),
            account.id.clone(),
            format!("Search: {query}"),
        );
        let mut state = self.lock();
        state.folders.retain(|folder| folder.id != results.id);
        state.folders.push(results.clone());
        Ok(results)
    }

    async fn refresh_folder(&self, folder: &Folder) -> Result<()> {
        self.record(ProviderCall::RefreshFolder(folder.id.clone()));
        if !self.lock().folders.iter().any(|f| f.id == folder.id) {
            return Err(Error::FolderNotFound(folder.id.clone()));
        }
        if !self.set_sync_status(&folder.id, SyncStatus::Syncing) {
            return Err(Error::Provider(format!("{} is already syncing", folder.id)));
        }
        self.set_sync_status(&folder.id, SyncStatus::Synced);
        Ok(())
    }

    async fn archive(&self, conversations: &[Conversation]) -> Result<()> {
        let call = ProviderCall::Archive(Self::ids(conversations));
        self.mutate(call, conversations, Self::drop_from_inbox)
    }

    async fn delete(&self, conversations: &[Conversation]) -> Result<()> {
        let call = ProviderCall::Delete(Self::ids(conversations));
        self.mutate(call, conversations, Self::remove)
    }

    async fn mute(&self, conversations: &[Conversation]) -> Result<()> {
        let call = ProviderCall::Mute(Self::ids(conversations));
        self.mutate(call, conversations, Self::drop_from_inbox)
    }

    async fn report_spam(&self, conversations: &[Conversation]) -> Result<()> {
        let call = ProviderCall::ReportSpam(Self::ids(conversations));
        self.mutate(call, conversations, Self::remove)
    }

    async fn update_boolean_field(
        &self,
        conversations: &[Conversation],
        field: BooleanField,
        value: bool,
    ) -> Result<()> {
        let call = ProviderCall::UpdateBoolean {
            conversations: Self::ids(conversations),
            field,
            value,
        };
        self.mutate(call, conversations, |state, id| {
            if let Some(conversation) = state.conversations.iter_mut().find(|c| &c.id == id) {
                match field {
                    BooleanField::Read => conversation.read = value,
                }
            }
        })
    }

    async fn update_int_field(
        &self,
        conversations: &[Conversation],
        field: IntField,
        value: i32,
    ) -> Result<()> {
        let call = ProviderCall::UpdateInt {
            conversations: Self::ids(conversations),
            field,
            value,
        };
        self.mutate(call, conversations, |state, id| {
            if let Some(conversation) = state.conversations.iter_mut().find(|c| &c.id == id) {
                match field {
                    IntField::Priority => {
                        conversation.priority = if value > 0 {
                            crate::Priority::High
                        } else {
                            crate::Priority::Low
                        };
                    }
                }
            }
        })
    }

    async fn update_folder_membership(
        &self,
        conversations: &[Conversation],
        membership: &FolderMembership,
    ) -> Result<()> {
        let call = ProviderCall::UpdateFolders {
            conversations: Self::ids(conversations),
            membership: membership.to_list_string(),
        };
        self.mutate(call, conversations, |state, id| {
            if let Some(conversation) = state.conversations.iter_mut().find(|c| &c.id == id) {
                conversation.folders = membership.clone();
            }
        })
    }

    async fn record_recent_folder(&self, account: &AccountId, folder: &Folder) -> Result<()> {
        self.record(ProviderCall::RecordRecent {
            account: account.clone(),
            folder: folder.id.clone(),
        });
        let push = {
            let mut state = self.lock();
            state.check_failure()?;
            let recent = state.recent_folders.entry(account.clone()).or_default();
            recent.retain(|id| id != &folder.id);
            recent.insert(0, folder.id.clone());
            state.watched(ResourceKind::RecentFolders, |resource| {
                resource == &Resource::RecentFolders(account.clone())
            })
        };
        Self::push(push);
        Ok(())
    }
}

impl MemoryProvider {
    fn find_inbox(&self, account: &AccountId) -> Result<Folder> {
        self.lock()
            .folders
            .iter()
            .find(|folder| folder.is_inbox && folder.belongs_to(account))
            .cloned()
            .ok_or_else(|| Error::NoInbox(account.clone()))
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
    use std::sync::Arc;

    use super::*;

    fn fixture() -> Fixture {
        let work = AccountId::new("work");
        Fixture {
            accounts: vec![Account::new("work", "Work")],
            folders: vec![
                Folder::new("work/inbox", work.clone(), "Inbox").inbox(),
                Folder::new("work/receipts", work.clone(), "Receipts"),
            ],
            conversations: vec![Conversation::new(
                "c1",
                "Quarterly report",
                FolderMembership::parse("work/inbox,work/receipts"),
            )],
            ..Fixture::default()
        }
    }

    fn account() -> Account {
        Account::new("work", "Work")
    }

    #[tokio::test]
    async fn resolve_folder_defaults_to_inbox() {
        let provider = MemoryProvider::from_fixture(fixture());
        let folder = provider.resolve_folder(&account(), None).await.unwrap();
        assert!(folder.is_inbox);
    }

    #[tokio::test]
    async fn resolve_folder_with_hint() {
        let provider = MemoryProvider::from_fixture(fixture());
        let hint = FolderId::new("work/receipts");
        let folder = provider
            .resolve_folder(&account(), Some(&hint))
            .await
            .unwrap();
        assert_eq!(folder.name, "Receipts");
    }

    #[tokio::test]
    async fn resolve_folder_of_other_account_fails() {
        let provider = MemoryProvider::from_fixture(fixture());
        let hint = FolderId::new("work/receipts");
        let err = provider
            .resolve_folder(&Account::new("home", "Home"), Some(&hint))
            .await
            .unwrap_err();
        assert_eq!(err, Error::FolderNotFound(hint));
    }

    #[tokio::test]
    async fn archive_drops_inbox_membership() {
        let provider = MemoryProvider::from_fixture(fixture());
        let conversation = provider.conversation(&ConversationId::new("c1")).unwrap();
        provider.archive(&[conversation]).await.unwrap();

        let stored = provider.conversation(&ConversationId::new("c1")).unwrap();
        assert_eq!(stored.folders.to_list_string(), "work/receipts");
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::Archive(vec![ConversationId::new("c1")])]
        );
    }

    #[tokio::test]
    async fn configured_failure_fails_mutations() {
        let provider = MemoryProvider::from_fixture(fixture());
        provider.set_failure(Some(Error::Provider("disk full".into())));
        let conversation = provider.conversation(&ConversationId::new("c1")).unwrap();
        let err = provider.delete(&[conversation]).await.unwrap_err();
        assert_eq!(err, Error::Provider("disk full".into()));
        assert!(provider.conversation(&ConversationId::new("c1")).is_some());
    }

    #[test]
    fn watch_pushes_current_content() {
        let provider = MemoryProvider::from_fixture(fixture());
        let watcher = DataWatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        watcher.subscribe(ResourceKind::Accounts, move |s| sink.lock().unwrap().push(s));

        provider.watch(Resource::Accounts, watcher);
        provider.set_accounts(vec![Account::new("work", "Work"), Account::new("home", "Home")]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[1], Snapshot::Accounts(accounts) if accounts.len() == 2));
    }

    #[test]
    fn removed_folder_pushes_none() {
        let provider = MemoryProvider::from_fixture(fixture());
        let watcher = DataWatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        watcher.subscribe(ResourceKind::Folder, move |s| sink.lock().unwrap().push(s));

        let id = FolderId::new("work/receipts");
        provider.watch(Resource::Folder(id.clone()), watcher);
        provider.remove_folder(&id);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&Snapshot::Folder { id, folder: None }));
    }

    #[test]
    fn sync_status_follows_its_lifecycle() {
        let provider = MemoryProvider::from_fixture(fixture());
        let inbox = FolderId::new("work/inbox");
        assert!(!provider.set_sync_status(&inbox, SyncStatus::Synced));
        assert!(provider.set_sync_status(&inbox, SyncStatus::Syncing));
        assert!(!provider.set_sync_status(&inbox, SyncStatus::Syncing));
        assert!(provider.set_sync_status(&inbox, SyncStatus::Failed));
        assert!(!provider.set_sync_status(&FolderId::new("gone"), SyncStatus::Syncing));

        let state = provider.lock();
        assert_eq!(state.folder(&inbox).unwrap().sync_status, SyncStatus::Failed);
    }

    #[tokio::test]
    async fn refresh_runs_a_full_sync() {
        let provider = MemoryProvider::from_fixture(fixture());
        let inbox = Folder::new("work/inbox", AccountId::new("work"), "Inbox");
        provider.refresh_folder(&inbox).await.unwrap();
        provider.refresh_folder(&inbox).await.unwrap();

        let state = provider.lock();
        assert_eq!(state.folder(&inbox.id).unwrap().sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn record_recent_moves_to_front() {
        let provider = MemoryProvider::from_fixture(fixture());
        let work = AccountId::new("work");
        let inbox = Folder::new("work/inbox", work.clone(), "Inbox");
        let receipts = Folder::new("work/receipts", work.clone(), "Receipts");

        provider.record_recent_folder(&work, &inbox).await.unwrap();
        provider.record_recent_folder(&work, &receipts).await.unwrap();
        provider.record_recent_folder(&work, &inbox).await.unwrap();

        let state = provider.lock();
        let snapshot = state.snapshot(&Resource::RecentFolders(work));
        let Snapshot::RecentFolders { folders, .. } = snapshot else {
            panic!("unexpected snapshot");
        };
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Inbox", "Receipts"]);
    }

    #[test]
    fn fixture_from_json() {
        let fixture = Fixture::from_json(
            r#"{
                "accounts": [{"id": "work", "name": "Work"}],
                "settings": {"work": {"confirm_delete": true}}
            }"#,
        )
        .unwrap();
        assert_eq!(fixture.accounts.len(), 1);
        assert!(fixture.settings[&AccountId::new("work")].confirm_delete);
        assert!(!fixture.settings[&AccountId::new("work")].confirm_archive);
    }
}
