//! The data-provider contract.
//!
//! The control layer never touches storage directly. It asks a
//! [`DataProvider`] to watch resources (snapshots come back through a
//! [`DataWatcher`]), to resolve folders, and to mutate conversations.
//!
//! Query and mutation futures run on the worker pool, so they must be `Send`
//! and must not hold on to control-layer state.

use std::future::Future;

use crate::model::{Account, AccountId, Conversation, Folder, FolderId, FolderMembership};
use crate::watcher::{DataWatcher, ResourceKind};
use crate::Result;

/// A resource the control layer can ask the provider to watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// The account list.
    Accounts,
    /// A single folder's state (sync status, capabilities).
    Folder(FolderId),
    /// An account's settings.
    Settings(AccountId),
    /// An account's recent-folders list.
    RecentFolders(AccountId),
}

impl Resource {
    /// Returns the snapshot kind the provider will deliver for this resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Accounts => ResourceKind::Accounts,
            Self::Folder(_) => ResourceKind::Folder,
            Self::Settings(_) => ResourceKind::Settings,
            Self::RecentFolders(_) => ResourceKind::RecentFolders,
        }
    }
}

/// Boolean conversation column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanField {
    /// Read/unread state.
    Read,
}

/// Integer conversation column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntField {
    /// Priority (see [`crate::Priority::as_int`]).
    Priority,
}

/// Persistent data store behind the mail client.
///
/// Mutations take a slice so hosts can batch, even though the control layer
/// usually acts on a single conversation.
pub trait DataProvider: Send + Sync + 'static {
    /// Starts pushing snapshots of `resource` into `watcher`.
    ///
    /// Watching a resource replaces any earlier watch of the same kind. The
    /// provider should push the current content promptly and then again on
    /// every change.
    fn watch(&self, resource: Resource, watcher: DataWatcher);

    /// Resolves the folder to list for `account`.
    ///
    /// `hint` names the folder to resolve; `None` means the account's default
    /// inbox. A hint that is not one of the account's folders is an error.
    fn resolve_folder(
        &self,
        account: &Account,
        hint: Option<&FolderId>,
    ) -> impl Future<Output = Result<Folder>> + Send;

    /// Resolves the account's default inbox.
    fn resolve_inbox(&self, account: &Account) -> impl Future<Output = Result<Folder>> + Send;

    /// Resolves (or creates) the folder holding search results for `query`.
    fn search_folder(
        &self,
        account: &Account,
        query: &str,
    ) -> impl Future<Output = Result<Folder>> + Send;

    /// Asks the backing store to sync `folder` now.
    fn refresh_folder(&self, folder: &Folder) -> impl Future<Output = Result<()>> + Send;

    /// Archives conversations.
    fn archive(&self, conversations: &[Conversation]) -> impl Future<Output = Result<()>> + Send;

    /// Deletes conversations.
    fn delete(&self, conversations: &[Conversation]) -> impl Future<Output = Result<()>> + Send;

    /// Mutes conversations.
    fn mute(&self, conversations: &[Conversation]) -> impl Future<Output = Result<()>> + Send;

    /// Reports conversations as spam.
    fn report_spam(
        &self,
        conversations: &[Conversation],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Sets a boolean column on conversations.
    fn update_boolean_field(
        &self,
        conversations: &[Conversation],
        field: BooleanField,
        value: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Sets an integer column on conversations.
    fn update_int_field(
        &self,
        conversations: &[Conversation],
        field: IntField,
        value: i32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Replaces the folder membership of conversations.
    fn update_folder_membership(
        &self,
        conversations: &[Conversation],
        membership: &FolderMembership,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Records `folder` at the front of the account's recent-folders list.
    fn record_recent_folder(
        &self,
        account: &AccountId,
        folder: &Folder,
    ) -> impl Future<Output = Result<()>> + Send;
}
