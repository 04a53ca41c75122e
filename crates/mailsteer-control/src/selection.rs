//! Selection state: account, folder, conversation and view mode.
//!
//! [`SelectionState`] is a versioned value. Every mutator returns a
//! [`Transition`] carrying the new version and the side effects the caller
//! must carry out (reloads to start, surfaces to notify). Mutators that do
//! not change anything return an empty transition and leave the version
//! untouched, so the whole state machine can be exercised without a runtime
//! or any surfaces.

use std::collections::HashSet;

use mailsteer_core::{Account, AccountId, Conversation, Folder, ListContext};
use tracing::debug;

use crate::error::{ControlError, Result};

/// What the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// A folder's conversation list.
    #[default]
    List,
    /// A single conversation opened from a folder list.
    Conversation,
    /// Search results.
    SearchList,
    /// A single conversation opened from search results.
    SearchConversation,
}

impl ViewMode {
    /// Returns true if a conversation is open.
    #[must_use]
    pub const fn is_conversation(self) -> bool {
        matches!(self, Self::Conversation | Self::SearchConversation)
    }

    /// Returns true if the mode belongs to a search.
    #[must_use]
    pub const fn is_search(self) -> bool {
        matches!(self, Self::SearchList | Self::SearchConversation)
    }

    /// The list mode a conversation mode returns to.
    #[must_use]
    pub const fn list_mode(self) -> Self {
        if self.is_search() {
            Self::SearchList
        } else {
            Self::List
        }
    }
}

/// A side effect required by a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Re-watch the account's recent-folders list.
    ReloadRecentFolders,
    /// Drop cached settings and re-watch the account's settings.
    ReloadSettings,
    /// Resolve which folder to show for the new account.
    ResolveAccountFolder,
    /// Watch the newly selected folder.
    WatchFolder,
    /// Re-resolve the selected folder's conversation list.
    ResolveFolderList,
    /// The view mode changed.
    ViewModeChanged(ViewMode),
}

/// Outcome of a selection mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State version after the mutation.
    pub version: u64,
    /// Whether the mutation changed anything.
    pub changed: bool,
    /// Effects to carry out, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    const fn unchanged(version: u64) -> Self {
        Self {
            version,
            changed: false,
            effects: Vec::new(),
        }
    }

    /// Returns true if the effect is required.
    #[must_use]
    pub fn requires(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

/// The current account, folder, conversation, list and view mode.
///
/// Invariants: the folder is `None` or belongs to the account; the list
/// context is `None` or belongs to the account; a conversation is only set
/// in a conversation view mode.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    version: u64,
    account: Option<Account>,
    folder: Option<Folder>,
    conversation: Option<Conversation>,
    list: Option<ListContext>,
    view_mode: ViewMode,
}

impl SelectionState {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version; bumped by every change.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Selected account.
    #[must_use]
    pub const fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Identifier of the selected account.
    #[must_use]
    pub fn account_id(&self) -> Option<&AccountId> {
        self.account.as_ref().map(|account| &account.id)
    }

    /// Selected folder.
    #[must_use]
    pub const fn folder(&self) -> Option<&Folder> {
        self.folder.as_ref()
    }

    /// Open conversation.
    #[must_use]
    pub const fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// What the conversation list shows.
    #[must_use]
    pub const fn list(&self) -> Option<&ListContext> {
        self.list.as_ref()
    }

    /// Current view mode.
    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    fn commit(&mut self, effects: Vec<Effect>) -> Transition {
        self.version += 1;
        Transition {
            version: self.version,
            changed: true,
            effects,
        }
    }

    /// Switches mode, recording the change in `effects`.
    fn switch_mode(&mut self, mode: ViewMode, effects: &mut Vec<Effect>) {
        if self.view_mode != mode {
            self.view_mode = mode;
            effects.push(Effect::ViewModeChanged(mode));
        }
    }

    /// Selects an account.
    ///
    /// A no-op if `account` is the selected account. Otherwise the folder,
    /// list and conversation are cleared, because they belong to the old
    /// account, and the account's dependent resources must be reloaded.
    pub fn set_account(&mut self, account: Account) -> Transition {
        if self.account.as_ref() == Some(&account) {
            return Transition::unchanged(self.version);
        }
        debug!(account = %account.id, "Selecting account");
        self.account = Some(account);
        self.folder = None;
        self.list = None;
        self.conversation = None;

        let mut effects = vec![
            Effect::ReloadRecentFolders,
            Effect::ReloadSettings,
            Effect::ResolveAccountFolder,
        ];
        self.switch_mode(ViewMode::List, &mut effects);
        self.commit(effects)
    }

    /// Clears the whole selection.
    ///
    /// Used when the provider reports no accounts at all.
    pub fn clear_account(&mut self) -> Transition {
        if self.account.is_none() && self.folder.is_none() && self.list.is_none() {
            return Transition::unchanged(self.version);
        }
        self.account = None;
        self.folder = None;
        self.list = None;
        self.conversation = None;

        let mut effects = Vec::new();
        self.switch_mode(ViewMode::List, &mut effects);
        self.commit(effects)
    }

    /// Selects a folder of the current account.
    ///
    /// A no-op if `folder` is the selected folder.
    ///
    /// # Errors
    ///
    /// Returns an error if no account is selected or the folder belongs to
    /// another account.
    pub fn set_folder(&mut self, folder: Folder) -> Result<Transition> {
        let account = self.account_id().ok_or(ControlError::NoAccount)?;
        if !folder.belongs_to(account) {
            return Err(ControlError::ForeignFolder {
                folder: folder.id,
                account: account.clone(),
            });
        }
        if self.folder.as_ref() == Some(&folder) {
            return Ok(Transition::unchanged(self.version));
        }
        debug!(folder = %folder.id, "Selecting folder");
        self.folder = Some(folder);
        Ok(self.commit(vec![Effect::WatchFolder, Effect::ResolveFolderList]))
    }

    /// Replaces the selected folder's data (sync status, capabilities) with
    /// a fresher snapshot of the same folder.
    ///
    /// Snapshots of any other folder are ignored.
    pub fn update_folder(&mut self, folder: Folder) -> Transition {
        match &mut self.folder {
            Some(current) if *current == folder => {
                *current = folder;
                self.commit(Vec::new())
            }
            _ => Transition::unchanged(self.version),
        }
    }

    /// Clears the selected folder and the list showing it.
    pub fn clear_folder(&mut self) -> Transition {
        if self.folder.is_none() && self.list.is_none() {
            return Transition::unchanged(self.version);
        }
        self.folder = None;
        self.list = None;
        self.conversation = None;

        let mut effects = Vec::new();
        let mode = self.view_mode.list_mode();
        self.switch_mode(mode, &mut effects);
        self.commit(effects)
    }

    /// Replaces the list context.
    ///
    /// A search context moves the view into search mode and a folder
    /// context moves it out of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the context belongs to another account.
    pub fn set_list(&mut self, list: ListContext) -> Result<Transition> {
        let account = self.account_id().ok_or(ControlError::NoAccount)?;
        if &list.account != account {
            return Err(ControlError::ForeignFolder {
                folder: list.list_folder().id.clone(),
                account: account.clone(),
            });
        }
        if self.list.as_ref() == Some(&list) {
            return Ok(Transition::unchanged(self.version));
        }

        let mut effects = Vec::new();
        let mode = match (list.is_search(), self.view_mode) {
            (true, ViewMode::Conversation) => ViewMode::SearchConversation,
            (true, ViewMode::List) => ViewMode::SearchList,
            (false, ViewMode::SearchConversation) => ViewMode::Conversation,
            (false, ViewMode::SearchList) => ViewMode::List,
            (_, mode) => mode,
        };
        self.switch_mode(mode, &mut effects);
        self.list = Some(list);
        Ok(self.commit(effects))
    }

    /// Enters search-list mode, closing any open conversation.
    pub fn enter_search(&mut self) -> Transition {
        if self.view_mode == ViewMode::SearchList && self.conversation.is_none() {
            return Transition::unchanged(self.version);
        }
        self.conversation = None;
        let mut effects = Vec::new();
        self.switch_mode(ViewMode::SearchList, &mut effects);
        self.commit(effects)
    }

    /// Opens a conversation.
    ///
    /// The view moves to search-conversation mode if the list shows search
    /// results, conversation mode otherwise.
    pub fn set_conversation(&mut self, conversation: Conversation) -> Transition {
        let searching = self
            .list
            .as_ref()
            .map_or(self.view_mode.is_search(), ListContext::is_search);
        let mode = if searching {
            ViewMode::SearchConversation
        } else {
            ViewMode::Conversation
        };
        if self.conversation.as_ref() == Some(&conversation) && self.view_mode == mode {
            return Transition::unchanged(self.version);
        }

        self.conversation = Some(conversation);
        let mut effects = Vec::new();
        self.switch_mode(mode, &mut effects);
        self.commit(effects)
    }

    /// Replaces the open conversation's data if `conversation` is it.
    pub fn update_conversation(&mut self, conversation: &Conversation) -> Transition {
        match &mut self.conversation {
            Some(current) if current == conversation => {
                current.clone_from(conversation);
                self.commit(Vec::new())
            }
            _ => Transition::unchanged(self.version),
        }
    }

    /// Leaves the open conversation for the list it came from.
    pub fn navigate_back(&mut self) -> Transition {
        if !self.view_mode.is_conversation() {
            return Transition::unchanged(self.version);
        }
        self.conversation = None;
        let mut effects = Vec::new();
        let mode = self.view_mode.list_mode();
        self.switch_mode(mode, &mut effects);
        self.commit(effects)
    }
}

/// The set of account identifiers seen in the last account-list snapshot.
#[derive(Debug, Clone, Default)]
pub struct AccountRoster {
    known: HashSet<AccountId>,
}

impl AccountRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether an account-list snapshot requires re-deriving the
    /// current account.
    ///
    /// Order is irrelevant: only the set of identifiers matters.
    #[must_use]
    pub fn has_changed(&self, current: Option<&AccountId>, snapshot: &[Account]) -> bool {
        let Some(current) = current else {
            return true;
        };
        if snapshot.is_empty() {
            return true;
        }
        let incoming: HashSet<&AccountId> = snapshot.iter().map(|account| &account.id).collect();
        if incoming.len() != self.known.len() {
            return true;
        }
        if self.known.iter().any(|id| !incoming.contains(id)) {
            return true;
        }
        !incoming.contains(current)
    }

    /// Remembers the identifiers of a snapshot.
    pub fn replace(&mut self, snapshot: &[Account]) {
        self.known = snapshot.iter().map(|account| account.id.clone()).collect();
    }

    /// Picks the account to select from a snapshot.
    ///
    /// Keeps the current account if it is still present, then tries the
    /// preferred one, then falls back to the first entry.
    #[must_use]
    pub fn effective_account(
        current: Option<&AccountId>,
        preferred: Option<&AccountId>,
        snapshot: &[Account],
    ) -> Option<Account> {
        let find = |id: &AccountId| snapshot.iter().find(|account| &account.id == id);
        current
            .and_then(find)
            .or_else(|| preferred.and_then(find))
            .or_else(|| snapshot.first())
            .cloned()
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
    use mailsteer_core::{FolderMembership, ListContext};

    use super::*;

    fn account(id: &str) -> Account {
        Account::new(id, id.to_uppercase())
    }

    fn folder(id: &str, account: &str) -> Folder {
        Folder::new(id, AccountId::new(account), id)
    }

    fn conversation(id: &str) -> Conversation {
        Conversation::new(id, "Subject", FolderMembership::default())
    }

    mod account_tests {
        use super::*;

        #[test]
        fn set_account_requests_reloads() {
            let mut state = SelectionState::new();
            let transition = state.set_account(account("x"));
            assert!(transition.changed);
            assert_eq!(
                transition.effects,
                vec![
                    Effect::ReloadRecentFolders,
                    Effect::ReloadSettings,
                    Effect::ResolveAccountFolder
                ]
            );
        }

        #[test]
        fn set_account_twice_changes_once() {
            let mut state = SelectionState::new();
            let first = state.set_account(account("x"));
            let second = state.set_account(account("x"));
            assert!(first.changed);
            assert!(!second.changed);
            assert!(second.effects.is_empty());
            assert_eq!(state.version(), 1);
        }

        #[test]
        fn identity_not_display_data_decides() {
            let mut state = SelectionState::new();
            state.set_account(Account::new("x", "Work"));
            let transition = state.set_account(Account::new("x", "Renamed"));
            assert!(!transition.changed);
        }

        #[test]
        fn account_change_clears_folder() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state.set_folder(folder("f1", "x")).unwrap();

            let transition = state.set_account(account("y"));
            assert!(transition.requires(Effect::ResolveAccountFolder));
            assert!(state.folder().is_none());
            assert!(state.list().is_none());
        }

        #[test]
        fn account_change_closes_conversation() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state.set_conversation(conversation("c1"));

            let transition = state.set_account(account("y"));
            assert!(transition.requires(Effect::ViewModeChanged(ViewMode::List)));
            assert!(state.conversation().is_none());
        }

        #[test]
        fn clear_account() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state.set_folder(folder("f1", "x")).unwrap();
            assert!(state.clear_account().changed);
            assert!(state.account().is_none());
            assert!(state.folder().is_none());
            assert!(!state.clear_account().changed);
        }
    }

    mod folder_tests {
        use super::*;

        #[test]
        fn set_folder_requests_list_resolution() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            let transition = state.set_folder(folder("f1", "x")).unwrap();
            assert_eq!(
                transition.effects,
                vec![Effect::WatchFolder, Effect::ResolveFolderList]
            );
        }

        #[test]
        fn same_folder_is_noop() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state.set_folder(folder("f1", "x")).unwrap();
            let version = state.version();
            let transition = state.set_folder(folder("f1", "x")).unwrap();
            assert!(!transition.changed);
            assert_eq!(state.version(), version);
        }

        #[test]
        fn foreign_folder_is_rejected() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            let err = state.set_folder(folder("f1", "y")).unwrap_err();
            assert!(matches!(err, ControlError::ForeignFolder { .. }));
            assert!(state.folder().is_none());
        }

        #[test]
        fn folder_without_account_is_rejected() {
            let mut state = SelectionState::new();
            assert!(matches!(
                state.set_folder(folder("f1", "x")),
                Err(ControlError::NoAccount)
            ));
        }

        #[test]
        fn update_folder_only_touches_selected() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state.set_folder(folder("f1", "x")).unwrap();

            let syncing = folder("f1", "x").with_sync_status(mailsteer_core::SyncStatus::Syncing);
            assert!(state.update_folder(syncing).changed);
            assert!(state.folder().unwrap().sync_status.is_in_progress());

            assert!(!state.update_folder(folder("f2", "x")).changed);
        }
    }

    mod view_mode_tests {
        use super::*;

        #[test]
        fn conversation_from_folder_list() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state
                .set_list(ListContext::folder(AccountId::new("x"), folder("f1", "x")))
                .unwrap();

            let transition = state.set_conversation(conversation("c1"));
            assert_eq!(
                transition.effects,
                vec![Effect::ViewModeChanged(ViewMode::Conversation)]
            );
        }

        #[test]
        fn conversation_from_search() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state.enter_search();
            state
                .set_list(ListContext::search(
                    AccountId::new("x"),
                    folder("results", "x"),
                    "invoices",
                ))
                .unwrap();

            state.set_conversation(conversation("c1"));
            assert_eq!(state.view_mode(), ViewMode::SearchConversation);

            let back = state.navigate_back();
            assert_eq!(back.effects, vec![Effect::ViewModeChanged(ViewMode::SearchList)]);
            assert!(state.conversation().is_none());
        }

        #[test]
        fn navigate_back_from_list_is_noop() {
            let mut state = SelectionState::new();
            assert!(!state.navigate_back().changed);
        }

        #[test]
        fn folder_list_leaves_search_mode() {
            let mut state = SelectionState::new();
            state.set_account(account("x"));
            state.enter_search();
            let transition = state
                .set_list(ListContext::folder(AccountId::new("x"), folder("f1", "x")))
                .unwrap();
            assert_eq!(transition.effects, vec![Effect::ViewModeChanged(ViewMode::List)]);
        }

        #[test]
        fn update_conversation_replaces_data() {
            let mut state = SelectionState::new();
            state.set_conversation(conversation("c1"));
            let mut flagged = conversation("c1");
            flagged.pending_local_delete = true;
            assert!(state.update_conversation(&flagged).changed);
            assert!(state.conversation().unwrap().pending_local_delete);
            assert!(!state.update_conversation(&conversation("c2")).changed);
        }
    }

    mod roster_tests {
        use super::*;

        fn roster(ids: &[&str]) -> AccountRoster {
            let mut roster = AccountRoster::new();
            let accounts: Vec<_> = ids.iter().map(|id| account(id)).collect();
            roster.replace(&accounts);
            roster
        }

        #[test]
        fn reordered_snapshot_is_unchanged() {
            let roster = roster(&["a", "b"]);
            let current = AccountId::new("a");
            assert!(!roster.has_changed(Some(&current), &[account("b"), account("a")]));
        }

        #[test]
        fn added_account_is_changed() {
            let roster = roster(&["a", "b"]);
            let current = AccountId::new("a");
            assert!(roster.has_changed(
                Some(&current),
                &[account("a"), account("b"), account("c")]
            ));
        }

        #[test]
        fn replaced_account_is_changed() {
            let roster = roster(&["a", "b"]);
            let current = AccountId::new("a");
            assert!(roster.has_changed(Some(&current), &[account("a"), account("c")]));
        }

        #[test]
        fn missing_current_is_changed() {
            let roster = roster(&["a", "b"]);
            let current = AccountId::new("z");
            assert!(roster.has_changed(Some(&current), &[account("a"), account("b")]));
        }

        #[test]
        fn no_selection_is_changed() {
            let roster = roster(&["a"]);
            assert!(roster.has_changed(None, &[account("a")]));
        }

        #[test]
        fn empty_snapshot_is_changed() {
            let roster = roster(&[]);
            let current = AccountId::new("a");
            assert!(roster.has_changed(Some(&current), &[]));
        }

        #[test]
        fn effective_account_prefers_current() {
            let snapshot = [account("a"), account("b")];
            let current = AccountId::new("b");
            let chosen = AccountRoster::effective_account(Some(&current), None, &snapshot);
            assert_eq!(chosen.unwrap().id, current);
        }

        #[test]
        fn effective_account_uses_preferred_then_first() {
            let snapshot = [account("a"), account("b")];
            let gone = AccountId::new("z");
            let preferred = AccountId::new("b");

            let chosen = AccountRoster::effective_account(Some(&gone), Some(&preferred), &snapshot);
            assert_eq!(chosen.unwrap().id, preferred);

            let chosen = AccountRoster::effective_account(Some(&gone), None, &snapshot);
            assert_eq!(chosen.unwrap().id, AccountId::new("a"));

            assert!(AccountRoster::effective_account(None, None, &[]).is_none());
        }
    }
}
