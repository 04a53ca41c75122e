//! Surfaces that render to the terminal.

use mailsteer_control::{
    ActionBarSurface, ActionFailed, ConfirmRequest, ControlHandle, FetchKind, FolderListSurface,
    Host, ListSurface, RemovalRequest, ViewMode,
};
use mailsteer_core::{
    Account, Conversation, Error, Folder, ListContext, ListTarget, SyncStatus, UndoOperation,
};
use tracing::debug;

/// Conversation list.
///
/// There is no animation in a terminal, so removals are acknowledged as
/// soon as they are requested.
pub struct ConsoleList {
    handle: ControlHandle,
}

impl ConsoleList {
    /// Creates a list that acknowledges removals through `handle`.
    pub const fn new(handle: ControlHandle) -> Self {
        Self { handle }
    }
}

impl ListSurface for ConsoleList {
    fn show_list(&mut self, list: &ListContext) {
        match &list.target {
            ListTarget::Folder { folder } => {
                println!("[{}] listing {} ({})", list.account, folder.name, folder.id);
            }
            ListTarget::Search { query, results } => {
                println!("[{}] search '{query}' in {}", list.account, results.id);
            }
        }
    }

    fn on_folder_updated(&mut self, folder: &Folder) {
        debug!(folder = %folder.id, status = ?folder.sync_status, "Folder updated");
    }

    fn on_undo_available(&mut self, undo: UndoOperation) {
        println!("{} {} conversation(s). (undo available)", undo.kind, undo.count);
    }

    fn request_list_refresh(&mut self) {
        debug!("List refresh requested");
    }

    fn request_delete(&mut self, request: RemovalRequest) {
        println!("removing '{}' ({})", request.conversation.subject, request.kind);
        self.handle.removal_finished(request.action);
    }

    fn on_action_complete(&mut self) {
        debug!("Removal presented");
    }
}

/// Action bar.
#[derive(Default)]
pub struct ConsoleActionBar;

impl ActionBarSurface for ConsoleActionBar {
    fn set_account(&mut self, account: Option<&Account>) {
        match account {
            Some(account) => println!("account: {} <{}>", account.name, account.id),
            None => println!("account: none"),
        }
    }

    fn set_accounts(&mut self, accounts: &[Account]) {
        let ids: Vec<_> = accounts.iter().map(|account| account.id.to_string()).collect();
        println!("accounts: {}", ids.join(", "));
    }

    fn set_folder(&mut self, folder: Option<&Folder>) {
        if let Some(folder) = folder {
            println!("folder: {}", folder.name);
        }
    }

    fn on_refresh_started(&mut self) {
        println!("syncing...");
    }

    fn on_refresh_stopped(&mut self, status: SyncStatus) {
        if status == SyncStatus::Failed {
            println!("sync failed");
        }
    }

    fn set_recent_folders(&mut self, folders: &[Folder]) {
        if !folders.is_empty() {
            let names: Vec<_> = folders.iter().map(|folder| folder.name.as_str()).collect();
            println!("recent: {}", names.join(", "));
        }
    }
}

/// Folder list.
#[derive(Default)]
pub struct ConsoleFolders;

impl FolderListSurface for ConsoleFolders {
    fn select_folder(&mut self, folder: Option<&Folder>) {
        debug!(folder = ?folder.map(|folder| &folder.id), "Folder highlighted");
    }
}

/// Prompts and errors.
#[derive(Default)]
pub struct ConsoleHost;

impl Host for ConsoleHost {
    fn confirm_action(&mut self, request: &ConfirmRequest) {
        let n = request.action.0;
        println!(
            "{} '{}'? answer 'confirm {n}' or 'cancel {n}'",
            request.kind, request.conversation.subject
        );
    }

    fn show_conversation(&mut self, conversation: &Conversation) {
        println!("> {} ({})", conversation.subject, conversation.id);
    }

    fn view_mode_changed(&mut self, mode: ViewMode) {
        debug!(?mode, "View mode");
    }

    fn on_action_failed(&mut self, failure: &ActionFailed) {
        println!("error: {failure}");
    }

    fn on_fetch_failed(&mut self, kind: FetchKind, error: &Error) {
        println!("error: {kind:?} failed: {error}");
    }
}
