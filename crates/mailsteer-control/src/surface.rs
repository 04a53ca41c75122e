//! Contracts for the visual surfaces the controller drives.
//!
//! Surfaces render; the controller decides. A surface never mutates control
//! state directly: anything it has to report (a finished removal, a user's
//! confirmation) goes back through a [`ControlHandle`](crate::ControlHandle).

use mailsteer_core::{Account, Conversation, Folder, ListContext, SyncStatus, UndoOperation};

use crate::destructive::{ConfirmRequest, RemovalRequest};
use crate::selection::ViewMode;
use crate::supervisor::FetchKind;

/// The conversation list.
pub trait ListSurface: Send {
    /// Shows the conversations of a list context.
    fn show_list(&mut self, list: &ListContext);

    /// The listed folder's state changed.
    fn on_folder_updated(&mut self, folder: &Folder);

    /// A completed action can be undone.
    fn on_undo_available(&mut self, undo: UndoOperation);

    /// The list content is stale and must be reloaded.
    fn request_list_refresh(&mut self);

    /// Presents the removal of a conversation.
    ///
    /// Once the presentation has finished the surface must report it exactly
    /// once with [`ControlHandle::removal_finished`](crate::ControlHandle::removal_finished).
    fn request_delete(&mut self, request: RemovalRequest);

    /// The durable part of a removal is about to run.
    fn on_action_complete(&mut self);
}

/// The action bar.
pub trait ActionBarSurface: Send {
    /// The selected account changed.
    fn set_account(&mut self, account: Option<&Account>);

    /// The account list changed.
    fn set_accounts(&mut self, accounts: &[Account]);

    /// The selected folder changed.
    fn set_folder(&mut self, folder: Option<&Folder>);

    /// The selected folder started syncing.
    fn on_refresh_started(&mut self);

    /// The selected folder is not syncing.
    fn on_refresh_stopped(&mut self, status: SyncStatus);

    /// The recent-folders list changed.
    fn set_recent_folders(&mut self, folders: &[Folder]);
}

/// The folder list.
pub trait FolderListSurface: Send {
    /// Highlights the selected folder, or nothing.
    fn select_folder(&mut self, folder: Option<&Folder>);
}

/// The application hosting the controller.
///
/// Every method but [`Host::confirm_action`] has a no-op default so hosts
/// only implement what they present.
pub trait Host: Send {
    /// Asks the user to confirm an action.
    ///
    /// The answer must go back through
    /// [`ControlHandle::resolve_confirmation`](crate::ControlHandle::resolve_confirmation);
    /// until it does, no other action can start on the conversation.
    fn confirm_action(&mut self, request: &ConfirmRequest);

    /// A conversation was opened.
    fn show_conversation(&mut self, conversation: &Conversation) {
        let _ = conversation;
    }

    /// The view mode changed.
    fn view_mode_changed(&mut self, mode: ViewMode) {
        let _ = mode;
    }

    /// A destructive action failed; nothing was registered for undo.
    fn on_action_failed(&mut self, failure: &crate::ActionFailed) {
        let _ = failure;
    }

    /// A background fetch failed.
    fn on_fetch_failed(&mut self, kind: FetchKind, error: &mailsteer_core::Error) {
        let _ = (kind, error);
    }
}
