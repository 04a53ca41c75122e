//! Events posted to the controller.

use mailsteer_core::{AccountId, Conversation, Folder, FolderId, Snapshot};
use tokio::sync::mpsc;

use crate::destructive::{ActionId, DestructiveAction};

/// A non-destructive change to the open conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationUpdate {
    /// Mark as unread.
    MarkUnread,
    /// Mark as important.
    MarkImportant,
    /// Mark as not important.
    MarkNotImportant,
}

/// Input to the controller's event loop.
#[derive(Debug)]
pub enum Event {
    /// A watched resource delivered a snapshot.
    Snapshot(Snapshot),
    /// The user picked an account.
    SelectAccount(AccountId),
    /// The user picked a folder from the folder list.
    SelectFolder(Folder),
    /// The user asked for a folder by identifier.
    OpenFolder(FolderId),
    /// The user opened a conversation.
    SelectConversation(Conversation),
    /// The user ran a search.
    Search(String),
    /// Show the current account's inbox.
    LoadInbox,
    /// Sync the selected folder now.
    RefreshFolder,
    /// Leave the open conversation.
    NavigateBack,
    /// Run a destructive action on the open conversation.
    RequestAction(DestructiveAction),
    /// Apply a non-destructive change to the open conversation.
    UpdateConversation(ConversationUpdate),
    /// The user answered a confirmation.
    ConfirmationResolved {
        /// Action the answer is for.
        action: ActionId,
        /// Whether the user confirmed.
        accepted: bool,
    },
    /// The list surface finished presenting a removal.
    RemovalFinished(ActionId),
    /// A destructive action's durable mutation finished.
    MutationFinished {
        /// Action the mutation belongs to.
        action: ActionId,
        /// Provider result.
        result: mailsteer_core::Result<()>,
    },
    /// A non-destructive update finished.
    UpdateFinished {
        /// What was updated.
        update: ConversationUpdate,
        /// Provider result.
        result: mailsteer_core::Result<()>,
    },
    /// A queued recent-folder write for the account reached the provider.
    RecentFolderRecorded(AccountId),
    /// Stop the event loop.
    Shutdown,
}

/// Posts events to a controller from any thread.
///
/// Cheap to clone. Posting never blocks; events are handled in order on the
/// controller's own task.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl ControlHandle {
    pub(crate) const fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    /// Posts an event.
    ///
    /// Returns false if the controller is gone.
    pub fn post(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Selects an account.
    pub fn select_account(&self, account: AccountId) -> bool {
        self.post(Event::SelectAccount(account))
    }

    /// Selects a folder.
    pub fn select_folder(&self, folder: Folder) -> bool {
        self.post(Event::SelectFolder(folder))
    }

    /// Opens a conversation.
    pub fn select_conversation(&self, conversation: Conversation) -> bool {
        self.post(Event::SelectConversation(conversation))
    }

    /// Requests a destructive action on the open conversation.
    pub fn request_action(&self, action: DestructiveAction) -> bool {
        self.post(Event::RequestAction(action))
    }

    /// Answers a confirmation.
    pub fn resolve_confirmation(&self, action: ActionId, accepted: bool) -> bool {
        self.post(Event::ConfirmationResolved { action, accepted })
    }

    /// Reports that a removal presentation finished.
    pub fn removal_finished(&self, action: ActionId) -> bool {
        self.post(Event::RemovalFinished(action))
    }

    /// Stops the controller.
    pub fn shutdown(&self) -> bool {
        self.post(Event::Shutdown)
    }
}
