//! Error types for the control layer.

use thiserror::Error;

use mailsteer_core::{AccountId, ActionKind, Conversation, FolderId};

use crate::destructive::ActionId;

/// Errors that can occur in control operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A folder was selected that does not belong to the current account.
    #[error("Folder {folder} does not belong to account {account}")]
    ForeignFolder {
        /// Folder that was selected.
        folder: FolderId,
        /// Current account.
        account: AccountId,
    },

    /// A folder was selected with no account selected.
    #[error("No account selected")]
    NoAccount,

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A destructive action whose durable mutation failed.
///
/// No undo operation is registered for a failed action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} ({action}) failed: {error}")]
pub struct ActionFailed {
    /// Action that failed.
    pub action: ActionId,
    /// What the action was.
    pub kind: ActionKind,
    /// The conversation as it stands after the failure, no longer flagged
    /// for local deletion.
    pub conversation: Conversation,
    /// Error reported by the provider.
    pub error: mailsteer_core::Error,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, ControlError>;
