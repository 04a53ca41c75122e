//! Data models shared by the provider and the control layer.

mod account;
mod conversation;
mod folder;
mod list_context;
mod settings;
mod undo;

pub use account::{Account, AccountCapability, AccountId};
pub use conversation::{Conversation, ConversationId, FolderMembership, Priority};
pub use folder::{Folder, FolderCapability, FolderId, SyncStatus};
pub use list_context::{ListContext, ListTarget};
pub use settings::Settings;
pub use undo::{ActionKind, UndoOperation};
