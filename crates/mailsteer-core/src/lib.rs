//! # mailsteer-core
//!
//! Data model and collaborator contracts for the `MailSteer` control layer.
//!
//! This crate provides:
//! - Domain models (accounts, folders, conversations, list contexts)
//! - The [`DataProvider`] trait the control layer queries and mutates through
//! - The [`DataWatcher`] push channel used by providers to deliver snapshots
//! - [`MemoryProvider`], an in-memory provider for hosts without a backing store

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod memory;
pub mod model;
pub mod provider;
pub mod watcher;

pub use error::{Error, Result};
pub use memory::{Fixture, MemoryProvider, ProviderCall};
pub use model::{
    Account, AccountCapability, AccountId, ActionKind, Conversation, ConversationId, Folder,
    FolderCapability, FolderId, FolderMembership, ListContext, ListTarget, Priority, Settings,
    SyncStatus, UndoOperation,
};
pub use provider::{BooleanField, DataProvider, IntField, Resource};
pub use watcher::{DataWatcher, ResourceKind, Snapshot};
