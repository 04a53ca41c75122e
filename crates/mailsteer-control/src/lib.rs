//! # mailsteer-control
//!
//! The control layer of the `MailSteer` mail client: it keeps account,
//! folder and conversation selection consistent with the data provider,
//! supervises background fetches, and sequences destructive actions.
//!
//! This crate provides:
//! - [`Controller`], the single owner of control state, and its
//!   [`ControlHandle`] for posting [`Event`]s
//! - [`TaskSupervisor`], at most one live fetch per [`FetchKind`]
//! - [`SelectionState`], a versioned selection whose mutators return
//!   [`Transition`]s
//! - [`DestructiveActionCoordinator`], confirmation → removal → mutation → undo
//! - Surface traits the controller drives
//! - Persisted control state and configuration
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use mailsteer_control::{ControlConfig, Controller};
//! use mailsteer_core::{Fixture, MemoryProvider};
//!
//! let provider = Arc::new(MemoryProvider::from_fixture(Fixture::default()));
//! let mut controller = Controller::new(provider, &ControlConfig::default());
//! controller.start();
//! controller.run().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod destructive;
mod error;
pub mod event;
pub mod recent;
pub mod selection;
pub mod state;
pub mod supervisor;
pub mod surface;

pub use config::ControlConfig;
pub use controller::Controller;
pub use destructive::{
    ActionId, ActionOutcome, ConfirmRequest, DestructiveAction, DestructiveActionCoordinator,
    Mutation, Phase, RemovalRequest, Step,
};
pub use error::{ActionFailed, ControlError, Result};
pub use event::{ControlHandle, ConversationUpdate, Event};
pub use recent::RecentFolders;
pub use selection::{AccountRoster, Effect, SelectionState, Transition, ViewMode};
pub use state::{ControlSnapshot, ListDescriptor, StateStore};
pub use supervisor::{FetchCompletion, FetchKind, FetchTicket, GenerationTable, TaskSupervisor};
pub use surface::{ActionBarSurface, FolderListSurface, Host, ListSurface};
