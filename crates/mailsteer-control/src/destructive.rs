//! Sequencing of destructive conversation actions.
//!
//! A destructive action walks through
//! `Requested → ConfirmPending? → AnimationPending → Applying → Completed`.
//! The coordinator is a pure state machine: it never calls the provider or
//! a surface itself. Each entry point returns a [`Step`] telling the caller
//! what to do next, and the caller reports back with the [`ActionId`] it was
//! handed. Several actions may be pending at once, e.g. a second delete
//! started while the first one's undo window is still open.
//!
//! The durable mutation is only released by
//! [`DestructiveActionCoordinator::removal_finished`], so it can never run
//! before the list surface has acknowledged the visual removal.

use std::collections::HashMap;
use std::fmt;

use mailsteer_core::{
    ActionKind, Conversation, ConversationId, Folder, FolderCapability, FolderMembership,
    Settings, UndoOperation,
};
use tracing::{debug, warn};

use crate::error::ActionFailed;

/// Identifies one invocation of a destructive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action #{}", self.0)
    }
}

/// A user action that may remove a conversation from the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestructiveAction {
    /// Archive.
    Archive,
    /// Delete.
    Delete,
    /// Mute.
    Mute,
    /// Report as spam.
    ReportSpam,
    /// Replace the conversation's folder membership.
    ChangeFolders(FolderMembership),
}

impl DestructiveAction {
    /// The undo kind recorded for this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Archive => ActionKind::Archive,
            Self::Delete => ActionKind::Delete,
            Self::Mute => ActionKind::Mute,
            Self::ReportSpam => ActionKind::ReportSpam,
            Self::ChangeFolders(_) => ActionKind::FolderChange,
        }
    }

    /// Whether the user's settings require confirmation first.
    #[must_use]
    pub fn needs_confirmation(&self, settings: Option<&Settings>) -> bool {
        settings.is_some_and(|settings| match self {
            Self::Archive => settings.confirm_archive,
            Self::Delete => settings.confirm_delete,
            Self::Mute | Self::ReportSpam | Self::ChangeFolders(_) => false,
        })
    }

    /// Whether completing the action leaves the conversation view.
    const fn navigates_back(&self) -> bool {
        !matches!(self, Self::ChangeFolders(_))
    }
}

/// Where a pending action stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to confirm.
    ConfirmPending,
    /// Waiting for the list surface to finish its removal presentation.
    AnimationPending,
    /// The durable mutation is running.
    Applying,
}

/// Asks the host to confirm an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    /// Action awaiting confirmation.
    pub action: ActionId,
    /// What the action is.
    pub kind: ActionKind,
    /// Conversation it applies to.
    pub conversation: Conversation,
}

/// Asks the list surface to present a conversation's removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRequest {
    /// Action to acknowledge once the removal has been presented.
    pub action: ActionId,
    /// What the action is.
    pub kind: ActionKind,
    /// Conversation being removed, flagged for local deletion.
    pub conversation: Conversation,
}

/// A durable mutation the caller must run against the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Action the mutation belongs to.
    pub action: ActionId,
    /// What to do.
    pub operation: DestructiveAction,
    /// Conversations to mutate.
    pub conversations: Vec<Conversation>,
}

/// What the caller must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Ask the user for confirmation.
    Confirm(ConfirmRequest),
    /// Have the list surface present the removal, then report back.
    AwaitRemoval(RemovalRequest),
    /// Run the mutation now.
    Apply(Mutation),
    /// Nothing to do; the action is gone.
    Discarded,
}

/// Follow-up work for a completed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Action that completed.
    pub action: ActionId,
    /// Conversation it applied to.
    pub conversation: ConversationId,
    /// Undo record to offer, for destructive changes.
    pub undo: Option<UndoOperation>,
    /// Whether the list must be refreshed.
    pub refresh_list: bool,
    /// Whether the view must return from the conversation to the list.
    pub navigate_back: bool,
}

#[derive(Debug)]
struct PendingAction {
    operation: DestructiveAction,
    conversation: Conversation,
    active_folder: Option<Folder>,
    destructive: bool,
    phase: Phase,
}

/// Drives destructive actions from request to completion.
#[derive(Debug, Default)]
pub struct DestructiveActionCoordinator {
    next_id: u64,
    pending: HashMap<ActionId, PendingAction>,
}

impl DestructiveActionCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actions that have not completed.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Phase of a pending action.
    #[must_use]
    pub fn phase(&self, action: ActionId) -> Option<Phase> {
        self.pending.get(&action).map(|pending| pending.phase)
    }

    /// Returns true if a mutation is running.
    #[must_use]
    pub fn is_applying(&self) -> bool {
        self.pending
            .values()
            .any(|pending| pending.phase == Phase::Applying)
    }

    /// Requests `operation` on `conversation`.
    ///
    /// `active_folder` is the folder the list is showing; a folder change is
    /// destructive only if it takes the conversation out of that folder.
    /// A conversation with an action already underway is left alone.
    pub fn request(
        &mut self,
        operation: DestructiveAction,
        conversation: Conversation,
        active_folder: Option<&Folder>,
        settings: Option<&Settings>,
    ) -> Step {
        if self
            .pending
            .values()
            .any(|pending| pending.conversation == conversation)
        {
            debug!(conversation = %conversation.id, "Action already underway, ignoring request");
            return Step::Discarded;
        }

        self.next_id += 1;
        let id = ActionId(self.next_id);
        let destructive = match &operation {
            DestructiveAction::ChangeFolders(membership) => {
                active_folder.is_some_and(|folder| !membership.contains(&folder.id))
            }
            _ => true,
        };
        let confirm = operation.needs_confirmation(settings);
        debug!(
            %id,
            kind = %operation.kind(),
            conversation = %conversation.id,
            destructive,
            confirm,
            "Destructive action requested"
        );

        self.pending.insert(
            id,
            PendingAction {
                operation,
                conversation,
                active_folder: active_folder.cloned(),
                destructive,
                phase: Phase::ConfirmPending,
            },
        );

        if confirm {
            self.confirm_step(id)
        } else if destructive {
            self.begin_removal(id)
        } else {
            // Nothing leaves the list, so there is no removal to wait for.
            self.begin_applying(id).map_or(Step::Discarded, Step::Apply)
        }
    }

    /// Records the user's answer to a confirmation.
    pub fn resolve_confirmation(&mut self, action: ActionId, accepted: bool) -> Step {
        if self.phase(action) != Some(Phase::ConfirmPending) {
            debug!(%action, "Confirmation for an action not awaiting one");
            return Step::Discarded;
        }
        if !accepted {
            debug!(%action, "Confirmation declined");
            self.pending.remove(&action);
            return Step::Discarded;
        }
        self.begin_removal(action)
    }

    /// Records that the list surface finished presenting the removal.
    ///
    /// Returns the mutation to run, or `None` if the action is not waiting
    /// for a removal (unknown, or already acknowledged).
    pub fn removal_finished(&mut self, action: ActionId) -> Option<Mutation> {
        if self.phase(action) != Some(Phase::AnimationPending) {
            debug!(%action, "Removal acknowledgment for an action not awaiting one");
            return None;
        }
        self.begin_applying(action)
    }

    /// Records the result of the durable mutation.
    ///
    /// Returns `None` for an unknown action. On failure no undo record is
    /// produced, the action is dropped, and the returned conversation has
    /// its local-deletion flag cleared.
    pub fn mutation_finished(
        &mut self,
        action: ActionId,
        result: mailsteer_core::Result<()>,
    ) -> Option<Result<ActionOutcome, ActionFailed>> {
        if self.phase(action) != Some(Phase::Applying) {
            debug!(%action, "Mutation result for an action not applying");
            return None;
        }
        let pending = self.pending.remove(&action)?;
        let kind = pending.operation.kind();

        if let Err(error) = result {
            warn!(%action, %kind, %error, "Destructive action failed");
            let mut conversation = pending.conversation;
            conversation.pending_local_delete = false;
            return Some(Err(ActionFailed {
                action,
                kind,
                conversation,
                error,
            }));
        }

        debug!(%action, %kind, "Destructive action completed");
        Some(Ok(ActionOutcome {
            action,
            conversation: pending.conversation.id,
            undo: pending.destructive.then_some(UndoOperation::new(1, kind)),
            refresh_list: true,
            navigate_back: pending.operation.navigates_back(),
        }))
    }

    fn confirm_step(&self, action: ActionId) -> Step {
        self.pending
            .get(&action)
            .map_or(Step::Discarded, |pending| {
                Step::Confirm(ConfirmRequest {
                    action,
                    kind: pending.operation.kind(),
                    conversation: pending.conversation.clone(),
                })
            })
    }

    fn begin_removal(&mut self, action: ActionId) -> Step {
        let Some(pending) = self.pending.get_mut(&action) else {
            return Step::Discarded;
        };
        pending.phase = Phase::AnimationPending;
        if !matches!(pending.operation, DestructiveAction::Mute) {
            pending.conversation.pending_local_delete = true;
        }
        Step::AwaitRemoval(RemovalRequest {
            action,
            kind: pending.operation.kind(),
            conversation: pending.conversation.clone(),
        })
    }

    fn begin_applying(&mut self, action: ActionId) -> Option<Mutation> {
        let pending = self.pending.get_mut(&action)?;
        pending.phase = Phase::Applying;
        if matches!(pending.operation, DestructiveAction::Mute)
            && pending
                .active_folder
                .as_ref()
                .is_some_and(|folder| folder.supports(FolderCapability::DestructiveMute))
        {
            pending.conversation.pending_local_delete = true;
        }
        Some(Mutation {
            action,
            operation: pending.operation.clone(),
            conversations: vec![pending.conversation.clone()],
        })
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
    use mailsteer_core::{AccountId, FolderId};

    use super::*;

    fn inbox() -> Folder {
        Folder::new("inbox", AccountId::new("work"), "Inbox").inbox()
    }

    fn conversation() -> Conversation {
        Conversation::new("c1", "Hello", FolderMembership::parse("inbox"))
    }

    fn removal(step: Step) -> RemovalRequest {
        match step {
            Step::AwaitRemoval(request) => request,
            other => panic!("expected removal, got {other:?}"),
        }
    }

    mod confirmation_tests {
        use super::*;

        #[test]
        fn delete_confirms_when_configured() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let settings = Settings::confirm_all();
            let step = coordinator.request(
                DestructiveAction::Delete,
                conversation(),
                Some(&inbox()),
                Some(&settings),
            );
            let Step::Confirm(request) = step else {
                panic!("expected confirmation");
            };
            assert_eq!(request.kind, ActionKind::Delete);
            assert_eq!(coordinator.phase(request.action), Some(Phase::ConfirmPending));
        }

        #[test]
        fn declined_confirmation_discards() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let settings = Settings::confirm_all();
            let Step::Confirm(request) = coordinator.request(
                DestructiveAction::Delete,
                conversation(),
                Some(&inbox()),
                Some(&settings),
            ) else {
                panic!("expected confirmation");
            };

            let step = coordinator.resolve_confirmation(request.action, false);
            assert_eq!(step, Step::Discarded);
            assert_eq!(coordinator.pending_count(), 0);
            assert!(coordinator.removal_finished(request.action).is_none());
        }

        #[test]
        fn accepted_confirmation_awaits_removal() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let settings = Settings::confirm_all();
            let Step::Confirm(request) = coordinator.request(
                DestructiveAction::Archive,
                conversation(),
                Some(&inbox()),
                Some(&settings),
            ) else {
                panic!("expected confirmation");
            };

            let removal = removal(coordinator.resolve_confirmation(request.action, true));
            assert!(removal.conversation.pending_local_delete);
        }

        #[test]
        fn mute_and_spam_never_confirm() {
            let settings = Settings::confirm_all();
            assert!(!DestructiveAction::Mute.needs_confirmation(Some(&settings)));
            assert!(!DestructiveAction::ReportSpam.needs_confirmation(Some(&settings)));
            assert!(!DestructiveAction::Delete.needs_confirmation(None));
        }
    }

    mod ordering_tests {
        use super::*;

        #[test]
        fn mutation_waits_for_removal() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let request = removal(coordinator.request(
                DestructiveAction::Archive,
                conversation(),
                Some(&inbox()),
                None,
            ));
            assert_eq!(
                coordinator.phase(request.action),
                Some(Phase::AnimationPending)
            );
            // No mutation result is accepted before the removal is done.
            assert!(coordinator.mutation_finished(request.action, Ok(())).is_none());

            let mutation = coordinator.removal_finished(request.action).unwrap();
            assert_eq!(mutation.operation, DestructiveAction::Archive);
            assert_eq!(mutation.conversations.len(), 1);
            assert!(coordinator.removal_finished(request.action).is_none());
        }

        #[test]
        fn archive_completes_with_undo() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let request = removal(coordinator.request(
                DestructiveAction::Archive,
                conversation(),
                Some(&inbox()),
                None,
            ));
            coordinator.removal_finished(request.action).unwrap();

            let outcome = coordinator
                .mutation_finished(request.action, Ok(()))
                .unwrap()
                .unwrap();
            assert_eq!(outcome.undo, Some(UndoOperation::new(1, ActionKind::Archive)));
            assert!(outcome.refresh_list);
            assert!(outcome.navigate_back);
            assert_eq!(coordinator.pending_count(), 0);
        }

        #[test]
        fn failed_mutation_has_no_undo() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let request = removal(coordinator.request(
                DestructiveAction::Delete,
                conversation(),
                Some(&inbox()),
                None,
            ));
            coordinator.removal_finished(request.action).unwrap();

            let error = mailsteer_core::Error::Provider("offline".into());
            let failed = coordinator
                .mutation_finished(request.action, Err(error.clone()))
                .unwrap()
                .unwrap_err();
            assert_eq!(failed.kind, ActionKind::Delete);
            assert_eq!(failed.error, error);
            assert_eq!(failed.conversation.id, conversation().id);
            assert!(!failed.conversation.pending_local_delete);
            assert_eq!(coordinator.pending_count(), 0);
        }

        #[test]
        fn concurrent_actions_are_independent() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let first = removal(coordinator.request(
                DestructiveAction::Archive,
                conversation(),
                Some(&inbox()),
                None,
            ));
            let other = Conversation::new("c2", "Other", FolderMembership::parse("inbox"));
            let second = removal(coordinator.request(
                DestructiveAction::Delete,
                other,
                Some(&inbox()),
                None,
            ));
            assert_ne!(first.action, second.action);

            coordinator.removal_finished(second.action).unwrap();
            assert_eq!(coordinator.phase(first.action), Some(Phase::AnimationPending));
            assert!(coordinator.is_applying());
        }

        #[test]
        fn same_conversation_twice_is_discarded() {
            let mut coordinator = DestructiveActionCoordinator::new();
            removal(coordinator.request(
                DestructiveAction::Archive,
                conversation(),
                Some(&inbox()),
                None,
            ));
            let step = coordinator.request(
                DestructiveAction::Delete,
                conversation(),
                Some(&inbox()),
                None,
            );
            assert_eq!(step, Step::Discarded);
        }
    }

    mod mute_tests {
        use super::*;

        #[test]
        fn mute_flags_only_with_destructive_mute() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let folder = inbox().with_capability(FolderCapability::DestructiveMute);
            let request = removal(coordinator.request(
                DestructiveAction::Mute,
                conversation(),
                Some(&folder),
                None,
            ));
            assert!(!request.conversation.pending_local_delete);

            let mutation = coordinator.removal_finished(request.action).unwrap();
            assert!(mutation.conversations[0].pending_local_delete);
        }

        #[test]
        fn plain_mute_is_not_flagged() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let request = removal(coordinator.request(
                DestructiveAction::Mute,
                conversation(),
                Some(&inbox()),
                None,
            ));
            let mutation = coordinator.removal_finished(request.action).unwrap();
            assert!(!mutation.conversations[0].pending_local_delete);

            let outcome = coordinator
                .mutation_finished(request.action, Ok(()))
                .unwrap()
                .unwrap();
            assert_eq!(outcome.undo, Some(UndoOperation::new(1, ActionKind::Mute)));
        }
    }

    mod folder_change_tests {
        use super::*;

        #[test]
        fn leaving_active_folder_is_destructive() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let membership = FolderMembership::parse("receipts");
            let request = removal(coordinator.request(
                DestructiveAction::ChangeFolders(membership),
                conversation(),
                Some(&inbox()),
                None,
            ));
            assert!(request.conversation.pending_local_delete);
            coordinator.removal_finished(request.action).unwrap();

            let outcome = coordinator
                .mutation_finished(request.action, Ok(()))
                .unwrap()
                .unwrap();
            assert_eq!(
                outcome.undo,
                Some(UndoOperation::new(1, ActionKind::FolderChange))
            );
            assert!(!outcome.navigate_back);
        }

        #[test]
        fn staying_in_active_folder_applies_immediately() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let membership = FolderMembership::parse("inbox,receipts");
            let Step::Apply(mutation) = coordinator.request(
                DestructiveAction::ChangeFolders(membership.clone()),
                conversation(),
                Some(&inbox()),
                None,
            ) else {
                panic!("expected immediate mutation");
            };
            assert_eq!(
                mutation.operation,
                DestructiveAction::ChangeFolders(membership)
            );
            assert!(!mutation.conversations[0].pending_local_delete);

            let outcome = coordinator
                .mutation_finished(mutation.action, Ok(()))
                .unwrap()
                .unwrap();
            assert_eq!(outcome.undo, None);
            assert!(outcome.refresh_list);
        }

        #[test]
        fn no_active_folder_is_not_destructive() {
            let mut coordinator = DestructiveActionCoordinator::new();
            let step = coordinator.request(
                DestructiveAction::ChangeFolders(FolderMembership::new([FolderId::new("x")])),
                conversation(),
                None,
                None,
            );
            assert!(matches!(step, Step::Apply(_)));
        }
    }
}
