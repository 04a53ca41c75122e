//! Integration tests for the controller.
//!
//! These tests drive a full `Controller` against the in-memory provider,
//! with one recording surface standing in for the list, action bar, folder
//! list and host. Time is paused so provider latency is deterministic.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use mailsteer_control::{
    ActionBarSurface, ActionFailed, ConfirmRequest, ControlConfig, ControlSnapshot, Controller,
    ConversationUpdate, DestructiveAction, Event, FetchKind, FolderListSurface, Host,
    ListDescriptor, ListSurface, RemovalRequest, ViewMode,
};
use mailsteer_core::{
    Account, AccountCapability, AccountId, ActionKind, Conversation, ConversationId, DataProvider,
    Error, Fixture, Folder, FolderCapability, FolderId, FolderMembership, ListContext, MemoryProvider,
    Priority, ProviderCall, Settings, SyncStatus, UndoOperation,
};

/// Something a surface was told.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    ShowList(ListContext),
    FolderUpdated(FolderId, SyncStatus),
    Undo(UndoOperation),
    ListRefresh,
    RequestDelete(RemovalRequest),
    ActionComplete,
    SetAccount(Option<AccountId>),
    SetAccounts(usize),
    SetFolder(Option<FolderId>),
    RefreshStarted,
    RefreshStopped(SyncStatus),
    RecentFolders(Vec<FolderId>),
    Highlight(Option<FolderId>),
    Confirm(ConfirmRequest),
    ShowConversation(ConversationId),
    ViewMode(ViewMode),
    ActionFailed(ActionFailed),
    FetchFailed(FetchKind),
}

/// Records every surface call into a shared journal.
#[derive(Clone, Default)]
struct Recorder {
    journal: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    fn push(&self, seen: Seen) {
        self.journal.lock().unwrap().push(seen);
    }
}

impl ListSurface for Recorder {
    fn show_list(&mut self, list: &ListContext) {
        self.push(Seen::ShowList(list.clone()));
    }

    fn on_folder_updated(&mut self, folder: &Folder) {
        self.push(Seen::FolderUpdated(folder.id.clone(), folder.sync_status));
    }

    fn on_undo_available(&mut self, undo: UndoOperation) {
        self.push(Seen::Undo(undo));
    }

    fn request_list_refresh(&mut self) {
        self.push(Seen::ListRefresh);
    }

    fn request_delete(&mut self, request: RemovalRequest) {
        self.push(Seen::RequestDelete(request));
    }

    fn on_action_complete(&mut self) {
        self.push(Seen::ActionComplete);
    }
}

impl ActionBarSurface for Recorder {
    fn set_account(&mut self, account: Option<&Account>) {
        self.push(Seen::SetAccount(account.map(|a| a.id.clone())));
    }

    fn set_accounts(&mut self, accounts: &[Account]) {
        self.push(Seen::SetAccounts(accounts.len()));
    }

    fn set_folder(&mut self, folder: Option<&Folder>) {
        self.push(Seen::SetFolder(folder.map(|f| f.id.clone())));
    }

    fn on_refresh_started(&mut self) {
        self.push(Seen::RefreshStarted);
    }

    fn on_refresh_stopped(&mut self, status: SyncStatus) {
        self.push(Seen::RefreshStopped(status));
    }

    fn set_recent_folders(&mut self, folders: &[Folder]) {
        self.push(Seen::RecentFolders(
            folders.iter().map(|f| f.id.clone()).collect(),
        ));
    }
}

impl FolderListSurface for Recorder {
    fn select_folder(&mut self, folder: Option<&Folder>) {
        self.push(Seen::Highlight(folder.map(|f| f.id.clone())));
    }
}

impl Host for Recorder {
    fn confirm_action(&mut self, request: &ConfirmRequest) {
        self.push(Seen::Confirm(request.clone()));
    }

    fn show_conversation(&mut self, conversation: &Conversation) {
        self.push(Seen::ShowConversation(conversation.id.clone()));
    }

    fn view_mode_changed(&mut self, mode: ViewMode) {
        self.push(Seen::ViewMode(mode));
    }

    fn on_action_failed(&mut self, failure: &ActionFailed) {
        self.push(Seen::ActionFailed(failure.clone()));
    }

    fn on_fetch_failed(&mut self, kind: FetchKind, _error: &Error) {
        self.push(Seen::FetchFailed(kind));
    }
}

fn work() -> AccountId {
    AccountId::new("work")
}

fn home() -> AccountId {
    AccountId::new("home")
}

fn inbox() -> FolderId {
    FolderId::new("work/inbox")
}

fn receipts() -> FolderId {
    FolderId::new("work/receipts")
}

fn fixture(settings: Settings) -> Fixture {
    let mut fixture = Fixture {
        accounts: vec![
            Account::new("work", "Work")
                .with_capability(AccountCapability::Search)
                .with_settings_uri("settings://work")
                .with_recent_folders_uri("recent://work"),
            Account::new("home", "Home"),
        ],
        folders: vec![
            Folder::new("work/inbox", work(), "Inbox")
                .inbox()
                .with_capability(FolderCapability::DestructiveMute),
            Folder::new("work/receipts", work(), "Receipts"),
            Folder::new("home/inbox", home(), "Inbox").inbox(),
        ],
        conversations: vec![
            Conversation::new("c1", "Quarterly report", FolderMembership::parse("work/inbox")),
            Conversation::new("c2", "Lunch?", FolderMembership::parse("work/inbox")),
        ],
        ..Fixture::default()
    };
    fixture.settings.insert(work(), settings);
    fixture
}

struct Harness {
    controller: Controller<MemoryProvider>,
    provider: Arc<MemoryProvider>,
    recorder: Recorder,
}

impl Harness {
    fn new(settings: Settings) -> Self {
        let provider = Arc::new(MemoryProvider::from_fixture(fixture(settings)));
        let mut controller = Controller::new(Arc::clone(&provider), &ControlConfig::default());
        let recorder = Recorder::default();
        controller.attach_list_surface(Some(Box::new(recorder.clone())));
        controller.attach_action_bar(Some(Box::new(recorder.clone())));
        controller.attach_folder_list(Some(Box::new(recorder.clone())));
        controller.attach_host(Some(Box::new(recorder.clone())));
        Self {
            controller,
            provider,
            recorder,
        }
    }

    /// Starts the controller, lets startup finish and clears the journal.
    async fn started(settings: Settings) -> Self {
        let mut harness = Self::new(settings);
        harness.controller.start();
        harness.settle().await;
        harness.clear();
        harness
    }

    /// Runs until nothing is in flight and no event arrives for a while.
    async fn settle(&mut self) {
        let mut quiet = 0;
        for _ in 0..1000 {
            tokio::time::sleep(Duration::from_millis(1)).await;
            if self.controller.process_pending() == 0 && self.controller.is_idle() {
                quiet += 1;
                if quiet == 3 {
                    return;
                }
            } else {
                quiet = 0;
            }
        }
        panic!("controller did not settle");
    }

    fn send(&mut self, event: Event) {
        assert!(self.controller.handle(event));
    }

    fn seen(&self) -> Vec<Seen> {
        self.recorder.journal.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.recorder.journal.lock().unwrap().clear();
        self.provider.clear_calls();
    }

    fn removals(&self) -> Vec<RemovalRequest> {
        self.seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::RequestDelete(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn undos(&self) -> Vec<UndoOperation> {
        self.seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::Undo(undo) => Some(undo),
                _ => None,
            })
            .collect()
    }

    fn position(&self, wanted: &Seen) -> Option<usize> {
        self.seen().iter().position(|seen| seen == wanted)
    }

    fn open(&mut self, id: &str) {
        let conversation = self
            .provider
            .conversation(&ConversationId::new(id))
            .unwrap();
        self.send(Event::SelectConversation(conversation));
    }

    fn current_folder(&self) -> Option<FolderId> {
        self.controller.selection().folder().map(|f| f.id.clone())
    }

    fn recent(&self) -> Vec<FolderId> {
        self.controller
            .recent_folders()
            .published()
            .iter()
            .map(|f| f.id.clone())
            .collect()
    }
}

mod startup_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn selects_first_account_and_its_inbox() {
        let mut harness = Harness::new(Settings::default());
        harness.controller.start();
        harness.settle().await;

        let selection = harness.controller.selection();
        assert_eq!(selection.account_id(), Some(&work()));
        assert_eq!(harness.current_folder(), Some(inbox()));
        assert!(!selection.list().unwrap().is_search());
        assert_eq!(harness.controller.settings(), Some(&Settings::default()));

        let calls = harness.provider.calls();
        assert!(calls.contains(&ProviderCall::ResolveFolder {
            account: work(),
            hint: None
        }));
        assert!(harness.seen().iter().any(|seen| matches!(
            seen,
            Seen::ShowList(list) if list.list_folder().id == inbox()
        )));
        assert_eq!(harness.seen().first(), Some(&Seen::SetAccounts(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn reordered_account_list_changes_nothing() {
        let mut harness = Harness::started(Settings::default()).await;
        let version = harness.controller.selection().version();

        harness.provider.set_accounts(vec![
            Account::new("home", "Home"),
            Account::new("work", "Work").with_capability(AccountCapability::Search),
        ]);
        harness.settle().await;

        assert_eq!(harness.controller.selection().version(), version);
        assert_eq!(harness.seen(), vec![Seen::SetAccounts(2)]);
        assert!(harness.provider.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_account_list_clears_selection() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.provider.set_accounts(Vec::new());
        harness.settle().await;

        let selection = harness.controller.selection();
        assert!(selection.account().is_none());
        assert!(selection.folder().is_none());
        assert!(selection.list().is_none());
        assert!(harness.controller.settings().is_none());
        assert!(harness.seen().contains(&Seen::SetAccount(None)));
        assert!(harness.seen().contains(&Seen::SetFolder(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn restored_folder_is_resolved_again() {
        let mut harness = Harness::new(Settings::default());
        harness.controller.restore(ControlSnapshot {
            account: Some(work()),
            list: Some(ListDescriptor::Folder { folder: receipts() }),
            saved_at: Utc::now(),
        });
        harness.controller.start();
        harness.settle().await;

        assert_eq!(harness.current_folder(), Some(receipts()));
        assert!(harness.provider.calls().contains(&ProviderCall::ResolveFolder {
            account: work(),
            hint: Some(receipts())
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_restored_folder_falls_back_to_inbox() {
        let mut harness = Harness::new(Settings::default());
        let gone = FolderId::new("work/gone");
        harness.controller.restore(ControlSnapshot {
            account: Some(work()),
            list: Some(ListDescriptor::Folder {
                folder: gone.clone(),
            }),
            saved_at: Utc::now(),
        });
        harness.controller.start();
        harness.settle().await;

        assert_eq!(harness.current_folder(), Some(inbox()));
        assert!(harness.controller.selection().list().is_some());
        let hints: Vec<_> = harness
            .provider
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::ResolveFolder { hint, .. } => Some(hint),
                _ => None,
            })
            .collect();
        assert_eq!(hints, vec![Some(gone), None]);
        assert!(!harness
            .seen()
            .iter()
            .any(|seen| matches!(seen, Seen::FetchFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn restored_account_is_preferred() {
        let mut harness = Harness::new(Settings::default());
        harness.controller.restore(ControlSnapshot {
            account: Some(home()),
            list: None,
            saved_at: Utc::now(),
        });
        harness.controller.start();
        harness.settle().await;

        assert_eq!(harness.controller.selection().account_id(), Some(&home()));
        assert_eq!(
            harness.current_folder(),
            Some(FolderId::new("home/inbox"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restored_search_runs_again() {
        let mut harness = Harness::new(Settings::default());
        harness.controller.restore(ControlSnapshot {
            account: Some(work()),
            list: Some(ListDescriptor::Search {
                query: "invoices".into(),
            }),
            saved_at: Utc::now(),
        });
        harness.controller.start();
        harness.settle().await;

        let list = harness.controller.selection().list().unwrap();
        assert_eq!(list.query(), Some("invoices"));
        assert_eq!(harness.controller.selection().view_mode(), ViewMode::SearchList);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_describes_current_list() {
        let mut harness = Harness::started(Settings::default()).await;
        let snapshot = harness.controller.snapshot();
        assert_eq!(snapshot.account, Some(work()));
        assert_eq!(snapshot.list, Some(ListDescriptor::Folder { folder: inbox() }));

        harness.send(Event::OpenFolder(receipts()));
        harness.settle().await;
        assert_eq!(
            harness.controller.snapshot().list,
            Some(ListDescriptor::Folder { folder: receipts() })
        );
    }
}

mod account_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn folder_is_cleared_before_new_account_fetch() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::OpenFolder(receipts()));
        harness.settle().await;
        assert_eq!(harness.current_folder(), Some(receipts()));
        harness.clear();

        harness.provider.set_latency(home(), Duration::from_millis(50));
        harness.send(Event::SelectAccount(home()));

        // The fetch is started but has not run; the old folder is gone.
        assert!(harness.controller.selection().folder().is_none());
        assert!(harness.controller.is_fetching(FetchKind::AccountFolder));
        let cleared = harness.position(&Seen::SetFolder(None)).unwrap();
        let selected = harness.position(&Seen::SetAccount(Some(home()))).unwrap();
        assert!(selected < cleared);

        harness.settle().await;
        assert_eq!(
            harness.provider.calls().first(),
            Some(&ProviderCall::ResolveFolder {
                account: home(),
                hint: None
            })
        );
        assert_eq!(harness.current_folder(), Some(FolderId::new("home/inbox")));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_account_fetch_never_shows() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::SelectAccount(home()));
        harness.provider.set_latency(work(), Duration::from_millis(100));
        harness.send(Event::SelectAccount(work()));
        harness.provider.set_latency(home(), Duration::from_millis(10));
        harness.send(Event::SelectAccount(home()));
        harness.settle().await;

        let shown: Vec<_> = harness
            .seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::ShowList(list) => Some(list.account),
                _ => None,
            })
            .collect();
        assert_eq!(shown, vec![home()]);
        assert_eq!(harness.controller.selection().account_id(), Some(&home()));
    }

    #[tokio::test(start_paused = true)]
    async fn selecting_same_account_twice_changes_once() {
        let mut harness = Harness::started(Settings::default()).await;
        let version = harness.controller.selection().version();
        harness.send(Event::SelectAccount(work()));
        harness.settle().await;
        assert_eq!(harness.controller.selection().version(), version);
        assert!(harness.provider.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn account_without_settings_resource_has_none() {
        let mut harness = Harness::started(Settings::confirm_all()).await;
        assert!(harness.controller.settings().is_some());

        harness.send(Event::SelectAccount(home()));
        harness.settle().await;
        assert!(harness.controller.settings().is_none());
        assert!(!harness
            .provider
            .calls()
            .iter()
            .any(|call| matches!(call, ProviderCall::Watch(mailsteer_core::Resource::Settings(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_settings_are_applied() {
        let mut harness = Harness::started(Settings::confirm_all()).await;
        harness.provider.set_settings(&work(), None);
        harness.settle().await;
        assert!(harness.controller.settings().is_none());
    }
}

mod folder_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn selecting_folder_shows_it_and_records_recent() {
        let mut harness = Harness::started(Settings::default()).await;
        let receipts_folder = Folder::new("work/receipts", work(), "Receipts");
        harness.send(Event::SelectFolder(receipts_folder));
        harness.settle().await;

        assert_eq!(harness.current_folder(), Some(receipts()));
        assert!(harness.seen().contains(&Seen::Highlight(Some(receipts()))));
        assert!(harness.seen().contains(&Seen::RecentFolders(vec![receipts(), inbox()])));

        let calls = harness.provider.calls();
        assert!(calls.contains(&ProviderCall::ResolveFolder {
            account: work(),
            hint: Some(receipts())
        }));
        assert!(calls.contains(&ProviderCall::RecordRecent {
            account: work(),
            folder: receipts()
        }));
        assert!(harness.seen().iter().any(|seen| matches!(
            seen,
            Seen::ShowList(list) if list.list_folder().id == receipts()
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn quick_folder_switches_keep_recent_order() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::SelectFolder(Folder::new("work/receipts", work(), "Receipts")));
        harness.send(Event::SelectFolder(
            Folder::new("work/inbox", work(), "Inbox").inbox(),
        ));
        harness.settle().await;

        // Echoes of the queued writes never reorder the list.
        let published: Vec<_> = harness
            .seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::RecentFolders(folders) => Some(folders),
                _ => None,
            })
            .collect();
        assert_eq!(
            published,
            vec![vec![receipts(), inbox()], vec![inbox(), receipts()]]
        );
        let recorded: Vec<_> = harness
            .provider
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::RecordRecent { folder, .. } => Some(folder),
                _ => None,
            })
            .collect();
        assert_eq!(recorded, vec![receipts(), inbox()]);
        assert_eq!(harness.recent(), vec![inbox(), receipts()]);

        // Once the writes are done, the provider's copy is taken again.
        harness
            .provider
            .record_recent_folder(&work(), &Folder::new("work/receipts", work(), "Receipts"))
            .await
            .unwrap();
        harness.settle().await;
        assert_eq!(harness.recent(), vec![receipts(), inbox()]);
    }

    #[tokio::test(start_paused = true)]
    async fn opening_missing_folder_reports_failure() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::OpenFolder(FolderId::new("work/gone")));
        harness.settle().await;

        assert_eq!(harness.seen(), vec![Seen::FetchFailed(FetchKind::AccountFolder)]);
        assert_eq!(harness.current_folder(), Some(inbox()));
    }

    #[tokio::test(start_paused = true)]
    async fn folder_of_other_account_is_ignored() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::SelectFolder(Folder::new("home/inbox", home(), "Inbox")));
        harness.settle().await;
        assert_eq!(harness.current_folder(), Some(inbox()));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_status_reaches_action_bar() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.provider.set_sync_status(&inbox(), SyncStatus::Syncing);
        harness.provider.set_sync_status(&inbox(), SyncStatus::Synced);
        harness.settle().await;

        assert_eq!(
            harness.seen(),
            vec![
                Seen::RefreshStarted,
                Seen::FolderUpdated(inbox(), SyncStatus::Syncing),
                Seen::RefreshStopped(SyncStatus::Synced),
                Seen::FolderUpdated(inbox(), SyncStatus::Synced),
            ]
        );
        assert_eq!(
            harness.controller.selection().folder().unwrap().sync_status,
            SyncStatus::Synced
        );
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_folder_clears_view() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.provider.remove_folder(&inbox());
        harness.settle().await;

        assert!(harness.controller.selection().folder().is_none());
        assert!(harness.controller.selection().list().is_none());
        assert!(harness.seen().contains(&Seen::SetFolder(None)));
        assert!(harness.seen().contains(&Seen::Highlight(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_syncs_current_folder() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::RefreshFolder);
        harness.settle().await;

        assert!(harness.provider.calls().contains(&ProviderCall::RefreshFolder(inbox())));
        assert!(harness.seen().contains(&Seen::RefreshStarted));
        assert!(harness.seen().contains(&Seen::RefreshStopped(SyncStatus::Synced)));
    }

    #[tokio::test(start_paused = true)]
    async fn load_inbox_returns_to_inbox() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::OpenFolder(receipts()));
        harness.settle().await;
        harness.clear();

        harness.send(Event::LoadInbox);
        harness.settle().await;
        assert_eq!(harness.current_folder(), Some(inbox()));
        assert!(harness.provider.calls().contains(&ProviderCall::ResolveInbox(work())));
        assert!(harness.seen().contains(&Seen::Highlight(Some(inbox()))));
    }
}

mod search_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn search_shows_results_in_search_mode() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::Search("invoices".into()));
        assert_eq!(harness.controller.selection().view_mode(), ViewMode::SearchList);
        harness.settle().await;

        let list = harness.controller.selection().list().unwrap();
        assert!(list.is_search());
        assert_eq!(list.query(), Some("invoices"));
        assert_eq!(
            harness.current_folder(),
            Some(list.list_folder().id.clone())
        );
        // Search results are not a recent folder.
        assert_eq!(harness.controller.recent_folders().published().len(), 1);

        harness.open("c1");
        assert_eq!(
            harness.controller.selection().view_mode(),
            ViewMode::SearchConversation
        );
        harness.send(Event::NavigateBack);
        assert_eq!(harness.controller.selection().view_mode(), ViewMode::SearchList);
        assert!(harness.controller.selection().conversation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn folder_picked_during_search_is_recorded() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::Search("invoices".into()));
        harness.settle().await;
        harness.clear();

        harness.send(Event::SelectFolder(Folder::new("work/receipts", work(), "Receipts")));
        harness.settle().await;

        assert_eq!(harness.controller.selection().view_mode(), ViewMode::List);
        assert_eq!(harness.current_folder(), Some(receipts()));
        assert_eq!(harness.recent(), vec![receipts(), inbox()]);
        assert!(harness.provider.calls().contains(&ProviderCall::RecordRecent {
            account: work(),
            folder: receipts()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn search_without_capability_fails() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::SelectAccount(home()));
        harness.settle().await;
        harness.clear();

        harness.send(Event::Search("invoices".into()));
        harness.settle().await;
        assert_eq!(harness.seen(), vec![Seen::FetchFailed(FetchKind::SearchFolder)]);
        assert!(harness.provider.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn folder_selection_supersedes_pending_search() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.provider.set_latency(work(), Duration::from_millis(50));
        harness.send(Event::Search("invoices".into()));
        harness.send(Event::OpenFolder(receipts()));
        harness.settle().await;

        assert!(!harness.controller.selection().list().unwrap().is_search());
        assert_eq!(harness.current_folder(), Some(receipts()));
    }
}

mod destructive_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn declined_delete_never_mutates() {
        let mut harness = Harness::started(Settings::confirm_all()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Delete));

        let Some(Seen::Confirm(request)) = harness.seen().last().cloned() else {
            panic!("expected a confirmation request");
        };
        assert_eq!(request.kind, ActionKind::Delete);

        harness.send(Event::ConfirmationResolved {
            action: request.action,
            accepted: false,
        });
        harness.settle().await;

        assert!(!harness
            .provider
            .calls()
            .iter()
            .any(|call| matches!(call, ProviderCall::Delete(_))));
        assert!(harness.undos().is_empty());
        assert!(harness.removals().is_empty());
        assert_eq!(harness.controller.pending_actions(), 0);
        assert!(harness.controller.selection().conversation().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn declined_confirmation_frees_conversation() {
        let mut harness = Harness::started(Settings::confirm_all()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Delete));
        let Some(Seen::Confirm(first)) = harness.seen().last().cloned() else {
            panic!("expected a confirmation request");
        };
        harness.send(Event::ConfirmationResolved {
            action: first.action,
            accepted: false,
        });

        harness.send(Event::RequestAction(DestructiveAction::Delete));
        let Some(Seen::Confirm(second)) = harness.seen().last().cloned() else {
            panic!("expected a second confirmation request");
        };
        assert_ne!(first.action, second.action);
        assert_eq!(harness.controller.pending_actions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_without_host_is_declined() {
        let mut harness = Harness::started(Settings::confirm_all()).await;
        harness.controller.attach_host(None);
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Delete));
        harness.send(Event::RequestAction(DestructiveAction::Delete));
        harness.settle().await;

        assert_eq!(harness.controller.pending_actions(), 0);
        assert!(harness.removals().is_empty());
        assert!(!harness
            .provider
            .calls()
            .iter()
            .any(|call| matches!(call, ProviderCall::Delete(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_delete_goes_through_removal() {
        let mut harness = Harness::started(Settings::confirm_all()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Delete));
        let Some(Seen::Confirm(request)) = harness.seen().last().cloned() else {
            panic!("expected a confirmation request");
        };
        harness.send(Event::ConfirmationResolved {
            action: request.action,
            accepted: true,
        });

        let removal = harness.removals().pop().unwrap();
        assert!(removal.conversation.pending_local_delete);
        harness.send(Event::RemovalFinished(removal.action));
        harness.settle().await;

        assert!(harness
            .provider
            .conversation(&ConversationId::new("c1"))
            .is_none());
        assert_eq!(harness.undos(), vec![UndoOperation::new(1, ActionKind::Delete)]);
    }

    #[tokio::test(start_paused = true)]
    async fn archive_waits_for_removal_then_offers_undo() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Archive));
        harness.settle().await;

        // Nothing durable happens until the list acknowledges the removal.
        let removal = harness.removals().pop().unwrap();
        assert!(!harness
            .provider
            .calls()
            .iter()
            .any(|call| matches!(call, ProviderCall::Archive(_))));

        harness.send(Event::RemovalFinished(removal.action));
        harness.settle().await;

        assert!(harness
            .provider
            .calls()
            .contains(&ProviderCall::Archive(vec![ConversationId::new("c1")])));
        let undo = Seen::Undo(UndoOperation::new(1, ActionKind::Archive));
        assert_eq!(harness.undos().len(), 1);
        let complete = harness.position(&Seen::ActionComplete).unwrap();
        let offered = harness.position(&undo).unwrap();
        let refreshed = harness.position(&Seen::ListRefresh).unwrap();
        assert!(complete < offered);
        assert!(offered < refreshed);

        assert_eq!(harness.controller.selection().view_mode(), ViewMode::List);
        assert!(harness.controller.selection().conversation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_removal_ack_is_ignored() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::ReportSpam));
        let removal = harness.removals().pop().unwrap();
        harness.send(Event::RemovalFinished(removal.action));
        harness.send(Event::RemovalFinished(removal.action));
        harness.settle().await;

        let spam_calls = harness
            .provider
            .calls()
            .iter()
            .filter(|call| matches!(call, ProviderCall::ReportSpam(_)))
            .count();
        assert_eq!(spam_calls, 1);
        assert_eq!(harness.undos(), vec![UndoOperation::new(1, ActionKind::ReportSpam)]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_archive_offers_no_undo() {
        let mut harness = Harness::started(Settings::default()).await;
        harness
            .provider
            .set_failure(Some(Error::Provider("offline".into())));
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Archive));
        let removal = harness.removals().pop().unwrap();
        harness.send(Event::RemovalFinished(removal.action));
        harness.settle().await;

        assert!(harness.undos().is_empty());
        assert!(!harness.seen().contains(&Seen::ListRefresh));
        assert!(harness.seen().iter().any(|seen| matches!(
            seen,
            Seen::ActionFailed(failure) if failure.kind == ActionKind::Archive
        )));
        assert_eq!(harness.controller.pending_actions(), 0);
        assert_eq!(
            harness.controller.selection().view_mode(),
            ViewMode::Conversation
        );
        // Nothing was mutated, so the row must come back.
        assert!(!harness
            .controller
            .selection()
            .conversation()
            .unwrap()
            .pending_local_delete);
    }

    #[tokio::test(start_paused = true)]
    async fn mute_in_destructive_mute_folder_flags_conversation() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Mute));
        let removal = harness.removals().pop().unwrap();
        assert!(!removal.conversation.pending_local_delete);

        harness.send(Event::RemovalFinished(removal.action));
        assert!(harness
            .controller
            .selection()
            .conversation()
            .unwrap()
            .pending_local_delete);

        harness.settle().await;
        assert!(harness
            .provider
            .calls()
            .contains(&ProviderCall::Mute(vec![ConversationId::new("c1")])));
        assert_eq!(harness.undos(), vec![UndoOperation::new(1, ActionKind::Mute)]);
    }

    #[tokio::test(start_paused = true)]
    async fn folder_change_leaving_active_folder_is_destructive() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::ChangeFolders(
            FolderMembership::parse("work/receipts"),
        )));
        let removal = harness.removals().pop().unwrap();
        assert_eq!(removal.kind, ActionKind::FolderChange);

        harness.send(Event::RemovalFinished(removal.action));
        harness.settle().await;

        assert!(harness.provider.calls().contains(&ProviderCall::UpdateFolders {
            conversations: vec![ConversationId::new("c1")],
            membership: "work/receipts".into(),
        }));
        assert_eq!(
            harness.undos(),
            vec![UndoOperation::new(1, ActionKind::FolderChange)]
        );
        // Folder changes keep the conversation open.
        assert_eq!(
            harness.controller.selection().view_mode(),
            ViewMode::Conversation
        );
    }

    #[tokio::test(start_paused = true)]
    async fn folder_change_keeping_active_folder_applies_immediately() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::ChangeFolders(
            FolderMembership::parse("work/inbox,work/receipts"),
        )));
        harness.settle().await;

        assert!(harness.removals().is_empty());
        assert!(harness.undos().is_empty());
        assert!(harness.seen().contains(&Seen::ListRefresh));
        let stored = harness
            .provider
            .conversation(&ConversationId::new("c1"))
            .unwrap();
        assert_eq!(stored.folders.to_list_string(), "work/inbox,work/receipts");
    }

    #[tokio::test(start_paused = true)]
    async fn second_action_during_first_undo_window() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::RequestAction(DestructiveAction::Archive));
        harness.open("c2");
        harness.send(Event::RequestAction(DestructiveAction::Delete));

        let removals = harness.removals();
        assert_eq!(removals.len(), 2);
        for removal in &removals {
            harness.send(Event::RemovalFinished(removal.action));
        }
        harness.settle().await;

        assert_eq!(
            harness.undos(),
            vec![
                UndoOperation::new(1, ActionKind::Archive),
                UndoOperation::new(1, ActionKind::Delete)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn action_without_conversation_is_ignored() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.send(Event::RequestAction(DestructiveAction::Delete));
        harness.settle().await;
        assert!(harness.seen().is_empty());
        assert_eq!(harness.controller.pending_actions(), 0);
    }
}

mod update_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn mark_important_updates_priority() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::UpdateConversation(ConversationUpdate::MarkImportant));
        harness.settle().await;

        let stored = harness
            .provider
            .conversation(&ConversationId::new("c1"))
            .unwrap();
        assert_eq!(stored.priority, Priority::High);
        assert!(harness.seen().contains(&Seen::ListRefresh));
        assert!(harness.undos().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn mark_unread_clears_read_flag() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.open("c1");
        harness.send(Event::UpdateConversation(ConversationUpdate::MarkUnread));
        harness.settle().await;

        assert!(harness.provider.calls().contains(&ProviderCall::UpdateBoolean {
            conversations: vec![ConversationId::new("c1")],
            field: mailsteer_core::BooleanField::Read,
            value: false,
        }));
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_run() {
        let mut harness = Harness::started(Settings::default()).await;
        let handle = harness.controller.control_handle();
        assert!(handle.shutdown());
        tokio::time::timeout(Duration::from_secs(1), harness.controller.run())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn late_attached_list_sees_current_list() {
        let mut harness = Harness::started(Settings::default()).await;
        harness.controller.attach_list_surface(None);
        harness.send(Event::OpenFolder(receipts()));
        harness.settle().await;
        assert!(!harness
            .seen()
            .iter()
            .any(|seen| matches!(seen, Seen::ShowList(_))));

        let recorder = harness.recorder.clone();
        harness.controller.attach_list_surface(Some(Box::new(recorder)));
        assert!(harness.seen().iter().any(|seen| matches!(
            seen,
            Seen::ShowList(list) if list.list_folder().id == receipts()
        )));
    }
}
