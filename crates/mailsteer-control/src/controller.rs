//! The controller: single owner of all control state.
//!
//! Everything that changes selection, list context, recent folders or
//! pending actions happens inside [`Controller::handle`], on whichever task
//! drives the controller. Watcher callbacks, fetch workers, mutation workers
//! and surfaces only ever post [`Event`]s; fetch results arrive over the
//! supervisor's completion channel and are filtered by generation before
//! they are applied.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use mailsteer_core::{
    Account, AccountCapability, AccountId, BooleanField, Conversation, DataProvider, DataWatcher,
    Error, Folder, FolderId, IntField, ListContext, Priority, Resource, ResourceKind, Settings,
    Snapshot,
};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::ControlConfig;
use crate::destructive::{
    ActionId, DestructiveAction, DestructiveActionCoordinator, Mutation, Step,
};
use crate::event::{ControlHandle, ConversationUpdate, Event};
use crate::recent::RecentFolders;
use crate::selection::{AccountRoster, Effect, SelectionState};
use crate::state::{ControlSnapshot, ListDescriptor};
use crate::supervisor::{FetchCompletion, FetchKind, TaskSupervisor};
use crate::surface::{ActionBarSurface, FolderListSurface, Host, ListSurface};

/// Fetch kinds whose result becomes the list context; the newest of them
/// wins.
const LIST_FETCHES: [FetchKind; 3] = [
    FetchKind::Inbox,
    FetchKind::AccountFolder,
    FetchKind::SearchFolder,
];

/// What a background fetch produced.
#[derive(Debug)]
enum Fetched {
    /// A folder to list.
    Folder { account: AccountId, folder: Folder },
    /// The folder holding search results.
    Search {
        account: AccountId,
        query: String,
        results: Folder,
    },
    /// A refresh was handed to the provider.
    Refreshed(FolderId),
}

/// Coordinates selection, fetches and destructive actions for one mail
/// client window.
pub struct Controller<P: DataProvider> {
    provider: Arc<P>,
    handle: ControlHandle,
    events: mpsc::UnboundedReceiver<Event>,
    fetches: mpsc::UnboundedReceiver<FetchCompletion<Fetched>>,
    supervisor: TaskSupervisor<Fetched>,
    watcher: DataWatcher,
    selection: SelectionState,
    roster: AccountRoster,
    accounts: Vec<Account>,
    settings: Option<Settings>,
    recent: RecentFolders,
    coordinator: DestructiveActionCoordinator,
    restored: Option<ControlSnapshot>,
    restored_hint: Option<FolderId>,
    recent_writer: Option<mpsc::UnboundedSender<Folder>>,
    recent_writes: HashMap<AccountId, usize>,
    updates_in_flight: usize,
    list: Option<Box<dyn ListSurface>>,
    action_bar: Option<Box<dyn ActionBarSurface>>,
    folder_list: Option<Box<dyn FolderListSurface>>,
    host: Option<Box<dyn Host>>,
}

impl<P: DataProvider> Controller<P> {
    /// Creates a controller over `provider`.
    ///
    /// Nothing is watched until [`Controller::start`] is called.
    #[must_use]
    pub fn new(provider: Arc<P>, config: &ControlConfig) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let (supervisor, fetches) = TaskSupervisor::new();
        Self {
            provider,
            handle: ControlHandle::new(tx),
            events,
            fetches,
            supervisor,
            watcher: DataWatcher::new(),
            selection: SelectionState::new(),
            roster: AccountRoster::new(),
            accounts: Vec::new(),
            settings: None,
            recent: RecentFolders::new(config.recent_folder_limit),
            coordinator: DestructiveActionCoordinator::new(),
            restored: None,
            restored_hint: None,
            recent_writer: None,
            recent_writes: HashMap::new(),
            updates_in_flight: 0,
            list: None,
            action_bar: None,
            folder_list: None,
            host: None,
        }
    }

    /// Subscribes to the provider and starts watching the account list.
    pub fn start(&mut self) {
        for kind in [
            ResourceKind::Accounts,
            ResourceKind::Folder,
            ResourceKind::Settings,
            ResourceKind::RecentFolders,
        ] {
            let handle = self.handle.clone();
            self.watcher.subscribe(kind, move |snapshot| {
                handle.post(Event::Snapshot(snapshot));
            });
        }
        info!("Controller started");
        self.provider.watch(Resource::Accounts, self.watcher.clone());
    }

    /// A handle for posting events from other tasks and threads.
    #[must_use]
    pub fn control_handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Settings of the current account, if delivered.
    #[must_use]
    pub const fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// The current account's recent folders.
    #[must_use]
    pub const fn recent_folders(&self) -> &RecentFolders {
        &self.recent
    }

    /// The last account list delivered by the provider.
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Destructive actions not yet completed.
    #[must_use]
    pub fn pending_actions(&self) -> usize {
        self.coordinator.pending_count()
    }

    /// Returns true if a fetch of `kind` is in flight.
    #[must_use]
    pub fn is_fetching(&self, kind: FetchKind) -> bool {
        self.supervisor.is_in_flight(kind)
    }

    /// Returns true if no fetch, mutation, update or recent-folder write is
    /// in flight.
    ///
    /// Actions waiting on the user or on a surface do not count.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.supervisor.is_busy()
            && !self.coordinator.is_applying()
            && self.updates_in_flight == 0
            && self.recent_writes.is_empty()
    }

    /// Attaches (or with `None`, detaches) the conversation list.
    pub fn attach_list_surface(&mut self, surface: Option<Box<dyn ListSurface>>) {
        self.list = surface;
        if let (Some(list), Some(context)) = (&mut self.list, self.selection.list()) {
            list.show_list(context);
        }
    }

    /// Attaches (or with `None`, detaches) the action bar.
    pub fn attach_action_bar(&mut self, surface: Option<Box<dyn ActionBarSurface>>) {
        self.action_bar = surface;
        if let Some(bar) = &mut self.action_bar {
            bar.set_accounts(&self.accounts);
            bar.set_account(self.selection.account());
            bar.set_folder(self.selection.folder());
            bar.set_recent_folders(self.recent.published());
        }
    }

    /// Attaches (or with `None`, detaches) the folder list.
    pub fn attach_folder_list(&mut self, surface: Option<Box<dyn FolderListSurface>>) {
        self.folder_list = surface;
        if let Some(folders) = &mut self.folder_list {
            folders.select_folder(self.selection.folder());
        }
    }

    /// Attaches (or with `None`, detaches) the host.
    pub fn attach_host(&mut self, host: Option<Box<dyn Host>>) {
        self.host = host;
    }

    /// Captures the state to persist.
    #[must_use]
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            account: self.selection.account_id().cloned(),
            list: self.selection.list().map(ListDescriptor::from),
            saved_at: Utc::now(),
        }
    }

    /// Seeds the selection from persisted state.
    ///
    /// Applied when the account list first arrives: the stored account is
    /// preferred, and the stored folder or search is resolved again.
    pub fn restore(&mut self, snapshot: ControlSnapshot) {
        debug!(account = ?snapshot.account, list = ?snapshot.list, "Restoring control state");
        self.restored = Some(snapshot);
    }

    /// Waits for the next event or fetch completion and handles it.
    ///
    /// Returns false once the controller has shut down.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            Some(completion) = self.fetches.recv() => {
                self.complete_fetch(completion);
                true
            }
            Some(event) = self.events.recv() => self.handle(event),
            else => false,
        }
    }

    /// Handles events until [`Event::Shutdown`].
    pub async fn run(&mut self) {
        while self.step().await {}
        info!("Controller stopped");
    }

    /// Handles every event and completion that is ready, without waiting.
    ///
    /// Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            if let Ok(completion) = self.fetches.try_recv() {
                self.complete_fetch(completion);
            } else if let Ok(event) = self.events.try_recv() {
                self.handle(event);
            } else {
                return handled;
            }
            handled += 1;
        }
    }

    /// Handles one event.
    ///
    /// Returns false if the event was [`Event::Shutdown`].
    pub fn handle(&mut self, event: Event) -> bool {
        trace!(?event, "Handling event");
        match event {
            Event::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            Event::SelectAccount(id) => self.select_account(&id),
            Event::SelectFolder(folder) => self.select_folder(folder),
            Event::OpenFolder(id) => self.open_folder(id),
            Event::SelectConversation(conversation) => self.select_conversation(conversation),
            Event::Search(query) => self.search(query),
            Event::LoadInbox => self.load_inbox(),
            Event::RefreshFolder => self.refresh_folder(),
            Event::NavigateBack => {
                let transition = self.selection.navigate_back();
                self.apply_effects(transition.effects);
            }
            Event::RequestAction(action) => self.request_action(action),
            Event::UpdateConversation(update) => self.update_conversation(update),
            Event::ConfirmationResolved { action, accepted } => {
                let step = self.coordinator.resolve_confirmation(action, accepted);
                self.run_step(step);
            }
            Event::RemovalFinished(action) => self.removal_finished(action),
            Event::MutationFinished { action, result } => self.mutation_finished(action, result),
            Event::UpdateFinished { update, result } => self.update_finished(update, result),
            Event::RecentFolderRecorded(account) => self.recent_folder_recorded(&account),
            Event::Shutdown => {
                self.supervisor.cancel_all();
                return false;
            }
        }
        true
    }

    fn apply_effects(&mut self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            match effect {
                Effect::ReloadRecentFolders => self.reload_recent_folders(),
                Effect::ReloadSettings => self.reload_settings(),
                Effect::ResolveAccountFolder => self.resolve_account_folder(),
                Effect::WatchFolder => {
                    if let Some(folder) = self.selection.folder() {
                        self.provider
                            .watch(Resource::Folder(folder.id.clone()), self.watcher.clone());
                    }
                }
                Effect::ResolveFolderList => {
                    if let (Some(account), Some(folder)) =
                        (self.selection.account(), self.selection.folder())
                    {
                        let (account, hint) = (account.clone(), folder.id.clone());
                        self.start_folder_fetch(FetchKind::AccountFolder, account, Some(hint));
                    }
                }
                Effect::ViewModeChanged(mode) => {
                    debug!(?mode, "View mode changed");
                    if let Some(host) = &mut self.host {
                        host.view_mode_changed(mode);
                    }
                }
            }
        }
    }

    // Snapshots

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Accounts(accounts) => self.accounts_changed(accounts),
            Snapshot::Folder { id, folder } => self.folder_changed(&id, folder),
            Snapshot::Settings { account, settings } => {
                if self.selection.account_id() == Some(&account) {
                    debug!(%account, present = settings.is_some(), "Settings updated");
                    self.settings = settings;
                } else {
                    trace!(%account, "Ignoring settings of another account");
                }
            }
            Snapshot::RecentFolders { account, folders } => {
                if self.recent_writes.contains_key(&account) {
                    trace!(%account, "Recent folder writes pending, keeping local order");
                } else if self.recent.replace(&account, folders) {
                    self.publish_recent();
                } else {
                    trace!(%account, "Ignoring recent folders of another account");
                }
            }
        }
    }

    fn accounts_changed(&mut self, accounts: Vec<Account>) {
        if let Some(bar) = &mut self.action_bar {
            bar.set_accounts(&accounts);
        }
        let current = self.selection.account_id().cloned();
        let changed = self.roster.has_changed(current.as_ref(), &accounts);
        self.roster.replace(&accounts);
        self.accounts = accounts;
        if !changed {
            trace!("Account list unchanged");
            return;
        }

        let preferred = self.restored.as_ref().and_then(|state| state.account.clone());
        match AccountRoster::effective_account(current.as_ref(), preferred.as_ref(), &self.accounts)
        {
            Some(account) => self.change_account(account),
            None => {
                warn!("No accounts available, clearing selection");
                self.clear_selection();
            }
        }
    }

    fn folder_changed(&mut self, id: &FolderId, folder: Option<Folder>) {
        if self.selection.folder().map(|folder| &folder.id) != Some(id) {
            trace!(folder = %id, "Ignoring snapshot of unselected folder");
            return;
        }
        let Some(folder) = folder else {
            warn!(folder = %id, "Selected folder no longer exists");
            self.supervisor.cancel(FetchKind::FolderRefresh);
            let transition = self.selection.clear_folder();
            self.announce_folder(None);
            self.apply_effects(transition.effects);
            return;
        };

        self.selection.update_folder(folder.clone());
        self.report_sync_status(&folder);
        if let Some(list) = &mut self.list {
            list.on_folder_updated(&folder);
        }
    }

    // Account and folder selection

    fn select_account(&mut self, id: &AccountId) {
        match self.accounts.iter().find(|account| &account.id == id) {
            Some(account) => self.change_account(account.clone()),
            None => warn!(account = %id, "Ignoring selection of unknown account"),
        }
    }

    fn change_account(&mut self, account: Account) {
        let transition = self.selection.set_account(account);
        if !transition.changed {
            return;
        }
        for kind in LIST_FETCHES.into_iter().chain([FetchKind::FolderRefresh]) {
            self.supervisor.cancel(kind);
        }
        if let Some(account) = self.selection.account() {
            info!(account = %account.id, "Account changed");
        }
        if let Some(bar) = &mut self.action_bar {
            bar.set_account(self.selection.account());
        }
        self.announce_folder(None);
        self.apply_effects(transition.effects);
    }

    fn clear_selection(&mut self) {
        self.supervisor.cancel_all();
        let transition = self.selection.clear_account();
        self.settings = None;
        self.recent.set_account(None);
        self.publish_recent();
        if let Some(bar) = &mut self.action_bar {
            bar.set_account(None);
        }
        self.announce_folder(None);
        self.apply_effects(transition.effects);
    }

    fn reload_settings(&mut self) {
        self.settings = None;
        let Some(account) = self.selection.account() else {
            return;
        };
        if account.settings_uri.is_some() {
            self.provider
                .watch(Resource::Settings(account.id.clone()), self.watcher.clone());
        } else {
            debug!(account = %account.id, "Account has no settings resource");
        }
    }

    fn reload_recent_folders(&mut self) {
        let account = self.selection.account().cloned();
        self.recent.set_account(account.as_ref().map(|account| account.id.clone()));
        self.publish_recent();
        if let Some(account) = account.filter(|account| account.recent_folders_uri.is_some()) {
            self.provider
                .watch(Resource::RecentFolders(account.id), self.watcher.clone());
        }
    }

    fn resolve_account_folder(&mut self) {
        let Some(account) = self.selection.account().cloned() else {
            return;
        };
        let restored = self
            .restored
            .take()
            .filter(|state| state.account.as_ref() == Some(&account.id));
        if let Some(query) = restored.as_ref().and_then(ControlSnapshot::query) {
            self.search(query.to_string());
            return;
        }
        let hint = restored.as_ref().and_then(ControlSnapshot::folder).cloned();
        self.start_folder_fetch(FetchKind::AccountFolder, account, hint.clone());
        self.restored_hint = hint;
    }

    fn select_folder(&mut self, folder: Folder) {
        let transition = match self.selection.set_folder(folder) {
            Ok(transition) => transition,
            Err(err) => {
                warn!(%err, "Ignoring folder selection");
                return;
            }
        };
        if !transition.changed {
            debug!("Folder already selected");
            return;
        }
        self.folder_selected();
        self.apply_effects(transition.effects);
    }

    fn open_folder(&mut self, id: FolderId) {
        let Some(account) = self.selection.account().cloned() else {
            warn!(folder = %id, "Cannot open a folder without an account");
            return;
        };
        self.start_folder_fetch(FetchKind::AccountFolder, account, Some(id));
    }

    fn load_inbox(&mut self) {
        let Some(account) = self.selection.account().cloned() else {
            warn!("Cannot load the inbox without an account");
            return;
        };
        self.start_folder_fetch(FetchKind::Inbox, account, None);
    }

    fn search(&mut self, query: String) {
        let Some(account) = self.selection.account().cloned() else {
            warn!("Cannot search without an account");
            return;
        };
        if !account.supports(AccountCapability::Search) {
            warn!(account = %account.id, "Account does not support search");
            if let Some(host) = &mut self.host {
                host.on_fetch_failed(
                    FetchKind::SearchFolder,
                    &Error::SearchUnsupported(account.id),
                );
            }
            return;
        }

        let transition = self.selection.enter_search();
        self.apply_effects(transition.effects);
        self.cancel_other_list_fetches(FetchKind::SearchFolder);
        self.restored_hint = None;

        let provider = Arc::clone(&self.provider);
        self.supervisor.start(FetchKind::SearchFolder, async move {
            let results = provider.search_folder(&account, &query).await?;
            Ok::<_, Error>(Fetched::Search {
                account: account.id,
                query,
                results,
            })
        });
    }

    fn refresh_folder(&mut self) {
        let Some(folder) = self.selection.folder().cloned() else {
            debug!("No folder to refresh");
            return;
        };
        let provider = Arc::clone(&self.provider);
        self.supervisor.start(FetchKind::FolderRefresh, async move {
            provider.refresh_folder(&folder).await?;
            Ok::<_, Error>(Fetched::Refreshed(folder.id))
        });
    }

    fn cancel_other_list_fetches(&mut self, kind: FetchKind) {
        for other in LIST_FETCHES.into_iter().filter(|other| *other != kind) {
            self.supervisor.cancel(other);
        }
    }

    fn start_folder_fetch(&mut self, kind: FetchKind, account: Account, hint: Option<FolderId>) {
        self.cancel_other_list_fetches(kind);
        self.restored_hint = None;
        let provider = Arc::clone(&self.provider);
        self.supervisor.start(kind, async move {
            let folder = if kind == FetchKind::Inbox {
                provider.resolve_inbox(&account).await?
            } else {
                provider.resolve_folder(&account, hint.as_ref()).await?
            };
            Ok::<_, Error>(Fetched::Folder {
                account: account.id,
                folder,
            })
        });
    }

    fn complete_fetch(&mut self, completion: FetchCompletion<Fetched>) {
        let kind = completion.ticket.kind;
        let Some(result) = self.supervisor.accept(completion) else {
            return;
        };
        let restored_hint = if LIST_FETCHES.contains(&kind) {
            self.restored_hint.take()
        } else {
            None
        };
        match result {
            Ok(Fetched::Folder { account, folder }) => {
                self.show_list(ListContext::folder(account, folder));
            }
            Ok(Fetched::Search {
                account,
                query,
                results,
            }) => self.show_list(ListContext::search(account, results, query)),
            Ok(Fetched::Refreshed(folder)) => debug!(%folder, "Folder refresh handed off"),
            Err(error) if restored_hint.is_some() => {
                warn!(
                    folder = ?restored_hint,
                    %error,
                    "Restored folder unavailable, using the inbox"
                );
                if let Some(account) = self.selection.account().cloned() {
                    self.start_folder_fetch(FetchKind::AccountFolder, account, None);
                }
            }
            Err(error) => {
                warn!(?kind, %error, "Fetch failed");
                if let Some(host) = &mut self.host {
                    host.on_fetch_failed(kind, &error);
                }
            }
        }
    }

    /// Makes a resolved list current and shows it.
    fn show_list(&mut self, list: ListContext) {
        if self.selection.account_id() != Some(&list.account) {
            debug!(account = %list.account, "Dropping list of a previous account");
            return;
        }
        let folder = list.list_folder().clone();
        let list_transition = match self.selection.set_list(list) {
            Ok(transition) => transition,
            Err(err) => {
                warn!(%err, "Dropping resolved list");
                return;
            }
        };
        self.apply_effects(list_transition.effects);

        match self.selection.set_folder(folder) {
            Ok(transition) => {
                if transition.changed {
                    self.folder_selected();
                }
                // The list was just resolved; only the watch is still needed.
                self.apply_effects(
                    transition
                        .effects
                        .into_iter()
                        .filter(|effect| *effect != Effect::ResolveFolderList),
                );
            }
            Err(err) => warn!(%err, "Resolved folder rejected"),
        }

        if let (Some(surface), Some(list)) = (&mut self.list, self.selection.list()) {
            surface.show_list(list);
        }
    }

    /// Tells the surfaces about a newly selected folder.
    fn folder_selected(&mut self) {
        let Some(folder) = self.selection.folder().cloned() else {
            return;
        };
        self.announce_folder(Some(&folder));
        self.report_sync_status(&folder);
        let is_search_results = self
            .selection
            .list()
            .is_some_and(|list| list.is_search() && list.list_folder() == &folder);
        if !is_search_results {
            self.touch_recent(&folder);
        }
    }

    fn announce_folder(&mut self, folder: Option<&Folder>) {
        if let Some(bar) = &mut self.action_bar {
            bar.set_folder(folder);
        }
        if let Some(folders) = &mut self.folder_list {
            folders.select_folder(folder);
        }
    }

    fn report_sync_status(&mut self, folder: &Folder) {
        if let Some(bar) = &mut self.action_bar {
            if folder.sync_status.is_in_progress() {
                bar.on_refresh_started();
            } else {
                bar.on_refresh_stopped(folder.sync_status);
            }
        }
    }

    /// Moves `folder` to the front of the recent list and queues the write.
    ///
    /// Writes reach the provider one at a time, in touch order. Until the
    /// last queued write of an account is done, the provider's copy of that
    /// account's list is ignored and the local order stands.
    fn touch_recent(&mut self, folder: &Folder) {
        if !self.recent.touch(folder) {
            return;
        }
        self.publish_recent();

        let writer = match &self.recent_writer {
            Some(writer) => writer.clone(),
            None => {
                let writer = self.spawn_recent_writer();
                self.recent_writer = Some(writer.clone());
                writer
            }
        };
        if writer.send(folder.clone()).is_ok() {
            *self.recent_writes.entry(folder.account.clone()).or_default() += 1;
        } else {
            warn!(folder = %folder.id, "Recent folder writer is gone");
            self.recent_writer = None;
        }
    }

    fn spawn_recent_writer(&self) -> mpsc::UnboundedSender<Folder> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Folder>();
        let provider = Arc::clone(&self.provider);
        let handle = self.handle.clone();
        tokio::spawn(async move {
            while let Some(folder) = rx.recv().await {
                if let Err(error) = provider.record_recent_folder(&folder.account, &folder).await {
                    warn!(folder = %folder.id, %error, "Failed to record recent folder");
                }
                handle.post(Event::RecentFolderRecorded(folder.account));
            }
        });
        tx
    }

    fn recent_folder_recorded(&mut self, account: &AccountId) {
        if let Some(pending) = self.recent_writes.get_mut(account) {
            *pending -= 1;
            if *pending == 0 {
                self.recent_writes.remove(account);
            }
        }
    }

    fn publish_recent(&mut self) {
        if let Some(bar) = &mut self.action_bar {
            bar.set_recent_folders(self.recent.published());
        }
    }

    // Conversations

    fn select_conversation(&mut self, conversation: Conversation) {
        let transition = self.selection.set_conversation(conversation);
        if transition.changed
            && let (Some(host), Some(conversation)) = (&mut self.host, self.selection.conversation())
        {
            host.show_conversation(conversation);
        }
        self.apply_effects(transition.effects);
    }

    fn request_action(&mut self, action: DestructiveAction) {
        let Some(conversation) = self.selection.conversation().cloned() else {
            warn!(kind = %action.kind(), "No open conversation to act on");
            return;
        };
        let step = self.coordinator.request(
            action,
            conversation,
            self.selection.folder(),
            self.settings.as_ref(),
        );
        self.run_step(step);
    }

    fn run_step(&mut self, step: Step) {
        match step {
            Step::Confirm(request) => {
                if let Some(host) = &mut self.host {
                    host.confirm_action(&request);
                } else {
                    debug!(action = %request.action, "No host to confirm with, declining");
                    let step = self.coordinator.resolve_confirmation(request.action, false);
                    self.run_step(step);
                }
            }
            Step::AwaitRemoval(request) => {
                self.selection.update_conversation(&request.conversation);
                if let Some(list) = &mut self.list {
                    list.request_delete(request);
                } else {
                    // Nothing to animate.
                    self.removal_finished(request.action);
                }
            }
            Step::Apply(mutation) => self.apply_mutation(mutation),
            Step::Discarded => {}
        }
    }

    fn removal_finished(&mut self, action: ActionId) {
        let Some(mutation) = self.coordinator.removal_finished(action) else {
            return;
        };
        if let Some(list) = &mut self.list {
            list.on_action_complete();
        }
        self.apply_mutation(mutation);
    }

    fn apply_mutation(&mut self, mutation: Mutation) {
        for conversation in &mutation.conversations {
            self.selection.update_conversation(conversation);
        }
        let Mutation {
            action,
            operation,
            conversations,
        } = mutation;
        debug!(%action, kind = %operation.kind(), "Applying mutation");

        let provider = Arc::clone(&self.provider);
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let result = match &operation {
                DestructiveAction::Archive => provider.archive(&conversations).await,
                DestructiveAction::Delete => provider.delete(&conversations).await,
                DestructiveAction::Mute => provider.mute(&conversations).await,
                DestructiveAction::ReportSpam => provider.report_spam(&conversations).await,
                DestructiveAction::ChangeFolders(membership) => {
                    provider
                        .update_folder_membership(&conversations, membership)
                        .await
                }
            };
            handle.post(Event::MutationFinished { action, result });
        });
    }

    fn mutation_finished(&mut self, action: ActionId, result: mailsteer_core::Result<()>) {
        match self.coordinator.mutation_finished(action, result) {
            None => debug!(%action, "Ignoring result of unknown action"),
            Some(Ok(outcome)) => {
                if let Some(list) = &mut self.list {
                    if let Some(undo) = outcome.undo {
                        list.on_undo_available(undo);
                    }
                    if outcome.refresh_list {
                        list.request_list_refresh();
                    }
                }
                let still_open = self
                    .selection
                    .conversation()
                    .is_some_and(|conversation| conversation.id == outcome.conversation);
                if outcome.navigate_back && still_open {
                    let transition = self.selection.navigate_back();
                    self.apply_effects(transition.effects);
                }
            }
            Some(Err(failure)) => {
                self.selection.update_conversation(&failure.conversation);
                if let Some(host) = &mut self.host {
                    host.on_action_failed(&failure);
                }
            }
        }
    }

    fn update_conversation(&mut self, update: ConversationUpdate) {
        let Some(conversation) = self.selection.conversation().cloned() else {
            warn!(?update, "No open conversation to update");
            return;
        };
        self.updates_in_flight += 1;

        let provider = Arc::clone(&self.provider);
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let conversations = std::slice::from_ref(&conversation);
            let result = match update {
                ConversationUpdate::MarkUnread => {
                    provider
                        .update_boolean_field(conversations, BooleanField::Read, false)
                        .await
                }
                ConversationUpdate::MarkImportant | ConversationUpdate::MarkNotImportant => {
                    let priority = if update == ConversationUpdate::MarkImportant {
                        Priority::High
                    } else {
                        Priority::Low
                    };
                    provider
                        .update_int_field(conversations, IntField::Priority, priority.as_int())
                        .await
                }
            };
            handle.post(Event::UpdateFinished { update, result });
        });
    }

    fn update_finished(&mut self, update: ConversationUpdate, result: mailsteer_core::Result<()>) {
        self.updates_in_flight = self.updates_in_flight.saturating_sub(1);
        match result {
            Ok(()) => {
                debug!(?update, "Conversation updated");
                if let Some(list) = &mut self.list {
                    list.request_list_refresh();
                }
            }
            Err(error) => warn!(?update, %error, "Conversation update failed"),
        }
    }
}

impl<P: DataProvider> std::fmt::Debug for Controller<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("selection", &self.selection)
            .field("settings", &self.settings)
            .field("recent", &self.recent)
            .field("coordinator", &self.coordinator)
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}
