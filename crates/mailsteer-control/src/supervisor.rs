//! Supervision of background fetches.
//!
//! At most one fetch per [`FetchKind`] is live at a time. Starting a fetch
//! supersedes the previous one of the same kind: its task is aborted, and
//! should it have finished already, its completion is rejected when it
//! reaches the control thread.
//!
//! Supersession rests on a per-kind generation counter. Each started fetch
//! captures the generation it was started under in its [`FetchTicket`], and
//! [`TaskSupervisor::accept`] applies a completion only when that generation
//! is still the live one. Aborting the task is an optimisation; the
//! generation check is what guarantees stale results are never applied.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// The purpose of a background fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// Resolving the account's default inbox.
    Inbox,
    /// Resolving the folder to show for the current account.
    AccountFolder,
    /// Resolving the folder holding search results.
    SearchFolder,
    /// Syncing the current folder.
    FolderRefresh,
}

impl FetchKind {
    /// Every fetch kind.
    pub const ALL: [Self; 4] = [
        Self::Inbox,
        Self::AccountFolder,
        Self::SearchFolder,
        Self::FolderRefresh,
    ];
}

/// Identifies one started fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    /// Kind of the fetch.
    pub kind: FetchKind,
    /// Generation the fetch was started under.
    pub generation: u64,
}

/// Per-kind generation bookkeeping.
///
/// Pure state with no runtime attached, so supersession can be checked in
/// isolation.
#[derive(Debug, Clone, Default)]
pub struct GenerationTable {
    issued: HashMap<FetchKind, u64>,
    live: HashMap<FetchKind, u64>,
}

impl GenerationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new generation for `kind`, superseding the live one.
    pub fn begin(&mut self, kind: FetchKind) -> FetchTicket {
        let generation = self.issued.entry(kind).or_insert(0);
        *generation += 1;
        self.live.insert(kind, *generation);
        FetchTicket {
            kind,
            generation: *generation,
        }
    }

    /// Returns true if `ticket` is the live fetch of its kind.
    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.live.get(&ticket.kind) == Some(&ticket.generation)
    }

    /// Marks `ticket` as finished.
    ///
    /// Returns true if it was the live fetch of its kind.
    pub fn retire(&mut self, ticket: FetchTicket) -> bool {
        if self.is_current(ticket) {
            self.live.remove(&ticket.kind);
            true
        } else {
            false
        }
    }

    /// Drops the live fetch of `kind`, if any.
    ///
    /// Returns true if a fetch was live.
    pub fn cancel(&mut self, kind: FetchKind) -> bool {
        self.live.remove(&kind).is_some()
    }

    /// Returns true if a fetch of `kind` is live.
    #[must_use]
    pub fn is_live(&self, kind: FetchKind) -> bool {
        self.live.contains_key(&kind)
    }
}

/// Result of a finished fetch, as delivered to the control thread.
#[derive(Debug)]
pub struct FetchCompletion<T> {
    /// Ticket of the fetch that produced this result.
    pub ticket: FetchTicket,
    /// What the fetch produced.
    pub result: mailsteer_core::Result<T>,
}

/// Owns the in-flight fetches of the control layer.
///
/// Fetches run as tokio tasks. Their results travel back over a channel and
/// must be passed through [`TaskSupervisor::accept`] on the control thread.
#[derive(Debug)]
pub struct TaskSupervisor<T> {
    table: GenerationTable,
    tasks: HashMap<FetchKind, JoinHandle<()>>,
    completions: mpsc::UnboundedSender<FetchCompletion<T>>,
}

impl<T: Send + 'static> TaskSupervisor<T> {
    /// Creates a supervisor and the receiver its completions arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FetchCompletion<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            table: GenerationTable::new(),
            tasks: HashMap::new(),
            completions: tx,
        };
        (supervisor, rx)
    }

    /// Starts a fetch, superseding any live fetch of the same kind.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, kind: FetchKind, work: F) -> FetchTicket
    where
        F: Future<Output = mailsteer_core::Result<T>> + Send + 'static,
    {
        if let Some(previous) = self.tasks.remove(&kind) {
            previous.abort();
        }
        let ticket = self.table.begin(kind);
        debug!(?kind, generation = ticket.generation, "Starting fetch");

        let completions = self.completions.clone();
        let task = tokio::spawn(async move {
            let result = work.await;
            // The receiver is gone only once the controller has shut down.
            let _ = completions.send(FetchCompletion { ticket, result });
        });
        self.tasks.insert(kind, task);
        ticket
    }

    /// Filters a completion through the generation table.
    ///
    /// Returns the fetch result if the completion belongs to the live fetch
    /// of its kind, or `None` if it was superseded or cancelled.
    pub fn accept(
        &mut self,
        completion: FetchCompletion<T>,
    ) -> Option<mailsteer_core::Result<T>> {
        let FetchCompletion { ticket, result } = completion;
        if self.table.retire(ticket) {
            self.tasks.remove(&ticket.kind);
            Some(result)
        } else {
            trace!(
                kind = ?ticket.kind,
                generation = ticket.generation,
                "Discarding stale fetch result"
            );
            None
        }
    }

    /// Cancels the live fetch of `kind`, if any.
    pub fn cancel(&mut self, kind: FetchKind) {
        if let Some(task) = self.tasks.remove(&kind) {
            task.abort();
        }
        if self.table.cancel(kind) {
            debug!(?kind, "Cancelled fetch");
        }
    }

    /// Cancels every live fetch.
    pub fn cancel_all(&mut self) {
        for kind in FetchKind::ALL {
            self.cancel(kind);
        }
    }

    /// Returns true if a fetch of `kind` has been started and not yet
    /// accepted or cancelled.
    #[must_use]
    pub fn is_in_flight(&self, kind: FetchKind) -> bool {
        self.table.is_live(kind)
    }

    /// Returns true if any fetch is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        FetchKind::ALL.iter().any(|kind| self.table.is_live(*kind))
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
    use super::*;

    mod generation_table_tests {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn newest_ticket_is_current() {
            let mut table = GenerationTable::new();
            let first = table.begin(FetchKind::Inbox);
            let second = table.begin(FetchKind::Inbox);
            assert!(!table.is_current(first));
            assert!(table.is_current(second));
        }

        #[test]
        fn kinds_are_independent() {
            let mut table = GenerationTable::new();
            let inbox = table.begin(FetchKind::Inbox);
            let search = table.begin(FetchKind::SearchFolder);
            assert!(table.is_current(inbox));
            assert!(table.is_current(search));
        }

        #[test]
        fn retire_accepts_once() {
            let mut table = GenerationTable::new();
            let ticket = table.begin(FetchKind::FolderRefresh);
            assert!(table.retire(ticket));
            assert!(!table.retire(ticket));
            assert!(!table.is_live(FetchKind::FolderRefresh));
        }

        #[test]
        fn cancel_rejects_live_ticket() {
            let mut table = GenerationTable::new();
            let ticket = table.begin(FetchKind::AccountFolder);
            assert!(table.cancel(FetchKind::AccountFolder));
            assert!(!table.retire(ticket));
        }

        #[test]
        fn generations_keep_growing_after_cancel() {
            let mut table = GenerationTable::new();
            let first = table.begin(FetchKind::AccountFolder);
            table.cancel(FetchKind::AccountFolder);
            let second = table.begin(FetchKind::AccountFolder);
            assert!(second.generation > first.generation);
            assert!(!table.is_current(first));
        }

        fn kind() -> impl Strategy<Value = FetchKind> {
            prop::sample::select(FetchKind::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn only_latest_start_per_kind_is_applied(
                starts in prop::collection::vec(kind(), 1..40),
                order in prop::collection::vec(any::<prop::sample::Index>(), 40),
            ) {
                let mut table = GenerationTable::new();
                let mut tickets: Vec<FetchTicket> =
                    starts.iter().map(|kind| table.begin(*kind)).collect();

                let mut latest: HashMap<FetchKind, FetchTicket> = HashMap::new();
                for ticket in &tickets {
                    latest.insert(ticket.kind, *ticket);
                }

                // Deliver completions in an arbitrary order.
                let mut applied = Vec::new();
                for index in order {
                    if tickets.is_empty() {
                        break;
                    }
                    let ticket = tickets.remove(index.index(tickets.len()));
                    if table.retire(ticket) {
                        applied.push(ticket);
                    }
                }
                for ticket in tickets {
                    if table.retire(ticket) {
                        applied.push(ticket);
                    }
                }

                prop_assert_eq!(applied.len(), latest.len());
                for ticket in applied {
                    prop_assert_eq!(latest.get(&ticket.kind), Some(&ticket));
                }
            }
        }
    }

    mod supervisor_tests {
        use std::time::Duration;

        use tokio::sync::oneshot;

        use super::*;

        #[tokio::test]
        async fn delivers_current_result() {
            let (mut supervisor, mut rx) = TaskSupervisor::new();
            supervisor.start(FetchKind::Inbox, async { Ok(7) });
            assert!(supervisor.is_in_flight(FetchKind::Inbox));

            let completion = rx.recv().await.unwrap();
            assert_eq!(supervisor.accept(completion), Some(Ok(7)));
            assert!(!supervisor.is_in_flight(FetchKind::Inbox));
        }

        #[tokio::test]
        async fn finished_but_superseded_result_is_discarded() {
            let (mut supervisor, mut rx) = TaskSupervisor::new();
            supervisor.start(FetchKind::SearchFolder, async { Ok("old") });
            // Let the first fetch finish before the second one starts.
            let stale = rx.recv().await.unwrap();

            supervisor.start(FetchKind::SearchFolder, async { Ok("new") });
            let fresh = rx.recv().await.unwrap();

            assert_eq!(supervisor.accept(stale), None);
            assert_eq!(supervisor.accept(fresh), Some(Ok("new")));
        }

        #[tokio::test]
        async fn superseded_task_is_aborted() {
            let (mut supervisor, mut rx) = TaskSupervisor::new();
            let (_hold, never) = oneshot::channel::<()>();
            supervisor.start(FetchKind::AccountFolder, async move {
                let _ = never.await;
                Ok(1)
            });
            supervisor.start(FetchKind::AccountFolder, async { Ok(2) });

            let completion = rx.recv().await.unwrap();
            assert_eq!(completion.ticket.generation, 2);
            assert_eq!(supervisor.accept(completion), Some(Ok(2)));
            tokio_test::assert_pending!(tokio_test::task::spawn(rx.recv()).poll());
        }

        #[tokio::test(start_paused = true)]
        async fn cancel_discards_late_result() {
            let (mut supervisor, mut rx) = TaskSupervisor::new();
            let ticket = supervisor.start(FetchKind::FolderRefresh, async { Ok(()) });
            tokio::time::sleep(Duration::from_millis(1)).await;
            supervisor.cancel(FetchKind::FolderRefresh);

            let completion = rx.recv().await.unwrap();
            assert_eq!(completion.ticket, ticket);
            assert!(supervisor.accept(completion).is_none());
            assert!(!supervisor.is_busy());
        }

        #[tokio::test]
        async fn errors_are_delivered() {
            let (mut supervisor, mut rx) = TaskSupervisor::<u8>::new();
            supervisor.start(FetchKind::Inbox, async {
                Err(mailsteer_core::Error::NoInbox(mailsteer_core::AccountId::new("a")))
            });
            let completion = rx.recv().await.unwrap();
            assert!(matches!(
                supervisor.accept(completion),
                Some(Err(mailsteer_core::Error::NoInbox(_)))
            ));
        }
    }
}
