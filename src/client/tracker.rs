//! Completion tracking for asynchronous requests
//!
//! Spawned requests never touch the completion map directly. They send
//! events to a single aggregator task that owns it, and the aggregator
//! publishes a [`Snapshot`] after every event. Reads of the snapshot never
//! block on the aggregator.
//!
//! ```text
//!  begin(id) ──┐
//!  task A ─────┼──> mpsc ──> aggregator (owns HashMap<CommandId, Outcome>)
//!  task B ─────┘                  │
//!                                 └──> watch<Snapshot> ──> done_count()
//! ```

use crate::common::CommandId;
use std::collections::HashMap;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

/// Where one asynchronous request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Succeeded,
    Failed,
}

/// Point-in-time view of the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub outstanding: usize,
    pub succeeded: usize,
    pub failed: usize,
}

enum Event {
    Begin(CommandId),
    Complete { id: CommandId, succeeded: bool },
    Drain(oneshot::Sender<()>),
    Query(CommandId, oneshot::Sender<Option<Outcome>>),
}

/// Cheap to clone; every clone feeds the same aggregator.
#[derive(Clone, Debug)]
pub struct CompletionTracker {
    events: mpsc::UnboundedSender<Event>,
    snapshot: watch::Receiver<Snapshot>,
}

impl CompletionTracker {
    /// Spawn the aggregator on `runtime`. It stops once every clone is dropped.
    pub fn spawn(runtime: &Handle, capacity: usize) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let (publish, snapshot) = watch::channel(Snapshot::default());
        let aggregator = Aggregator {
            results: HashMap::with_capacity(capacity),
            current: Snapshot::default(),
            waiters: Vec::new(),
            publish,
        };
        runtime.spawn(aggregator.run(rx));
        Self { events, snapshot }
    }

    /// Register `id` as outstanding and not yet successful.
    pub fn begin(&self, id: CommandId) {
        self.send(Event::Begin(id));
    }

    /// Record the terminal state of `id`.
    pub fn complete(&self, id: CommandId, succeeded: bool) {
        self.send(Event::Complete { id, succeeded });
    }

    /// Guard that settles `id` exactly once, even if its task never finishes.
    pub fn completion(&self, id: CommandId) -> Completion {
        Completion {
            tracker: self.clone(),
            id,
            settled: false,
        }
    }

    /// Number of requests flagged successful as of the last applied event.
    pub fn done_count(&self) -> usize {
        self.snapshot.borrow().succeeded
    }

    pub fn outstanding(&self) -> usize {
        self.snapshot.borrow().outstanding
    }

    pub fn snapshot(&self) -> Snapshot {
        *self.snapshot.borrow()
    }

    /// Resolve once every event sent before this call has been applied and
    /// nothing is outstanding.
    pub async fn wait(&self) {
        let (tx, rx) = oneshot::channel();
        self.send(Event::Drain(tx));
        let _ = rx.await;
    }

    pub async fn outcome(&self, id: CommandId) -> Option<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.send(Event::Query(id, tx));
        rx.await.ok().flatten()
    }

    fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::warn!("completion aggregator has stopped; event dropped");
        }
    }
}

/// Pending completion of one command.
///
/// Dropping it without calling [`Completion::finish`] (a panic or a cancelled
/// task) records the command as failed.
#[derive(Debug)]
pub struct Completion {
    tracker: CompletionTracker,
    id: CommandId,
    settled: bool,
}

impl Completion {
    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn finish(mut self, succeeded: bool) {
        self.settled = true;
        self.tracker.complete(self.id, succeeded);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("command {} abandoned before completing", self.id);
            self.tracker.complete(self.id, false);
        }
    }
}

struct Aggregator {
    results: HashMap<CommandId, Outcome>,
    current: Snapshot,
    waiters: Vec<oneshot::Sender<()>>,
    publish: watch::Sender<Snapshot>,
}

impl Aggregator {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = rx.recv().await {
            self.apply(event);
        }
        tracing::debug!(
            succeeded = self.current.succeeded,
            failed = self.current.failed,
            "completion aggregator stopped"
        );
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::Begin(id) => {
                if self.results.insert(id, Outcome::Pending).is_some() {
                    tracing::warn!("command {} registered twice", id);
                } else {
                    self.current.outstanding += 1;
                }
            }
            Event::Complete { id, succeeded } => match self.results.get_mut(&id) {
                Some(outcome) if *outcome == Outcome::Pending => {
                    if succeeded {
                        *outcome = Outcome::Succeeded;
                        self.current.succeeded += 1;
                    } else {
                        *outcome = Outcome::Failed;
                        self.current.failed += 1;
                    }
                    self.current.outstanding -= 1;
                }
                Some(done) => {
                    tracing::warn!("command {} already completed as {:?}", id, done);
                }
                None => {
                    tracing::warn!("completion for unknown command {}", id);
                }
            },
            Event::Drain(tx) => self.waiters.push(tx),
            Event::Query(id, tx) => {
                let _ = tx.send(self.results.get(&id).copied());
            }
        }

        self.publish.send_replace(self.current);
        if self.current.outstanding == 0 {
            for waiter in self.waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_begin_and_complete() {
        let tracker = CompletionTracker::spawn(&Handle::current(), 8);
        tracker.begin(CommandId(1));
        tracker.begin(CommandId(2));
        tracker.begin(CommandId(3));
        tracker.complete(CommandId(1), true);
        tracker.complete(CommandId(3), false);

        assert_eq!(tracker.outcome(CommandId(1)).await, Some(Outcome::Succeeded));
        assert_eq!(tracker.outcome(CommandId(2)).await, Some(Outcome::Pending));
        assert_eq!(tracker.outcome(CommandId(3)).await, Some(Outcome::Failed));
        assert_eq!(tracker.outcome(CommandId(4)).await, None);

        assert_eq!(
            tracker.snapshot(),
            Snapshot {
                outstanding: 1,
                succeeded: 1,
                failed: 1
            }
        );

        tracker.complete(CommandId(2), true);
        tracker.wait().await;
        assert_eq!(tracker.done_count(), 2);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_outcome_is_set_once() {
        let tracker = CompletionTracker::spawn(&Handle::current(), 0);
        tracker.begin(CommandId(1));
        tracker.complete(CommandId(1), false);
        tracker.complete(CommandId(1), true);
        tracker.wait().await;

        assert_eq!(tracker.outcome(CommandId(1)).await, Some(Outcome::Failed));
        assert_eq!(tracker.done_count(), 0);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_unknown_completion_is_ignored() {
        let tracker = CompletionTracker::spawn(&Handle::current(), 0);
        tracker.complete(CommandId(5), true);
        tracker.wait().await;
        assert_eq!(tracker.snapshot(), Snapshot::default());
    }

    #[tokio::test]
    async fn test_wait_with_nothing_outstanding() {
        let tracker = CompletionTracker::spawn(&Handle::current(), 0);
        tracker.wait().await;
        assert_eq!(tracker.done_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_guard() {
        let tracker = CompletionTracker::spawn(&Handle::current(), 4);
        tracker.begin(CommandId(1));
        tracker.begin(CommandId(2));

        let finished = tracker.completion(CommandId(1));
        assert_eq!(finished.id(), CommandId(1));
        finished.finish(true);
        drop(tracker.completion(CommandId(2)));
        tracker.wait().await;

        assert_eq!(tracker.outcome(CommandId(1)).await, Some(Outcome::Succeeded));
        assert_eq!(tracker.outcome(CommandId(2)).await, Some(Outcome::Failed));
        assert_eq!(
            tracker.snapshot(),
            Snapshot {
                outstanding: 0,
                succeeded: 1,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_panicking_task_still_completes() {
        let tracker = CompletionTracker::spawn(&Handle::current(), 1);
        tracker.begin(CommandId(1));
        let completion = tracker.completion(CommandId(1));
        let task = tokio::spawn(async move {
            let _completion = completion;
            panic!("request task blew up");
        });
        assert!(task.await.unwrap_err().is_panic());

        tracker.wait().await;
        assert_eq!(tracker.outcome(CommandId(1)).await, Some(Outcome::Failed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_completions() {
        let tracker = CompletionTracker::spawn(&Handle::current(), 128);
        let mut handles = Vec::new();
        for i in 1..=100u64 {
            tracker.begin(CommandId(i));
            let t = tracker.clone();
            handles.push(tokio::spawn(async move {
                t.complete(CommandId(i), i % 4 != 0);
            }));
        }
        tracker.wait().await;
        assert_eq!(tracker.done_count(), 75);
        assert_eq!(tracker.snapshot().failed, 25);
        for h in handles {
            h.await.unwrap();
        }
    }
}
