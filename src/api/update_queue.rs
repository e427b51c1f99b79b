use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, trace, warn};

use crate::error::{PlotError, PlotResult};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const CONSUMER_THREAD_NAME: &str = "stripchart-update";

/// Something the consumer thread can ask to run one coalesced update pass.
pub trait UpdateTarget: Send + Sync {
    fn process_update(&self) -> PlotResult<()>;
}

enum QueueMessage {
    Update(Weak<dyn UpdateTarget>),
    Shutdown,
}

#[derive(Debug, Default)]
struct QueueCounters {
    interrupted: AtomicBool,
    processed: AtomicU64,
    failed: AtomicU64,
    dropped_targets: AtomicU64,
}

/// Cloneable producer side of an [`UpdateQueue`].
#[derive(Clone)]
pub struct UpdateQueueHandle {
    sender: SyncSender<QueueMessage>,
    counters: Arc<QueueCounters>,
    consumer: ThreadId,
}

impl std::fmt::Debug for UpdateQueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateQueueHandle")
            .field("interrupted", &self.counters.interrupted.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl UpdateQueueHandle {
    /// Posts one update token; blocks while the queue is full.
    ///
    /// Tokens hold a weak reference, so a target dropped before its turn is
    /// skipped rather than kept alive.
    ///
    /// On the consumer thread itself (an update pass that appends in turbo
    /// mode) the post never blocks: a full queue drops the token, since the
    /// queued tokens already drain the same dirty set.
    pub fn post(&self, target: Weak<dyn UpdateTarget>) -> PlotResult<()> {
        if self.counters.interrupted.load(Ordering::Acquire) {
            return Err(PlotError::QueueClosed);
        }
        if thread::current().id() != self.consumer {
            return self
                .sender
                .send(QueueMessage::Update(target))
                .map_err(|_| PlotError::QueueClosed);
        }
        match self.sender.try_send(QueueMessage::Update(target)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                trace!("update queue full; dropping token posted by the consumer");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(PlotError::QueueClosed),
        }
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.counters.interrupted.load(Ordering::Acquire)
    }
}

/// FIFO of update tokens drained by one dedicated consumer thread.
///
/// Duplicate tokens are not merged; each one runs an idempotent drain of the
/// target's dirty set. A failing or panicking target is logged and the
/// consumer moves on to the next token.
pub struct UpdateQueue {
    handle: UpdateQueueHandle,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for UpdateQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateQueue")
            .field("processed", &self.processed_count())
            .field("failed", &self.failed_count())
            .field("running", &self.is_running())
            .finish()
    }
}

impl UpdateQueue {
    pub fn spawn() -> PlotResult<Self> {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> PlotResult<Self> {
        if capacity == 0 {
            return Err(PlotError::InvalidData(
                "update queue capacity must be > 0".to_owned(),
            ));
        }
        let (sender, receiver) = mpsc::sync_channel(capacity);
        let counters = Arc::new(QueueCounters::default());
        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name(CONSUMER_THREAD_NAME.to_owned())
            .spawn(move || consume(&receiver, &worker_counters))
            .map_err(PlotError::ThreadSpawn)?;
        debug!(capacity, "update queue consumer started");

        Ok(Self {
            handle: UpdateQueueHandle {
                sender,
                counters,
                consumer: worker.thread().id(),
            },
            worker: Some(worker),
        })
    }

    #[must_use]
    pub fn handle(&self) -> UpdateQueueHandle {
        self.handle.clone()
    }

    pub fn post(&self, target: Weak<dyn UpdateTarget>) -> PlotResult<()> {
        self.handle.post(target)
    }

    /// Stops the consumer after its current token; pending tokens are discarded.
    pub fn interrupt(&self) {
        if self.handle.counters.interrupted.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wakes an idle consumer; a full queue is noticed on the next recv.
        if let Err(TrySendError::Full(_)) = self.handle.sender.try_send(QueueMessage::Shutdown) {
            trace!("update queue full while interrupting");
        }
        debug!("update queue interrupted");
    }

    /// Tokens taken off the queue so far, including failed ones.
    #[must_use]
    pub fn processed_count(&self) -> u64 {
        self.handle.counters.processed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn failed_count(&self) -> u64 {
        self.handle.counters.failed.load(Ordering::Acquire)
    }

    /// Tokens whose target had already been dropped.
    #[must_use]
    pub fn dropped_target_count(&self) -> u64 {
        self.handle.counters.dropped_targets.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Interrupts the consumer and waits for it to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.interrupt();
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            warn!("update queue consumer exited with a panic");
        }
    }
}

impl Drop for UpdateQueue {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn consume(receiver: &Receiver<QueueMessage>, counters: &QueueCounters) {
    while let Ok(message) = receiver.recv() {
        if counters.interrupted.load(Ordering::Acquire) {
            break;
        }
        let target = match message {
            QueueMessage::Shutdown => break,
            QueueMessage::Update(target) => target,
        };
        counters.processed.fetch_add(1, Ordering::AcqRel);

        let Some(target) = target.upgrade() else {
            counters.dropped_targets.fetch_add(1, Ordering::AcqRel);
            trace!("skipping update token for dropped target");
            continue;
        };
        match catch_unwind(AssertUnwindSafe(|| target.process_update())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                counters.failed.fetch_add(1, Ordering::AcqRel);
                warn!(error = %err, "update pass failed");
            }
            Err(_) => {
                counters.failed.fetch_add(1, Ordering::AcqRel);
                warn!("update pass panicked");
            }
        }
    }
    debug!("update queue consumer exiting");
}
