use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dispatch::dispatch;
use crate::ring::SlotRing;
use crate::task::{Task, TimerKey};

/// Request carried on the remove queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Removal<K> {
    Key(K),
    All,
}

/// Driver loop: the only owner of the ring and its index.
///
/// Every mutation arrives as a message on one of the two bounded queues, so
/// the ring needs no locking.
pub(crate) struct Driver<K> {
    /// Instance name for logging
    name: Arc<str>,

    ring: SlotRing<K>,

    add_rx: mpsc::Receiver<Task<K>>,

    remove_rx: mpsc::Receiver<Removal<K>>,

    cancel_token: CancellationToken,
}

impl<K: TimerKey> Driver<K> {
    pub(crate) fn new(
        name: Arc<str>,
        ring: SlotRing<K>,
        add_rx: mpsc::Receiver<Task<K>>,
        remove_rx: mpsc::Receiver<Removal<K>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            name,
            ring,
            add_rx,
            remove_rx,
            cancel_token,
        }
    }

    /// Run until the cancellation token fires. Pending tasks are abandoned.
    pub(crate) async fn run(mut self) {
        let period = self.ring.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "Time wheel '{}' started ({} slots, {:?} tick)",
            self.name,
            self.ring.slot_count(),
            period
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.handle_tick();
                },

                Some(task) = self.add_rx.recv() => {
                    self.handle_add(task);
                },

                Some(removal) = self.remove_rx.recv() => {
                    self.handle_remove(removal);
                },

                _ = self.cancel_token.cancelled() => {
                    break;
                },
            }
        }

        log::info!(
            "Time wheel '{}' stopped, abandoning {} pending timer(s)",
            self.name,
            self.ring.len()
        );
    }

    fn handle_tick(&mut self) {
        let pos = self.ring.pos();
        let expired = self.ring.tick();
        log::trace!(
            "Time wheel '{}' tick at slot {}: {} expired",
            self.name,
            pos,
            expired.len()
        );
        for task in expired {
            dispatch(self.name.clone(), task);
        }
    }

    fn handle_add(&mut self, task: Task<K>) {
        let delay = task.delay;
        let key = task.key.clone();
        let slot = self.ring.insert(task);
        log::debug!(
            "Timer {:?} added to wheel '{}' at slot {} (delay {:?})",
            key,
            self.name,
            slot,
            delay
        );
    }

    /// Apply a removal after every add already queued ahead of it, so a caller
    /// that adds then removes always cancels its own timer.
    fn handle_remove(&mut self, removal: Removal<K>) {
        while let Ok(task) = self.add_rx.try_recv() {
            self.handle_add(task);
        }

        match removal {
            Removal::Key(key) => {
                let removed = self.ring.remove(&key);
                if removed > 0 {
                    log::debug!(
                        "Removed {} timer(s) with key {:?} from wheel '{}'",
                        removed,
                        key,
                        self.name
                    );
                }
            }
            Removal::All => {
                let removed = self.ring.clear();
                log::debug!("Removed all {} timer(s) from wheel '{}'", removed, self.name);
            }
        }
    }
}
