use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::WheelConfig;
use crate::driver::{Driver, Removal};
use crate::error::{Result, WheelError};
use crate::ring::SlotRing;
use crate::task::{Task, TimerJob, TimerKey};

enum State<K> {
    /// Constructed; the driver waits here until `start`.
    Idle(Driver<K>),
    Running(JoinHandle<()>),
    Stopped,
}

/// Hashed timing wheel
///
/// Owns the lifecycle (`Idle -> Running -> Stopped`) of one driver loop.
/// Consumers that only schedule and cancel should get a [`WheelHandle`].
///
/// Dropping the wheel stops its driver.
pub struct TimeWheel<K: TimerKey = String> {
    config: WheelConfig,

    handle: WheelHandle<K>,

    state: State<K>,

    /// Stop signal for the driver; a child of any caller-supplied token
    cancel_token: CancellationToken,
}

/// Cloneable handle for scheduling and cancelling timers
///
/// Adds and removals travel on separate queues. A removal is applied only
/// after every add queued before it, so `add_timer(k)` followed by
/// `remove_timer(k)` from one caller always cancels. Ticks may still fall
/// between any two requests. Submitting to a full queue waits for space.
pub struct WheelHandle<K> {
    add_tx: mpsc::Sender<Task<K>>,

    remove_tx: mpsc::Sender<Removal<K>>,
}

impl<K> Clone for WheelHandle<K> {
    fn clone(&self) -> Self {
        Self {
            add_tx: self.add_tx.clone(),
            remove_tx: self.remove_tx.clone(),
        }
    }
}

impl<K: TimerKey> TimeWheel<K> {
    /// Create an idle wheel. Values below the configured minimums are clamped.
    ///
    /// No background work starts until [`TimeWheel::start`].
    pub fn new(config: WheelConfig) -> Self {
        Self::with_cancel_token(config, CancellationToken::new())
    }

    /// Create an idle wheel that also stops when `parent` is cancelled.
    pub fn with_cancel_token(config: WheelConfig, parent: CancellationToken) -> Self {
        let config = config.clamped();
        let cancel_token = parent.child_token();
        let (add_tx, add_rx) = mpsc::channel(config.queue_capacity);
        let (remove_tx, remove_rx) = mpsc::channel(config.queue_capacity);

        let driver = Driver::new(
            Arc::from(config.name.as_str()),
            SlotRing::new(config.slot_count, config.tick_interval),
            add_rx,
            remove_rx,
            cancel_token.clone(),
        );

        TimeWheel {
            config,
            handle: WheelHandle { add_tx, remove_tx },
            state: State::Idle(driver),
            cancel_token,
        }
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn handle(&self) -> WheelHandle<K> {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Spawn the driver loop onto the current Tokio runtime.
    ///
    /// Starting a running wheel fails with [`WheelError::AlreadyStarted`];
    /// a stopped wheel cannot be restarted ([`WheelError::Stopped`]).
    ///
    /// # Panics
    /// When called outside a Tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Idle(driver) => {
                self.state = State::Running(tokio::spawn(driver.run()));
                Ok(())
            }
            State::Running(join) => {
                self.state = State::Running(join);
                Err(WheelError::AlreadyStarted)
            }
            State::Stopped => Err(WheelError::Stopped),
        }
    }

    /// Stop ticking and wait for the driver loop to exit.
    ///
    /// Once this returns no further tick runs and no further timer fires.
    /// Jobs dispatched earlier are not awaited. Stopping a stopped wheel is a
    /// no-op; stopping one that never started fails with
    /// [`WheelError::NotStarted`].
    pub async fn stop(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Stopped) {
            State::Running(join) => {
                self.cancel_token.cancel();
                if let Err(e) = join.await {
                    log::warn!("Time wheel '{}' driver ended abnormally: {}", self.config.name, e);
                }
                Ok(())
            }
            State::Idle(driver) => {
                self.state = State::Idle(driver);
                Err(WheelError::NotStarted)
            }
            State::Stopped => Ok(()),
        }
    }

    /// See [`WheelHandle::add_timer`].
    pub async fn add_timer<J: TimerJob>(&self, delay: Duration, key: Option<K>, job: J) -> Result<()> {
        self.handle.add_timer(delay, key, job).await
    }

    /// See [`WheelHandle::add_timer_at`].
    pub async fn add_timer_at<J: TimerJob>(&self, deadline: Instant, key: Option<K>, job: J) -> Result<()> {
        self.handle.add_timer_at(deadline, key, job).await
    }

    /// See [`WheelHandle::try_add_timer`].
    pub fn try_add_timer<J: TimerJob>(&self, delay: Duration, key: Option<K>, job: J) -> Result<()> {
        self.handle.try_add_timer(delay, key, job)
    }

    /// See [`WheelHandle::remove_timer`].
    pub async fn remove_timer(&self, key: K) -> Result<()> {
        self.handle.remove_timer(key).await
    }

    /// See [`WheelHandle::try_remove_timer`].
    pub fn try_remove_timer(&self, key: K) -> Result<()> {
        self.handle.try_remove_timer(key)
    }

    /// See [`WheelHandle::remove_all`].
    pub async fn remove_all(&self) -> Result<()> {
        self.handle.remove_all().await
    }
}

impl<K: TimerKey> Drop for TimeWheel<K> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl<K: TimerKey> WheelHandle<K> {
    /// Schedule `job` to run once, `delay` from when the driver accepts it.
    ///
    /// The delay is quantized down to whole ticks. Only keyed timers can be
    /// cancelled. Fails only with [`WheelError::Closed`] once the driver has
    /// exited.
    pub async fn add_timer<J: TimerJob>(&self, delay: Duration, key: Option<K>, job: J) -> Result<()> {
        self.add_tx
            .send(Task::new(delay, key, Box::new(job)))
            .await
            .map_err(|_| WheelError::Closed)
    }

    /// Schedule `job` for `deadline`.
    ///
    /// A deadline already in the past is a negative delay: the request is
    /// discarded without error and the job never runs.
    pub async fn add_timer_at<J: TimerJob>(&self, deadline: Instant, key: Option<K>, job: J) -> Result<()> {
        match deadline.checked_duration_since(Instant::now()) {
            Some(delay) => self.add_timer(delay, key, job).await,
            None => {
                log::debug!("Discarding timer {:?} with a deadline in the past", key);
                Ok(())
            }
        }
    }

    /// Schedule without waiting for queue space.
    pub fn try_add_timer<J: TimerJob>(&self, delay: Duration, key: Option<K>, job: J) -> Result<()> {
        self.add_tx
            .try_send(Task::new(delay, key, Box::new(job)))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => WheelError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => WheelError::Closed,
            })
    }

    /// Cancel every pending timer with `key`.
    ///
    /// Unknown keys and timers that already fired are a silent no-op.
    pub async fn remove_timer(&self, key: K) -> Result<()> {
        self.send_removal(Removal::Key(key)).await
    }

    /// Cancel without waiting for queue space.
    pub fn try_remove_timer(&self, key: K) -> Result<()> {
        self.remove_tx
            .try_send(Removal::Key(key))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => WheelError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => WheelError::Closed,
            })
    }

    /// Cancel every pending timer, keyed or not.
    pub async fn remove_all(&self) -> Result<()> {
        self.send_removal(Removal::All).await
    }

    async fn send_removal(&self, removal: Removal<K>) -> Result<()> {
        self.remove_tx
            .send(removal)
            .await
            .map_err(|_| WheelError::Closed)
    }
}
