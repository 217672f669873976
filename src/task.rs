use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use async_trait::async_trait;

/// Identity of a cancellable timer.
///
/// Implemented for every type that can be hashed, compared, cloned into the
/// index and moved to the driver task, e.g. `String`, `u64` or a small enum.
pub trait TimerKey: Eq + Hash + Clone + fmt::Debug + Send + 'static {}

impl<T> TimerKey for T where T: Eq + Hash + Clone + fmt::Debug + Send + 'static {}

/// Work executed once when a timer expires.
///
/// Jobs run on their own Tokio task, never on the driver loop. A job that
/// panics is logged and dropped; it cannot affect the wheel or other jobs.
#[async_trait]
pub trait TimerJob: Send + 'static {
    async fn run(self: Box<Self>);
}

/// Job calling a blocking closure with its captured arguments.
///
/// Created by [`job_fn`]. The closure runs on Tokio's blocking pool.
pub struct FnJob<F, A> {
    f: F,
    args: A,
}

/// Job awaiting the future produced by an async closure.
///
/// Created by [`job_async`].
pub struct AsyncFnJob<F, A> {
    f: F,
    args: A,
}

/// Bind a blocking callback to the arguments it will be called with.
///
/// ```
/// use timewheel::job_fn;
///
/// let job = job_fn(|(lease, ttl): (u64, u32)| println!("lease {lease} expired after {ttl}s"), (7, 30));
/// # let _ = job;
/// ```
pub fn job_fn<F, A>(f: F, args: A) -> FnJob<F, A>
where
    F: FnOnce(A) + Send + 'static,
    A: Send + 'static,
{
    FnJob { f, args }
}

/// Bind an async callback to the arguments it will be called with.
pub fn job_async<F, A, Fut>(f: F, args: A) -> AsyncFnJob<F, A>
where
    F: FnOnce(A) -> Fut + Send + 'static,
    A: Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    AsyncFnJob { f, args }
}

#[async_trait]
impl<F, A> TimerJob for FnJob<F, A>
where
    F: FnOnce(A) + Send + 'static,
    A: Send + 'static,
{
    async fn run(self: Box<Self>) {
        let FnJob { f, args } = *self;
        if let Err(err) = tokio::task::spawn_blocking(move || f(args)).await {
            if err.is_panic() {
                // Surface the panic to the dispatcher, which owns reporting.
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}

#[async_trait]
impl<F, A, Fut> TimerJob for AsyncFnJob<F, A>
where
    F: FnOnce(A) -> Fut + Send + 'static,
    A: Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn run(self: Box<Self>) {
        let AsyncFnJob { f, args } = *self;
        f(args).await;
    }
}

/// One scheduled callback, owned by the driver loop until it expires.
pub(crate) struct Task<K> {
    pub(crate) delay: Duration,
    /// Full rotations left before the task may fire in its slot.
    pub(crate) circle: usize,
    pub(crate) key: Option<K>,
    pub(crate) job: Box<dyn TimerJob>,
}

impl<K> Task<K> {
    pub(crate) fn new(delay: Duration, key: Option<K>, job: Box<dyn TimerJob>) -> Self {
        Self {
            delay,
            circle: 0,
            key,
            job,
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Task<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("delay", &self.delay)
            .field("circle", &self.circle)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
