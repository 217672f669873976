//! Fire-and-forget execution of expired tasks.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::task::{Task, TimerKey};

/// Run an expired task's job on its own Tokio task.
///
/// The caller never awaits the job. A panicking job is caught and logged
/// here so the failure stays inside that one task.
pub(crate) fn dispatch<K: TimerKey>(wheel: Arc<str>, task: Task<K>) {
    let Task { key, job, .. } = task;
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(job.run()).catch_unwind().await {
            log::warn!(
                "Timer {:?} in wheel '{}' panicked: {}",
                key,
                wheel,
                panic_message(panic.as_ref())
            );
        }
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
