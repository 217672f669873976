//! # Time Wheel
//!
//! A hashed timing wheel for Tokio, built for very large numbers of
//! short-to-medium-lived timers: lease keep-alives, idle timeouts, retry
//! backoffs, cache expirations.
//!
//! Insertion and cancellation are O(1) and each tick only touches the tasks
//! in one slot. Delays are quantized to the tick interval.
//!
//! ## Design
//!
//! - **Single owner**: one driver task owns the slot ring and key index.
//!   Callers never touch it; they send requests over bounded queues.
//! - **Backpressure**: a full request queue makes the caller wait.
//! - **Fire-and-forget dispatch**: expired jobs run on their own Tokio tasks
//!   and a panicking job is logged and isolated.
//! - **Silent no-ops**: negative delays (past deadlines) and unknown keys are
//!   ignored; configuration below the minimums is clamped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use timewheel::{job_fn, TimeWheel, WheelConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut wheel = TimeWheel::new(
//!         WheelConfig::builder()
//!             .name("sessions")
//!             .tick_interval(Duration::from_secs(1))
//!             .slot_count(60)
//!             .build(),
//!     );
//!     wheel.start()?;
//!
//!     let handle = wheel.handle();
//!     handle
//!         .add_timer(
//!             Duration::from_secs(30),
//!             Some("session-42".to_string()),
//!             job_fn(|id: u32| println!("session {} idle", id), 42),
//!         )
//!         .await?;
//!
//!     // Activity seen: cancel the idle timeout.
//!     handle.remove_timer("session-42".to_string()).await?;
//!
//!     wheel.stop().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod dispatch;
mod driver;
mod error;
mod ring;
mod task;
mod wheel;

pub use config::{
    WheelConfig, WheelConfigBuilder, DEFAULT_QUEUE_CAPACITY, DEFAULT_SLOT_COUNT, MIN_SLOT_COUNT,
    MIN_TICK_INTERVAL,
};
pub use error::{Result, WheelError};
pub use task::{job_async, job_fn, AsyncFnJob, FnJob, TimerJob, TimerKey};
pub use wheel::{TimeWheel, WheelHandle};

// Re-export commonly used types for convenience
pub use async_trait::async_trait;
pub use std::time::Duration;
pub use tokio::time::Instant;
pub use tokio_util::sync::CancellationToken;
