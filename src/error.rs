use thiserror::Error;

/// Lifecycle and transport failures of a [`TimeWheel`](crate::TimeWheel).
///
/// Invalid inputs (negative delays, unknown keys, out-of-range configuration)
/// are not errors; they resolve to silent no-ops or clamped defaults.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelError {
    #[error("time wheel is already running")]
    AlreadyStarted,
    #[error("time wheel has been stopped")]
    Stopped,
    #[error("time wheel was never started")]
    NotStarted,
    #[error("time wheel driver has exited")]
    Closed,
    #[error("request queue is full")]
    QueueFull,
}

pub type Result<T> = std::result::Result<T, WheelError>;
