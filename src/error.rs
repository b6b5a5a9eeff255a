//! Error types for the scheduler.

use thiserror::Error;

/// Scheduler errors.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Store connection failure (initial connect or mid-stream).
    #[error("store connection error: {0}")]
    Connection(String),

    /// Connection pool error.
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Store command error.
    #[error("store error: {0}")]
    Store(#[from] deadpool_redis::redis::RedisError),

    /// A task description that could not be used for scheduling.
    ///
    /// Raised by description parsing; the dispatcher downgrades it to a
    /// logged anomaly and drops the task rather than crashing the loop.
    #[error("malformed task description for {task_id}: {reason}")]
    MalformedTask {
        /// The task whose description was unusable.
        task_id: String,
        /// What was missing or invalid.
        reason: String,
    },
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
