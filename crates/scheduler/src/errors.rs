//! Error types for the scheduler

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("scheduler is already running")]
    AlreadyRunning,
}
