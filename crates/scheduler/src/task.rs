//! Task descriptors
//!
//! A scheduled task is a named, zero-argument async operation plus its
//! firing interval. Descriptors are plain data; the live timer handles are
//! kept in the scheduler's side table, never captured in closures.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A recurring task body.
///
/// Bodies may run overlapping with their own previous firing; they must not
/// assume mutual exclusion.
#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`Task`]
pub struct TaskFn<F> {
    f: F,
}

impl<F, Fut> TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self.f)().await
    }
}

/// A registered recurring task
pub struct ScheduledTask {
    /// Stable identity within the registry
    pub id: String,
    /// Human-readable label
    pub name: String,
    /// Duration between firings
    pub interval: Duration,
    /// Only enabled tasks are scheduled to fire
    pub enabled: bool,
    /// The operation to execute
    pub task: Arc<dyn Task>,
}

impl ScheduledTask {
    /// Create an enabled task descriptor
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        interval: Duration,
        task: Arc<dyn Task>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            interval,
            enabled: true,
            task,
        }
    }

    /// Register this task disabled; it will not fire until enabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Snapshot of one task's scheduling state
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    /// Task id
    pub id: String,
    /// Human-readable label
    pub name: String,
    /// Whether the task is currently enabled
    pub enabled: bool,
    /// Completion time of the most recent firing, success or failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    /// Estimated next firing (`last_run + interval`); unknown before the
    /// first firing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    /// Firing interval
    pub interval: Duration,
}
