//! Recurring task scheduler
//!
//! Owns the task registry and a side table of live timer handles, one per
//! enabled task while running. Each timer tick spawns the firing on its own
//! tokio task, so firings of the same task may overlap if a previous firing
//! is still in flight: there is no per-task mutual exclusion and no
//! ordering guarantee across different tasks. Task failures are caught and
//! logged at the firing boundary; they never cancel future firings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, SchedulerError};
use crate::task::{ScheduledTask, Task, TaskStatus};

struct TaskEntry {
    name: String,
    interval: Duration,
    enabled: bool,
    last_run: Option<DateTime<Utc>>,
    task: Arc<dyn Task>,
}

/// Recurring task scheduler.
///
/// Constructed once by the embedding application's startup sequence and
/// shared by handle; `start()` is expected at process boot (production mode)
/// and `stop()` on graceful shutdown.
pub struct TaskScheduler {
    /// Registered task descriptors, keyed by id
    tasks: Arc<DashMap<String, TaskEntry>>,
    /// Live timer handles; an entry exists iff the task is enabled and the
    /// scheduler has started it
    timers: DashMap<String, JoinHandle<()>>,
    running: AtomicBool,
}

impl TaskScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            timers: DashMap::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Insert or replace the task keyed by its id (last write wins).
    ///
    /// Replacing a task whose timer is live restarts the timer against the
    /// new descriptor.
    pub fn register_task(&self, task: ScheduledTask) {
        let ScheduledTask {
            id,
            name,
            interval,
            enabled,
            task,
        } = task;

        debug!("Registering task '{}' (interval {:?})", id, interval);

        if let Some((_, handle)) = self.timers.remove(&id) {
            handle.abort();
        }

        self.tasks.insert(
            id.clone(),
            TaskEntry {
                name,
                interval,
                enabled,
                last_run: None,
                task,
            },
        );

        if enabled && self.running.load(Ordering::SeqCst) {
            let handle = self.spawn_timer(&id, interval);
            if let Some(displaced) = self.timers.insert(id, handle) {
                displaced.abort();
            }
        }
    }

    /// Start timers for every enabled task.
    ///
    /// Guarded: calling `start` while already running is rejected rather
    /// than leaking duplicate timers.
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        for entry in self.tasks.iter() {
            if entry.enabled {
                let handle = self.spawn_timer(entry.key(), entry.interval);
                if let Some(displaced) = self.timers.insert(entry.key().clone(), handle) {
                    displaced.abort();
                }
            }
        }

        info!("Task scheduler started with {} active timers", self.timers.len());
        Ok(())
    }

    /// Cancel all timers. Enabled flags are left untouched and in-flight
    /// firings run to completion.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let ids: Vec<String> = self.timers.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, handle)) = self.timers.remove(&id) {
                handle.abort();
            }
        }

        info!("Task scheduler stopped");
    }

    /// Whether the scheduler is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Enable a task; if the scheduler is running, its timer starts
    /// immediately.
    pub fn enable_task(&self, id: &str) -> Result<()> {
        let interval = {
            let mut entry = self
                .tasks
                .get_mut(id)
                .ok_or_else(|| SchedulerError::TaskNotFound(id.to_string()))?;
            entry.enabled = true;
            entry.interval
        };

        if self.running.load(Ordering::SeqCst) && !self.timers.contains_key(id) {
            let handle = self.spawn_timer(id, interval);
            if let Some(displaced) = self.timers.insert(id.to_string(), handle) {
                displaced.abort();
            }
            info!("Task '{}' enabled and scheduled", id);
        } else {
            info!("Task '{}' enabled", id);
        }

        Ok(())
    }

    /// Disable a task and cancel its timer if active. An in-flight firing
    /// runs to completion.
    pub fn disable_task(&self, id: &str) -> Result<()> {
        {
            let mut entry = self
                .tasks
                .get_mut(id)
                .ok_or_else(|| SchedulerError::TaskNotFound(id.to_string()))?;
            entry.enabled = false;
        }

        if let Some((_, handle)) = self.timers.remove(id) {
            handle.abort();
        }

        info!("Task '{}' disabled", id);
        Ok(())
    }

    /// Fire a task once, immediately, outside its timer cadence.
    ///
    /// Body failures are caught and logged, never propagated; only an
    /// unknown id is an error. Updates `last_run` like a timer firing.
    pub async fn run_task_now(&self, id: &str) -> Result<()> {
        let (name, task) = {
            let entry = self
                .tasks
                .get(id)
                .ok_or_else(|| SchedulerError::TaskNotFound(id.to_string()))?;
            (entry.name.clone(), Arc::clone(&entry.task))
        };

        info!("Manually triggering task '{}'", id);
        fire(&self.tasks, id, &name, task).await;
        Ok(())
    }

    /// Snapshot the scheduling state of every registered task
    pub fn task_statuses(&self) -> Vec<TaskStatus> {
        self.tasks
            .iter()
            .map(|entry| {
                let next_run = entry.last_run.and_then(|last| {
                    chrono::Duration::from_std(entry.interval)
                        .ok()
                        .map(|d| last + d)
                });

                TaskStatus {
                    id: entry.key().clone(),
                    name: entry.name.clone(),
                    enabled: entry.enabled,
                    last_run: entry.last_run,
                    next_run,
                    interval: entry.interval,
                }
            })
            .collect()
    }

    fn spawn_timer(&self, id: &str, interval: Duration) -> JoinHandle<()> {
        let tasks = Arc::clone(&self.tasks);
        let id = id.to_string();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the first firing comes
            // one full interval after start.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some((name, task)) = tasks
                    .get(&id)
                    .map(|e| (e.name.clone(), Arc::clone(&e.task)))
                else {
                    warn!("Task '{}' vanished from registry; stopping its timer", id);
                    break;
                };

                // Fire on an independent task so a slow firing never blocks
                // the cadence; overlap with the previous firing is allowed.
                let tasks = Arc::clone(&tasks);
                let id = id.clone();
                tokio::spawn(async move {
                    fire(&tasks, &id, &name, task).await;
                });
            }
        })
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one firing to completion, record the outcome, and stamp `last_run`
/// regardless of success or failure.
async fn fire(tasks: &DashMap<String, TaskEntry>, id: &str, name: &str, task: Arc<dyn Task>) {
    let started = Instant::now();
    debug!("Task '{}' firing", id);

    match task.run().await {
        Ok(()) => info!(
            "Task '{}' ({}) completed in {}ms",
            id,
            name,
            started.elapsed().as_millis()
        ),
        Err(e) => error!(
            "Task '{}' ({}) failed after {}ms: {:#}",
            id,
            name,
            started.elapsed().as_millis(),
            e
        ),
    }

    if let Some(mut entry) = tasks.get_mut(id) {
        entry.last_run = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::AtomicU32;
    use tokio::time::sleep;

    struct CountingTask {
        fired: AtomicU32,
        fail: bool,
    }

    impl CountingTask {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: AtomicU32::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fired: AtomicU32::new(0),
                fail: true,
            })
        }

        fn count(&self) -> u32 {
            self.fired.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Task for CountingTask {
        async fn run(&self) -> anyhow::Result<()> {
            self.fired.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("task blew up"))
            } else {
                Ok(())
            }
        }
    }

    fn scheduler_with(id: &str, interval_ms: u64, task: Arc<CountingTask>) -> TaskScheduler {
        let scheduler = TaskScheduler::new();
        scheduler.register_task(ScheduledTask::new(
            id,
            "test task",
            Duration::from_millis(interval_ms),
            task,
        ));
        scheduler
    }

    #[tokio::test]
    async fn test_fires_on_interval() {
        let task = CountingTask::new();
        let scheduler = scheduler_with("tick", 40, Arc::clone(&task));

        scheduler.start().unwrap();
        sleep(Duration::from_millis(150)).await;
        scheduler.stop();

        let fired = task.count();
        assert!(fired >= 2, "expected at least 2 firings, got {}", fired);
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let scheduler = scheduler_with("tick", 1000, CountingTask::new());
        scheduler.start().unwrap();

        assert!(matches!(
            scheduler.start(),
            Err(SchedulerError::AlreadyRunning)
        ));
        scheduler.stop();

        // After stop, start is allowed again
        scheduler.start().unwrap();
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_disabled_task_never_fires() {
        let task = CountingTask::new();
        let scheduler = scheduler_with("tick", 30, Arc::clone(&task));

        scheduler.disable_task("tick").unwrap();
        scheduler.start().unwrap();
        sleep(Duration::from_millis(150)).await;
        scheduler.stop();

        assert_eq!(task.count(), 0);
    }

    #[tokio::test]
    async fn test_enable_resumes_firing() {
        let task = CountingTask::new();
        let scheduler = scheduler_with("tick", 30, Arc::clone(&task));

        scheduler.disable_task("tick").unwrap();
        scheduler.start().unwrap();
        sleep(Duration::from_millis(80)).await;
        assert_eq!(task.count(), 0);

        scheduler.enable_task("tick").unwrap();
        sleep(Duration::from_millis(100)).await;
        scheduler.stop();

        assert!(task.count() >= 1);
    }

    #[tokio::test]
    async fn test_stop_preserves_enabled_flags() {
        let scheduler = scheduler_with("tick", 1000, CountingTask::new());
        scheduler.start().unwrap();
        scheduler.stop();

        let statuses = scheduler.task_statuses();
        assert!(statuses[0].enabled);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_run_task_now_fires_once_and_stamps_last_run() {
        let task = CountingTask::new();
        let scheduler = scheduler_with("tick", 60_000, Arc::clone(&task));

        // Works without the scheduler running
        scheduler.run_task_now("tick").await.unwrap();
        assert_eq!(task.count(), 1);

        let statuses = scheduler.task_statuses();
        assert!(statuses[0].last_run.is_some());
        assert!(statuses[0].next_run.is_some());
    }

    #[tokio::test]
    async fn test_run_task_now_unknown_id() {
        let scheduler = TaskScheduler::new();
        assert!(matches!(
            scheduler.run_task_now("missing").await,
            Err(SchedulerError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failing_task_keeps_firing_and_stamps_last_run() {
        let task = CountingTask::failing();
        let scheduler = scheduler_with("flaky", 30, Arc::clone(&task));

        scheduler.start().unwrap();
        sleep(Duration::from_millis(130)).await;
        scheduler.stop();

        // Failures are suppressed at the firing boundary; the cadence
        // continues and last_run is still stamped.
        assert!(task.count() >= 2);
        assert!(scheduler.task_statuses()[0].last_run.is_some());
    }

    #[tokio::test]
    async fn test_register_replaces_by_id() {
        let first = CountingTask::new();
        let second = CountingTask::new();
        let scheduler = scheduler_with("tick", 60_000, Arc::clone(&first));

        scheduler.register_task(ScheduledTask::new(
            "tick",
            "replacement",
            Duration::from_millis(40),
            Arc::clone(&second) as Arc<dyn Task>,
        ));

        scheduler.run_task_now("tick").await.unwrap();
        assert_eq!(first.count(), 0);
        assert_eq!(second.count(), 1);

        let statuses = scheduler.task_statuses();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].name, "replacement");
    }

    #[tokio::test]
    async fn test_status_before_first_firing() {
        let scheduler = scheduler_with("tick", 5000, CountingTask::new());

        let statuses = scheduler.task_statuses();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].id, "tick");
        assert!(statuses[0].last_run.is_none());
        assert!(statuses[0].next_run.is_none());
        assert_eq!(statuses[0].interval, Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_enable_unknown_task() {
        let scheduler = TaskScheduler::new();
        assert!(matches!(
            scheduler.enable_task("missing"),
            Err(SchedulerError::TaskNotFound(_))
        ));
        assert!(matches!(
            scheduler.disable_task("missing"),
            Err(SchedulerError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_start_aborts_stale_timer_handle() {
        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let scheduler = scheduler_with("tick", 60_000, CountingTask::new());

        // A handle already mapped for the id must be aborted when a new
        // timer takes its slot, otherwise it would keep firing with no
        // handle left to cancel it.
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));
        let stale = tokio::spawn(async move {
            let _flag = flag;
            sleep(Duration::from_secs(60)).await;
        });
        scheduler.timers.insert("tick".to_string(), stale);

        scheduler.start().unwrap();
        sleep(Duration::from_millis(20)).await;

        assert!(dropped.load(Ordering::SeqCst));
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_overlapping_firings_allowed() {
        struct SlowTask {
            started: AtomicU32,
        }

        #[async_trait::async_trait]
        impl Task for SlowTask {
            async fn run(&self) -> anyhow::Result<()> {
                self.started.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(200)).await;
                Ok(())
            }
        }

        let task = Arc::new(SlowTask {
            started: AtomicU32::new(0),
        });
        let scheduler = TaskScheduler::new();
        scheduler.register_task(ScheduledTask::new(
            "slow",
            "slow task",
            Duration::from_millis(40),
            Arc::clone(&task) as Arc<dyn Task>,
        ));

        scheduler.start().unwrap();
        sleep(Duration::from_millis(150)).await;
        scheduler.stop();

        // A 200ms body on a 40ms cadence: multiple firings start before the
        // first completes.
        assert!(task.started.load(Ordering::SeqCst) >= 2);
    }
}
