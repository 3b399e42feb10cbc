//! Recurring task scheduling for the Studio Auto-Optimizer
//!
//! This crate provides the in-process scheduler that keeps the optimizer
//! self-healing without operator intervention: a registry of named recurring
//! tasks, per-task periodic timers, enable/disable and run-now controls, and
//! status introspection. The built-in task set composes the experiment
//! optimizer and the rate limiter sweep.
//!
//! This is a best-effort, single-process, in-memory coordination layer: the
//! schedule is not persisted across restarts and execution is not
//! exactly-once.

pub mod builtin;
pub mod errors;
pub mod scheduler;
pub mod task;

pub use builtin::{
    builtin_tasks, PerformanceAnalysisTask, RateLimiterSweepTask, WeightOptimizationTask,
    PERFORMANCE_ANALYSIS_TASK_ID, RATE_LIMITER_SWEEP_TASK_ID, WEIGHT_OPTIMIZATION_TASK_ID,
};
pub use errors::{Result, SchedulerError};
pub use scheduler::TaskScheduler;
pub use task::{ScheduledTask, Task, TaskFn, TaskStatus};
