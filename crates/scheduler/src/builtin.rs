//! Built-in task set
//!
//! The scheduler composes the experiment optimizer and the rate limiter
//! sweep as its standing tasks. The embedding application registers these at
//! boot and may enable, disable, or trigger them individually.

use std::sync::Arc;

use async_trait::async_trait;
use studio_optimizer_config::ScheduleConfig;
use studio_optimizer_decision::ExperimentOptimizer;
use studio_optimizer_resilience::RateLimiter;
use tracing::debug;

use crate::task::{ScheduledTask, Task};

/// Id of the recurring weight optimization task
pub const WEIGHT_OPTIMIZATION_TASK_ID: &str = "optimize-ab-weights";
/// Id of the recurring performance analysis task
pub const PERFORMANCE_ANALYSIS_TASK_ID: &str = "analyze-performance";
/// Id of the recurring rate limiter sweep task
pub const RATE_LIMITER_SWEEP_TASK_ID: &str = "rate-limiter-sweep";

/// Periodically rebalances variant weights when enough data exists
pub struct WeightOptimizationTask {
    optimizer: Arc<ExperimentOptimizer>,
}

impl WeightOptimizationTask {
    pub fn new(optimizer: Arc<ExperimentOptimizer>) -> Self {
        Self { optimizer }
    }
}

#[async_trait]
impl Task for WeightOptimizationTask {
    async fn run(&self) -> anyhow::Result<()> {
        self.optimizer.optimize_weights().await?;
        Ok(())
    }
}

/// Periodically surfaces a performance report for operators
pub struct PerformanceAnalysisTask {
    optimizer: Arc<ExperimentOptimizer>,
}

impl PerformanceAnalysisTask {
    pub fn new(optimizer: Arc<ExperimentOptimizer>) -> Self {
        Self { optimizer }
    }
}

#[async_trait]
impl Task for PerformanceAnalysisTask {
    async fn run(&self) -> anyhow::Result<()> {
        self.optimizer.analyze_performance().await?;
        Ok(())
    }
}

/// Periodically sweeps expired rate limiter windows to bound memory
pub struct RateLimiterSweepTask {
    limiter: Arc<RateLimiter>,
}

impl RateLimiterSweepTask {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Task for RateLimiterSweepTask {
    async fn run(&self) -> anyhow::Result<()> {
        let removed = self.limiter.cleanup();
        debug!(
            "Rate limiter sweep complete: {} keys removed, {} tracked",
            removed,
            self.limiter.tracked_keys()
        );
        Ok(())
    }
}

/// Build the standard task set from configured intervals
pub fn builtin_tasks(
    optimizer: Arc<ExperimentOptimizer>,
    limiter: Arc<RateLimiter>,
    schedules: &ScheduleConfig,
) -> Vec<ScheduledTask> {
    vec![
        ScheduledTask::new(
            WEIGHT_OPTIMIZATION_TASK_ID,
            "A/B weight optimization",
            schedules.weight_optimization_interval(),
            Arc::new(WeightOptimizationTask::new(Arc::clone(&optimizer))),
        ),
        ScheduledTask::new(
            PERFORMANCE_ANALYSIS_TASK_ID,
            "Variant performance analysis",
            schedules.performance_analysis_interval(),
            Arc::new(PerformanceAnalysisTask::new(optimizer)),
        ),
        ScheduledTask::new(
            RATE_LIMITER_SWEEP_TASK_ID,
            "Rate limiter sweep",
            schedules.rate_limiter_sweep_interval(),
            Arc::new(RateLimiterSweepTask::new(limiter)),
        ),
    ]
}
