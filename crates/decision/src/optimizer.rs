//! Experiment optimizer
//!
//! Drives adaptive weight rebalancing over a `MetricsSource` collaborator:
//! a readiness gate decides whether enough data has accumulated, and a
//! report builder turns the current comparison into insights and
//! recommendations for operators.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use studio_optimizer_types::{MetricsSource, VariantPerformance};
use tracing::{info, warn};

use crate::errors::Result;
use crate::insights::{generate_insights, generate_recommendations, Insights, OptimizerPolicy};

/// Outcome of a weight optimization pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum OptimizeOutcome {
    /// The readiness gate passed and weights were rebalanced
    Rebalanced,
    /// Not enough data yet; nothing was changed
    InsufficientData {
        /// Highest usage count observed across variants
        max_uses: u64,
    },
}

/// Performance analysis report
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// Raw comparison snapshot, sorted best-to-worst
    pub comparison: Vec<VariantPerformance>,
    /// Derived insights over the active variants
    pub insights: Insights,
    /// Applicable recommendations
    pub recommendations: Vec<String>,
    /// When this report was generated
    pub generated_at: DateTime<Utc>,
}

/// Adaptive experiment optimizer
pub struct ExperimentOptimizer {
    source: Arc<dyn MetricsSource>,
    policy: OptimizerPolicy,
}

impl ExperimentOptimizer {
    /// Create an optimizer over the given metrics source with default policy
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self {
            source,
            policy: OptimizerPolicy::default(),
        }
    }

    /// Override the policy thresholds
    pub fn with_policy(mut self, policy: OptimizerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the policy
    pub fn policy(&self) -> &OptimizerPolicy {
        &self.policy
    }

    /// Rebalance variant weights if enough data has accumulated.
    ///
    /// The gate requires at least one variant with
    /// `total_uses >= policy.min_sample_size`; otherwise this logs and takes
    /// no action.
    pub async fn optimize_weights(&self) -> Result<OptimizeOutcome> {
        let comparison = self.source.performance_comparison().await?;

        let max_uses = comparison
            .iter()
            .map(|v| v.metrics.total_uses)
            .max()
            .unwrap_or(0);

        if max_uses < self.policy.min_sample_size {
            info!(
                "Skipping weight optimization: insufficient data ({} uses, need {})",
                max_uses, self.policy.min_sample_size
            );
            return Ok(OptimizeOutcome::InsufficientData { max_uses });
        }

        self.source.auto_optimize_weights().await?;
        info!(
            "Variant weights rebalanced across {} variants",
            comparison.len()
        );
        Ok(OptimizeOutcome::Rebalanced)
    }

    /// Build and surface a performance report for the current comparison.
    ///
    /// Emits a warning when the insights flag the experiment for human
    /// review.
    pub async fn analyze_performance(&self) -> Result<PerformanceReport> {
        let comparison = self.source.performance_comparison().await?;

        let insights = generate_insights(&comparison, &self.policy);
        let recommendations = generate_recommendations(&comparison, &self.policy);

        info!(
            "Performance analysis: {} variants, avg rating {:.2}, avg success rate {:.1}%",
            comparison.len(),
            insights.avg_rating,
            insights.avg_success_rate
        );
        for recommendation in &recommendations {
            info!("Recommendation: {}", recommendation);
        }

        if insights.needs_attention {
            warn!(
                "Experiment needs attention: {}",
                insights
                    .message
                    .as_deref()
                    .unwrap_or("performance below policy thresholds")
            );
        }

        Ok(PerformanceReport {
            comparison,
            insights,
            recommendations,
            generated_at: Utc::now(),
        })
    }
}
