//! Metrics source collaborator contract
//!
//! The optimizer reads aggregated experiment metrics and triggers weight
//! rebalancing through this trait. Implementations live in the embedding
//! application (typically backed by its database).

use async_trait::async_trait;

use crate::variants::VariantPerformance;

/// External source of per-variant performance metrics.
///
/// `performance_comparison` must return variants sorted best-to-worst; the
/// decision engine relies on that ordering and does not re-sort.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch the current performance comparison across all variants,
    /// sorted best-to-worst.
    async fn performance_comparison(&self) -> anyhow::Result<Vec<VariantPerformance>>;

    /// Rebalance variant traffic weights based on accumulated metrics.
    ///
    /// Mutates external variant-weight state; no return contract beyond
    /// "succeeded or failed".
    async fn auto_optimize_weights(&self) -> anyhow::Result<()>;
}
