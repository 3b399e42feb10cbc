//! Insight and recommendation generation
//!
//! Pure functions over a variant performance comparison snapshot: no hidden
//! state, deterministic given the same input. Both restrict themselves to
//! active variants and rely on the comparison being pre-sorted best-to-worst
//! by the metrics source (an ordering precondition, not re-checked here).

use serde::{Deserialize, Serialize};
use studio_optimizer_types::VariantPerformance;

/// Fixed policy thresholds for the decision engine.
///
/// The sample-size gate is deliberately volume-only; waiting for data is the
/// intent, not statistical significance.
#[derive(Debug, Clone)]
pub struct OptimizerPolicy {
    /// Minimum uses on at least one variant before weights may rebalance
    pub min_sample_size: u64,
    /// Average rating below which the experiment needs attention
    pub min_avg_rating: f64,
    /// Average success rate (percent) below which the experiment needs
    /// attention
    pub min_success_rate: f64,
    /// Per-variant rating below which the variant should be disabled or
    /// revised
    pub low_rating_threshold: f64,
    /// Usage count below which a variant counts as starved
    pub low_usage_threshold: u64,
    /// Usage count above which a variant counts as dominating
    pub high_usage_threshold: u64,
}

impl Default for OptimizerPolicy {
    fn default() -> Self {
        Self {
            min_sample_size: 100,
            min_avg_rating: 3.5,
            min_success_rate: 60.0,
            low_rating_threshold: 3.0,
            low_usage_threshold: 50,
            high_usage_threshold: 500,
        }
    }
}

/// Derived insights over the active variants of a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insights {
    /// Whether the experiment needs human review
    pub needs_attention: bool,
    /// Explanatory message when insights could not be computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Arithmetic mean rating across active variants
    pub avg_rating: f64,
    /// Arithmetic mean success rate across active variants
    pub avg_success_rate: f64,
    /// Best-performing active variant (first in the pre-sorted comparison)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_variant: Option<String>,
    /// Worst-performing active variant (last in the pre-sorted comparison)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_variant: Option<String>,
    /// Rating spread between best and worst active variant
    pub performance_gap: f64,
}

/// Derive insights from a comparison snapshot, considering only active
/// variants.
pub fn generate_insights(comparison: &[VariantPerformance], policy: &OptimizerPolicy) -> Insights {
    let active: Vec<&VariantPerformance> = comparison.iter().filter(|v| v.active).collect();

    if active.is_empty() {
        return Insights {
            needs_attention: true,
            message: Some("No active variants".to_string()),
            avg_rating: 0.0,
            avg_success_rate: 0.0,
            best_variant: None,
            worst_variant: None,
            performance_gap: 0.0,
        };
    }

    let count = active.len() as f64;
    let avg_rating = active.iter().map(|v| v.metrics.avg_rating).sum::<f64>() / count;
    let avg_success_rate = active.iter().map(|v| v.metrics.success_rate).sum::<f64>() / count;

    // First and last active entry of the pre-sorted comparison
    let best = active[0];
    let worst = active[active.len() - 1];
    let performance_gap = best.metrics.avg_rating - worst.metrics.avg_rating;

    Insights {
        needs_attention: avg_rating < policy.min_avg_rating
            || avg_success_rate < policy.min_success_rate,
        message: None,
        avg_rating,
        avg_success_rate,
        best_variant: Some(best.name.clone()),
        worst_variant: Some(worst.name.clone()),
        performance_gap,
    }
}

/// Derive recommendations from a comparison snapshot.
///
/// Rules are evaluated independently and every applicable rule fires; the
/// fallback fires only when nothing else did.
pub fn generate_recommendations(
    comparison: &[VariantPerformance],
    policy: &OptimizerPolicy,
) -> Vec<String> {
    let active: Vec<&VariantPerformance> = comparison.iter().filter(|v| v.active).collect();
    let mut recommendations = Vec::new();

    if active.len() < 2 {
        recommendations
            .push("Add more active variants to enable meaningful comparison".to_string());
    }

    for variant in &active {
        if variant.metrics.avg_rating < policy.low_rating_threshold {
            recommendations.push(format!(
                "Variant '{}' is underperforming (avg rating {:.1}); consider disabling or revising it",
                variant.name, variant.metrics.avg_rating
            ));
        }
    }

    let starved = active
        .iter()
        .any(|v| v.metrics.total_uses < policy.low_usage_threshold);
    let dominating = active
        .iter()
        .any(|v| v.metrics.total_uses > policy.high_usage_threshold);
    if starved && dominating {
        recommendations
            .push("Traffic is unevenly distributed across variants; rebalance weights".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("All variants performing within expected ranges; continue monitoring".to_string());
    }

    recommendations
}
