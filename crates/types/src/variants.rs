//! Variant performance types
//!
//! Aggregated per-variant metrics as reported by the embedding application.
//! These are read-only snapshots for the decision engine; the optimizer never
//! mutates them directly.

use serde::{Deserialize, Serialize};

/// Aggregated usage and quality metrics for a single variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    /// Total number of times this variant has been served
    pub total_uses: u64,
    /// Average user rating on a 1-5 scale
    pub avg_rating: f64,
    /// Success rate as a percentage (0-100)
    pub success_rate: f64,
}

/// Performance snapshot for one variant in an A/B experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPerformance {
    /// Variant name (e.g., "control", "variant_a")
    pub name: String,
    /// Whether this variant is currently serving traffic
    pub active: bool,
    /// Aggregated metrics for this variant
    pub metrics: VariantMetrics,
}

impl VariantPerformance {
    /// Create a new active variant snapshot
    pub fn new(
        name: impl Into<String>,
        total_uses: u64,
        avg_rating: f64,
        success_rate: f64,
    ) -> Self {
        Self {
            name: name.into(),
            active: true,
            metrics: VariantMetrics {
                total_uses,
                avg_rating,
                success_rate,
            },
        }
    }

    /// Mark this variant as inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_performance_creation() {
        let variant = VariantPerformance::new("control", 250, 4.2, 88.0);
        assert_eq!(variant.name, "control");
        assert!(variant.active);
        assert_eq!(variant.metrics.total_uses, 250);

        let inactive = VariantPerformance::new("retired", 10, 2.0, 40.0).inactive();
        assert!(!inactive.active);
    }

    #[test]
    fn test_variant_performance_serialization() {
        let variant = VariantPerformance::new("variant_a", 120, 3.9, 72.5);
        let json = serde_json::to_string(&variant).unwrap();
        let back: VariantPerformance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, variant);
    }
}
