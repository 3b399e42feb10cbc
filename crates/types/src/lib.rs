//! Shared types for the Studio Auto-Optimizer
//!
//! This crate defines the variant performance data model consumed by the
//! decision engine and the `MetricsSource` collaborator contract through
//! which the optimizer reads aggregated experiment metrics.

pub mod metrics;
pub mod variants;

pub use metrics::MetricsSource;
pub use variants::{VariantMetrics, VariantPerformance};
