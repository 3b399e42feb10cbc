//! Optimization decision engine for the Studio Auto-Optimizer
//!
//! This crate decides when accumulated experiment data justifies
//! rebalancing variant traffic weights, and derives insights and
//! recommendations from a per-variant performance comparison. The gate is
//! intentionally a conservative sample-size check, not a statistical
//! significance test.

pub mod errors;
pub mod insights;
pub mod optimizer;

pub use errors::{OptimizerError, Result};
pub use insights::{generate_insights, generate_recommendations, Insights, OptimizerPolicy};
pub use optimizer::{ExperimentOptimizer, OptimizeOutcome, PerformanceReport};
