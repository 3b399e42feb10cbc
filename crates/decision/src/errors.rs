//! Error types for the decision engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("metrics source error: {0}")]
    MetricsSource(#[from] anyhow::Error),
}
