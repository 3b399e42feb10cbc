//! Configuration management for the Studio Auto-Optimizer

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main optimizer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Service configuration
    pub service: ServiceConfig,

    /// Built-in task schedules
    pub schedules: ScheduleConfig,

    /// Resilience primitive settings
    pub resilience: ResilienceConfig,
}

impl OptimizerConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }

        // Override with environment variables (prefixed with OPTIMIZER_)
        figment = figment.merge(Env::prefixed("OPTIMIZER_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.schedules.validate()?;
        self.resilience.validate()
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Deployment mode; the scheduler is started at boot only in
    /// production mode
    pub mode: DeploymentMode,
}

impl ServiceConfig {
    /// Whether the embedding application should start the scheduler at boot
    pub fn is_production(&self) -> bool {
        self.mode == DeploymentMode::Production
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "studio-optimizer".to_string(),
            mode: DeploymentMode::Development,
        }
    }
}

/// Deployment mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    Development,
    Production,
}

/// Intervals for the built-in scheduled tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Weight optimization interval in seconds
    pub weight_optimization_interval_secs: u64,

    /// Performance analysis interval in seconds
    pub performance_analysis_interval_secs: u64,

    /// Rate limiter sweep interval in seconds
    pub rate_limiter_sweep_interval_secs: u64,
}

impl ScheduleConfig {
    pub fn weight_optimization_interval(&self) -> Duration {
        Duration::from_secs(self.weight_optimization_interval_secs)
    }

    pub fn performance_analysis_interval(&self) -> Duration {
        Duration::from_secs(self.performance_analysis_interval_secs)
    }

    pub fn rate_limiter_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limiter_sweep_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.weight_optimization_interval_secs == 0
            || self.performance_analysis_interval_secs == 0
            || self.rate_limiter_sweep_interval_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "Task intervals must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weight_optimization_interval_secs: 3600, // hourly
            performance_analysis_interval_secs: 86400, // daily
            rate_limiter_sweep_interval_secs: 600,
        }
    }
}

/// Settings for the resilience primitives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Rate limiter settings
    pub rate_limit: RateLimitSettings,

    /// Circuit breaker settings
    pub circuit_breaker: CircuitBreakerSettings,

    /// Retry executor settings
    pub retry: RetrySettings,
}

impl ResilienceConfig {
    fn validate(&self) -> Result<()> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.max_requests must be greater than 0".to_string(),
            ));
        }
        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.window_ms must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "circuit_breaker.failure_threshold must be greater than 0".to_string(),
            ));
        }
        if self.circuit_breaker.recovery_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "circuit_breaker.recovery_time_ms must be greater than 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rate limiter quota and window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Maximum requests per key within the window
    pub max_requests: usize,

    /// Sliding window size in milliseconds
    pub window_ms: u64,
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60_000,
        }
    }
}

/// Circuit breaker thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u64,

    /// Time to wait in the open state before probing recovery, in
    /// milliseconds
    pub recovery_time_ms: u64,
}

impl CircuitBreakerSettings {
    pub fn recovery_time(&self) -> Duration {
        Duration::from_millis(self.recovery_time_ms)
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_time_ms: 30_000,
        }
    }
}

/// Retry executor defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts (including the first)
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds
    pub delay_ms: u64,

    /// Whether to double the delay after each failed attempt
    pub exponential_backoff: bool,
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
            exponential_backoff: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.service.name, "studio-optimizer");
        assert!(!config.service.is_production());
        assert_eq!(config.schedules.weight_optimization_interval_secs, 3600);
        assert_eq!(config.resilience.rate_limit.max_requests, 10);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = OptimizerConfig::default();
        config.schedules.weight_optimization_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_resilience_settings_rejected() {
        let mut config = OptimizerConfig::default();
        config.resilience.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.resilience.circuit_breaker.recovery_time_ms = 0;
        assert!(config.validate().is_err());

        let mut config = OptimizerConfig::default();
        config.resilience.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_accessors() {
        let config = OptimizerConfig::default();
        assert_eq!(
            config.schedules.rate_limiter_sweep_interval(),
            Duration::from_secs(600)
        );
        assert_eq!(config.resilience.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.resilience.retry.delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_deployment_mode_serialization() {
        let json = serde_json::to_string(&DeploymentMode::Production).unwrap();
        assert_eq!(json, "\"production\"");
        let mode: DeploymentMode = serde_json::from_str("\"development\"").unwrap();
        assert_eq!(mode, DeploymentMode::Development);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = OptimizerConfig::load(None).unwrap();
        assert!(config.validate().is_ok());
    }
}
