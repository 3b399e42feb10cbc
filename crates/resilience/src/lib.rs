//! Resilience primitives for the Studio Auto-Optimizer
//!
//! This crate provides the reusable fault-tolerance building blocks that
//! guard calls to external, possibly-flaky services: a sliding-window rate
//! limiter, a circuit breaker state machine, and a retry-with-backoff
//! executor. Each primitive is created once per protected resource and is
//! safe under concurrent access.

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerStats, CircuitState,
};
pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterStats};
pub use retry::{RetryExecutor, RetryPolicy};
