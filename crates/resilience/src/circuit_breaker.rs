//! Circuit Breaker Pattern
//!
//! This module implements a circuit breaker for fault isolation. After a
//! configured number of consecutive failures the circuit opens and calls
//! fail fast without touching the wrapped operation; after a cool-down
//! period a single probe is let through to test recovery.
//!
//! The breaker only decides admit-vs-reject and tracks health; it never
//! retries internally; that is the retry executor's job.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u64,
    /// Duration to wait in the open state before probing recovery
    pub recovery_time: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_time: Duration::from_secs(30),
        }
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Operations pass through normally
    Closed,
    /// All operations fail fast without being invoked
    Open,
    /// One probe operation is attempted to test recovery
    HalfOpen,
}

impl CircuitState {
    /// Check if circuit is open
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitState::Open)
    }

    /// Check if circuit is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, CircuitState::Closed)
    }

    /// Check if circuit is half-open
    pub fn is_half_open(&self) -> bool {
        matches!(self, CircuitState::HalfOpen)
    }

    /// Get state name for logs and metrics
    pub fn state_name(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Error returned by [`CircuitBreaker::execute`].
///
/// `Open` means the operation was rejected without being invoked; callers
/// can distinguish it from the wrapped operation's own error.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the operation was not attempted
    #[error("circuit breaker is open")]
    Open,

    /// The wrapped operation was attempted and failed
    #[error("operation failed: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Whether this error is a fast rejection
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open)
    }

    /// Extract the wrapped operation error, if any
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Open => None,
            CircuitBreakerError::Inner(e) => Some(e),
        }
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CircuitBreakerStats {
    /// Total successful operations
    pub total_success: u64,
    /// Total failed operations
    pub total_failures: u64,
    /// Total rejected operations (circuit open)
    pub total_rejected: u64,
    /// Current consecutive failures
    pub consecutive_failures: u64,
    /// Number of times the circuit has opened
    pub open_count: u64,
    /// Number of times the circuit has closed after recovery
    pub close_count: u64,
    /// Current state
    pub current_state: String,
}

struct BreakerState {
    state: CircuitState,
    /// Consecutive failures, reset to 0 on any success
    failures: u64,
    /// Timestamp of the most recent failure
    last_failure: Option<Instant>,
}

/// Circuit breaker for fault isolation
pub struct CircuitBreaker {
    inner: RwLock<BreakerState>,
    config: CircuitBreakerConfig,
    total_success: AtomicU64,
    total_failures: AtomicU64,
    total_rejected: AtomicU64,
    open_count: AtomicU64,
    close_count: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default config
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom config
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        info!(
            "Creating circuit breaker: failure_threshold={}, recovery_time={:?}",
            config.failure_threshold, config.recovery_time
        );

        Self {
            inner: RwLock::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                last_failure: None,
            }),
            config,
            total_success: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
            open_count: AtomicU64::new(0),
            close_count: AtomicU64::new(0),
        }
    }

    /// Execute an operation through the breaker.
    ///
    /// When the circuit is open and the recovery time has not yet elapsed,
    /// the operation is rejected immediately with
    /// [`CircuitBreakerError::Open`]. Once the recovery time has passed the
    /// circuit transitions to half-open and the operation is attempted as a
    /// probe: success closes the circuit, failure reopens it.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        {
            let mut inner = self.inner.write().await;
            if inner.state == CircuitState::Open {
                let recovered = inner
                    .last_failure
                    .map(|t| t.elapsed() > self.config.recovery_time)
                    .unwrap_or(true);

                if recovered {
                    info!("Circuit breaker transitioning to half-open: probing recovery");
                    inner.state = CircuitState::HalfOpen;
                } else {
                    self.total_rejected.fetch_add(1, Ordering::Relaxed);
                    debug!("Circuit breaker open: rejecting call without invoking operation");
                    return Err(CircuitBreakerError::Open);
                }
            }
        }

        match operation().await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure(&err).await;
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    async fn on_success(&self) {
        self.total_success.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.write().await;
        inner.failures = 0;

        if inner.state == CircuitState::HalfOpen {
            info!("Circuit breaker closing: probe succeeded");
            inner.state = CircuitState::Closed;
            self.close_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn on_failure(&self, err: &impl fmt::Display) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.write().await;
        inner.failures += 1;
        inner.last_failure = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                warn!("Circuit breaker reopening: probe failed: {}", err);
                inner.state = CircuitState::Open;
                self.open_count.fetch_add(1, Ordering::Relaxed);
            }
            CircuitState::Closed if inner.failures >= self.config.failure_threshold => {
                warn!(
                    "Circuit breaker opening: {} consecutive failures reached threshold {}: {}",
                    inner.failures, self.config.failure_threshold, err
                );
                inner.state = CircuitState::Open;
                self.open_count.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                debug!(
                    "Operation failed in {} state ({}/{}): {}",
                    inner.state.state_name(),
                    inner.failures,
                    self.config.failure_threshold,
                    err
                );
            }
        }
    }

    /// Get current state
    pub async fn state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    /// Force the circuit closed and clear the failure counter. Idempotent.
    pub async fn reset(&self) {
        info!("Circuit breaker manually reset");
        let mut inner = self.inner.write().await;
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.last_failure = None;
    }

    /// Get statistics
    pub async fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.read().await;

        CircuitBreakerStats {
            total_success: self.total_success.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            consecutive_failures: inner.failures,
            open_count: self.open_count.load(Ordering::Relaxed),
            close_count: self.close_count.load(Ordering::Relaxed),
            current_state: inner.state.state_name().to_string(),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
