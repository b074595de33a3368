use axum::{
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,
    /// Failing fast until the reset timeout passes.
    Open,
    /// One trial request decides between Closed and Open.
    HalfOpen,
}

pub struct CircuitBreaker {
    pub name: String,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
    last_failure: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold.max(1),
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    /// Admits every request while Closed. Once the reset timeout has
    /// passed, admits exactly one trial; a trial that never reports back
    /// is replaced after another reset timeout.
    pub async fn check(&self) -> bool {
        if *self.state.read().await == CircuitState::Closed {
            return true;
        }

        let mut state = self.state.write().await;
        let mut last_failure = self.last_failure.write().await;
        match *state {
            CircuitState::Closed => true,
            CircuitState::Open | CircuitState::HalfOpen => match *last_failure {
                Some(instant) if instant.elapsed() >= self.reset_timeout => {
                    if *state == CircuitState::Open {
                        tracing::info!("Circuit Breaker [{}] moving to Half-Open", self.name);
                    }
                    *state = CircuitState::HalfOpen;
                    *last_failure = Some(Instant::now());
                    true
                }
                _ => false,
            },
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            tracing::info!("Circuit Breaker [{}] recovered to Closed", self.name);
        }
        self.failure_count.store(0, Ordering::SeqCst);
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            *state = CircuitState::Open;
            *self.last_failure.write().await = Some(Instant::now());
            tracing::error!(
                "Circuit Breaker [{}] TRIPPED to Open. Failures: {}",
                self.name,
                count
            );
        }
    }
}

/// Guards reservation creation, the only route that reaches the payment
/// provider.
pub async fn circuit_breaker_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let guarded = req.method() == Method::POST && req.uri().path() == "/v1/reservations";
    if !guarded {
        return next.run(req).await;
    }

    let cb = &state.resiliency.reservations_cb;
    if !cb.check().await {
        return AppError::CircuitOpen(cb.name.clone()).into_response();
    }

    let response = next.run(req).await;

    if response.status().is_server_error() {
        cb.record_failure().await;
    } else {
        cb.record_success().await;
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trips_and_recovers() {
        let cb = CircuitBreaker::new("payments", 2, Duration::from_millis(20));

        cb.record_failure().await;
        assert!(cb.check().await);
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.check().await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new("payments", 1, Duration::from_millis(10));
        cb.record_failure().await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cb.check().await);
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_half_open_admits_single_trial() {
        let cb = CircuitBreaker::new("payments", 1, Duration::from_millis(20));
        cb.record_failure().await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await);
        assert!(!cb.check().await);
        assert!(!cb.check().await);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert!(cb.check().await);
        assert!(cb.check().await);
    }

    #[tokio::test]
    async fn test_abandoned_trial_is_replaced() {
        let cb = CircuitBreaker::new("payments", 1, Duration::from_millis(20));
        cb.record_failure().await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await);
        assert!(!cb.check().await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.check().await);
        assert!(!cb.check().await);
    }
}
