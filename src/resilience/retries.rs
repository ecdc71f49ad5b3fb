//! Bounded readiness polling.
//!
//! # Responsibilities
//! - Poll a probe until it reports ready
//! - Stop after `max_attempts` or when the overall deadline passes
//! - Sleep between attempts according to the backoff strategy
//!
//! # Design Decisions
//! - The first attempt always runs, even with a tiny deadline
//! - An attempt is cut off at the overall deadline, so a slow probe cannot
//!   overrun `timeout` by its own per-attempt timeout
//! - No sleep after the last attempt
//! - Success returns immediately; an already-ready service costs one attempt

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time;

use crate::config::{BackoffKind, RetryConfig};
use crate::exec::{CommandRunner, Environment};
use crate::observability::metrics;
use crate::probe::{Probe, Readiness};
use crate::resilience::backoff::Backoff;

/// How long and how often to poll a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Option<Duration>,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// A single attempt, no waiting.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            timeout: None,
            backoff: Backoff::Fixed { delay: Duration::ZERO },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        let backoff = match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed {
                delay: Duration::from_millis(config.delay_ms),
            },
            BackoffKind::Exponential => Backoff::Exponential {
                base: Duration::from_millis(config.delay_ms),
                max: Duration::from_millis(config.max_delay_ms),
            },
        };

        Self {
            max_attempts: config.max_attempts.max(1),
            timeout: config.timeout_secs.map(Duration::from_secs),
            backoff,
        }
    }
}

/// Successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyOutcome {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// The retry budget ran out before the service became ready.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("service '{service}' not ready after {attempts} attempt(s) in {} ms: {last_reason}", .elapsed.as_millis())]
pub struct ReadinessTimeout {
    pub service: String,
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_reason: String,
}

/// Poll `probe` until it is ready or the policy is exhausted.
pub async fn wait_until_ready<R: CommandRunner>(
    service: &str,
    probe: &Probe,
    policy: &RetryPolicy,
    runner: &R,
    env: &Environment,
) -> Result<ReadyOutcome, ReadinessTimeout> {
    let started = Instant::now();
    let deadline = policy.timeout.map(|t| started + t);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let readiness = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                time::timeout(remaining, probe.check(runner, env))
                    .await
                    .unwrap_or_else(|_| {
                        Readiness::NotReady(format!(
                            "overall deadline of {} ms reached during attempt",
                            policy.timeout.unwrap_or_default().as_millis()
                        ))
                    })
            }
            None => probe.check(runner, env).await,
        };
        metrics::record_probe_attempt(service, readiness.is_ready());

        let reason = match readiness {
            Readiness::Ready => {
                let elapsed = started.elapsed();
                tracing::info!(
                    service = %service,
                    attempts = attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Service ready"
                );
                metrics::record_readiness_wait(service, elapsed);
                return Ok(ReadyOutcome {
                    attempts: attempt,
                    elapsed,
                });
            }
            Readiness::NotReady(reason) => reason,
        };

        let delay = policy.backoff.delay(attempt);
        let out_of_attempts = attempt >= policy.max_attempts;
        let out_of_time = deadline.is_some_and(|d| Instant::now() + delay >= d);

        if out_of_attempts || out_of_time {
            tracing::error!(
                service = %service,
                attempts = attempt,
                reason = %reason,
                "Service did not become ready"
            );
            return Err(ReadinessTimeout {
                service: service.to_string(),
                attempts: attempt,
                elapsed: started.elapsed(),
                last_reason: reason,
            });
        }

        tracing::warn!(
            service = %service,
            attempt = attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "Service not ready, retrying"
        );
        time::sleep(delay).await;
    }
}
