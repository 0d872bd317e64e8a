use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};

use crate::executor::Executor;
use crate::workflow::task::TaskDescriptor;

fn default_max_attempts() -> usize {
    1
}

fn default_initial_interval_ms() -> u64 {
    100
}

fn default_max_interval_ms() -> u64 {
    10000
}

fn default_backoff_coefficient() -> f64 {
    2.0
}

/// Configuration for executor retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Initial interval between retries in milliseconds
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    /// Maximum interval between retries in milliseconds
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Multiplier for backoff
    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_coefficient: default_backoff_coefficient(),
        }
    }
}

impl RetryConfig {
    /// Base delay before retrying after `attempt` failed attempts, without jitter
    pub fn base_delay_ms(&self, attempt: usize) -> u64 {
        let base = self.initial_interval_ms as f64
            * self
                .backoff_coefficient
                .powi(attempt.saturating_sub(1) as i32);

        base.min(self.max_interval_ms as f64) as u64
    }
}

/// Executor decorator adding retries with exponential backoff and an
/// optional per-attempt timeout
#[derive(Debug)]
pub struct RetryingExecutor<E> {
    inner: E,
    config: RetryConfig,
    attempt_timeout: Option<Duration>,
}

impl<E: Executor> RetryingExecutor<E> {
    /// Wrap `inner`
    pub fn new(inner: E, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            attempt_timeout: None,
        }
    }

    /// Bound each attempt
    pub fn with_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = Some(attempt_timeout);
        self
    }

    /// Calculate the delay before the next attempt
    fn calculate_retry_delay(&self, attempt: usize) -> Duration {
        let delay = self.config.base_delay_ms(attempt);

        // Add some randomness to avoid thundering herd
        let jitter = (rand::thread_rng().gen_range(0.0..0.2) - 0.1) * delay as f64;
        let delay = (delay as f64 + jitter).max(0.0) as u64;

        Duration::from_millis(delay)
    }

    async fn attempt(&self, descriptor: &TaskDescriptor) -> Result<Value> {
        match self.attempt_timeout {
            Some(limit) => match timeout(limit, self.inner.execute(descriptor)).await {
                Ok(result) => result,
                Err(_) => {
                    error!("Task timed out after {:?}: {}", limit, descriptor.name);
                    Err(anyhow!("Task timed out: {}", descriptor.name))
                }
            },
            None => self.inner.execute(descriptor).await,
        }
    }
}

#[async_trait]
impl<E: Executor> Executor for RetryingExecutor<E> {
    #[instrument(skip(self, descriptor), fields(task.name = %descriptor.name, task.effect_id = %descriptor.effect_id))]
    async fn execute(&self, descriptor: &TaskDescriptor) -> Result<Value> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("Executing task (attempt {}/{}): {}", attempt, max_attempts, descriptor.name);

            match self.attempt(descriptor).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_attempts => {
                    error!(
                        "Task failed after {} attempts: {}, error: {}",
                        attempt, descriptor.name, err
                    );
                    return Err(err.context(format!("gave up after {} attempts", attempt)));
                }
                Err(err) => {
                    let delay = self.calculate_retry_delay(attempt);
                    warn!(
                        "Task failed, retrying in {:?}: {}, error: {}",
                        delay, descriptor.name, err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
