//! Fault-injecting units of work.
//!
//! Only compiled for tests or with the `fault-injection` feature; production
//! builds plug in a real `UnitOfWork`.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::domain::{Task, WorkError};
use crate::ports::UnitOfWork;

/// Fails each run with probability `rate`.
#[derive(Debug, Clone)]
pub struct RandomFailure {
    rate: f64,
}

impl RandomFailure {
    /// `rate` is clamped to `0.0..=1.0`.
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

#[async_trait]
impl UnitOfWork for RandomFailure {
    async fn run(&self, task: &Task) -> Result<(), WorkError> {
        let roll: f64 = rand::thread_rng().r#gen();
        let fail = roll < self.rate;
        debug!(
            task_id = %task.task_id,
            roll = format!("{roll:.3}"),
            rate = self.rate,
            fail,
            "random failure check"
        );
        if fail {
            return Err(WorkError::new(format!(
                "Simulated task failure (random: {roll:.3})"
            )));
        }
        Ok(())
    }
}

/// Fails the first `n` runs, then succeeds.
#[derive(Debug)]
pub struct FailFirst {
    remaining_failures: AtomicU32,
}

impl FailFirst {
    pub fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl UnitOfWork for FailFirst {
    async fn run(&self, _task: &Task) -> Result<(), WorkError> {
        let left = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match left {
            Ok(left) => Err(WorkError::new(format!("intentional failure (left={left})"))),
            Err(_) => Ok(()),
        }
    }
}

/// Always fails with the same message.
#[derive(Debug, Clone)]
pub struct AlwaysFail {
    message: String,
}

impl AlwaysFail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl UnitOfWork for AlwaysFail {
    async fn run(&self, _task: &Task) -> Result<(), WorkError> {
        Err(WorkError::new(self.message.clone()))
    }
}
