//! Bounded wait for a collector to become ready

use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Not ready yet; `attempt` polls so far
    Waiting { attempt: u32 },
    Ready,
    TimedOut,
}

/// Waiting → Ready | TimedOut, with a fixed backoff between polls
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    max_attempts: u32,
    backoff: Duration,
    state: Readiness,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BACKOFF)
    }
}

impl ReadinessGate {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            state: Readiness::Waiting { attempt: 0 },
        }
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record one poll result. Terminal states are sticky.
    pub fn observe(&mut self, ready: bool) -> Readiness {
        if let Readiness::Waiting { attempt } = self.state {
            let attempt = attempt + 1;
            self.state = if ready {
                Readiness::Ready
            } else if attempt >= self.max_attempts {
                Readiness::TimedOut
            } else {
                Readiness::Waiting { attempt }
            };
        }
        self.state
    }

    /// Poll `probe` until it reports ready or attempts run out, sleeping
    /// the backoff between polls.
    pub async fn wait(&mut self, mut probe: impl FnMut() -> bool) -> Readiness {
        loop {
            match self.observe(probe()) {
                Readiness::Waiting { attempt } => {
                    debug!(attempt, max = self.max_attempts, "collector not ready, retrying");
                    tokio::time::sleep(self.backoff).await;
                }
                Readiness::TimedOut => {
                    warn!(attempts = self.max_attempts, "collector never became ready");
                    return Readiness::TimedOut;
                }
                Readiness::Ready => return Readiness::Ready,
            }
        }
    }
}
