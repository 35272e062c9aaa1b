//! Bounded exponential reconnect backoff.

use super::ConnectionState;
use crate::timer::{Deadline, Duration, Instant};

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry `attempt` (1-based): doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// What the supervisor decided after a connection loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossOutcome {
    /// The loss followed a deliberate disconnect; nothing to do.
    Ignored,
    RetryScheduled { attempt: u32, delay: Duration },
    GaveUp,
}

/// Connection lifecycle state machine with retry scheduling.
#[derive(Debug, Clone)]
pub struct ReconnectSupervisor {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
    retry: Deadline,
}

impl ReconnectSupervisor {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
            retry: Deadline::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// A user-initiated connect. Also the only way out of `Failed`.
    pub fn begin_connect(&mut self) {
        self.attempts = 0;
        self.retry.cancel();
        self.state = ConnectionState::Connecting;
    }

    pub fn on_connected(&mut self) {
        self.attempts = 0;
        self.retry.cancel();
        self.state = ConnectionState::Connected;
    }

    pub fn on_connection_lost(&mut self, now: Instant) -> LossOutcome {
        match self.state {
            ConnectionState::Disconnected => return LossOutcome::Ignored,
            ConnectionState::Failed => return LossOutcome::GaveUp,
            _ => {}
        }

        self.attempts += 1;
        if self.attempts > self.policy.max_attempts {
            self.retry.cancel();
            self.state = ConnectionState::Failed;
            return LossOutcome::GaveUp;
        }

        let delay = self.policy.delay_for(self.attempts);
        self.retry.schedule(now, delay);
        self.state = ConnectionState::Reconnecting {
            attempt: self.attempts,
        };
        LossOutcome::RetryScheduled {
            attempt: self.attempts,
            delay,
        }
    }

    /// True once, when the pending retry is due.
    pub fn poll_retry(&mut self, now: Instant) -> bool {
        matches!(self.state, ConnectionState::Reconnecting { .. }) && self.retry.poll(now)
    }

    /// Deliberate disconnect or teardown: drop any pending retry.
    pub fn cancel(&mut self) {
        self.retry.cancel();
        self.attempts = 0;
        self.state = ConnectionState::Disconnected;
    }
}
