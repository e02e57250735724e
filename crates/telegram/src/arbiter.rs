//! Duplicate-poller mitigation.
//!
//! Telegram rejects concurrent `getUpdates` calls for the same bot token.
//! When that conflict surfaces we back off so the stale instance has time
//! to exit, then resume polling. This is a heuristic, not leader
//! election: two instances restarting quickly can still interleave polls.

use {std::time::Duration, tracing::warn};

const INITIAL_COOLDOWN: Duration = Duration::from_secs(5);
const MAX_COOLDOWN: Duration = Duration::from_secs(300);

/// Tracks consecutive duplicate-poller conflicts and enforces a cooldown
/// that doubles with each one, resetting after a clean poll.
#[derive(Debug, Default)]
pub struct ConflictArbiter {
    consecutive: u32,
}

impl ConflictArbiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after a poll completes without a conflict.
    pub fn record_clean_poll(&mut self) {
        self.consecutive = 0;
    }

    /// Log the conflict and wait out the cooldown before polling resumes.
    pub async fn cooldown(&mut self) {
        let delay = self.next_cooldown();
        warn!(
            conflict_count = self.consecutive,
            cooldown_secs = delay.as_secs(),
            "another instance is polling with this token; backing off"
        );
        tokio::time::sleep(delay).await;
    }

    fn next_cooldown(&mut self) -> Duration {
        let delay = INITIAL_COOLDOWN
            .saturating_mul(2u32.saturating_pow(self.consecutive))
            .min(MAX_COOLDOWN);
        self.consecutive = self.consecutive.saturating_add(1);
        delay
    }
}
