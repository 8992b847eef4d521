//! Politeness pauses between navigation steps.
//!
//! Readiness waits decide *when* a page is usable; pacing only spaces out the
//! crawler's actions so the target site sees a human-like rhythm. Nothing
//! depends on these pauses for correctness, and tests run with
//! [`PacingConfig::none`].

use std::time::Duration;

/// A base pause plus up to `jitter` of random extra time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub delay: Duration,
    pub jitter: Duration,
}

impl PacingConfig {
    /// One second, plus up to half a second.
    pub const POLITE: PacingConfig = PacingConfig {
        delay: Duration::from_secs(1),
        jitter: Duration::from_millis(500),
    };

    pub fn jittered(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::jittered(delay, Duration::ZERO)
    }

    /// No pauses at all.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self::POLITE
    }
}

/// Sleeps between steps according to a [`PacingConfig`].
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Length of the next pause, drawn fresh on every call.
    fn next_pause(&self) -> Duration {
        let spread = self.config.jitter.as_millis() as u64;
        if spread == 0 {
            return self.config.delay;
        }
        self.config.delay + Duration::from_millis(fastrand::u64(0..spread))
    }

    /// Pause before the next step. `step` only labels the trace event.
    pub async fn pause(&self, step: &str) {
        let pause = self.next_pause();
        if pause.is_zero() {
            return;
        }
        tracing::debug!(step, sleep_ms = %pause.as_millis(), "Pacing");
        tokio::time::sleep(pause).await;
    }
}
