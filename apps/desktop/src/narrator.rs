//! Progressive "AI is thinking" status lines shown while a generation call
//! is outstanding. Purely cosmetic: the schedule has no relation to the real
//! backend's progress and must never affect how the request completes.

use std::time::{Duration, Instant};

pub const MESSAGE_INTERVAL: Duration = Duration::from_secs(3);

pub const THINKING_MESSAGES: [&str; 11] = [
    "AI is analyzing viral trends...",
    "Identifying target audience psychology...",
    "Evaluating psychological triggers (Fear, Greed, Curiosity)...",
    "Optimizing pacing for retention at 5s, 15s, 30s...",
    "Crafting attention-grabbing opening...",
    "Structuring narrative arc for maximum engagement...",
    "Critic is reviewing story logic...",
    "Checking for plot holes and inconsistencies...",
    "Finalizing scene transitions...",
    "Calculating clickbait score...",
    "Almost ready...",
];

/// A cancellable, pull-based schedule: one message per interval, in order,
/// until the list is exhausted or `stop` discards the rest. The UI drives it
/// from the update loop with `advance`, so emission is append-only and
/// deterministic under test.
pub struct ThinkingNarrator {
    messages: Vec<String>,
    interval: Duration,
    started_at: Option<Instant>,
    shown: Vec<String>,
}

impl Default for ThinkingNarrator {
    fn default() -> Self {
        Self::new(
            THINKING_MESSAGES.iter().map(|m| m.to_string()).collect(),
            MESSAGE_INTERVAL,
        )
    }
}

impl ThinkingNarrator {
    pub fn new(messages: Vec<String>, interval: Duration) -> Self {
        Self {
            messages,
            interval,
            started_at: None,
            shown: Vec::new(),
        }
    }

    /// Begins (or restarts) the schedule from message index 0.
    pub fn start(&mut self, now: Instant) {
        self.shown.clear();
        self.started_at = Some(now);
    }

    /// Halts emission and discards the pending schedule. Lines already shown
    /// stay until the next `start`.
    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// True while more messages are still due.
    pub fn has_pending(&self) -> bool {
        self.is_running() && self.shown.len() < self.messages.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.shown
    }

    /// Appends every message whose emission time has passed. Returns how many
    /// lines were newly shown.
    pub fn advance(&mut self, now: Instant) -> usize {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let elapsed = now.saturating_duration_since(started_at);
        let due = if self.interval.is_zero() {
            self.messages.len()
        } else {
            ((elapsed.as_millis() / self.interval.as_millis()) as usize).min(self.messages.len())
        };
        let mut added = 0;
        while self.shown.len() < due {
            self.shown.push(self.messages[self.shown.len()].clone());
            added += 1;
        }
        added
    }
}
