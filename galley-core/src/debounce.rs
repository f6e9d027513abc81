use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

/// Per-payload cooldown gate. Keys are raw payload strings, so payloads that
/// differ only in whitespace are tracked separately.
#[derive(Debug, Clone)]
pub struct Debouncer {
    cooldown: Duration,
    last_emitted: HashMap<String, Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::with_cooldown(DEFAULT_COOLDOWN)
    }
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_emitted: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns true and records `now` if `payload` has never been emitted or
    /// its last emission is at least one cooldown old.
    pub fn should_emit(&mut self, payload: &str, now: Instant) -> bool {
        if let Some(last) = self.last_emitted.get(payload) {
            if now.saturating_duration_since(*last) < self.cooldown {
                return false;
            }
        }
        self.last_emitted.insert(payload.to_string(), now);
        true
    }

    pub fn reset(&mut self) {
        self.last_emitted.clear();
    }

    pub fn tracked(&self) -> usize {
        self.last_emitted.len()
    }
}
