use std::collections::HashMap;
use std::sync::Mutex;

use vigil_core::Timestamp;

use crate::error::{LivenessError, LivenessResult};

// ---------------------------------------------------------------------------
// SlidingWindowCounter — keyed event-rate limiter
// ---------------------------------------------------------------------------

/// Counts events per key inside a trailing time window. Stale entries for
/// a key are pruned when that key is touched, so memory stays proportional
/// to keys active inside the window.
pub struct SlidingWindowCounter {
    window_seconds: u64,
    max_events: usize,
    events: Mutex<HashMap<String, Vec<Timestamp>>>,
}

impl SlidingWindowCounter {
    pub fn new(window_seconds: u64, max_events: usize) -> Self {
        Self {
            window_seconds,
            max_events,
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Record one event for `key`, or refuse it when the key already has
    /// `max_events` inside the window.
    pub fn try_acquire(&self, key: &str, now: Timestamp) -> LivenessResult<()> {
        let mut events = self.events.lock().map_err(|_| LivenessError::Internal)?;
        let entry = events.entry(key.to_string()).or_default();
        entry.retain(|t| now.seconds_since(t) <= self.window_seconds);

        if entry.len() >= self.max_events {
            tracing::warn!(key, count = entry.len(), "rate limit exceeded");
            return Err(LivenessError::RateLimited);
        }
        entry.push(now);
        Ok(())
    }

    /// Events currently counted for `key`, after pruning.
    pub fn count(&self, key: &str, now: Timestamp) -> LivenessResult<usize> {
        let mut events = self.events.lock().map_err(|_| LivenessError::Internal)?;
        let Some(entry) = events.get_mut(key) else {
            return Ok(0);
        };
        entry.retain(|t| now.seconds_since(t) <= self.window_seconds);
        if entry.is_empty() {
            events.remove(key);
            return Ok(0);
        }
        Ok(entry.len())
    }
}
