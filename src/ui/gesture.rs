use std::time::{Duration, Instant};
use tracing::debug;

/// Default window for two presses to count as a double press
pub const DEFAULT_DOUBLE_PRESS_MS: u64 = 400;

/// Recognizes two activations of the same trigger within a time window.
///
/// A completed double press clears the reference, so the detector is armed
/// again right away and a third quick press starts a new pair instead of
/// firing twice.
#[derive(Debug, Clone)]
pub struct DoublePressDetector {
    threshold: Duration,
    last_press: Option<Instant>,
}

impl DoublePressDetector {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_press: None,
        }
    }

    /// Register a press happening now
    pub fn press(&mut self) -> bool {
        self.press_at(Instant::now())
    }

    /// Register a press at `now`. Returns true when it completes a double
    /// press.
    pub fn press_at(&mut self, now: Instant) -> bool {
        match self.last_press {
            Some(previous) if now.saturating_duration_since(previous) <= self.threshold => {
                debug!(
                    target: "input",
                    "Double press after {:?}",
                    now.saturating_duration_since(previous)
                );
                self.last_press = None;
                true
            }
            _ => {
                self.last_press = Some(now);
                false
            }
        }
    }

    /// Forget a half-finished pair
    pub fn reset(&mut self) {
        self.last_press = None;
    }

    /// Whether one press is waiting for its partner at `now`
    pub fn is_armed_at(&self, now: Instant) -> bool {
        self.last_press
            .is_some_and(|previous| now.saturating_duration_since(previous) <= self.threshold)
    }
}

impl Default for DoublePressDetector {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DOUBLE_PRESS_MS))
    }
}
