//! Pacing Policy — randomized waits that throttle automated actions.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::debug;

/// Delay bounds in seconds. `short` brackets UI micro-actions, `long` separates
/// whole applications.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub short_min: f64,
    pub short_max: f64,
    pub long_min: f64,
    pub long_max: f64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            short_min: 2.0,
            short_max: 5.0,
            long_min: 30.0,
            long_max: 120.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PacingPolicy {
    settings: PacingSettings,
}

impl PacingPolicy {
    pub fn new(settings: PacingSettings) -> Self {
        Self { settings }
    }

    /// Sleeps for a uniform random duration in `[min_seconds, max_seconds]` and
    /// returns the number of seconds slept. Never fails.
    pub async fn delay(&self, min_seconds: f64, max_seconds: f64) -> f64 {
        let seconds = draw_delay(min_seconds, max_seconds);
        debug!("Pacing delay {seconds:.2}s");
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        seconds
    }

    pub async fn short(&self) -> f64 {
        self.delay(self.settings.short_min, self.settings.short_max)
            .await
    }

    pub async fn long(&self) -> f64 {
        self.delay(self.settings.long_min, self.settings.long_max)
            .await
    }
}

/// Longest single wait; larger configured bounds are capped here.
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Uniform draw in `[min, max]`. Reversed bounds are swapped; negative and
/// non-finite bounds are treated as zero, oversized ones as `MAX_DELAY_SECS`.
pub fn draw_delay(min_seconds: f64, max_seconds: f64) -> f64 {
    let sanitize = |v: f64| {
        if v.is_finite() && v > 0.0 {
            v.min(MAX_DELAY_SECS)
        } else {
            0.0
        }
    };
    let (mut lo, mut hi) = (sanitize(min_seconds), sanitize(max_seconds));
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }
    if lo == hi {
        return lo;
    }
    rand::thread_rng().gen_range(lo..=hi)
}
