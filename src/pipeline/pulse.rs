//! Adaptive polling interval.
//!
//! The baseline spreads the exchange's per-minute quota over every pair that
//! shares it. A throttling response multiplies the interval by the backoff
//! factor once per throttling episode: repeated 429s in a row only count the
//! streak. Success does not shrink the interval again; a backed-off interval
//! holds until the next cold start.

use std::time::Duration;

use crate::models::PulseConfig;
use crate::pipeline::dispatch::StatusRoute;

/// Owner of the current polling interval.
#[derive(Debug, Clone)]
pub struct PulseController {
    interval: Duration,
    baseline: Duration,
    min_interval: Duration,
    max_interval: Duration,
    backoff_factor: f64,
    last_status: Option<u16>,
    consecutive_throttles: u32,
}

impl PulseController {
    /// Create a controller for `channels` pairs sharing one quota.
    pub fn new(config: &PulseConfig, channels: usize) -> Self {
        let min_interval = config.min_interval();
        let max_interval = config.max_interval().max(min_interval);

        let baseline_ms = 60_000.0 * channels as f64 / config.per_minute_quota as f64;
        let baseline = clamp_ms(baseline_ms, min_interval, max_interval);

        Self {
            interval: baseline,
            baseline,
            min_interval,
            max_interval,
            backoff_factor: config.backoff_factor,
            last_status: None,
            consecutive_throttles: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn baseline(&self) -> Duration {
        self.baseline
    }

    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    pub fn consecutive_throttles(&self) -> u32 {
        self.consecutive_throttles
    }

    /// Observe the status of the latest response (`None` when no response
    /// arrived). Returns whether the interval changed.
    pub fn update(&mut self, status: Option<u16>) -> bool {
        let previous = self.interval;

        let throttled = Some(StatusRoute::TooManyRequests.code());
        if status == throttled {
            if self.last_status != throttled {
                let next_ms = self.interval.as_secs_f64() * 1_000.0 * self.backoff_factor;
                self.interval = clamp_ms(next_ms, self.min_interval, self.max_interval);
            }
            self.consecutive_throttles = self.consecutive_throttles.saturating_add(1);
        } else {
            self.consecutive_throttles = 0;
        }

        self.last_status = status;
        self.interval != previous
    }
}

/// Clamp a millisecond value into `[min, max]`, falling back to `min` for
/// values that are not a usable duration.
fn clamp_ms(ms: f64, min: Duration, max: Duration) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return min;
    }
    let max_ms = max.as_secs_f64() * 1_000.0;
    if ms >= max_ms {
        return max;
    }
    Duration::from_secs_f64(ms / 1_000.0).max(min)
}
