//! # Decay Model
//! Maps the gap between an ad airing and a conversion to a causal-influence
//! weight in `[0.0, 1.0]`.
//!
//! Weight is `2^(-elapsed / half_life)` inside the window and exactly `0.0`
//! outside it. The window is a hard cutoff: a conversion at the boundary
//! still gets a small positive weight, one instant later gets none.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

pub const DEFAULT_DECAY_WINDOW_MINUTES: f64 = 30.0;
/// Calibrated for live-broadcast second-screen response.
pub const DEFAULT_HALF_LIFE_MINUTES: f64 = 6.0;

/// Validated decay parameters. Both values are finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDecayParams")]
pub struct DecayParams {
    window_minutes: f64,
    half_life_minutes: f64,
}

#[derive(Deserialize)]
struct RawDecayParams {
    window_minutes: f64,
    half_life_minutes: f64,
}

impl TryFrom<RawDecayParams> for DecayParams {
    type Error = ConfigurationError;

    fn try_from(raw: RawDecayParams) -> Result<Self, Self::Error> {
        Self::new(raw.window_minutes, raw.half_life_minutes)
    }
}

impl DecayParams {
    pub fn new(window_minutes: f64, half_life_minutes: f64) -> Result<Self, ConfigurationError> {
        if !(window_minutes.is_finite() && window_minutes > 0.0) {
            return Err(ConfigurationError::DecayWindow(window_minutes));
        }
        if !(half_life_minutes.is_finite() && half_life_minutes > 0.0) {
            return Err(ConfigurationError::HalfLife(half_life_minutes));
        }
        Ok(Self {
            window_minutes,
            half_life_minutes,
        })
    }

    pub fn window_minutes(&self) -> f64 {
        self.window_minutes
    }

    pub fn half_life_minutes(&self) -> f64 {
        self.half_life_minutes
    }

    /// Weight for a gap already expressed in minutes.
    pub fn weight_for_elapsed(&self, elapsed_minutes: f64) -> f64 {
        // NaN fails both comparisons, so test eligibility positively.
        if !(0.0..=self.window_minutes).contains(&elapsed_minutes) {
            return 0.0;
        }
        (-elapsed_minutes / self.half_life_minutes).exp2()
    }
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            window_minutes: DEFAULT_DECAY_WINDOW_MINUTES,
            half_life_minutes: DEFAULT_HALF_LIFE_MINUTES,
        }
    }
}

/// Influence an ad aired at `ad_time` retains over a conversion at `conversion_time`.
pub fn decay_weight(
    conversion_time: DateTime<Utc>,
    ad_time: DateTime<Utc>,
    params: &DecayParams,
) -> f64 {
    params.weight_for_elapsed(elapsed_minutes(ad_time, conversion_time))
}

/// Signed gap `to - from` in fractional minutes, nanosecond resolution where it fits.
pub fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let gap = to.signed_duration_since(from);
    match gap.num_nanoseconds() {
        Some(ns) => ns as f64 / 60e9,
        // beyond ~292 years; millisecond resolution is plenty
        None => gap.num_milliseconds() as f64 / 60e3,
    }
}
