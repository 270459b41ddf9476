//! # Spike Detector
//! Rolling, upper-tail z-score test over an ordered series (typically
//! conversions per minute).
//!
//! With the default `Baseline::Inclusive` the window for position `i` is the
//! `window` values ending at `i`. `z = (x_i - mean) / (std + EPSILON)` with
//! the sample standard deviation; `i` is a spike iff `z > z_threshold`.
//!
//! An inclusive window dilutes its own outlier: `z` can never exceed
//! `(window - 1) / sqrt(window)`, so short windows need `Baseline::Trailing`,
//! which scores `x_i` against the `window` values strictly before it.
//!
//! A constant window has zero variance: the additive epsilon keeps `z`
//! finite instead of raising. Positions without a full window are
//! `SpikeFlag::Unknown`, which is not the same thing as "no spike" and is
//! excluded from evaluated counts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigurationError;

pub const DEFAULT_SPIKE_WINDOW: usize = 15;
pub const DEFAULT_Z_THRESHOLD: f64 = 2.5;
pub const EPSILON: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikeFlag {
    /// Not enough history (or a non-finite value in the window).
    Unknown,
    Normal,
    Spike,
}

impl SpikeFlag {
    pub fn is_spike(self) -> bool {
        self == SpikeFlag::Spike
    }

    pub fn is_known(self) -> bool {
        self != SpikeFlag::Unknown
    }

    /// `Some(is_spike)` for evaluated positions, `None` for unknown ones.
    pub fn as_option(self) -> Option<bool> {
        match self {
            SpikeFlag::Unknown => None,
            SpikeFlag::Normal => Some(false),
            SpikeFlag::Spike => Some(true),
        }
    }
}

/// Tally over a flag sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpikeCounts {
    pub evaluated: usize,
    pub spikes: usize,
    pub unknown: usize,
}

impl SpikeCounts {
    pub fn from_flags(flags: &[SpikeFlag]) -> Self {
        flags.iter().fold(Self::default(), |mut acc, f| {
            match f {
                SpikeFlag::Unknown => acc.unknown += 1,
                SpikeFlag::Normal => acc.evaluated += 1,
                SpikeFlag::Spike => {
                    acc.evaluated += 1;
                    acc.spikes += 1;
                }
            }
            acc
        })
    }
}

/// Which observations form the rolling window scored against `x_i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    /// `x[i+1-window ..= i]`; the first `window - 1` positions are unknown.
    #[default]
    Inclusive,
    /// `x[i-window .. i]`; the first `window` positions are unknown.
    Trailing,
}

impl Baseline {
    /// Positions before this index have no complete window.
    fn first_scored(self, window: usize) -> usize {
        match self {
            Baseline::Inclusive => window - 1,
            Baseline::Trailing => window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpikeDetector {
    window: usize,
    z_threshold: f64,
    baseline: Baseline,
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self {
            window: DEFAULT_SPIKE_WINDOW,
            z_threshold: DEFAULT_Z_THRESHOLD,
            baseline: Baseline::Inclusive,
        }
    }
}

impl SpikeDetector {
    pub fn new(window: usize, z_threshold: f64) -> Result<Self, ConfigurationError> {
        if window == 0 {
            return Err(ConfigurationError::SpikeWindow(window));
        }
        if !z_threshold.is_finite() {
            return Err(ConfigurationError::ZThreshold(z_threshold));
        }
        Ok(Self {
            window,
            z_threshold,
            baseline: Baseline::Inclusive,
        })
    }

    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn z_threshold(&self) -> f64 {
        self.z_threshold
    }

    /// Rolling z-score at every position; `None` where the window is incomplete.
    pub fn z_scores(&self, series: &[f64]) -> Vec<Option<f64>> {
        let first = self.baseline.first_scored(self.window);
        let mut out = vec![None; series.len()];
        for (i, slot) in out.iter_mut().enumerate().skip(first) {
            let x = series[i];
            let win = match self.baseline {
                Baseline::Inclusive => &series[i + 1 - self.window..=i],
                Baseline::Trailing => &series[i - self.window..i],
            };
            *slot = z_score(x, win);
        }
        out
    }

    pub fn detect(&self, series: &[f64]) -> Vec<SpikeFlag> {
        let flags: Vec<SpikeFlag> = self
            .z_scores(series)
            .into_iter()
            .map(|z| match z {
                None => SpikeFlag::Unknown,
                Some(z) if z > self.z_threshold => SpikeFlag::Spike,
                Some(_) => SpikeFlag::Normal,
            })
            .collect();

        let counts = SpikeCounts::from_flags(&flags);
        metrics::counter!("spike_flags_total").increment(counts.spikes as u64);
        debug!(
            target: "spikes",
            len = series.len(),
            window = self.window,
            baseline = ?self.baseline,
            evaluated = counts.evaluated,
            spikes = counts.spikes,
            unknown = counts.unknown,
            "spike detection pass"
        );
        flags
    }
}

/// Boolean view: unknown positions read as `false`.
pub fn detect_spikes(
    series: &[f64],
    window: usize,
    z_threshold: f64,
) -> Result<Vec<bool>, ConfigurationError> {
    let detector = SpikeDetector::new(window, z_threshold)?;
    Ok(detector
        .detect(series)
        .into_iter()
        .map(SpikeFlag::is_spike)
        .collect())
}

/// z-score of `x` against the window's mean and sample std.
fn z_score(x: f64, win: &[f64]) -> Option<f64> {
    if !x.is_finite() || win.is_empty() || win.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let n = win.len() as f64;
    let mean = win.iter().sum::<f64>() / n;
    // Sample std of a single value is undefined; treat as zero spread.
    let std = if win.len() > 1 {
        let ss: f64 = win.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    Some((x - mean) / (std + EPSILON))
}
