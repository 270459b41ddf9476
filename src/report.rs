//! # Broadcast Report
//! Aggregates attribution output for humans: campaign totals, the organic
//! baseline, a per-minute spike cross-check, and a decay curve table.
//!
//! Rendering is informational; nothing parses the text.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::attribution::AttributionResult;
use crate::decay::DecayParams;
use crate::registry::AdBreakRegistry;
use crate::spike::{SpikeCounts, SpikeDetector, SpikeFlag};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignTotal {
    pub campaign: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastSummary {
    pub total_conversions: usize,
    pub incremental_conversions: usize,
    pub organic_conversions: usize,
    /// Registry campaigns in first-seen order, including those that earned nothing.
    pub campaign_totals: Vec<CampaignTotal>,
    pub organic_total: f64,
}

impl BroadcastSummary {
    pub fn from_results(results: &[AttributionResult], registry: &AdBreakRegistry) -> Self {
        let incremental = results.iter().filter(|r| r.is_incremental()).count();
        let campaign_totals = registry
            .campaigns()
            .into_iter()
            .map(|campaign| CampaignTotal {
                campaign: campaign.to_string(),
                value: results.iter().map(|r| r.campaign_share(campaign)).sum(),
            })
            .collect();
        let organic_total = results.iter().filter_map(|r| r.organic()).sum();

        Self {
            total_conversions: results.len(),
            incremental_conversions: incremental,
            organic_conversions: results.len() - incremental,
            campaign_totals,
            organic_total,
        }
    }

    /// Campaign totals plus organic; equals the summed input value up to rounding.
    pub fn attributed_value(&self) -> f64 {
        self.campaign_totals.iter().map(|c| c.value).sum::<f64>() + self.organic_total
    }
}

/// Conversions falling into one fixed-width interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntervalBucket {
    pub conversions: usize,
    pub incremental: usize,
}

/// Bucket results into `buckets` intervals of `interval` width from `start`.
/// Conversions outside `[start, start + buckets * interval)` are ignored.
pub fn bucket_by_interval(
    results: &[AttributionResult],
    start: DateTime<Utc>,
    interval: Duration,
    buckets: usize,
) -> Vec<IntervalBucket> {
    let mut out = vec![IntervalBucket::default(); buckets];
    let Some(width) = interval.num_nanoseconds().filter(|w| *w > 0) else {
        return out;
    };
    for r in results {
        let Some(offset) = r
            .conversion
            .timestamp
            .signed_duration_since(start)
            .num_nanoseconds()
        else {
            continue;
        };
        if offset < 0 {
            continue;
        }
        if let Some(b) = out.get_mut((offset / width) as usize) {
            b.conversions += 1;
            if r.is_incremental() {
                b.incremental += 1;
            }
        }
    }
    out
}

/// Count series for the spike detector.
pub fn conversion_counts(buckets: &[IntervalBucket]) -> Vec<f64> {
    buckets.iter().map(|b| b.conversions as f64).collect()
}

/// Cross-check of volume spikes against attribution output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeValidation {
    pub counts: SpikeCounts,
    /// Spike buckets where most conversions were attributed to an ad.
    pub spikes_mostly_incremental: usize,
    pub flags: Vec<SpikeFlag>,
}

impl SpikeValidation {
    pub fn evaluate(buckets: &[IntervalBucket], detector: &SpikeDetector) -> Self {
        let flags = detector.detect(&conversion_counts(buckets));
        let spikes_mostly_incremental = flags
            .iter()
            .zip(buckets)
            .filter(|(f, b)| f.is_spike() && 2 * b.incremental > b.conversions)
            .count();
        Self {
            counts: SpikeCounts::from_flags(&flags),
            spikes_mostly_incremental,
            flags,
        }
    }

    /// Share of spikes explained by ad airings; `None` when nothing spiked.
    pub fn coincidence_rate(&self) -> Option<f64> {
        (self.counts.spikes > 0)
            .then(|| self.spikes_mostly_incremental as f64 / self.counts.spikes as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecayPoint {
    pub elapsed_minutes: f64,
    pub weight: f64,
}

pub fn decay_curve(params: &DecayParams, elapsed: &[f64]) -> Vec<DecayPoint> {
    elapsed
        .iter()
        .map(|&m| DecayPoint {
            elapsed_minutes: m,
            weight: params.weight_for_elapsed(m),
        })
        .collect()
}

/// Everything the console report prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastReport {
    pub summary: BroadcastSummary,
    pub spikes: SpikeValidation,
    pub decay: Vec<DecayPoint>,
}

impl fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(70);
        let s = &self.summary;

        writeln!(f, "BROADCAST SUMMARY")?;
        writeln!(f, "   Total Conversions:       {:>8}", s.total_conversions)?;
        writeln!(f, "   Incremental (Ad-Driven): {:>8}", s.incremental_conversions)?;
        writeln!(f, "   Organic Baseline:        {:>8}", s.organic_conversions)?;
        writeln!(f)?;

        writeln!(f, "CAMPAIGN ATTRIBUTION")?;
        writeln!(f, "{rule}")?;
        for c in &s.campaign_totals {
            writeln!(f, "   {:<25} ${:>12.2}", c.campaign, c.value)?;
        }
        writeln!(f, "   {:<25} ${:>12.2}", "Organic (No Ad)", s.organic_total)?;
        writeln!(f)?;

        writeln!(f, "SPIKE VALIDATION")?;
        writeln!(f, "{rule}")?;
        let c = &self.spikes.counts;
        writeln!(
            f,
            "   Intervals evaluated: {} (warm-up, not evaluated: {})",
            c.evaluated, c.unknown
        )?;
        writeln!(f, "   Volume spikes:       {}", c.spikes)?;
        match self.spikes.coincidence_rate() {
            Some(rate) => writeln!(
                f,
                "   Ad-driven spikes:    {} ({:.0}%)",
                self.spikes.spikes_mostly_incremental,
                rate * 100.0
            )?,
            None => writeln!(f, "   Ad-driven spikes:    n/a")?,
        }
        writeln!(f)?;

        writeln!(f, "TIME-DECAY ATTRIBUTION")?;
        writeln!(f, "{rule}")?;
        for p in &self.decay {
            writeln!(
                f,
                "   +{:>4.0} min -> {:>3.0}% influence",
                p.elapsed_minutes,
                p.weight * 100.0
            )?;
        }
        Ok(())
    }
}
