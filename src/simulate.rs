//! # Broadcast Simulation
//! Synthetic second-screen conversions for a live broadcast.
//!
//! Each one-minute interval draws a Poisson baseline and adds a decaying
//! bump after every ad break: `floor(peak * e^(-decay * d))` extra
//! conversions for `0 <= d <= span` minutes after the airing. Conversions
//! land at a random second inside their minute with a uniform value.
//!
//! Seeded, so a given seed always yields the same broadcast.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};

use crate::attribution::{attribute, ConversionEvent};
use crate::config::EngineConfig;
use crate::decay::elapsed_minutes;
use crate::registry::AdBreakRegistry;
use crate::report::{
    bucket_by_interval, decay_curve, BroadcastReport, BroadcastSummary, SpikeValidation,
};

/// Elapsed minutes shown in the report's decay table.
pub const DECAY_TABLE_MINUTES: [f64; 4] = [0.0, 3.0, 6.0, 30.0];

/// 2026-01-31 20:00 UTC, the top of the simulated broadcast.
pub fn broadcast_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 31, 20, 0, 0)
        .single()
        .expect("2026-01-31 20:00 is a single UTC instant")
}

/// The three breaks of the two-hour programme.
pub fn default_programme(start: DateTime<Utc>) -> AdBreakRegistry {
    let mut reg = AdBreakRegistry::new();
    reg.add(start + Duration::minutes(14), "WWE_Title_Promo")
        .add(start + Duration::minutes(42), "Royal_Rumble_Ads")
        .add(start + Duration::minutes(88), "Main_Event_Call");
    reg
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastSimulation {
    pub start: DateTime<Utc>,
    pub minutes: u32,
    /// Mean organic conversions per minute.
    pub baseline_rate: f64,
    /// Extra conversions in the minute an ad airs.
    pub spike_peak: f64,
    pub spike_decay_per_minute: f64,
    pub spike_span_minutes: f64,
    pub value_min: f64,
    pub value_max: f64,
}

impl Default for BroadcastSimulation {
    fn default() -> Self {
        Self {
            start: broadcast_start(),
            minutes: 120,
            baseline_rate: 8.0,
            spike_peak: 50.0,
            spike_decay_per_minute: 0.25,
            spike_span_minutes: 15.0,
            value_min: 20.0,
            value_max: 100.0,
        }
    }
}

impl BroadcastSimulation {
    /// Ad-driven extra conversions for the minute starting at `t`.
    pub fn spike_at(&self, t: DateTime<Utc>, registry: &AdBreakRegistry) -> u64 {
        registry
            .list_all()
            .iter()
            .map(|ad| elapsed_minutes(ad.timestamp, t))
            .filter(|d| (0.0..=self.spike_span_minutes).contains(d))
            .map(|d| (self.spike_peak * (-self.spike_decay_per_minute * d).exp()).floor() as u64)
            .sum()
    }

    pub fn generate<R: Rng>(
        &self,
        registry: &AdBreakRegistry,
        rng: &mut R,
    ) -> Result<Vec<ConversionEvent>> {
        if !(self.value_min.is_finite() && self.value_max.is_finite())
            || self.value_min < 0.0
            || self.value_min >= self.value_max
        {
            bail!(
                "value range must be finite, non-negative and non-empty, got [{}, {})",
                self.value_min,
                self.value_max
            );
        }
        let baseline = Poisson::new(self.baseline_rate)
            .with_context(|| format!("baseline rate {}", self.baseline_rate))?;

        let mut out = Vec::new();
        for minute in 0..self.minutes {
            let t = self.start + Duration::minutes(i64::from(minute));
            let organic = baseline.sample(&mut *rng) as u64;
            let total = organic + self.spike_at(t, registry);
            for _ in 0..total {
                let offset = Duration::seconds(rng.random_range(0..60));
                let value = rng.random_range(self.value_min..self.value_max);
                out.push(ConversionEvent::new(t + offset, value));
            }
        }
        Ok(out)
    }

    pub fn generate_seeded(&self, registry: &AdBreakRegistry, seed: u64) -> Result<Vec<ConversionEvent>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate(registry, &mut rng)
    }

    /// Generate, attribute and cross-check one broadcast end to end.
    pub fn run(
        &self,
        registry: &AdBreakRegistry,
        cfg: &EngineConfig,
        seed: u64,
    ) -> Result<BroadcastReport> {
        let params = cfg.decay_params()?;
        let detector = cfg.spike_detector()?;

        let conversions = self.generate_seeded(registry, seed)?;
        let results = attribute(&conversions, registry, &params)?;

        let buckets = bucket_by_interval(
            &results,
            self.start,
            Duration::minutes(1),
            self.minutes as usize,
        );

        Ok(BroadcastReport {
            summary: BroadcastSummary::from_results(&results, registry),
            spikes: SpikeValidation::evaluate(&buckets, &detector),
            decay: decay_curve(&params, &DECAY_TABLE_MINUTES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_broadcast() {
        let sim = BroadcastSimulation::default();
        let reg = default_programme(sim.start);
        let a = sim.generate_seeded(&reg, 7).unwrap();
        let b = sim.generate_seeded(&reg, 7).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn conversions_stay_inside_the_broadcast() {
        let sim = BroadcastSimulation::default();
        let reg = default_programme(sim.start);
        let end = sim.start + Duration::minutes(i64::from(sim.minutes));
        for c in sim.generate_seeded(&reg, 1).unwrap() {
            assert!(c.timestamp >= sim.start && c.timestamp < end);
            assert!((20.0..100.0).contains(&c.value));
        }
    }

    #[test]
    fn spike_shape_follows_the_airing() {
        let sim = BroadcastSimulation::default();
        let reg = default_programme(sim.start);
        let at = |m: i64| sim.spike_at(sim.start + Duration::minutes(m), &reg);
        assert_eq!(at(13), 0);
        assert_eq!(at(14), 50);
        assert_eq!(at(15), 38); // floor(50 * e^-0.25)
        assert_eq!(at(29), 1); // floor(50 * e^-3.75)
        assert_eq!(at(30), 0);
    }

    #[test]
    fn broadcast_starts_at_the_fixed_instant() {
        let start = broadcast_start();
        assert_eq!(start.to_rfc3339(), "2026-01-31T20:00:00+00:00");
        assert_eq!(BroadcastSimulation::default().start, start);
    }

    #[test]
    fn rejects_bad_value_range() {
        let sim = BroadcastSimulation {
            value_min: 10.0,
            value_max: 10.0,
            ..Default::default()
        };
        assert!(sim.generate_seeded(&AdBreakRegistry::new(), 0).is_err());
    }
}
