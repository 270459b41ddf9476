//! # Attribution Engine
//! Pure logic that maps `(conversions, registry, decay params)` → one
//! `AttributionResult` per conversion. No I/O, no shared state.
//!
//! Policy per conversion:
//! 1. decay-weight every registered ad break;
//! 2. keep positive weights, summing repeats of the same campaign id;
//! 3. nothing eligible → the whole value is organic;
//! 4. otherwise split the value proportionally to the summed weights.
//!
//! A batch is validated up front: one negative or non-finite value rejects
//! the whole batch and no partial output is produced.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::thread;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decay::{decay_weight, DecayParams};
use crate::error::ValidationError;
use crate::registry::AdBreakRegistry;

/// One observed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl ConversionEvent {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Where a conversion's value went. Exactly one bucket kind per conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attribution {
    /// At least one eligible ad; shares keyed by campaign id.
    Campaigns { shares: BTreeMap<String, f64> },
    /// No eligible ad.
    Organic { value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub conversion: ConversionEvent,
    pub attribution: Attribution,
}

impl AttributionResult {
    pub fn is_incremental(&self) -> bool {
        matches!(self.attribution, Attribution::Campaigns { .. })
    }

    /// Per-campaign shares; `None` for organic conversions.
    pub fn per_campaign(&self) -> Option<&BTreeMap<String, f64>> {
        match &self.attribution {
            Attribution::Campaigns { shares } => Some(shares),
            Attribution::Organic { .. } => None,
        }
    }

    pub fn campaign_share(&self, campaign: &str) -> f64 {
        self.per_campaign()
            .and_then(|s| s.get(campaign))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn organic(&self) -> Option<f64> {
        match self.attribution {
            Attribution::Organic { value } => Some(value),
            Attribution::Campaigns { .. } => None,
        }
    }

    /// Sum of every bucket; equals the conversion value up to rounding.
    pub fn attributed_total(&self) -> f64 {
        match &self.attribution {
            Attribution::Campaigns { shares } => shares.values().sum(),
            Attribution::Organic { value } => *value,
        }
    }
}

/// Summed decay weight per campaign for ads eligible at `at`.
pub fn eligible_weights(
    at: DateTime<Utc>,
    registry: &AdBreakRegistry,
    params: &DecayParams,
) -> BTreeMap<String, f64> {
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    for ad in registry.list_all() {
        let w = decay_weight(at, ad.timestamp, params);
        if w > 0.0 {
            *weights.entry(ad.campaign.clone()).or_insert(0.0) += w;
        }
    }
    weights
}

/// Attribute a single, already validated conversion.
pub fn attribute_one(
    conversion: ConversionEvent,
    registry: &AdBreakRegistry,
    params: &DecayParams,
) -> AttributionResult {
    let weights = eligible_weights(conversion.timestamp, registry, params);
    let total: f64 = weights.values().sum();

    let attribution = if weights.is_empty() || total <= 0.0 {
        Attribution::Organic {
            value: conversion.value,
        }
    } else {
        let shares = weights
            .into_iter()
            .map(|(campaign, w)| (campaign, (w / total) * conversion.value))
            .collect();
        Attribution::Campaigns { shares }
    };

    AttributionResult {
        conversion,
        attribution,
    }
}

/// Reject the batch on the first conversion that cannot be attributed.
pub fn validate(conversions: &[ConversionEvent]) -> Result<(), ValidationError> {
    for (index, c) in conversions.iter().enumerate() {
        if !c.value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                index,
                value: c.value,
            });
        }
        if c.value < 0.0 {
            return Err(ValidationError::NegativeValue {
                index,
                value: c.value,
            });
        }
    }
    Ok(())
}

/// Attribute a batch, preserving input order.
pub fn attribute(
    conversions: &[ConversionEvent],
    registry: &AdBreakRegistry,
    params: &DecayParams,
) -> Result<Vec<AttributionResult>, ValidationError> {
    checked(conversions)?;
    let results: Vec<AttributionResult> = conversions
        .iter()
        .map(|c| attribute_one(*c, registry, params))
        .collect();
    record_batch(&results, registry.len());
    Ok(results)
}

/// Same output as [`attribute`], with the batch split across scoped threads.
///
/// Workers only read the registry; it must not change during the pass,
/// which the shared borrow already guarantees.
pub fn attribute_sharded(
    conversions: &[ConversionEvent],
    registry: &AdBreakRegistry,
    params: &DecayParams,
    shards: NonZeroUsize,
) -> Result<Vec<AttributionResult>, ValidationError> {
    checked(conversions)?;
    if conversions.is_empty() {
        return Ok(Vec::new());
    }
    let chunk = conversions.len().div_ceil(shards.get());

    let results: Vec<AttributionResult> = thread::scope(|s| {
        let handles: Vec<_> = conversions
            .chunks(chunk)
            .map(|part| {
                s.spawn(move || {
                    part.iter()
                        .map(|c| attribute_one(*c, registry, params))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(part) => part,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    record_batch(&results, registry.len());
    Ok(results)
}

fn checked(conversions: &[ConversionEvent]) -> Result<(), ValidationError> {
    validate(conversions).inspect_err(|e| {
        counter!("attribution_rejected_batches_total").increment(1);
        warn!(target: "attribution", error = %e, size = conversions.len(), "batch rejected");
    })
}

fn record_batch(results: &[AttributionResult], ad_breaks: usize) {
    let incremental = results.iter().filter(|r| r.is_incremental()).count();
    let organic = results.len() - incremental;

    counter!("attribution_conversions_total").increment(results.len() as u64);
    counter!("attribution_incremental_total").increment(incremental as u64);
    counter!("attribution_organic_total").increment(organic as u64);

    debug!(
        target: "attribution",
        conversions = results.len(),
        ad_breaks,
        incremental,
        organic,
        "attribution pass"
    );
}
