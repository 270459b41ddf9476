//! # Ad-Break Registry
//! Append-only list of ad airings for one session.
//!
//! The registry is plain data: populate it, then hand out `&AdBreakRegistry`
//! to attribution passes. It has no interior locking, so mutation while a
//! pass is running is ruled out by the borrow checker rather than a mutex.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AD_DURATION_SECS: u32 = 30;

fn default_duration() -> u32 {
    DEFAULT_AD_DURATION_SECS
}

/// One ad airing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdBreak {
    pub timestamp: DateTime<Utc>,
    pub campaign: String,
    /// Airtime length; informational only, never used in decay math.
    #[serde(default = "default_duration")]
    pub duration_seconds: u32,
}

impl AdBreak {
    pub fn new(timestamp: DateTime<Utc>, campaign: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            timestamp,
            campaign: campaign.into(),
            duration_seconds,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdBreakRegistry {
    breaks: Vec<AdBreak>,
}

impl AdBreakRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an airing with the default 30 s duration.
    pub fn add(&mut self, timestamp: DateTime<Utc>, campaign: impl Into<String>) -> &mut Self {
        self.add_with_duration(timestamp, campaign, DEFAULT_AD_DURATION_SECS)
    }

    /// A reused campaign id is kept as a separate entry with its own timestamp.
    pub fn add_with_duration(
        &mut self,
        timestamp: DateTime<Utc>,
        campaign: impl Into<String>,
        duration_seconds: u32,
    ) -> &mut Self {
        self.breaks
            .push(AdBreak::new(timestamp, campaign, duration_seconds));
        self
    }

    /// All breaks in insertion order.
    pub fn list_all(&self) -> &[AdBreak] {
        &self.breaks
    }

    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    /// Distinct campaign ids in first-seen order.
    pub fn campaigns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for b in &self.breaks {
            if !out.contains(&b.campaign.as_str()) {
                out.push(&b.campaign);
            }
        }
        out
    }
}

impl FromIterator<AdBreak> for AdBreakRegistry {
    fn from_iter<I: IntoIterator<Item = AdBreak>>(iter: I) -> Self {
        Self {
            breaks: iter.into_iter().collect(),
        }
    }
}

impl Extend<AdBreak> for AdBreakRegistry {
    fn extend<I: IntoIterator<Item = AdBreak>>(&mut self, iter: I) {
        self.breaks.extend(iter);
    }
}
