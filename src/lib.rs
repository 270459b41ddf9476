// src/lib.rs
// Public library surface for the service binary, the simulator and integration tests.

pub mod decay;
pub mod error;
pub mod registry;
pub mod spike;

// Attribution core
pub mod attribution;

pub mod config;
pub mod report;
pub mod simulate;

// HTTP surface
pub mod api;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::attribution::{
    attribute, attribute_sharded, Attribution, AttributionResult, ConversionEvent,
};
pub use crate::config::EngineConfig;
pub use crate::decay::{decay_weight, DecayParams};
pub use crate::error::{ConfigurationError, Error, ValidationError};
pub use crate::registry::{AdBreak, AdBreakRegistry};
pub use crate::spike::{detect_spikes, Baseline, SpikeDetector, SpikeFlag};
