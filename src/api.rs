use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::attribution::{self, Attribution, AttributionResult, ConversionEvent};
use crate::config::EngineConfig;
use crate::decay::DecayParams;
use crate::error::{ConfigurationError, Error, ValidationError};
use crate::registry::AdBreakRegistry;
use crate::report::BroadcastSummary;
use crate::spike::{Baseline, SpikeCounts, SpikeDetector};

#[derive(Clone)]
pub struct AppState {
    config: Arc<EngineConfig>,
}

/// Stateless batch endpoints; every request brings its own registry.
pub fn create_router(config: EngineConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/attribute", post(attribute_batch))
        .route("/spikes", post(spikes))
        .route("/debug/config", get(debug_config))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Typed domain errors rendered as `422 {"error": "..."}`.
pub struct ApiError(Error);

impl From<ConfigurationError> for ApiError {
    fn from(e: ConfigurationError) -> Self {
        Self(e.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = match self.0 {
            Error::Configuration(_) => "configuration",
            Error::Validation(_) => "validation",
        };
        let body = serde_json::json!({ "error": self.0.to_string(), "kind": kind });
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct AttributeReq {
    #[serde(default)]
    ad_breaks: AdBreakRegistry,
    conversions: Vec<ConversionEvent>,
    #[serde(default)]
    decay_window_minutes: Option<f64>,
    #[serde(default)]
    half_life_minutes: Option<f64>,
}

#[derive(Serialize)]
struct AttributedOut {
    timestamp: DateTime<Utc>,
    value: f64,
    is_incremental: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    per_campaign_attribution: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organic_attribution: Option<f64>,
}

impl From<AttributionResult> for AttributedOut {
    fn from(r: AttributionResult) -> Self {
        let is_incremental = r.is_incremental();
        let (per_campaign_attribution, organic_attribution) = match r.attribution {
            Attribution::Campaigns { shares } => (shares, None),
            Attribution::Organic { value } => (BTreeMap::new(), Some(value)),
        };
        Self {
            timestamp: r.conversion.timestamp,
            value: r.conversion.value,
            is_incremental,
            per_campaign_attribution,
            organic_attribution,
        }
    }
}

#[derive(Serialize)]
struct AttributeResp {
    results: Vec<AttributedOut>,
    summary: BroadcastSummary,
}

async fn attribute_batch(
    State(state): State<AppState>,
    Json(req): Json<AttributeReq>,
) -> Result<Json<AttributeResp>, ApiError> {
    let params = DecayParams::new(
        req.decay_window_minutes
            .unwrap_or(state.config.decay_window_minutes),
        req.half_life_minutes
            .unwrap_or(state.config.half_life_minutes),
    )?;

    let results = attribution::attribute(&req.conversions, &req.ad_breaks, &params)?;
    let summary = BroadcastSummary::from_results(&results, &req.ad_breaks);

    Ok(Json(AttributeResp {
        results: results.into_iter().map(AttributedOut::from).collect(),
        summary,
    }))
}

#[derive(Deserialize)]
struct SpikesReq {
    series: Vec<f64>,
    #[serde(default)]
    window: Option<usize>,
    #[serde(default)]
    z_threshold: Option<f64>,
    #[serde(default)]
    baseline: Option<Baseline>,
}

#[derive(Serialize)]
struct SpikesResp {
    /// `null` where the rolling window is incomplete.
    flags: Vec<Option<bool>>,
    z_scores: Vec<Option<f64>>,
    counts: SpikeCounts,
}

async fn spikes(
    State(state): State<AppState>,
    Json(req): Json<SpikesReq>,
) -> Result<Json<SpikesResp>, ApiError> {
    let detector = SpikeDetector::new(
        req.window.unwrap_or(state.config.spike_window),
        req.z_threshold.unwrap_or(state.config.z_threshold),
    )?
    .with_baseline(req.baseline.unwrap_or(state.config.spike_baseline));

    let flags = detector.detect(&req.series);
    Ok(Json(SpikesResp {
        counts: SpikeCounts::from_flags(&flags),
        flags: flags.iter().map(|f| f.as_option()).collect(),
        z_scores: detector.z_scores(&req.series),
    }))
}

async fn debug_config(State(state): State<AppState>) -> Json<EngineConfig> {
    Json(state.config.as_ref().clone())
}
