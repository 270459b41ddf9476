use anyhow::Result;
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use shuttle_axum::axum::{routing::get, Router};

use crate::config::EngineConfig;

/// The global recorder can only be installed once per process.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (first call only) and publish the
    /// active decay settings as gauges.
    pub fn init(cfg: &EngineConfig) -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        gauge!("attribution_decay_window_minutes").set(cfg.decay_window_minutes);
        gauge!("attribution_half_life_minutes").set(cfg.half_life_minutes);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!(
        "attribution_conversions_total",
        "Conversions attributed across all batches."
    );
    describe_counter!(
        "attribution_incremental_total",
        "Conversions with at least one eligible ad break."
    );
    describe_counter!(
        "attribution_organic_total",
        "Conversions with no eligible ad break."
    );
    describe_counter!(
        "attribution_rejected_batches_total",
        "Batches rejected by value validation."
    );
    describe_counter!("spike_flags_total", "Positions flagged as volume spikes.");
}
