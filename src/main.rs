//! Attribution service binary entrypoint.
//! Boots the Axum HTTP server with the batch attribution and spike routes,
//! plus the Prometheus `/metrics` endpoint.

use live_event_attribution::{api, config::EngineConfig, metrics::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `SHUTTLE_ENV` values treated as a developer machine.
fn is_dev_shuttle_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "local" | "development" | "dev"
    )
}

/// Batch-level `attribution` and `spikes` debug lines on stdout.
/// Off unless `ATTRIBUTION_DEV_LOG=1` on a debug build or a dev `SHUTTLE_ENV`;
/// `RUST_LOG` replaces the default filter.
fn enable_dev_tracing() {
    if std::env::var("ATTRIBUTION_DEV_LOG").as_deref() != Ok("1") {
        return;
    }
    let shuttle_env = std::env::var("SHUTTLE_ENV").unwrap_or_default();
    if !(cfg!(debug_assertions) || is_dev_shuttle_env(&shuttle_env)) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("attribution=debug,spikes=debug,warn"));

    // Shuttle may have installed its own subscriber already.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = EngineConfig::load()?;
    let metrics = Metrics::init(&cfg)?;

    let router = api::create_router(cfg).merge(metrics.router());

    Ok(router.into())
}
