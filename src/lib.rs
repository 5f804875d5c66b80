// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod dataset;
pub mod metrics;
pub mod recommend;

pub use crate::api::router;
pub use crate::config::ServiceConfig;
pub use crate::dataset::{Article, Dataset, DatasetError};
pub use crate::recommend::{recommend, Recommendation, RecommendationResult};

use anyhow::Context;
use axum::Router;
use tracing::info;

/// Build the full application from config: load the dataset (fatal on
/// failure), optionally install metrics, and wire the router.
pub fn build_app(config: &ServiceConfig) -> anyhow::Result<Router> {
    let dataset = Dataset::load(&config.dataset_path).with_context(|| {
        format!(
            "loading article dataset from {}",
            config.dataset_path.display()
        )
    })?;

    let metrics = if config.metrics_enabled {
        Some(metrics::Metrics::init(dataset.len())?)
    } else {
        None
    };

    let cors = api::cors_layer(config)?;
    info!(
        dataset = %config.dataset_path.display(),
        articles = dataset.len(),
        cors_origins = ?config.cors_origins,
        metrics = config.metrics_enabled,
        "recommendation service ready"
    );

    Ok(api::create_router(
        api::AppState::new(dataset),
        cors,
        metrics.as_ref(),
    ))
}

/// Resolve config from file/env and build the application.
pub fn app() -> anyhow::Result<Router> {
    let config = ServiceConfig::load()?;
    build_app(&config)
}
