use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "recommendations_requests_total";
pub const EMPTY_TOTAL: &str = "recommendations_empty_total";
pub const RETURNED: &str = "recommendations_returned";
pub const DATASET_ARTICLES: &str = "dataset_articles";

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder and publish the dataset size.
    /// Can only succeed once per process.
    pub fn init(dataset_articles: usize) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!(DATASET_ARTICLES).set(dataset_articles as f64);

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

/// Record one served `/recommendations` call. No-op without a recorder.
pub fn record_request(returned: usize) {
    counter!(REQUESTS_TOTAL).increment(1);
    if returned == 0 {
        counter!(EMPTY_TOTAL).increment(1);
    }
    histogram!(RETURNED).record(returned as f64);
}
