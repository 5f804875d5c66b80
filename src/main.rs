//! Wikify Recommender — Binary Entrypoint
//! Boots the Axum HTTP server: config, dataset load, routes and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs. `RUST_LOG` overrides the default filter. Uses
/// `try_init` so a subscriber installed by the runtime stays in place.
fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wikify_recommender=info,tower_http=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_tracing();

    // Dataset or config problems abort startup; nothing is served.
    let router = wikify_recommender::app()?;

    Ok(router.into())
}
