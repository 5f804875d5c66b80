use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::ServiceConfig;
use crate::dataset::Dataset;
use crate::metrics::{self, Metrics};
use crate::recommend::{self, RecommendationResult};

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
}

impl AppState {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }
}

/// Credentialed CORS for the configured origins. Methods and headers are
/// mirrored from the preflight, since `*` is not allowed with credentials.
pub fn cors_layer(config: &ServiceConfig) -> anyhow::Result<CorsLayer> {
    let origins = config.origin_header_values()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

pub fn create_router(state: AppState, cors: CorsLayer, metrics: Option<&Metrics>) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/recommendations", get(recommendations))
        .route("/categories", get(categories))
        .with_state(state);

    if let Some(m) = metrics {
        router = router.merge(m.router());
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Router with default CORS and no metrics; convenient for tests and tools.
pub fn router(dataset: Dataset) -> anyhow::Result<Router> {
    let cors = cors_layer(&ServiceConfig::default())?;
    Ok(create_router(AppState::new(dataset), cors, None))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello from FastAPI!" }))
}

/// Raw query pairs; a repeated `categories` key resolves to its last value.
async fn recommendations(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<RecommendationResult>, (StatusCode, &'static str)> {
    let categories = pairs
        .into_iter()
        .rev()
        .find_map(|(k, v)| (k == "categories").then_some(v))
        .ok_or((
            StatusCode::BAD_REQUEST,
            "missing required query parameter `categories`",
        ))?;

    let result = recommend::recommend(&state.dataset, &categories);
    debug!(%categories, returned = result.len(), "GET /recommendations");
    metrics::record_request(result.len());
    Ok(Json(result))
}

#[derive(Serialize)]
struct CategoriesOut {
    categories: Vec<String>,
}

async fn categories(State(state): State<AppState>) -> Json<CategoriesOut> {
    Json(CategoriesOut {
        categories: state.dataset.categories(),
    })
}
