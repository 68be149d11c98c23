use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing::instrument;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub mod app_state;
pub mod client;
pub mod config;
pub mod consts;
pub mod error;
pub mod middleware;
pub mod videogen;

use app_state::AppState;

#[derive(OpenApi)]
#[openapi(tags(
    (name = "VideoGen", description = "Future trailer generation API"),
))]
struct ApiDoc;

/// HTTP surface of the service, without the Sentry layers `main` adds on top
pub fn app_router(shared_state: Arc<AppState>) -> Router {
    let body_limit = shared_state.config.server.body_limit_bytes;

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", videogen::videogen_router(shared_state.clone()))
        .split_for_parts();

    Router::new()
        .route("/healthz", get(health_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .merge(router)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            crate::middleware::http_logging_middleware,
        ))
}

#[instrument]
async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
