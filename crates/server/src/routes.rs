use axum::{routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use service::Services;

pub mod crud;
pub mod params;

pub use crud::collection_router;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: `/health` plus the CRUD routes of
/// every collection.
pub fn build_router(services: &Services, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(collection_router(services.users.clone()))
        .merge(collection_router(services.auths.clone()))
        .merge(collection_router(services.roles.clone()))
        .merge(collection_router(services.customers.clone()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one INFO span per request with method and path
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // status code and latency
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx and other failures
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
