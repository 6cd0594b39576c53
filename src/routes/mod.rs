use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::services::providers::MetadataProvider;
use crate::store::RankingStore;

pub mod rankings;
pub mod titles;

/// Shared application state: the ranking store and the metadata catalog,
/// both behind trait objects so tests can swap in in-memory versions
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RankingStore>,
    pub metadata: Arc<dyn MetadataProvider>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes(state: AppState) -> Router {
    Router::new()
        // Ranking sessions (stateless: the client echoes session state)
        .route("/rankings/sessions", post(rankings::start_session))
        .route("/rankings/sessions/advance", post(rankings::advance_session))
        .route("/rankings", post(rankings::commit_ranking))
        // Stored rankings
        .route("/users/:user_id/rankings", get(rankings::list_rankings))
        .route(
            "/users/:user_id/rankings/:title_id",
            delete(rankings::remove_ranking),
        )
        .route(
            "/users/:user_id/rankings/:title_id/rating",
            put(rankings::change_star_rating),
        )
        // Catalog search
        .route("/titles/search", get(titles::search))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
