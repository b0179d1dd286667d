use axum::{extract::DefaultBodyLimit, routing::get, Router};
use runbox_types::endpoints;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the HTTP router. Unlisted methods on these paths answer 405.
pub fn build_router(state: AppState) -> Router {
    // one byte of headroom so the gateway reports its own 413
    let body_limit = state.gateway.max_body_bytes().saturating_add(1);
    Router::new()
        .route(
            "/store/:read_key",
            get(handler::fetch_handler).post(handler::store_handler),
        )
        .route(endpoints::IMPORT, get(handler::import_handler))
        .route("/new/", get(handler::import_handler))
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::INFO, get(handler::info_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
