//! Route configuration and middleware layering.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

const API_PREFIX: &str = "/api/v0";

/// Extra room for multipart framing on top of the document size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn build_router(state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(&state)?;
    let body_limit = state.config.max_document_size_bytes + MULTIPART_OVERHEAD_BYTES;

    let router = Router::new()
        .route("/health", get(handlers::health))
        .route(
            &format!("{}/documents", API_PREFIX),
            post(handlers::upload::upload_document).get(handlers::documents::list_documents),
        )
        .route(
            &format!("{}/documents/{{id}}", API_PREFIX),
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )
        .route(
            &format!("{}/documents/{{id}}/file", API_PREFIX),
            get(handlers::documents::download_document),
        )
        .route(
            &format!("{}/documents/{{id}}/retry", API_PREFIX),
            post(handlers::documents::retry_document),
        )
        .route(
            &format!("{}/events", API_PREFIX),
            get(handlers::events::document_events),
        )
        .route(
            &format!("{}/admin/stale", API_PREFIX),
            get(handlers::documents::stale_documents),
        )
        // Shareable viewer contract: the URL path resolves the record
        .route("/document/{id}", get(handlers::documents::get_document))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .with_state(state);

    Ok(router)
}

fn setup_cors(state: &Arc<AppState>) -> Result<CorsLayer, anyhow::Error> {
    let origins = &state.config.cors_origins;
    if origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let parsed: Result<Vec<HeaderValue>, _> =
        origins.iter().map(|o| o.parse::<HeaderValue>()).collect();
    Ok(CorsLayer::new()
        .allow_origin(parsed?)
        .allow_methods(Any)
        .allow_headers(Any))
}
