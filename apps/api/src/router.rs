//! Router assembly and the CORS policy that distinguishes development from
//! production deployments.

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use wts_config::Environment;

use crate::routes;
use crate::state::AppState;

/// Build the CORS layer for the given environment and optional allowlist.
///
/// In production: an explicit, non-empty `cors_allowed_origins` is required,
/// otherwise CORS requests are rejected. In development: an explicit
/// allowlist is honored if given, otherwise CORS is permissive.
pub fn build_cors_layer(environment: Environment, cors_allowed_origins: &Option<Vec<String>>) -> CorsLayer {
    match cors_allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed: Vec<_> = origins
                .iter()
                .filter_map(|origin| {
                    origin.parse().ok().or_else(|| {
                        tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
                        None
                    })
                })
                .collect();

            if allowed.is_empty() {
                tracing::error!("no valid CORS origins configured, CORS requests will be rejected");
                CorsLayer::new()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                    .max_age(std::time::Duration::from_secs(3600))
            }
        }
        _ if environment.is_production() => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not configured in production; CORS requests will be rejected"
            );
            CorsLayer::new()
        }
        _ => {
            tracing::warn!("using permissive CORS in development mode");
            CorsLayer::permissive()
        }
    }
}

pub fn build_router(state: AppState, cors_allowed_origins: Option<Vec<String>>) -> Router {
    let cors = build_cors_layer(state.environment, &cors_allowed_origins);

    Router::new()
        .route("/", get(root))
        .route("/api/status", get(routes::status::status))
        .route("/api/paths", get(routes::paths::get_paths).post(routes::paths::post_paths))
        .route("/api/list", get(routes::list::list))
        .route("/api/ready", get(routes::ready::ready))
        .route("/api/folder", get(routes::folder::folder))
        .route("/api/decision", axum::routing::post(routes::decision::decision))
        .route("/api/events", get(routes::events::events))
        .route("/api/debug/jobs", get(routes::debug::jobs))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> &'static str {
    "whats-that-sound control plane"
}
