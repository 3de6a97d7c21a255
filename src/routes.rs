//! Router assembly

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::{staking_handlers, tracing_middleware::tracing_middleware, AppState};

/// Build the full application router over shared state
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes())
        .layer(middleware::from_fn(tracing_middleware))
        .layer(cors)
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/pools", get(staking_handlers::list_pools))
        .route("/positions", post(staking_handlers::open_position))
        .route("/positions/:id", get(staking_handlers::get_position))
        .route("/positions/:id/rewards", get(staking_handlers::get_rewards))
        .route("/positions/:id/claim", post(staking_handlers::claim_rewards))
        .route("/positions/:id/close", post(staking_handlers::close_position))
        .route("/positions/:id/emergency-close", post(staking_handlers::emergency_close))
        .route(
            "/positions/:id/assets/:asset_id/boost/entanglement",
            post(staking_handlers::boost_entanglement),
        )
        .route(
            "/positions/:id/assets/:asset_id/boost/consciousness",
            post(staking_handlers::boost_consciousness),
        )
        .route(
            "/positions/:id/assets/:asset_id/boost/anchor",
            post(staking_handlers::boost_anchor),
        )
        .route("/owners/:owner_id/positions", get(staking_handlers::list_owner_positions))
        .route(
            "/owners/:owner_id/events/quantum-entanglement",
            post(staking_handlers::quantum_entanglement_event),
        )
        .route("/owners/:owner_id/events/meditation", post(staking_handlers::meditation_boost))
        .route(
            "/owners/:owner_id/events/reality-distortion",
            post(staking_handlers::reality_distortion),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.engine.monitor().export_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
