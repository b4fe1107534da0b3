pub mod admin;
pub mod campaigns;
pub mod events;
pub mod health;
pub mod images;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full API router with tracing and CORS applied.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .merge(health::router())
        .merge(campaigns::router())
        .merge(images::router())
        .merge(events::router())
        .merge(admin::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            tracing::warn!("Invalid CORS origin {:?} ({}), allowing any origin", origin, e);
            layer.allow_origin(Any)
        }
    }
}
