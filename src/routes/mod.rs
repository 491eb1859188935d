pub mod dashboard;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(dashboard::router())
                .merge(crate::openapi::router()),
        )
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}
