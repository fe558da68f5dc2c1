use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/contexts/{kind}/{id}/chat", post(handlers::send_message))
        .route(
            "/contexts/{kind}/{id}/chat/history",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route(
            "/contexts/{kind}/{id}/chat/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/contexts/{kind}/{id}/chat/sessions/{session_id}",
            axum::routing::delete(handlers::delete_session),
        )
        .route(
            "/contexts/{kind}/{id}/chat/sessions/{session_id}/history",
            get(handlers::get_session_history),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
