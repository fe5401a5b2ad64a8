use crate::handlers;
use crate::state::AppState;
use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/user/register", post(handlers::register_user))
        .route("/api/user/:user_id", get(handlers::get_user))
        .route("/api/quiz/generate", post(handlers::generate_quiz))
        .route("/api/quiz/submit", post(handlers::submit_quiz))
        .route("/api/leaderboard", get(handlers::leaderboard))
        .route("/api/leaderboard/reset", delete(handlers::reset_leaderboard))
        .fallback_service(ServeDir::new("./static"))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
