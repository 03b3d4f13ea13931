//! HTTP handlers, one module per concern.
//!
//! | Method | Path                    | Description                      |
//! |--------|-------------------------|----------------------------------|
//! | GET    | `/api/user/leaderboard` | Ranked participants (`?top=N`)   |
//! | GET    | `/health`               | Liveness                         |

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::SharedState;

pub mod health;
pub mod leaderboard;

/// The full router with middleware, ready to serve.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/user/leaderboard", get(leaderboard::get_leaderboard))
        .route("/health",               get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
