//! # routes::leaderboard
//!
//! `GET /api/user/leaderboard?top=N`
//!
//! ```json
//! { "ok": true, "count": 2,
//!   "users": [{ "username": "bob",   "value": 20000, "initialInvestment": 100000 },
//!             { "username": "alice", "value": 6500,  "initialInvestment": 101000,
//!               "firstTransactionDate": "2024-01-02T15:30:00Z" }] }
//! ```
//!
//! `top` defaults to `-1` (everyone). When the pass fails the response is a
//! 503 that also carries the previous snapshot under `"stale"`, if there is
//! one; whether to display it is the client's call.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{AppError, LeaderboardError},
    service::ALL,
    state::SharedState,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub top: Option<i64>,
}

pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let top = query.top.unwrap_or(ALL);

    match state.leaderboard.get_leaderboard(top).await {
        Ok(users) => Ok(Json(json!({
            "ok":    true,
            "count": users.len(),
            "users": users,
        }))),
        Err(e @ LeaderboardError::InvalidTopN(_)) => Err(AppError::BadRequest(e.to_string())),
        Err(source) => Err(AppError::Unavailable {
            source,
            stale: state.leaderboard.last_known().await,
        }),
    }
}
