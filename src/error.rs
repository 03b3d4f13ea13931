//! # error
//!
//! Error types for the valuation pipeline and the HTTP surface.
//!
//! * [`FetchError`]       — one symbol lookup failed.
//! * [`StoreError`]       — the participant store could not be read.
//! * [`LeaderboardError`] — why a valuation pass (or a leaderboard query) failed.
//! * [`AppError`]         — what handlers return; rendered as JSON by Axum.
//!
//! Pipeline errors are `Clone` because coalesced callers all receive the same
//! failed result.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::LeaderboardSnapshot;

// ─── FetchError ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("provider unreachable: {0}")]
    Network(String),

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("unknown symbol")]
    UnknownSymbol,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("invalid price {0}")]
    InvalidPrice(f64),
}

// ─── StoreError ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("participant store unreachable: {0}")]
    Unreachable(String),

    #[error("participant store returned malformed data: {0}")]
    Malformed(String),
}

// ─── LeaderboardError ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LeaderboardError {
    /// A price lookup failed; the whole pass is aborted.
    #[error("price fetch failed for {symbol}: {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: FetchError,
    },

    /// Valuation reached a held symbol that has no price in the table.
    #[error("no price for {symbol} (held by {username})")]
    MissingPrice { username: String, symbol: String },

    #[error(transparent)]
    StoreRead(#[from] StoreError),

    #[error("valuation pass exceeded {0:?}")]
    Timeout(Duration),

    #[error("top must be -1 or a non-negative count, got {0}")]
    InvalidTopN(i64),

    /// A fetch task or the pass task panicked or was cancelled.
    #[error("internal pipeline failure: {0}")]
    Internal(String),
}

// ─── AppError ─────────────────────────────────────────────────────────────────

/// Every handler returns `Result<_, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request was well-formed but its parameters are not acceptable.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The leaderboard could not be computed. Carries the last snapshot, if
    /// any, so the client can decide whether to show it.
    #[error("Leaderboard unavailable: {source}")]
    Unavailable {
        source: LeaderboardError,
        stale:  Option<Arc<LeaderboardSnapshot>>,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        let (status, body) = match self {
            AppError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "error": message }),
            ),
            AppError::Unavailable { stale, .. } => {
                let mut body = json!({ "ok": false, "error": message });
                if let Some(snapshot) = stale {
                    body["stale"] = json!(*snapshot);
                }
                (StatusCode::SERVICE_UNAVAILABLE, body)
            }
        };

        (status, Json(body)).into_response()
    }
}
