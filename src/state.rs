//! # state
//!
//! The **shared application state** injected into every Axum handler.
//!
//! The state owns the [`LeaderboardService`], which in turn owns its ranking
//! cache: there is no process-wide cache, its lifetime is the state's.

use std::sync::Arc;

use crate::service::LeaderboardService;

// ─── AppState ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub leaderboard: Arc<LeaderboardService>,
}

impl AppState {
    pub fn new(leaderboard: LeaderboardService) -> Self {
        Self { leaderboard: Arc::new(leaderboard) }
    }
}

/// Convenience type alias so callers can write `SharedState` instead of the
/// full generic form.
pub type SharedState = Arc<AppState>;

/// Wrap the service in an `Arc` ready for injection into the Axum router.
pub fn build_state(leaderboard: LeaderboardService) -> SharedState {
    Arc::new(AppState::new(leaderboard))
}
