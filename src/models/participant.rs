//! # models::participant
//!
//! Read-only portfolio data handed to the valuation pipeline by a
//! [`ParticipantStore`](crate::store::ParticipantStore).
//!
//! The trading subsystem owns and mutates these records; the leaderboard only
//! ever reads a snapshot of them once per valuation pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Position ─────────────────────────────────────────────────────────────────

/// One held quantity of a symbol, with the price and time it was bought at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Ticker symbol, e.g. `"AAPL"`.
    pub symbol: String,
    /// Units held. Always `> 0`.
    pub quantity: f64,
    /// Unit price paid at purchase. Always `>= 0`.
    pub purchase_price: f64,
    pub purchase_date: DateTime<Utc>,
}

impl Position {
    /// Cost basis of this position (`purchase_price × quantity`).
    pub fn cost_basis(&self) -> f64 {
        self.purchase_price * self.quantity
    }
}

// ─── Participant ──────────────────────────────────────────────────────────────

/// A competitor being ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique across the competition.
    pub username: String,
    pub cash: f64,
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl Participant {
    /// Earliest purchase date across all positions, `None` without positions.
    pub fn first_transaction_date(&self) -> Option<DateTime<Utc>> {
        self.positions.iter().map(|p| p.purchase_date).min()
    }
}
