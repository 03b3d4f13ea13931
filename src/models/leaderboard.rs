//! # models::leaderboard
//!
//! Values produced by a valuation pass: fetched [`Quote`]s, the ephemeral
//! [`PriceTable`], and the ranked [`LeaderboardSnapshot`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Quote ────────────────────────────────────────────────────────────────────

/// One price lookup result from a [`PriceFetcher`](crate::pricing::PriceFetcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price:  f64,
}

// ─── PriceTable ───────────────────────────────────────────────────────────────

/// Symbol → latest price, built once per pass and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, f64>,
}

impl PriceTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { prices: HashMap::with_capacity(capacity) }
    }

    pub fn insert(&mut self, symbol: impl Into<String>, price: f64) {
        self.prices.insert(symbol.into(), price);
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(String, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self { prices: iter.into_iter().collect() }
    }
}

// ─── LeaderboardEntry ─────────────────────────────────────────────────────────

/// A participant's standing. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    /// `cash + Σ(quantity × current price)`
    pub value: f64,
    /// `baseline cash + Σ(purchase price × quantity)`
    pub initial_investment: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_transaction_date: Option<DateTime<Utc>>,
}

// ─── LeaderboardSnapshot ──────────────────────────────────────────────────────

/// The full ranked list from one pass. Shared behind an `Arc` and replaced
/// wholesale by the next pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    #[serde(rename = "users")]
    pub entries:     Vec<LeaderboardEntry>,
    pub computed_at: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    pub fn new(entries: Vec<LeaderboardEntry>) -> Self {
        Self { entries, computed_at: Utc::now() }
    }

    /// First `top_n` entries, or all of them when `top_n` is `None`.
    pub fn top(&self, top_n: Option<usize>) -> &[LeaderboardEntry] {
        match top_n {
            Some(n) => &self.entries[..n.min(self.entries.len())],
            None    => &self.entries,
        }
    }
}
