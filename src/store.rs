//! # store — Participant Store
//!
//! Read-only access to users, cash and positions. The trading subsystem owns
//! this data; the leaderboard reads one snapshot of it per valuation pass.
//!
//! | Store            | Source                                   |
//! |------------------|------------------------------------------|
//! | `InMemoryStore`  | seeded in process (tests, empty default) |
//! | `JsonFileStore`  | `PARTICIPANTS_FILE`, re-read every pass  |
//! | `PgParticipantStore` | PostgreSQL, `db.rs` (feature `postgres`) |

use std::collections::HashSet;
use std::path::PathBuf;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::models::Participant;

pub trait ParticipantStore: Send + Sync {
    /// Every participant with their current cash and positions.
    fn participants(&self) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>>;
}

/// Reject records a valuation pass cannot trust.
pub fn validate(participants: &[Participant]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(participants.len());

    for participant in participants {
        if participant.username.trim().is_empty() {
            return Err(StoreError::Malformed("participant with empty username".into()));
        }
        if !seen.insert(participant.username.as_str()) {
            return Err(StoreError::Malformed(format!(
                "duplicate username '{}'",
                participant.username
            )));
        }
        if !participant.cash.is_finite() {
            return Err(StoreError::Malformed(format!(
                "non-finite cash for '{}'",
                participant.username
            )));
        }
        for position in &participant.positions {
            if position.symbol.trim().is_empty() {
                return Err(StoreError::Malformed(format!(
                    "position with empty symbol held by '{}'",
                    participant.username
                )));
            }
            if !(position.quantity.is_finite() && position.quantity > 0.0) {
                return Err(StoreError::Malformed(format!(
                    "non-positive quantity of {} held by '{}'",
                    position.symbol, participant.username
                )));
            }
            if !(position.purchase_price.is_finite() && position.purchase_price >= 0.0) {
                return Err(StoreError::Malformed(format!(
                    "negative purchase price of {} held by '{}'",
                    position.symbol, participant.username
                )));
            }
        }
    }

    Ok(())
}

// ─── InMemoryStore ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryStore {
    participants: RwLock<Vec<Participant>>,
}

impl InMemoryStore {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self { participants: RwLock::new(participants) }
    }

    /// Swap the whole data set (stands in for the trading subsystem's writes).
    #[cfg(test)]
    pub async fn replace(&self, participants: Vec<Participant>) {
        let mut guard = self.participants.write().await;
        *guard = participants;
    }

    async fn load(&self) -> Result<Vec<Participant>, StoreError> {
        let participants = self.participants.read().await.clone();
        validate(&participants)?;
        Ok(participants)
    }
}

impl ParticipantStore for InMemoryStore {
    fn participants(&self) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        self.load().boxed()
    }
}

// ─── JsonFileStore ────────────────────────────────────────────────────────────

/// A JSON array of participants on disk:
///
/// ```json
/// [{ "username": "alice", "cash": 5000,
///    "positions": [{ "symbol": "AAPL", "quantity": 10,
///                    "purchasePrice": 100, "purchaseDate": "2024-01-02T15:30:00Z" }] }]
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<Participant>, StoreError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::Unreachable(format!("{}: {e}", self.path.display())))?;

        let participants: Vec<Participant> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", self.path.display())))?;

        validate(&participants)?;
        debug!(path = %self.path.display(), count = participants.len(), "Participants loaded");
        Ok(participants)
    }
}

impl ParticipantStore for JsonFileStore {
    fn participants(&self) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        self.load().boxed()
    }
}
