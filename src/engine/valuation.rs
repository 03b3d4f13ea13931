//! # engine::valuation
//!
//! **Valuation Engine** — folds one [`PriceTable`] across every portfolio.
//!
//! | Field                    | Formula                                        |
//! |--------------------------|------------------------------------------------|
//! | `value`                  | `cash + Σ(quantity × price_table[symbol])`     |
//! | `initial_investment`     | `baseline_cash + Σ(purchase_price × quantity)` |
//! | `first_transaction_date` | `min(purchase_date)`, absent with no positions |
//!
//! A held symbol with no price is a hard failure, never a zero: a zero would
//! quietly drop that participant down the ranking.

use tracing::error;

use crate::error::LeaderboardError;
use crate::models::{LeaderboardEntry, Participant, PriceTable};

/// Value a single participant against `prices`.
pub fn value_participant(
    participant:   &Participant,
    prices:        &PriceTable,
    baseline_cash: f64,
) -> Result<LeaderboardEntry, LeaderboardError> {
    let mut value = participant.cash;
    let mut cost_basis = 0.0;

    for position in &participant.positions {
        let Some(price) = prices.get(&position.symbol) else {
            error!(
                username = %participant.username,
                symbol   = %position.symbol,
                "Held symbol missing from price table"
            );
            return Err(LeaderboardError::MissingPrice {
                username: participant.username.clone(),
                symbol:   position.symbol.clone(),
            });
        };
        value += price * position.quantity;
        cost_basis += position.cost_basis();
    }

    Ok(LeaderboardEntry {
        username:               participant.username.clone(),
        value,
        initial_investment:     baseline_cash + cost_basis,
        first_transaction_date: participant.first_transaction_date(),
    })
}

/// Value everyone and rank them, highest `value` first.
///
/// The sort is stable: equal values keep the order the store returned them in.
pub fn value_participants(
    participants:  &[Participant],
    prices:        &PriceTable,
    baseline_cash: f64,
) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
    let mut entries = participants
        .iter()
        .map(|p| value_participant(p, prices, baseline_cash))
        .collect::<Result<Vec<_>, _>>()?;

    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    Ok(entries)
}
