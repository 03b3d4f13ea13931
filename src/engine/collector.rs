//! # engine::collector
//!
//! **Symbol Collector** — the distinct symbols actually held, so the provider
//! is never asked about anything nobody owns.

use std::collections::BTreeSet;

use crate::models::Participant;

/// Distinct symbols across every participant's positions.
///
/// Returned sorted; callers must not rely on any particular order beyond
/// that batches built from it are reproducible.
pub fn collect_symbols(participants: &[Participant]) -> Vec<String> {
    participants
        .iter()
        .flat_map(|p| p.positions.iter())
        .map(|position| position.symbol.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
