//! Domain models shared across the leaderboard pipeline.

pub mod leaderboard;
pub mod participant;

#[allow(unused_imports)]
pub use leaderboard::{LeaderboardEntry, LeaderboardSnapshot, PriceTable, Quote};
#[allow(unused_imports)]
pub use participant::{Participant, Position};
