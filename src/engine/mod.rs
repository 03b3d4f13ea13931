//! # engine
//!
//! The three stages of a valuation pass, leaf-first:
//!
//! ```text
//! participants ──▶ [collector] ──▶ distinct symbols
//!                                      │
//!                                      ▼
//!                  [batcher] ── paced batches ──▶ PriceFetcher
//!                                      │
//!                                      ▼
//! participants ──▶ [valuation] ◀── PriceTable ──▶ ranked entries
//! ```

pub mod batcher;
pub mod collector;
pub mod valuation;
