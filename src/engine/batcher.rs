//! # engine::batcher
//!
//! **Batching Rate Limiter** — turns an arbitrary number of symbols into a
//! [`PriceTable`] without bursting the provider.
//!
//! ```text
//! symbols ──chunk(batch_size)──▶ [b0] [b1] [b2] ...
//!
//! b0: fan-out on a JoinSet ──▶ fan-in ──▶ sleep(batch_delay)
//! b1: fan-out on a JoinSet ──▶ fan-in ──▶ sleep(batch_delay)
//! b2: fan-out on a JoinSet ──▶ fan-in ──▶ done (no trailing sleep)
//! ```
//!
//! Batch N fully completes before batch N+1 is dispatched. The first failed
//! lookup aborts the rest of its batch (dropping the `JoinSet` cancels the
//! outstanding tasks) and fails the whole pass: an incomplete table would
//! silently undervalue whoever holds the missing symbol.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::BatchConfig;
use crate::error::{FetchError, LeaderboardError};
use crate::models::{PriceTable, Quote};
use crate::pricing::PriceFetcher;

/// Fetch a price for every symbol in `symbols`, batch by batch.
///
/// `symbols` is expected to be distinct (see
/// [`collect_symbols`](crate::engine::collector::collect_symbols)).
pub async fn fetch_prices(
    fetcher: Arc<dyn PriceFetcher>,
    symbols: &[String],
    config:  &BatchConfig,
) -> Result<PriceTable, LeaderboardError> {
    let batch_size = config.batch_size.max(1);
    let batch_count = symbols.len().div_ceil(batch_size);
    let mut prices = PriceTable::with_capacity(symbols.len());

    let mut batches = symbols.chunks(batch_size).enumerate().peekable();
    while let Some((index, batch)) = batches.next() {
        debug!(batch = index + 1, of = batch_count, size = batch.len(), "Dispatching quote batch");

        for quote in fetch_batch(&fetcher, batch, config).await? {
            prices.insert(quote.symbol, quote.price);
        }

        if batches.peek().is_some() {
            tokio::time::sleep(config.batch_delay).await;
        }
    }

    info!(symbols = prices.len(), batches = batch_count, "Price table built");
    Ok(prices)
}

/// All lookups of one batch, concurrently. Fails fast on the first error.
async fn fetch_batch(
    fetcher: &Arc<dyn PriceFetcher>,
    batch:   &[String],
    config:  &BatchConfig,
) -> Result<Vec<Quote>, LeaderboardError> {
    let mut tasks = JoinSet::new();

    for symbol in batch {
        let fetcher = Arc::clone(fetcher);
        let symbol = symbol.clone();
        let timeout = config.fetch_timeout;

        tasks.spawn(async move {
            let result = match tokio::time::timeout(timeout, fetcher.fetch(&symbol)).await {
                Ok(result) => result,
                Err(_)     => Err(FetchError::Timeout(timeout)),
            };
            (symbol, result)
        });
    }

    let mut quotes = Vec::with_capacity(batch.len());
    while let Some(joined) = tasks.join_next().await {
        let (symbol, result) = joined.map_err(|e| LeaderboardError::Internal(e.to_string()))?;

        let quote = result
            .and_then(|quote| match quote.price {
                p if p.is_finite() && p >= 0.0 => Ok(quote),
                p => Err(FetchError::InvalidPrice(p)),
            })
            .map_err(|source| LeaderboardError::Fetch { symbol: symbol.clone(), source })?;

        quotes.push(Quote { symbol, price: quote.price });
    }

    Ok(quotes)
}
