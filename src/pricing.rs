//! # pricing
//!
//! **Price Fetcher** — one symbol in, one [`Quote`] (or [`FetchError`]) out.
//!
//! The pipeline treats the provider as a black box: it never retries and it
//! imposes no batching contract on the fetcher. Pacing lives in
//! [`engine::batcher`](crate::engine::batcher).
//!
//! ## Provider contract (`HttpPriceFetcher`)
//! ```text
//! GET {base_url}/quote?symbol=AAPL
//! 200 { "symbol": "AAPL", "regularMarketPrice": 189.84 }
//! 404 unknown symbol · 429 rate limited · other non-2xx provider error
//! ```

use futures_util::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::models::Quote;

// ─── Trait ────────────────────────────────────────────────────────────────────

pub trait PriceFetcher: Send + Sync {
    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<Quote, FetchError>>;
}

// ─── HTTP ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderQuote {
    symbol:               String,
    regular_market_price: Option<f64>,
}

/// Looks prices up against a quote endpoint over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPriceFetcher {
    client:   reqwest::Client,
    base_url: String,
}

impl HttpPriceFetcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let url = format!("{}/quote", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::UnknownSymbol);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!(symbol, "Quote provider rate limit hit");
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Provider { status: status.as_u16(), body });
        }

        let quote: ProviderQuote = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        let price = quote
            .regular_market_price
            .ok_or_else(|| FetchError::Malformed("missing regularMarketPrice".into()))?;

        if !quote.symbol.eq_ignore_ascii_case(symbol) {
            debug!(requested = symbol, returned = %quote.symbol, "Provider normalised symbol");
        }

        // keyed by what was asked for, so the price table lines up with positions
        Ok(Quote { symbol: symbol.to_string(), price })
    }
}

impl PriceFetcher for HttpPriceFetcher {
    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<Quote, FetchError>> {
        self.fetch_quote(symbol).boxed()
    }
}

// ─── Mock ─────────────────────────────────────────────────────────────────────

/// Generated prices for running without a provider (`QUOTE_BASE_URL=mock`).
///
/// The price is a pure function of the symbol so repeated passes agree.
#[derive(Debug, Clone, Default)]
pub struct MockPriceFetcher;

impl MockPriceFetcher {
    pub fn price_for(symbol: &str) -> f64 {
        // FNV-1a, folded into 5.00 ..= 504.99
        let hash = symbol
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
        5.0 + (hash % 50_000) as f64 / 100.0
    }
}

impl PriceFetcher for MockPriceFetcher {
    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<Quote, FetchError>> {
        let quote = Quote { symbol: symbol.to_string(), price: Self::price_for(symbol) };
        async move { Ok(quote) }.boxed()
    }
}
