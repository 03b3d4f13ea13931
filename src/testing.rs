//! Test doubles shared by the pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use tokio::time::Instant;

use crate::error::FetchError;
use crate::models::{Participant, Position, Quote};
use crate::pricing::PriceFetcher;

pub const DEFAULT_TEST_PRICE: f64 = 100.0;

/// A [`PriceFetcher`] that records every call and when it started.
#[derive(Default)]
pub struct RecordingFetcher {
    calls:         Mutex<Vec<(String, Instant)>>,
    in_flight:     AtomicUsize,
    max_in_flight: AtomicUsize,
    latency:       Option<Duration>,
    failing:       Option<String>,
    prices:        HashMap<String, f64>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Lookups of `symbol` fail with [`FetchError::UnknownSymbol`].
    pub fn failing_on(mut self, symbol: &str) -> Self {
        self.failing = Some(symbol.to_string());
        self
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(s, _)| s == symbol).count()
    }

    pub fn was_called(&self, symbol: &str) -> bool {
        self.calls_for(symbol) > 0
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Sizes of groups of calls that started at the same instant, in order.
    /// Under paused tokio time each group is one dispatched batch.
    pub fn batch_sizes(&self) -> Vec<usize> {
        let calls = self.calls.lock().unwrap();
        let mut sizes: Vec<(Instant, usize)> = Vec::new();
        for (_, at) in calls.iter() {
            match sizes.last_mut() {
                Some((last, n)) if last == at => *n += 1,
                _ => sizes.push((*at, 1)),
            }
        }
        sizes.into_iter().map(|(_, n)| n).collect()
    }
}

impl PriceFetcher for RecordingFetcher {
    fn fetch<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, Result<Quote, FetchError>> {
        async move {
            self.calls.lock().unwrap().push((symbol.to_string(), Instant::now()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.as_deref() == Some(symbol) {
                return Err(FetchError::UnknownSymbol);
            }
            let price = self.prices.get(symbol).copied().unwrap_or(DEFAULT_TEST_PRICE);
            Ok(Quote { symbol: symbol.to_string(), price })
        }
        .boxed()
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap()
}

pub fn position(symbol: &str, quantity: f64, purchase_price: f64, purchase_date: DateTime<Utc>) -> Position {
    Position { symbol: symbol.to_string(), quantity, purchase_price, purchase_date }
}

pub fn participant(username: &str, cash: f64, positions: Vec<Position>) -> Participant {
    Participant { username: username.to_string(), cash, positions }
}
