//! # service — Leaderboard Service
//!
//! The one operation callers need: *give me the current leaderboard*.
//!
//! ```text
//! get_leaderboard(top_n)
//!   └─ cache fresh? ──yes──▶ slice & return
//!          │ no (coalesced: one pass for all concurrent callers)
//!          ▼
//!      store.participants()
//!      collect_symbols()
//!      fetch_prices()        ── paced batches ──▶ PriceFetcher
//!      value_participants()
//!      cache.put(snapshot)   (success only)
//! ```
//!
//! Any failure in the pass reaches the caller unchanged and leaves the cache
//! as it was.

use std::sync::Arc;

use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::cache::{PassResult, RankingCache};
use crate::config::PipelineConfig;
use crate::engine::{batcher::fetch_prices, collector::collect_symbols, valuation::value_participants};
use crate::error::LeaderboardError;
use crate::models::{LeaderboardEntry, LeaderboardSnapshot};
use crate::pricing::PriceFetcher;
use crate::store::ParticipantStore;

/// `top_n` value meaning "every participant".
pub const ALL: i64 = -1;

pub struct LeaderboardService {
    store:   Arc<dyn ParticipantStore>,
    fetcher: Arc<dyn PriceFetcher>,
    cache:   RankingCache,
    config:  Arc<PipelineConfig>,
}

impl LeaderboardService {
    pub fn new(
        store:   Arc<dyn ParticipantStore>,
        fetcher: Arc<dyn PriceFetcher>,
        config:  PipelineConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            cache: RankingCache::new(config.cache_ttl),
            config: Arc::new(config),
        }
    }

    /// The ranked entries, truncated to `top_n` (`-1` = all).
    pub async fn get_leaderboard(&self, top_n: i64) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let limit = parse_top_n(top_n)?;
        let snapshot = self.snapshot().await?;
        Ok(snapshot.top(limit).to_vec())
    }

    /// The full current snapshot, from cache or from a fresh pass.
    pub async fn snapshot(&self) -> PassResult {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let config = Arc::clone(&self.config);

        self.cache
            .get_or_compute(move || run_pass(store, fetcher, config))
            .await
    }

    /// The last snapshot computed, even if expired. Callers may show it
    /// after a failed refresh; this service never does so on its own.
    pub async fn last_known(&self) -> Option<Arc<LeaderboardSnapshot>> {
        self.cache.last_known().await
    }
}

fn parse_top_n(top_n: i64) -> Result<Option<usize>, LeaderboardError> {
    match top_n {
        ALL => Ok(None),
        n if n >= 0 => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        n => Err(LeaderboardError::InvalidTopN(n)),
    }
}

/// One valuation pass, bounded by `pass_timeout`, under its own span.
async fn run_pass(
    store:   Arc<dyn ParticipantStore>,
    fetcher: Arc<dyn PriceFetcher>,
    config:  Arc<PipelineConfig>,
) -> PassResult {
    let span = tracing::info_span!("valuation_pass", pass_id = %Uuid::new_v4());
    let limit = config.pass_timeout;

    async move {
        let result = match tokio::time::timeout(limit, value_all(store, fetcher, &config)).await {
            Ok(result) => result,
            Err(_)     => Err(LeaderboardError::Timeout(limit)),
        };

        if let Err(e) = &result {
            error!(error = %e, "Valuation pass failed — cache left unchanged");
        }
        result
    }
    .instrument(span)
    .await
}

async fn value_all(
    store:   Arc<dyn ParticipantStore>,
    fetcher: Arc<dyn PriceFetcher>,
    config:  &PipelineConfig,
) -> PassResult {
    let started = tokio::time::Instant::now();

    let participants = store.participants().await?;
    let symbols = collect_symbols(&participants);
    info!(participants = participants.len(), symbols = symbols.len(), "Valuation pass started");

    let prices = fetch_prices(fetcher, &symbols, &config.batch).await?;
    let entries = value_participants(&participants, &prices, config.baseline_cash)?;

    info!(
        entries    = entries.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Valuation pass complete"
    );
    Ok(Arc::new(LeaderboardSnapshot::new(entries)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::store::InMemoryStore;
    use crate::testing::{participant, position, t0, RecordingFetcher};
    use std::time::Duration;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn service(store: Arc<InMemoryStore>, fetcher: Arc<RecordingFetcher>) -> LeaderboardService {
        LeaderboardService::new(store, fetcher, config())
    }

    fn sample_store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new(vec![
            participant("bob", 20_000.0, vec![]),
            participant("alice", 5_000.0, vec![position("AAPL", 10.0, 100.0, t0())]),
            participant("carol", 1_000.0, vec![
                position("AAPL", 1.0, 90.0, t0()),
                position("MSFT", 2.0, 250.0, t0()),
            ]),
        ]))
    }

    fn sample_fetcher() -> Arc<RecordingFetcher> {
        Arc::new(RecordingFetcher::new().with_price("AAPL", 150.0).with_price("MSFT", 300.0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ranks_sample_participants() {
        let svc = service(sample_store(), sample_fetcher());

        let board = svc.get_leaderboard(ALL).await.unwrap();

        let ranked: Vec<_> = board.iter().map(|e| (e.username.as_str(), e.value)).collect();
        assert_eq!(ranked, vec![("bob", 20_000.0), ("alice", 6_500.0), ("carol", 1_750.0)]);
        assert_eq!(board[1].initial_investment, 101_000.0);
        assert_eq!(board[0].first_transaction_date, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_symbol_fetched_once() {
        let fetcher = sample_fetcher();
        let svc = service(sample_store(), fetcher.clone());

        svc.get_leaderboard(ALL).await.unwrap();

        assert_eq!(fetcher.calls_for("AAPL"), 1);
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_n_truncates() {
        let svc = service(sample_store(), sample_fetcher());

        let top = svc.get_leaderboard(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].username, "bob");

        assert!(svc.get_leaderboard(0).await.unwrap().is_empty());
        assert_eq!(svc.get_leaderboard(50).await.unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_top_n_rejected() {
        let fetcher = sample_fetcher();
        let svc = service(sample_store(), fetcher.clone());

        assert_eq!(svc.get_leaderboard(-2).await.unwrap_err(), LeaderboardError::InvalidTopN(-2));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_within_ttl_refreshed_after() {
        let store = sample_store();
        let fetcher = sample_fetcher();
        let svc = service(store.clone(), fetcher.clone());

        let first = svc.snapshot().await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;
        let second = svc.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.call_count(), 2);

        store.replace(vec![participant("dan", 1.0, vec![])]).await;
        tokio::time::advance(Duration::from_secs(301)).await;

        let third = svc.snapshot().await.unwrap();
        assert_eq!(third.entries.len(), 1);
        assert_eq!(third.entries[0].username, "dan");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_pass() {
        let fetcher = Arc::new(
            RecordingFetcher::new()
                .with_price("AAPL", 150.0)
                .with_price("MSFT", 300.0)
                .with_latency(Duration::from_millis(30)),
        );
        let svc = service(sample_store(), fetcher.clone());

        let (a, b) = tokio::join!(svc.get_leaderboard(ALL), svc.get_leaderboard(ALL));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_leaves_no_stale_pass() {
        let store = sample_store();
        let fetcher = Arc::new(
            RecordingFetcher::new()
                .with_price("AAPL", 150.0)
                .with_price("MSFT", 300.0)
                .with_latency(Duration::from_millis(30)),
        );
        let svc = service(store.clone(), fetcher.clone());

        let dropped = tokio::time::timeout(Duration::from_millis(10), svc.snapshot()).await;
        assert!(dropped.is_err());

        // the pass completes on its own
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(svc.last_known().await.unwrap().entries.len(), 3);

        tokio::time::advance(Duration::from_secs(3600)).await;
        store.replace(vec![participant("dan", 1.0, vec![])]).await;

        let later = svc.snapshot().await.unwrap();
        assert_eq!(later.entries.len(), 1);
        assert_eq!(later.entries[0].username, "dan");
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_fails_call_and_caches_nothing() {
        let fetcher = Arc::new(RecordingFetcher::new().failing_on("MSFT"));
        let svc = service(sample_store(), fetcher.clone());

        let err = svc.get_leaderboard(ALL).await.unwrap_err();

        assert_eq!(
            err,
            LeaderboardError::Fetch { symbol: "MSFT".into(), source: FetchError::UnknownSymbol }
        );
        assert!(svc.last_known().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_snapshot() {
        let store = sample_store();
        let svc = service(store.clone(), sample_fetcher());
        let good = svc.snapshot().await.unwrap();

        // an empty symbol is rejected by store validation
        store.replace(vec![participant("eve", 1.0, vec![position("", 1.0, 1.0, t0())])]).await;
        tokio::time::advance(Duration::from_secs(601)).await;

        assert!(matches!(svc.snapshot().await, Err(LeaderboardError::StoreRead(_))));

        assert!(Arc::ptr_eq(&svc.last_known().await.unwrap(), &good));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_timeout() {
        let fetcher = Arc::new(RecordingFetcher::new().with_latency(Duration::from_secs(8)));
        let config = PipelineConfig {
            pass_timeout: Duration::from_secs(5),
            ..PipelineConfig::default()
        };
        let svc = LeaderboardService::new(sample_store(), fetcher, config);

        assert_eq!(
            svc.get_leaderboard(ALL).await.unwrap_err(),
            LeaderboardError::Timeout(Duration::from_secs(5))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_store_gives_empty_board() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let svc = service(Arc::new(InMemoryStore::default()), fetcher.clone());

        assert!(svc.get_leaderboard(ALL).await.unwrap().is_empty());
        assert_eq!(fetcher.call_count(), 0);
    }
}
