//! # config — read configuration from environment variables
//!
//! `.env` is loaded by `main` through `dotenvy` before [`Config::from_env`]
//! runs, so either source works.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

/// Default freshness window of a cached leaderboard.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
/// Symbols per provider batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Pause between provider batches.
pub const DEFAULT_BATCH_DELAY_MS: u64 = 55;
/// Starting cash every participant began the competition with.
pub const DEFAULT_BASELINE_CASH: f64 = 100_000.0;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PASS_TIMEOUT_SECS: u64 = 60;

/// Where participants are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreSource {
    /// Nothing configured — an empty in-memory store.
    InMemory,
    /// JSON array of participants, re-read every pass.
    JsonFile(PathBuf),
    /// PostgreSQL connection string (requires the `postgres` feature).
    Postgres(String),
}

// ─── BatchConfig ──────────────────────────────────────────────────────────────

/// Pacing parameters for provider lookups.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Symbols fetched concurrently per batch. Never zero.
    pub batch_size:    usize,
    /// Pause after every batch except the last.
    pub batch_delay:   Duration,
    /// Upper bound for a single symbol lookup.
    pub fetch_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size:    DEFAULT_BATCH_SIZE,
            batch_delay:   Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

// ─── PipelineConfig ───────────────────────────────────────────────────────────

/// Everything a [`LeaderboardService`](crate::service::LeaderboardService)
/// needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache_ttl:     Duration,
    pub batch:         BatchConfig,
    pub baseline_cash: f64,
    /// Upper bound for one whole valuation pass.
    pub pass_timeout:  Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl:     Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            batch:         BatchConfig::default(),
            baseline_cash: DEFAULT_BASELINE_CASH,
            pass_timeout:  Duration::from_secs(DEFAULT_PASS_TIMEOUT_SECS),
        }
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr:      SocketAddr,
    pub pipeline:       PipelineConfig,
    /// Quote provider base URL, or `"mock"` for generated prices.
    pub quote_base_url: String,
    pub store:          StoreSource,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr: SocketAddr = parse_or(&lookup, "BIND_ADDR", "0.0.0.0:3000".parse()?)?;

        let batch_size: usize = parse_or(&lookup, "LEADERBOARD_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            bail!("LEADERBOARD_BATCH_SIZE must be at least 1");
        }

        let baseline_cash: f64 = parse_or(&lookup, "LEADERBOARD_BASELINE_CASH", DEFAULT_BASELINE_CASH)?;
        if !baseline_cash.is_finite() {
            bail!("LEADERBOARD_BASELINE_CASH must be a finite number");
        }

        let pipeline = PipelineConfig {
            cache_ttl: Duration::from_secs(parse_or(
                &lookup, "STOTRA_LEADERBOARD_CACHE_TTL", DEFAULT_CACHE_TTL_SECS,
            )?),
            batch: BatchConfig {
                batch_size,
                batch_delay: Duration::from_millis(parse_or(
                    &lookup, "LEADERBOARD_BATCH_DELAY_MS", DEFAULT_BATCH_DELAY_MS,
                )?),
                fetch_timeout: Duration::from_secs(parse_or(
                    &lookup, "LEADERBOARD_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS,
                )?),
            },
            baseline_cash,
            pass_timeout: Duration::from_secs(parse_or(
                &lookup, "LEADERBOARD_PASS_TIMEOUT_SECS", DEFAULT_PASS_TIMEOUT_SECS,
            )?),
        };

        let store = match (non_empty(&lookup, "DATABASE_URL"), non_empty(&lookup, "PARTICIPANTS_FILE")) {
            (Some(url), _)     => StoreSource::Postgres(url),
            (None, Some(path)) => StoreSource::JsonFile(PathBuf::from(path)),
            (None, None)       => StoreSource::InMemory,
        };

        Ok(Self {
            bind_addr,
            pipeline,
            quote_base_url: non_empty(&lookup, "QUOTE_BASE_URL").unwrap_or_else(|| "mock".to_string()),
            store,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Missing or blank → `default`; present but unparseable → error.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} is not valid: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.pipeline.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.pipeline.batch.batch_size, 100);
        assert_eq!(config.pipeline.batch.batch_delay, Duration::from_millis(55));
        assert_eq!(config.pipeline.baseline_cash, 100_000.0);
        assert_eq!(config.quote_base_url, "mock");
        assert_eq!(config.store, StoreSource::InMemory);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("STOTRA_LEADERBOARD_CACHE_TTL", "30"),
            ("LEADERBOARD_BATCH_SIZE", "25"),
            ("LEADERBOARD_BATCH_DELAY_MS", "200"),
            ("LEADERBOARD_BASELINE_CASH", "10000"),
            ("QUOTE_BASE_URL", "http://quotes.local"),
            ("PARTICIPANTS_FILE", "data/users.json"),
        ])
        .unwrap();
        assert_eq!(config.pipeline.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.pipeline.batch.batch_size, 25);
        assert_eq!(config.pipeline.batch.batch_delay, Duration::from_millis(200));
        assert_eq!(config.pipeline.baseline_cash, 10_000.0);
        assert_eq!(config.quote_base_url, "http://quotes.local");
        assert_eq!(config.store, StoreSource::JsonFile(PathBuf::from("data/users.json")));
    }

    #[test]
    fn test_database_url_wins_over_file() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/stotra"),
            ("PARTICIPANTS_FILE", "data/users.json"),
        ])
        .unwrap();
        assert_eq!(config.store, StoreSource::Postgres("postgres://localhost/stotra".into()));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        assert!(config_from(&[("LEADERBOARD_BATCH_SIZE", "0")]).is_err());
    }

    #[test]
    fn test_rejects_unparseable_ttl() {
        let err = config_from(&[("STOTRA_LEADERBOARD_CACHE_TTL", "ten minutes")]).unwrap_err();
        assert!(err.to_string().contains("STOTRA_LEADERBOARD_CACHE_TTL"));
    }

    #[test]
    fn test_blank_value_takes_default() {
        let config = config_from(&[("LEADERBOARD_BATCH_SIZE", "  ")]).unwrap();
        assert_eq!(config.pipeline.batch.batch_size, 100);
    }
}
