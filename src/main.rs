//! # Stotra Leaderboard — Competition Ranking Backend
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐  GET /api/user/leaderboard   ┌──────────────────────────┐
//!  │  Dashboard   │ ────────────────────────────▶│ LeaderboardService       │
//!  └──────────────┘                              │ ├─ RankingCache (TTL)    │
//!                                                │ ├─ ParticipantStore ◀────┼── JSON file / PostgreSQL
//!                                                │ └─ PriceFetcher ─────────┼──▶ quote provider
//!                                                └──────────────────────────┘    (paced batches)
//! ```
//!
//! ## Environment Variables
//!
//! | Variable                         | Default        | Description                         |
//! |----------------------------------|----------------|-------------------------------------|
//! | `BIND_ADDR`                      | `0.0.0.0:3000` | Address Axum listens on             |
//! | `STOTRA_LEADERBOARD_CACHE_TTL`   | `600`          | Snapshot freshness (seconds)        |
//! | `LEADERBOARD_BATCH_SIZE`         | `100`          | Symbols per provider batch          |
//! | `LEADERBOARD_BATCH_DELAY_MS`     | `55`           | Pause between batches               |
//! | `LEADERBOARD_BASELINE_CASH`      | `100000`       | Starting cash per participant       |
//! | `LEADERBOARD_FETCH_TIMEOUT_SECS` | `10`           | Per-symbol lookup timeout           |
//! | `LEADERBOARD_PASS_TIMEOUT_SECS`  | `60`           | Whole valuation pass timeout        |
//! | `QUOTE_BASE_URL`                 | `mock`         | Quote provider, or `mock`           |
//! | `PARTICIPANTS_FILE`              | —              | JSON participant store              |
//! | `DATABASE_URL`                   | —              | PostgreSQL store (`postgres` feature) |
//! | `RUST_LOG`                       | —              | Extra tracing directives            |

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cache;
mod config;
#[cfg(feature = "postgres")]
mod db;
mod engine;
mod error;
mod models;
mod pricing;
mod routes;
mod service;
mod state;
mod store;
#[cfg(test)]
mod testing;

use config::{Config, StoreSource};
use pricing::{HttpPriceFetcher, MockPriceFetcher, PriceFetcher};
use routes::build_router;
use service::LeaderboardService;
use state::build_state;
use store::{InMemoryStore, JsonFileStore, ParticipantStore};

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional — CI/prod can use real env vars) ──────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("leaderboard=debug".parse()?)
                .add_directive("tower_http=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════╗
  ║        STOTRA — Leaderboard Backend           ║
  ║   Collect · Batch · Value · Rank · Cache      ║
  ╚═══════════════════════════════════════════════╝"#);

    // ── 3. Config ─────────────────────────────────────────────────────────────
    let config = Config::from_env().context("Failed to load config")?;

    info!(
        ttl_secs      = config.pipeline.cache_ttl.as_secs(),
        batch_size    = config.pipeline.batch.batch_size,
        batch_delay   = ?config.pipeline.batch.batch_delay,
        baseline_cash = config.pipeline.baseline_cash,
        quotes        = %config.quote_base_url,
        "Leaderboard configured"
    );

    // ── 4. Collaborators ──────────────────────────────────────────────────────
    let store = build_store(&config.store).await?;
    let fetcher = build_fetcher(&config)?;

    // ── 5. Shared state & router ──────────────────────────────────────────────
    let service = LeaderboardService::new(store, fetcher, config.pipeline.clone());
    let app = build_router(build_state(service));

    // ── 6. Bind & Serve ───────────────────────────────────────────────────────
    info!(addr = ?config.bind_addr, "🚀 Leaderboard server starting");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(source: &StoreSource) -> anyhow::Result<Arc<dyn ParticipantStore>> {
    match source {
        StoreSource::InMemory => {
            warn!("No PARTICIPANTS_FILE or DATABASE_URL — serving an empty leaderboard");
            Ok(Arc::new(InMemoryStore::default()))
        }
        StoreSource::JsonFile(path) => {
            info!(path = %path.display(), "Using JSON participant store");
            Ok(Arc::new(JsonFileStore::new(path.clone())))
        }
        #[cfg(feature = "postgres")]
        StoreSource::Postgres(url) => {
            let pool = db::init_pool(url).await?;
            Ok(Arc::new(db::PgParticipantStore::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        StoreSource::Postgres(_) => {
            anyhow::bail!("DATABASE_URL is set but this build lacks the `postgres` feature")
        }
    }
}

fn build_fetcher(config: &Config) -> anyhow::Result<Arc<dyn PriceFetcher>> {
    if config.quote_base_url == "mock" {
        warn!("QUOTE_BASE_URL=mock — using generated prices");
        return Ok(Arc::new(MockPriceFetcher));
    }

    let client = reqwest::Client::builder()
        .timeout(config.pipeline.batch.fetch_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    Ok(Arc::new(HttpPriceFetcher::new(client, config.quote_base_url.clone())))
}
