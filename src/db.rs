//! # db — PostgreSQL Participant Store
//!
//! Enabled with `--features postgres`; selected at startup when
//! `DATABASE_URL` is set.
//!
//! ## Setup
//! 1. Create a database and set `DATABASE_URL` in `.env`
//! 2. `migrations/001_init.sql` is applied on connect

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use tracing::info;

use crate::error::StoreError;
use crate::models::{Participant, Position};
use crate::store::{validate, ParticipantStore};

// ─── Pool Init ────────────────────────────────────────────────────────────────

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    pool.execute(include_str!("../migrations/001_init.sql"))
        .await
        .context("Failed to run migration 001_init.sql")?;

    info!("✅ PostgreSQL connected and migrations applied");
    Ok(pool)
}

// ─── Rows ─────────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    id:       i64,
    username: String,
    cash:     f64,
}

#[derive(sqlx::FromRow)]
struct PositionRow {
    participant_id: i64,
    symbol:         String,
    quantity:       f64,
    purchase_price: f64,
    purchase_date:  DateTime<Utc>,
}

// ─── Store ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgParticipantStore {
    pool: PgPool,
}

impl PgParticipantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self) -> Result<Vec<Participant>, StoreError> {
        let unreachable = |e: sqlx::Error| StoreError::Unreachable(e.to_string());

        // both reads must see one snapshot; READ COMMITTED would give each its own
        let mut tx = self.pool.begin().await.map_err(unreachable)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(unreachable)?;

        let participants: Vec<ParticipantRow> =
            sqlx::query_as("SELECT id, username, cash FROM participants ORDER BY id")
                .fetch_all(&mut *tx)
                .await
                .map_err(unreachable)?;

        let positions: Vec<PositionRow> = sqlx::query_as(
            r#"
            SELECT participant_id, symbol, quantity, purchase_price, purchase_date
            FROM positions
            ORDER BY participant_id, id
            "#,
        )
        .fetch_all(&mut *tx)
        .await
        .map_err(unreachable)?;

        tx.commit().await.map_err(unreachable)?;

        let mut by_owner: HashMap<i64, Vec<Position>> = HashMap::new();
        for row in positions {
            by_owner.entry(row.participant_id).or_default().push(Position {
                symbol:         row.symbol,
                quantity:       row.quantity,
                purchase_price: row.purchase_price,
                purchase_date:  row.purchase_date,
            });
        }

        let participants: Vec<Participant> = participants
            .into_iter()
            .map(|row| Participant {
                positions: by_owner.remove(&row.id).unwrap_or_default(),
                username:  row.username,
                cash:      row.cash,
            })
            .collect();

        validate(&participants)?;
        Ok(participants)
    }
}

impl ParticipantStore for PgParticipantStore {
    fn participants(&self) -> BoxFuture<'_, Result<Vec<Participant>, StoreError>> {
        self.load().boxed()
    }
}
