//! # cache
//!
//! **Ranking Cache** — one leaderboard snapshot, fresh for a fixed TTL, with
//! single-flight recomputation.
//!
//! ## State
//!
//! * `slot`      — the last stored snapshot and its expiry. Replaced whole
//!   under a write lock, so readers see either the old `Arc` or the new one.
//! * `in_flight` — the valuation pass currently running, if any, as a
//!   [`Shared`] handle to its task that every concurrent miss awaits.
//!
//! ## Miss handling
//!
//! ```text
//! caller A ─ miss ─▶ lock in_flight ─ empty ─▶ spawn pass ─▶ await ─┐
//! caller B ─ miss ─▶ lock in_flight ─ found ─▶ clone pass ─▶ await ─┤
//!                                                                   ▼
//!            pass task settles: Ok  → put(snapshot), free in_flight
//!                               Err → free in_flight, store nothing
//! ```
//!
//! The pass runs on its own task, so it finishes and settles even when every
//! caller awaiting it has gone away.
//!
//! Expiry is lazy: nothing is evicted, [`RankingCache::get`] simply stops
//! returning a snapshot once its deadline has passed.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::LeaderboardError;
use crate::models::LeaderboardSnapshot;

pub type PassResult = Result<Arc<LeaderboardSnapshot>, LeaderboardError>;

type PassFuture = Shared<BoxFuture<'static, PassResult>>;

#[derive(Debug)]
struct Stored {
    snapshot:   Arc<LeaderboardSnapshot>,
    expires_at: Instant,
}

/// Everything a pass task needs to settle after its callers are gone.
struct Slots {
    ttl:       Duration,
    slot:      RwLock<Option<Stored>>,
    in_flight: Mutex<Option<PassFuture>>,
}

impl Slots {
    async fn fresh(&self) -> Option<Arc<LeaderboardSnapshot>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|stored| Instant::now() < stored.expires_at)
            .map(|stored| Arc::clone(&stored.snapshot))
    }

    async fn store(&self, snapshot: Arc<LeaderboardSnapshot>) {
        let mut slot = self.slot.write().await;
        *slot = Some(Stored { snapshot, expires_at: Instant::now() + self.ttl });
    }

    /// Store a finished pass's snapshot and free the in-flight slot.
    async fn settle(&self, result: &PassResult) {
        let mut in_flight = self.in_flight.lock().await;
        if let Ok(snapshot) = result {
            self.store(Arc::clone(snapshot)).await;
        }
        *in_flight = None;
    }
}

pub struct RankingCache {
    slots: Arc<Slots>,
}

impl RankingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::new(Slots {
                ttl,
                slot:      RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// The stored snapshot if it has not expired yet.
    pub async fn get(&self) -> Option<Arc<LeaderboardSnapshot>> {
        self.slots.fresh().await
    }

    /// The most recently stored snapshot, expired or not.
    pub async fn last_known(&self) -> Option<Arc<LeaderboardSnapshot>> {
        let slot = self.slots.slot.read().await;
        slot.as_ref().map(|stored| Arc::clone(&stored.snapshot))
    }

    /// Replace the stored snapshot; it expires `ttl` from now.
    pub async fn put(&self, snapshot: Arc<LeaderboardSnapshot>) {
        self.slots.store(snapshot).await;
    }

    /// Return the fresh snapshot, or run `compute` once for all concurrent
    /// callers and cache its successful result.
    ///
    /// `compute` is only invoked by the caller that finds no pass in flight.
    /// Its future is spawned, so dropping every caller does not stall it.
    pub async fn get_or_compute<F, Fut>(&self, compute: F) -> PassResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PassResult> + Send + 'static,
    {
        if let Some(snapshot) = self.get().await {
            return Ok(snapshot);
        }

        let pass = {
            let mut in_flight = self.slots.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(pass) => {
                    debug!("Joining valuation pass already in flight");
                    pass.clone()
                }
                None => {
                    // a pass may have settled between the first check and the lock
                    if let Some(snapshot) = self.slots.fresh().await {
                        return Ok(snapshot);
                    }
                    // settle() waits on the in_flight lock held here, so the
                    // pass is installed before it can be cleared
                    let pass = spawn_pass(Arc::clone(&self.slots), compute());
                    *in_flight = Some(pass.clone());
                    pass
                }
            }
        };

        pass.await
    }
}

fn spawn_pass<Fut>(slots: Arc<Slots>, pass: Fut) -> PassFuture
where
    Fut: Future<Output = PassResult> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let result = match AssertUnwindSafe(pass).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Valuation pass panicked");
                Err(LeaderboardError::Internal("valuation pass panicked".into()))
            }
        };
        slots.settle(&result).await;
        result
    });

    task.map(|joined| {
        joined.unwrap_or_else(|e| Err(LeaderboardError::Internal(format!("valuation pass task failed: {e}"))))
    })
    .boxed()
    .shared()
}
