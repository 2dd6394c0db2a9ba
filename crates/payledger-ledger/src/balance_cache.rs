//! Memoized per-user balances.
//!
//! The cache is a read optimization over the ledger. Every write path calls
//! [`BalanceCache::invalidate_cache`] after it commits, so the next read
//! recomputes from the ledger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use payledger_types::{BalanceSnapshot, Result, UserId};
use tokio::sync::Mutex;

use crate::LedgerStore;

/// Cached balance lookups backed by a [`LedgerStore`].
#[async_trait]
pub trait BalanceCache: Send + Sync {
    /// The user's balance, served from cache when present.
    async fn get_balance(&self, user: UserId) -> Result<BalanceSnapshot>;

    /// Drop the cached balance so the next read recomputes it.
    async fn invalidate_cache(&self, user: UserId);

    /// Recompute from the ledger, bypassing the cached value, and refresh the
    /// entry. Used for checks that gate money leaving the platform.
    async fn authoritative_balance(&self, user: UserId) -> Result<BalanceSnapshot>;
}

#[derive(Debug, Default)]
struct Slot {
    snapshot: Option<BalanceSnapshot>,
    /// Bumped on every invalidation. A recompute that started before an
    /// invalidation must not overwrite the slot.
    generation: u64,
}

/// Process-local balance cache.
pub struct InMemoryBalanceCache {
    ledger: Arc<dyn LedgerStore>,
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl InMemoryBalanceCache {
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a snapshot for `user` is currently held.
    pub async fn is_cached(&self, user: UserId) -> bool {
        self.slots
            .lock()
            .await
            .get(&user)
            .is_some_and(|slot| slot.snapshot.is_some())
    }

    async fn generation(&self, user: UserId) -> u64 {
        self.slots
            .lock()
            .await
            .get(&user)
            .map_or(0, |slot| slot.generation)
    }

    /// Recompute from the ledger and store the result unless the slot was
    /// invalidated while the recompute was running.
    async fn refresh(&self, user: UserId, generation: u64) -> Result<BalanceSnapshot> {
        let history = self.ledger.transactions_for_user(user).await?;
        let snapshot = BalanceSnapshot::from_transactions(&history);

        let mut slots = self.slots.lock().await;
        let slot = slots.entry(user).or_default();
        if slot.generation == generation {
            slot.snapshot = Some(snapshot);
        } else {
            tracing::trace!(
                user = %user.short(),
                "Balance recomputed across an invalidation; not cached"
            );
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl BalanceCache for InMemoryBalanceCache {
    async fn get_balance(&self, user: UserId) -> Result<BalanceSnapshot> {
        let generation = {
            let slots = self.slots.lock().await;
            match slots.get(&user) {
                Some(Slot {
                    snapshot: Some(snapshot),
                    ..
                }) => return Ok(*snapshot),
                Some(slot) => slot.generation,
                None => 0,
            }
        };
        self.refresh(user, generation).await
    }

    async fn invalidate_cache(&self, user: UserId) {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(user).or_default();
        slot.snapshot = None;
        slot.generation = slot.generation.wrapping_add(1);
    }

    async fn authoritative_balance(&self, user: UserId) -> Result<BalanceSnapshot> {
        let generation = self.generation(user).await;
        self.refresh(user, generation).await
    }
}
