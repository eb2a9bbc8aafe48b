//! Process-local memo of ledger state.
//!
//! The ledger is the source of truth; everything here only saves redundant
//! reads. Entries are written exclusively from synchronous ledger answers,
//! never from a queued request, so a cached value may be stale but is
//! never invented.
//!
//! A [`WalletStore`] is an ordinary value. Clients that should share what
//! they have learned hold the same `Arc<WalletStore>`; tests build their
//! own.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::PlayerId;
use crate::transport::TransportResult;

/// Shape of the balance cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheScope {
    /// One entry per player; entries survive switching the active player.
    #[default]
    PerIdentity,
    /// At most one entry; switching the active player clears it.
    SingleSlot,
}

/// Last known balance per player.
#[derive(Debug, Default)]
pub struct BalanceCache {
    scope: CacheScope,
    entries: Mutex<HashMap<PlayerId, Decimal>>,
}

impl BalanceCache {
    pub fn new(scope: CacheScope) -> Self {
        Self {
            scope,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    /// Returns `true` when a balance read must go to the ledger.
    pub fn should_refresh(&self, identity: &PlayerId, force_fresh: bool) -> bool {
        force_fresh || !lock(&self.entries).contains_key(identity)
    }

    pub fn read(&self, identity: &PlayerId) -> Option<Decimal> {
        lock(&self.entries).get(identity).copied()
    }

    pub fn write(&self, identity: &PlayerId, balance: Decimal) {
        let mut entries = lock(&self.entries);
        if self.scope == CacheScope::SingleSlot {
            entries.clear();
        }
        entries.insert(identity.clone(), balance);
    }

    /// Records the balance carried by a synchronous result.
    ///
    /// An accepted (queued) result leaves the cache untouched and yields
    /// `None`.
    pub fn apply(&self, identity: &PlayerId, result: &TransportResult) -> Option<Decimal> {
        let balance = result.as_synchronous()?.balance?;
        self.write(identity, balance);
        Some(balance)
    }

    pub fn invalidate(&self, identity: &PlayerId) {
        lock(&self.entries).remove(identity);
    }

    /// Forgets every balance.
    pub fn invalidate_all(&self) {
        lock(&self.entries).clear();
        debug!("balance cache cleared");
    }

    /// Applies the cache's rule for a change of active player.
    ///
    /// Per-identity caches keep their entries; a single-slot cache drops
    /// the previous player's balance.
    pub fn invalidate_on_identity_switch(&self, previous: Option<&PlayerId>, next: &PlayerId) {
        let Some(previous) = previous else {
            return;
        };
        if self.scope == CacheScope::SingleSlot && previous != next {
            self.invalidate(previous);
            debug!(previous = %previous, next = %next, "dropped balance of previous player");
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All mutable state a client shares across calls: balances, wallets this
/// process has created, and the aggregate balance memo.
#[derive(Debug, Default)]
pub struct WalletStore {
    balances: BalanceCache,
    created_wallets: Mutex<HashSet<PlayerId>>,
    sum_of_balances: Mutex<Option<Decimal>>,
}

impl WalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(scope: CacheScope) -> Self {
        Self {
            balances: BalanceCache::new(scope),
            ..Self::default()
        }
    }

    pub fn balances(&self) -> &BalanceCache {
        &self.balances
    }

    pub fn has_created_wallet(&self, identity: &PlayerId) -> bool {
        lock(&self.created_wallets).contains(identity)
    }

    pub fn mark_wallet_created(&self, identity: &PlayerId) {
        lock(&self.created_wallets).insert(identity.clone());
    }

    pub fn sum_of_balances(&self) -> Option<Decimal> {
        *lock(&self.sum_of_balances)
    }

    pub fn set_sum_of_balances(&self, sum: Decimal) {
        *lock(&self.sum_of_balances) = Some(sum);
    }

    /// Records the outcome of a money movement for `identity`.
    ///
    /// A queued result changes nothing. A synchronous one retires the
    /// aggregate memo; if it carries no balance, the player's cached
    /// balance is dropped as well since the ledger has moved past it.
    pub fn record_mutation(&self, identity: &PlayerId, result: &TransportResult) -> Option<Decimal> {
        if result.is_accepted() {
            return None;
        }
        *lock(&self.sum_of_balances) = None;

        let balance = self.balances.apply(identity, result);
        if balance.is_none() {
            self.balances.invalidate(identity);
            debug!(player_id = %identity, "confirmed mutation without balance, cache entry dropped");
        }
        balance
    }

    /// Forgets every balance and the aggregate memo.
    pub fn invalidate_balances(&self) {
        self.balances.invalidate_all();
        *lock(&self.sum_of_balances) = None;
    }
}

/// Locks `mutex`, recovering the guard if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
