//! The `finance` store: watchlist plus history cache, and the two managers
//! that operate on it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::cache::CachedValue;
use crate::clock::Clock;
use crate::config::{CacheConfig, FINANCE_STORE};
use crate::history_cache::HistoryCacheManager;
use crate::persistence::KeyValueStore;
use crate::quote_service::QuoteService;
use crate::store::{PersistedState, Store};
use crate::ticker_cache::TickerCacheManager;
use crate::{FetchError, HistoryRange, HistorySeries, StorageError, Symbol, TickerSnapshot};

/// symbol -> range -> series. Cells are independent of each other.
pub type HistoryCache = BTreeMap<Symbol, BTreeMap<HistoryRange, CachedValue<HistorySeries>>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinanceState {
    /// Watchlist in display order, at most one row per symbol.
    pub tickers: Vec<TickerSnapshot>,
    pub history: HistoryCache,
    /// Fetches currently running. Volatile.
    pub pending: usize,
    /// Message of the last failed fetch. Volatile.
    pub error: Option<String>,
}

impl FinanceState {
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    pub fn ticker(&self, symbol: &Symbol) -> Option<&TickerSnapshot> {
        self.tickers.iter().find(|row| row.symbol() == symbol)
    }

    pub fn history_entry(
        &self,
        symbol: &Symbol,
        range: &HistoryRange,
    ) -> Option<&CachedValue<HistorySeries>> {
        self.history.get(symbol).and_then(|ranges| ranges.get(range))
    }
}

/// Durable part of [`FinanceState`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceProjection {
    #[serde(default)]
    pub tickers: Vec<TickerSnapshot>,
    #[serde(default)]
    pub history: HistoryCache,
}

impl PersistedState for FinanceState {
    type Projection = FinanceProjection;

    fn project(&self) -> FinanceProjection {
        FinanceProjection {
            tickers: self.tickers.clone(),
            history: self.history.clone(),
        }
    }

    fn restore(&mut self, projection: FinanceProjection) {
        self.tickers = projection.tickers;
        self.history = projection.history;
    }
}

/// Marks a fetch as started: bumps the loading counter and clears the last error.
pub(crate) fn begin_request(store: &Store<FinanceState>) {
    store.mutate_volatile(|state| {
        state.pending += 1;
        state.error = None;
        true
    });
}

pub(crate) fn finish_request(store: &Store<FinanceState>, failure: Option<&FetchError>) {
    store.mutate_volatile(|state| {
        state.pending = state.pending.saturating_sub(1);
        if let Some(error) = failure {
            state.error = Some(error.message().to_owned());
        }
        true
    });
}

/// Handle to the `finance` store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct FinanceStore {
    store: Store<FinanceState>,
    tickers: TickerCacheManager,
    history: HistoryCacheManager,
}

impl FinanceStore {
    /// Opens the store and starts rehydrating it from `backend`.
    pub fn open(
        service: Arc<dyn QuoteService>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
        backend: Arc<dyn KeyValueStore>,
    ) -> Self {
        let store = Store::open(FINANCE_STORE, FinanceState::default(), backend);
        let tickers = TickerCacheManager::new(
            store.clone(),
            Arc::clone(&service),
            Arc::clone(&clock),
            config.snapshot_policy(),
        );
        let history = HistoryCacheManager::new(store.clone(), service, clock, config.history_policy());

        Self {
            store,
            tickers,
            history,
        }
    }

    pub fn tickers(&self) -> &TickerCacheManager {
        &self.tickers
    }

    pub fn history(&self) -> &HistoryCacheManager {
        &self.history
    }

    /// Drops a symbol from the watchlist together with all of its history.
    pub fn untrack(&self, symbol: &str) {
        self.tickers.remove(symbol);
        self.history.remove_history(symbol);
    }

    pub fn state(&self) -> FinanceState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FinanceState> {
        self.store.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.store.read(FinanceState::is_loading)
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|state| state.error.clone())
    }

    pub fn clear_error(&self) {
        self.store.mutate_volatile(|state| state.error.take().is_some());
    }

    pub fn is_hydrated(&self) -> bool {
        self.store.is_hydrated()
    }

    pub async fn wait_ready(&self) {
        self.store.wait_ready().await;
    }

    /// Waits for scheduled persistence writes; see [`Store::flush`].
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.store.flush().await
    }
}
