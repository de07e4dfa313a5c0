//! Price history cache keyed by `(symbol, range)`.
//!
//! Each cell expires on its own; fetching one range never touches another
//! range of the same symbol, another symbol, or the watchlist.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::cache::{CachedValue, ExpiryPolicy};
use crate::clock::Clock;
use crate::finance::{begin_request, finish_request, FinanceState};
use crate::inflight::InFlight;
use crate::quote_service::QuoteService;
use crate::store::Store;
use crate::{FetchError, HistoryRange, HistorySeries, Symbol};

#[derive(Clone)]
pub struct HistoryCacheManager {
    store: Store<FinanceState>,
    service: Arc<dyn QuoteService>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    inflight: InFlight<(Symbol, HistoryRange), ()>,
}

impl HistoryCacheManager {
    pub(crate) fn new(
        store: Store<FinanceState>,
        service: Arc<dyn QuoteService>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            store,
            service,
            clock,
            policy,
            inflight: InFlight::new(),
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Makes sure the `(symbol, range)` cell holds a fresh series.
    ///
    /// On failure the cell keeps whatever it held before, stale or absent.
    pub async fn get_history(&self, symbol: &str, range: &str) -> Result<(), FetchError> {
        let symbol = Symbol::parse(symbol)?;
        let range: HistoryRange = range.parse()?;
        let now = self.clock.now_ms();

        let fresh = self.store.read(|state| {
            state
                .history_entry(&symbol, &range)
                .is_some_and(|entry| self.policy.is_fresh(entry, now))
        });
        if fresh {
            debug!("cache hit (fresh) for {symbol} {range}");
            return Ok(());
        }

        let store = self.store.clone();
        let service = Arc::clone(&self.service);
        let clock = Arc::clone(&self.clock);
        let key = (symbol.clone(), range.clone());

        self.inflight
            .run(key, move || async move {
                begin_request(&store);
                let result = service.history(&symbol, &range).await;

                match result {
                    Ok(series) => {
                        let points = series.points.len();
                        let entry = CachedValue::new(series, clock.now_ms());
                        store.mutate(|state| {
                            state
                                .history
                                .entry(symbol.clone())
                                .or_default()
                                .insert(range.clone(), entry);
                            true
                        });
                        info!("fetched {range} history for {symbol} ({points} points)");
                        finish_request(&store, None);
                        Ok(())
                    }
                    Err(error) => {
                        warn!("failed to fetch {range} history for {symbol}: {error}");
                        finish_request(&store, Some(&error));
                        Err(error)
                    }
                }
            })
            .await
    }

    /// Drops every cached range of `symbol`.
    pub fn remove_history(&self, symbol: &str) {
        let Ok(symbol) = Symbol::parse(symbol) else {
            debug!("ignoring history removal of invalid symbol {symbol:?}");
            return;
        };

        self.store
            .mutate(|state| state.history.remove(&symbol).is_some());
    }

    /// Cached cell for `(symbol, range)`, fresh or stale.
    pub fn series(&self, symbol: &str, range: &str) -> Option<CachedValue<HistorySeries>> {
        let symbol = Symbol::parse(symbol).ok()?;
        let range: HistoryRange = range.parse().ok()?;
        self.store
            .read(|state| state.history_entry(&symbol, &range).cloned())
    }

    /// Ranges currently cached for `symbol`, in sorted order.
    pub fn ranges(&self, symbol: &str) -> Vec<HistoryRange> {
        let Ok(symbol) = Symbol::parse(symbol) else {
            return Vec::new();
        };
        self.store.read(|state| {
            state
                .history
                .get(&symbol)
                .map(|ranges| ranges.keys().cloned().collect())
                .unwrap_or_default()
        })
    }

    pub fn is_stale(&self, symbol: &str, range: &str) -> bool {
        let now = self.clock.now_ms();
        self.series(symbol, range)
            .is_some_and(|entry| self.policy.is_expired(&entry, now))
    }
}
