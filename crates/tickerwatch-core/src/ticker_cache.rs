//! Watchlist cache: single-symbol fetches, eviction and batch refresh.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::cache::ExpiryPolicy;
use crate::clock::Clock;
use crate::finance::{begin_request, finish_request, FinanceState};
use crate::inflight::InFlight;
use crate::quote_service::QuoteService;
use crate::reconcile::{reconcile_watchlist, ReconcileReport};
use crate::store::Store;
use crate::{FetchError, Symbol, TickerSnapshot};

/// Owns the watchlist half of the `finance` store.
#[derive(Clone)]
pub struct TickerCacheManager {
    store: Store<FinanceState>,
    service: Arc<dyn QuoteService>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
    single: InFlight<Symbol, ()>,
    batch: InFlight<Vec<Symbol>, ()>,
}

impl TickerCacheManager {
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
            single: InFlight::new(),
            batch: InFlight::new(),
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Makes sure `symbol` is on the watchlist with a fresh snapshot.
    ///
    /// A fresh row is served as is, with no request. Otherwise the symbol is
    /// fetched and its row inserted (appended) or replaced in place. On
    /// failure the watchlist is left untouched.
    pub async fn ensure_tracked(&self, symbol: &str) -> Result<(), FetchError> {
        let symbol = Symbol::parse(symbol)?;
        let now = self.clock.now_ms();

        let fresh = self.store.read(|state| {
            state
                .ticker(&symbol)
                .is_some_and(|row| self.policy.is_fresh(row, now))
        });
        if fresh {
            debug!("cache hit (fresh) for {symbol}");
            return Ok(());
        }

        let store = self.store.clone();
        let service = Arc::clone(&self.service);
        let clock = Arc::clone(&self.clock);
        let key = symbol.clone();

        self.single
            .run(symbol, move || async move {
                begin_request(&store);
                let result = service.ticker(&key).await;

                match result {
                    Ok(snapshot) => {
                        let row = snapshot.stamp(&key, clock.now_ms());
                        store.mutate(|state| upsert(&mut state.tickers, row));
                        info!("fetched snapshot for {key}");
                        finish_request(&store, None);
                        Ok(())
                    }
                    Err(error) => {
                        warn!("failed to fetch snapshot for {key}: {error}");
                        finish_request(&store, Some(&error));
                        Err(error)
                    }
                }
            })
            .await
    }

    /// Drops `symbol` from the watchlist. Absent or unparseable symbols are a no-op.
    pub fn remove(&self, symbol: &str) {
        let Ok(symbol) = Symbol::parse(symbol) else {
            debug!("ignoring removal of invalid symbol {symbol:?}");
            return;
        };

        self.store.mutate(|state| {
            let before = state.tickers.len();
            state.tickers.retain(|row| row.symbol() != &symbol);
            state.tickers.len() != before
        });
    }

    /// Refreshes every expired row with one batch request.
    ///
    /// Nothing is requested when the watchlist is empty or every row is fresh.
    /// Concurrent refreshes share a batch only when they found the same
    /// expired set; a caller that sees more expired rows issues its own.
    /// Per-symbol failures keep the cached row; only a failure of the whole
    /// request is returned, and then the watchlist is left untouched.
    pub async fn refresh_all(&self) -> Result<(), FetchError> {
        let now = self.clock.now_ms();
        let expired: Vec<Symbol> = self.store.read(|state| {
            state
                .tickers
                .iter()
                .filter(|row| self.policy.is_expired(*row, now))
                .map(|row| row.symbol().clone())
                .collect()
        });

        if expired.is_empty() {
            debug!("refresh skipped: no expired snapshots");
            return Ok(());
        }

        let mut key = expired.clone();
        key.sort();

        let store = self.store.clone();
        let service = Arc::clone(&self.service);
        let clock = Arc::clone(&self.clock);

        self.batch
            .run(key, move || async move {
                begin_request(&store);
                let result = service.tickers(&expired).await;

                match result {
                    Ok(batch) => {
                        let fetched_at = clock.now_ms();
                        let mut report = ReconcileReport::default();
                        store.mutate(|state| {
                            report = reconcile_watchlist(&mut state.tickers, &batch, fetched_at);
                            !report.is_noop()
                        });
                        info!(
                            "refreshed {} of {} expired snapshots, {} retained",
                            report.replaced.len(),
                            expired.len(),
                            report.retained.len()
                        );
                        finish_request(&store, None);
                        Ok(())
                    }
                    Err(error) => {
                        warn!("batch refresh of {} symbols failed: {error}", expired.len());
                        finish_request(&store, Some(&error));
                        Err(error)
                    }
                }
            })
            .await
    }

    /// Watchlist in display order.
    pub fn watchlist(&self) -> Vec<TickerSnapshot> {
        self.store.read(|state| state.tickers.clone())
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.store
            .read(|state| state.tickers.iter().map(|row| row.symbol().clone()).collect())
    }

    pub fn get(&self, symbol: &str) -> Option<TickerSnapshot> {
        let symbol = Symbol::parse(symbol).ok()?;
        self.store.read(|state| state.ticker(&symbol).cloned())
    }

    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    /// Whether the row for `symbol` is present and past its TTL.
    pub fn is_stale(&self, symbol: &str) -> bool {
        let now = self.clock.now_ms();
        self.get(symbol)
            .is_some_and(|row| self.policy.is_expired(&row, now))
    }

    pub fn subscribe(&self) -> watch::Receiver<FinanceState> {
        self.store.subscribe()
    }
}

/// Replaces the row for `row`'s symbol in place, or appends it.
fn upsert(tickers: &mut Vec<TickerSnapshot>, row: TickerSnapshot) -> bool {
    match tickers
        .iter_mut()
        .find(|existing| existing.symbol() == row.symbol())
    {
        Some(existing) => *existing = row,
        None => tickers.push(row),
    }
    true
}
