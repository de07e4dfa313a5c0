//! Merge of a batch refresh into the watchlist.
//!
//! Each tracked symbol is looked up in the batch and handled by [`decide`]:
//!
//! | Batch entry | Decision |
//! |-------------|----------|
//! | snapshot | [`MergeDecision::Replace`] |
//! | `{error}` marker | [`MergeDecision::RetainFlagged`] |
//! | absent | [`MergeDecision::RetainMissing`] |
//! | any other shape | [`MergeDecision::RetainMalformed`] |
//!
//! Every `Retain*` decision leaves the existing row untouched. Batch entries
//! for symbols that are not tracked are ignored; a refresh never adds rows.

use log::warn;

use crate::quote_service::{BatchEntry, TickerBatch};
use crate::{Symbol, TickerSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Replace,
    RetainFlagged,
    RetainMissing,
    RetainMalformed,
}

impl MergeDecision {
    pub const fn is_replace(self) -> bool {
        matches!(self, Self::Replace)
    }
}

pub fn decide(entry: Option<&BatchEntry>) -> MergeDecision {
    match entry {
        Some(BatchEntry::Snapshot(_)) => MergeDecision::Replace,
        Some(BatchEntry::Error(_)) => MergeDecision::RetainFlagged,
        Some(BatchEntry::Malformed(_)) => MergeDecision::RetainMalformed,
        None => MergeDecision::RetainMissing,
    }
}

/// Which rows a reconciliation replaced and which it kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub replaced: Vec<Symbol>,
    pub retained: Vec<(Symbol, MergeDecision)>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.replaced.is_empty()
    }
}

/// Applies `batch` to `watchlist` in place, preserving row order.
///
/// Replaced rows are re-keyed to the tracked symbol and stamped with
/// `fetched_at_ms`.
pub fn reconcile_watchlist(
    watchlist: &mut [TickerSnapshot],
    batch: &TickerBatch,
    fetched_at_ms: i64,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for row in watchlist.iter_mut() {
        let symbol = row.symbol().clone();
        let entry = batch.get(&symbol);

        match (decide(entry), entry) {
            (MergeDecision::Replace, Some(BatchEntry::Snapshot(snapshot))) => {
                *row = snapshot.clone().stamp(&symbol, fetched_at_ms);
                report.replaced.push(symbol);
            }
            (decision, entry) => {
                match entry {
                    Some(BatchEntry::Error(message)) => {
                        warn!("keeping cached {symbol}: service flagged it ({message})");
                    }
                    Some(BatchEntry::Malformed(detail)) => {
                        warn!("keeping cached {symbol}: unusable batch entry ({detail})");
                    }
                    _ => {}
                }
                report.retained.push((symbol, decision));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompanyInfo, MarketInfo};

    fn snapshot(symbol: &str, price: f64, fetched_at: i64) -> TickerSnapshot {
        TickerSnapshot {
            company: CompanyInfo {
                symbol: Symbol::parse(symbol).expect("valid symbol"),
                name: None,
                sector: None,
                industry: None,
            },
            market: MarketInfo {
                current_price: Some(price),
                ..MarketInfo::default()
            },
            performance: Default::default(),
            analyst: Default::default(),
            metadata: Default::default(),
            client_fetched_at: fetched_at,
        }
    }

    fn batch(entries: Vec<(&str, BatchEntry)>) -> TickerBatch {
        TickerBatch {
            entries: entries
                .into_iter()
                .map(|(symbol, entry)| (Symbol::parse(symbol).expect("valid symbol"), entry))
                .collect(),
        }
    }

    #[test]
    fn decision_table() {
        let row = snapshot("AAPL", 1.0, 0);
        assert_eq!(
            decide(Some(&BatchEntry::Snapshot(row))),
            MergeDecision::Replace
        );
        assert_eq!(
            decide(Some(&BatchEntry::Error(String::from("rate limited")))),
            MergeDecision::RetainFlagged
        );
        assert_eq!(
            decide(Some(&BatchEntry::Malformed(String::from("number")))),
            MergeDecision::RetainMalformed
        );
        assert_eq!(decide(None), MergeDecision::RetainMissing);
    }

    #[test]
    fn error_marker_keeps_row_and_snapshot_replaces_row() {
        let mut watchlist = vec![snapshot("AAPL", 180.0, 1_000), snapshot("MSFT", 300.0, 1_000)];
        let incoming = batch(vec![
            ("AAPL", BatchEntry::Error(String::from("rate limited"))),
            ("MSFT", BatchEntry::Snapshot(snapshot("MSFT", 310.0, 0))),
        ]);

        let report = reconcile_watchlist(&mut watchlist, &incoming, 9_000);

        assert_eq!(watchlist[0], snapshot("AAPL", 180.0, 1_000));
        assert_eq!(watchlist[1].market.current_price, Some(310.0));
        assert_eq!(watchlist[1].client_fetched_at, 9_000);
        assert_eq!(report.replaced, vec![Symbol::parse("MSFT").expect("valid")]);
        assert_eq!(
            report.retained,
            vec![(
                Symbol::parse("AAPL").expect("valid"),
                MergeDecision::RetainFlagged
            )]
        );
    }

    #[test]
    fn untracked_batch_entries_are_ignored() {
        let mut watchlist = vec![snapshot("AAPL", 180.0, 1_000)];
        let incoming = batch(vec![("TSLA", BatchEntry::Snapshot(snapshot("TSLA", 200.0, 0)))]);

        let report = reconcile_watchlist(&mut watchlist, &incoming, 9_000);

        assert_eq!(watchlist.len(), 1);
        assert!(report.is_noop());
        assert_eq!(report.retained[0].1, MergeDecision::RetainMissing);
    }

    #[test]
    fn replacement_is_keyed_by_tracked_symbol() {
        let mut watchlist = vec![snapshot("BRK-B", 400.0, 1_000)];
        let incoming = batch(vec![("BRK-B", BatchEntry::Snapshot(snapshot("brk-b", 410.0, 0)))]);

        reconcile_watchlist(&mut watchlist, &incoming, 2_000);

        assert_eq!(watchlist[0].symbol().as_str(), "BRK-B");
        assert_eq!(watchlist[0].market.current_price, Some(410.0));
    }
}
