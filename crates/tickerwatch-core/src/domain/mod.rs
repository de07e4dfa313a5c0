//! # Domain Models
//!
//! Typed shapes of everything the caches hold.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Normalized (trimmed, upper-cased) ticker symbol |
//! | [`HistoryRange`] | History look-back code (`1D` .. `5Y`, open set) |
//! | [`TickerSnapshot`] | Watchlist row: company, market, performance, analyst, metadata |
//! | [`HistorySeries`] | OHLCV points for one `(symbol, range)` |
//! | [`NotificationRecord`] | Feed entry with read flag |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Service payloads are camelCase JSON; every section of a ticker payload
//! except `company.symbol` may be missing or partially null.

mod history;
mod notification;
mod range;
mod snapshot;
mod symbol;
mod timestamp;

pub use history::{HistoryPoint, HistorySeries};
pub use notification::{NotificationKind, NotificationRecord};
pub use range::HistoryRange;
pub use snapshot::{
    AnalystInfo, CompanyInfo, MarketInfo, MarketMetadata, PerformanceInfo, TickerSnapshot,
};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
