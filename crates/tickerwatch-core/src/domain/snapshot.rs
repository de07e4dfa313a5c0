use serde::{Deserialize, Serialize};

use crate::cache::Fetched;
use crate::Symbol;

/// Company identity block of a ticker payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub symbol: Symbol,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// Price and size figures of a ticker payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub fifty_two_week_range: Option<String>,
}

impl MarketInfo {
    /// Absolute move against the previous close.
    pub fn change(&self) -> Option<f64> {
        Some(self.current_price? - self.previous_close?)
    }

    /// Relative move against the previous close, in percent.
    pub fn change_percent(&self) -> Option<f64> {
        let previous = self.previous_close?;
        if previous == 0.0 {
            return None;
        }
        Some(self.change()? * 100.0 / previous)
    }

    pub fn is_up(&self) -> bool {
        self.change().map(|change| change >= 0.0).unwrap_or(false)
    }

    /// Price to show in a watchlist row: the live price when the market
    /// reported one, the previous close otherwise.
    pub fn display_price(&self) -> Option<f64> {
        self.current_price
            .filter(|price| price.is_finite())
            .or(self.previous_close.filter(|price| price.is_finite()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInfo {
    #[serde(default, rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    #[serde(default, rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub earnings_growth: Option<f64>,
    #[serde(default)]
    pub revenue_growth: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystInfo {
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub target_mean_price: Option<f64>,
}

/// Server-side bookkeeping attached to a payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMetadata {
    #[serde(default)]
    pub cached_at: Option<String>,
    #[serde(default)]
    pub last_trade_at: Option<String>,
    #[serde(default)]
    pub market_state: Option<String>,
}

/// One watchlist row: the service payload plus the client fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSnapshot {
    pub company: CompanyInfo,
    #[serde(default)]
    pub market: MarketInfo,
    #[serde(default)]
    pub performance: PerformanceInfo,
    #[serde(default)]
    pub analyst: AnalystInfo,
    #[serde(default)]
    pub metadata: MarketMetadata,
    /// Wall-clock time (epoch ms) of the fetch that produced this payload.
    #[serde(default, alias = "clientCachedAt")]
    pub client_fetched_at: i64,
}

impl TickerSnapshot {
    pub fn symbol(&self) -> &Symbol {
        &self.company.symbol
    }

    /// Stamps a freshly fetched payload: keys it by the requested symbol and
    /// records the fetch time.
    pub(crate) fn stamp(mut self, requested: &Symbol, fetched_at_ms: i64) -> Self {
        self.company.symbol = requested.clone();
        self.client_fetched_at = fetched_at_ms;
        self
    }
}

impl Fetched for TickerSnapshot {
    fn fetched_at_ms(&self) -> i64 {
        self.client_fetched_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(current: Option<f64>, previous: Option<f64>) -> MarketInfo {
        MarketInfo {
            current_price: current,
            previous_close: previous,
            ..MarketInfo::default()
        }
    }

    #[test]
    fn computes_change_against_previous_close() {
        let info = market(Some(110.0), Some(100.0));
        assert_eq!(info.change(), Some(10.0));
        assert_eq!(info.change_percent(), Some(10.0));
        assert!(info.is_up());

        let down = market(Some(90.0), Some(100.0));
        assert!(!down.is_up());
    }

    #[test]
    fn change_percent_is_undefined_without_previous_close() {
        assert_eq!(market(Some(1.0), None).change_percent(), None);
        assert_eq!(market(Some(1.0), Some(0.0)).change_percent(), None);
    }

    #[test]
    fn display_price_falls_back_to_previous_close() {
        assert_eq!(market(Some(5.0), Some(4.0)).display_price(), Some(5.0));
        assert_eq!(market(None, Some(4.0)).display_price(), Some(4.0));
        assert_eq!(market(Some(f64::NAN), Some(4.0)).display_price(), Some(4.0));
        assert_eq!(market(None, None).display_price(), None);
    }

    #[test]
    fn deserializes_service_payload_with_sparse_sections() {
        let payload = r#"{
            "company": {"symbol": "aapl", "name": "Apple Inc.", "sector": null},
            "market": {"currentPrice": 189.5, "previousClose": 187.0, "marketCap": 2.9e12, "fiftyTwoWeekRange": "164.08 - 199.62"},
            "performance": {"trailingPE": 29.4, "forwardPE": 26.1},
            "metadata": {"marketState": "REGULAR"}
        }"#;

        let snapshot: TickerSnapshot = serde_json::from_str(payload).expect("payload parses");
        assert_eq!(snapshot.symbol().as_str(), "AAPL");
        assert_eq!(snapshot.company.sector, None);
        assert_eq!(snapshot.performance.trailing_pe, Some(29.4));
        assert_eq!(snapshot.analyst, AnalystInfo::default());
        assert_eq!(snapshot.client_fetched_at, 0);
    }

    #[test]
    fn accepts_legacy_client_cached_at_field() {
        let payload = r#"{"company": {"symbol": "MSFT"}, "clientCachedAt": 1700000000000}"#;
        let snapshot: TickerSnapshot = serde_json::from_str(payload).expect("payload parses");
        assert_eq!(snapshot.client_fetched_at, 1_700_000_000_000);
    }
}
