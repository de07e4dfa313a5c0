use serde::{Deserialize, Serialize};

/// One OHLCV sample of a history series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Price series for one `(symbol, range)` cell, as returned by `/history`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySeries {
    #[serde(rename = "data")]
    pub points: Vec<HistoryPoint>,
    /// Server-side cache time of the series (epoch seconds), informational only.
    #[serde(default)]
    pub cached_at: Option<f64>,
}

impl HistorySeries {
    pub fn new(points: Vec<HistoryPoint>) -> Self {
        Self {
            points,
            cached_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_close(&self) -> Option<f64> {
        self.points.first().map(|point| point.close)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|point| point.close)
    }

    /// Lowest low and highest high over the series, for chart scaling.
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |bounds, point| match bounds {
            None => Some((point.low, point.high)),
            Some((low, high)) => Some((low.min(point.low), high.max(point.high))),
        })
    }
}
