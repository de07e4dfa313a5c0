use serde::{Deserialize, Serialize};

use crate::UtcDateTime;

/// Category of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Price alerts, thresholds, watchlist triggers.
    Alert,
    /// Market or company news.
    News,
    /// Earnings, dividends and other scheduled events.
    Events,
    /// Messages from the app itself.
    System,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::News => "news",
            Self::Events => "events",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub snippet: String,
    pub detail: String,
    pub date: UtcDateTime,
    #[serde(default)]
    pub read: bool,
}

impl NotificationRecord {
    pub fn new(
        id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        snippet: impl Into<String>,
        detail: impl Into<String>,
        date: UtcDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            snippet: snippet.into(),
            detail: detail.into(),
            date,
            read: false,
        }
    }
}
