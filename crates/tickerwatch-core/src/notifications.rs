//! The `notifications` store: a most-recent-first feed with read flags.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::NOTIFICATION_STORE;
use crate::persistence::KeyValueStore;
use crate::store::{PersistedState, Store};
use crate::{NotificationKind, NotificationRecord, StorageError, UtcDateTime};

struct SeedRecord {
    id: &'static str,
    kind: NotificationKind,
    title: &'static str,
    snippet: &'static str,
    detail: &'static str,
    date: &'static str,
    read: bool,
}

const SEED: [SeedRecord; 6] = [
    SeedRecord {
        id: "1",
        kind: NotificationKind::Events,
        title: "Trade Executed: NASDAQ",
        snippet: "Your order to sell 50 shares of TSLA has been filled at $215.45.",
        detail: "The transaction was completed successfully in the morning trading session. Funds will settle within T+2 business days. View your portfolio for updated holdings.",
        date: "2025-11-14T10:30:00Z",
        read: false,
    },
    SeedRecord {
        id: "2",
        kind: NotificationKind::Alert,
        title: "Low Balance Warning",
        snippet: "Your checking account balance has dropped below your set threshold of $500.",
        detail: "Please note that your primary checking account is currently holding $489.12. Consider moving funds from savings or delaying upcoming payments to avoid overdraft fees.",
        date: "2025-11-13T16:15:00Z",
        read: false,
    },
    SeedRecord {
        id: "3",
        kind: NotificationKind::System,
        title: "New Feature Available",
        snippet: "Explore our new automatic savings tool, powered by AI.",
        detail: "We've launched a new feature that analyzes your spending habits and automatically moves small, safe amounts into your dedicated savings account, helping you reach your goals faster. Check out the 'Savings Goals' tab to activate.",
        date: "2025-11-12T09:00:00Z",
        read: true,
    },
    SeedRecord {
        id: "4",
        kind: NotificationKind::Alert,
        title: "Suspicious Login Attempt",
        snippet: "An unauthorized login attempt was detected from an unknown device in Tokyo, Japan.",
        detail: "For your security, we have temporarily locked access to your account. Please change your password immediately and contact our fraud department if you did not initiate this login attempt. You must verify your identity to regain full access.",
        date: "2025-11-10T22:45:00Z",
        read: true,
    },
    SeedRecord {
        id: "5",
        kind: NotificationKind::News,
        title: "Loan Repayment Complete",
        snippet: "Your scheduled loan repayment of $1,200 has been successfully processed.",
        detail: "Congratulations, your monthly installment has been successfully debited. Your outstanding loan balance has been updated.",
        date: "2025-11-09T08:00:00Z",
        read: true,
    },
    SeedRecord {
        id: "6",
        kind: NotificationKind::System,
        title: "Annual Statement Ready",
        snippet: "Your 2024 annual summary statement is now available for download.",
        detail: "Find your comprehensive financial summary for the previous year in the documents section of your profile.",
        date: "2025-11-08T11:00:00Z",
        read: false,
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationState {
    /// Most recent first, at most one record per id.
    pub notifications: Vec<NotificationRecord>,
}

impl NotificationState {
    /// Feed shown on first run, before anything was persisted.
    pub fn seeded() -> Self {
        let notifications = SEED
            .iter()
            .filter_map(|seed| {
                let date = UtcDateTime::parse(seed.date).ok()?;
                let mut record = NotificationRecord::new(
                    seed.id,
                    seed.kind,
                    seed.title,
                    seed.snippet,
                    seed.detail,
                    date,
                );
                record.read = seed.read;
                Some(record)
            })
            .collect();

        Self { notifications }
    }

    pub fn get(&self, id: &str) -> Option<&NotificationRecord> {
        self.notifications.iter().find(|record| record.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|record| !record.read).count()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationProjection {
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
}

impl PersistedState for NotificationState {
    type Projection = NotificationProjection;

    fn project(&self) -> NotificationProjection {
        NotificationProjection {
            notifications: self.notifications.clone(),
        }
    }

    fn restore(&mut self, projection: NotificationProjection) {
        self.notifications = projection.notifications;
    }
}

/// Handle to the `notifications` store. Cheap to clone.
#[derive(Clone)]
pub struct NotificationStore {
    store: Store<NotificationState>,
}

impl NotificationStore {
    /// Opens the store seeded with the default feed; a persisted feed replaces it.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::open_with(backend, NotificationState::seeded())
    }

    pub fn open_with(backend: Arc<dyn KeyValueStore>, initial: NotificationState) -> Self {
        Self {
            store: Store::open(NOTIFICATION_STORE, initial, backend),
        }
    }

    /// Puts `record` at the head of the feed, marked read, replacing any
    /// record with the same id.
    pub fn add(&self, record: NotificationRecord) {
        let record = NotificationRecord {
            read: true,
            ..record
        };

        self.store.mutate(|state| {
            state.notifications.retain(|existing| existing.id != record.id);
            state.notifications.insert(0, record);
            true
        });
    }

    /// Marks `id` read. Idempotent; unknown ids are ignored.
    pub fn mark_as_read(&self, id: &str) {
        self.store.mutate(|state| {
            match state
                .notifications
                .iter_mut()
                .find(|record| record.id == id && !record.read)
            {
                Some(record) => {
                    record.read = true;
                    true
                }
                None => false,
            }
        });
    }

    pub fn remove(&self, id: &str) {
        self.store.mutate(|state| {
            let before = state.notifications.len();
            state.notifications.retain(|record| record.id != id);
            state.notifications.len() != before
        });
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.store.read(|state| state.notifications.clone())
    }

    pub fn get(&self, id: &str) -> Option<NotificationRecord> {
        self.store.read(|state| state.get(id).cloned())
    }

    pub fn unread_count(&self) -> usize {
        self.store.read(NotificationState::unread_count)
    }

    pub fn state(&self) -> NotificationState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.store.subscribe()
    }

    pub fn is_hydrated(&self) -> bool {
        self.store.is_hydrated()
    }

    pub async fn wait_ready(&self) {
        self.store.wait_ready().await;
    }

    pub async fn flush(&self) -> Result<(), StorageError> {
        self.store.flush().await
    }
}
