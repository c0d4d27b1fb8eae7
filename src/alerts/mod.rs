//! Alert engine.
//!
//! Owns the alert list: a capped, newest-first log of security events with read/unread
//! tracking. The unread count is always computed from the list, never stored.
//!
//! The list exists only between `load` and `clear`; writes outside that window fail
//! rather than replace the stored history.

mod generator;

pub use generator::*;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::clock::{timestamp_id, Clock};
use crate::errors::AppError;
use crate::models::{Alert, AlertFilter, AlertType};
use crate::notify::{Notification, NotificationPermission, Notifier, ALERT_NOTIFICATION_TITLE};
use crate::storage::{KvStore, LoadOutcome, ALERTS_KEY};

/// Maximum number of alerts kept. Older entries are evicted first.
pub const MAX_ALERTS: usize = 100;

pub struct AlertEngine {
    kv: KvStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    /// `None` until loaded for the current session
    alerts: RwLock<Option<Vec<Alert>>>,
    delay: Duration,
}

fn not_loaded() -> AppError {
    AppError::SessionNotReady("Alerts are not loaded".to_string())
}

impl AlertEngine {
    pub fn new(
        kv: KvStore,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        delay: Duration,
    ) -> Self {
        Self {
            kv,
            clock,
            notifier,
            alerts: RwLock::new(None),
            delay,
        }
    }

    /// Load persisted alerts for a new session, seeding demo data when there are none.
    ///
    /// The write lock is held for the whole load, so writers queue behind it.
    pub async fn load(&self) -> Result<usize, AppError> {
        let mut alerts = self.alerts.write().await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let loaded = match self.kv.load::<Vec<Alert>>(ALERTS_KEY).await? {
            LoadOutcome::Loaded(list) | LoadOutcome::Migrated(list) => list,
            LoadOutcome::Missing => self.reseed().await?,
            LoadOutcome::Corrupt => {
                tracing::warn!("Stored alerts were unreadable; reseeding demo alerts");
                self.reseed().await?
            }
        };

        let count = loaded.len();
        *alerts = Some(loaded);
        tracing::debug!(count, "Alerts loaded");
        Ok(count)
    }

    async fn reseed(&self) -> Result<Vec<Alert>, AppError> {
        let seeded = demo_alerts(self.clock.now());
        self.kv.save(ALERTS_KEY, &seeded).await?;
        Ok(seeded)
    }

    /// Forget the in-memory list. Storage is untouched.
    pub async fn clear(&self) {
        *self.alerts.write().await = None;
    }

    pub async fn is_loaded(&self) -> bool {
        self.alerts.read().await.is_some()
    }

    /// All alerts, newest first.
    pub async fn list(&self) -> Vec<Alert> {
        self.alerts.read().await.clone().unwrap_or_default()
    }

    pub async fn filtered(&self, filter: &AlertFilter) -> Vec<Alert> {
        self.alerts
            .read()
            .await
            .iter()
            .flatten()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.as_ref().map_or(0, Vec::len)
    }

    pub async fn unread_count(&self) -> usize {
        self.alerts
            .read()
            .await
            .iter()
            .flatten()
            .filter(|a| !a.viewed)
            .count()
    }

    /// Insert a fully formed alert as-is.
    #[cfg(test)]
    pub async fn add(&self, alert: Alert) -> Result<Alert, AppError> {
        let mut guard = self.alerts.write().await;
        let alerts = guard.as_mut().ok_or_else(not_loaded)?;
        self.insert(alerts, alert).await
    }

    /// Turn a draft into an alert stamped with the current time and a fresh id, then add it.
    pub async fn record(&self, draft: AlertDraft) -> Result<Alert, AppError> {
        let mut guard = self.alerts.write().await;
        let alerts = guard.as_mut().ok_or_else(not_loaded)?;
        let now = self.clock.now();
        let id = timestamp_id(now, |id| alerts.iter().any(|a| a.id == id));
        let alert = draft.into_alert(id, now);
        self.insert(alerts, alert).await
    }

    /// Prepend `alert`, evict beyond [`MAX_ALERTS`], persist and notify.
    async fn insert(&self, alerts: &mut Vec<Alert>, alert: Alert) -> Result<Alert, AppError> {
        let mut updated = Vec::with_capacity(MAX_ALERTS);
        updated.push(alert.clone());
        updated.extend(alerts.iter().take(MAX_ALERTS - 1).cloned());

        self.kv.save(ALERTS_KEY, &updated).await?;
        *alerts = updated;

        tracing::info!(
            alert_id = %alert.id,
            camera_id = %alert.camera_id,
            kind = alert.kind.as_str(),
            "Alert added"
        );

        if self.notifier.permission() == NotificationPermission::Granted {
            self.notifier.notify(&Notification {
                title: ALERT_NOTIFICATION_TITLE.to_string(),
                body: format!("{}: {}", alert.camera_name, alert.description),
            });
        }

        Ok(alert)
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<Alert, AppError> {
        let mut guard = self.alerts.write().await;
        let alerts = guard.as_mut().ok_or_else(not_loaded)?;

        let mut updated = alerts.clone();
        let alert = updated
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", id)))?;

        if alert.viewed {
            return Ok(alert.clone());
        }
        alert.viewed = true;
        let alert = alert.clone();

        self.kv.save(ALERTS_KEY, &updated).await?;
        *alerts = updated;
        Ok(alert)
    }

    /// Mark every alert viewed. Returns how many changed.
    pub async fn mark_all_as_read(&self) -> Result<usize, AppError> {
        let mut guard = self.alerts.write().await;
        let alerts = guard.as_mut().ok_or_else(not_loaded)?;

        let changed = alerts.iter().filter(|a| !a.viewed).count();
        if changed == 0 {
            return Ok(0);
        }

        let updated: Vec<Alert> = alerts
            .iter()
            .cloned()
            .map(|a| Alert { viewed: true, ..a })
            .collect();

        self.kv.save(ALERTS_KEY, &updated).await?;
        *alerts = updated;

        tracing::info!(changed, "Marked all alerts as read");
        Ok(changed)
    }
}

/// Alerts shown to a first-time session.
pub fn demo_alerts(now: DateTime<Utc>) -> Vec<Alert> {
    let at = |minutes_ago: i64| (now - chrono::Duration::minutes(minutes_ago)).to_rfc3339();

    vec![
        Alert {
            id: "1".to_string(),
            camera_id: "1".to_string(),
            camera_name: "North Field Camera".to_string(),
            timestamp: at(15),
            kind: AlertType::Person,
            description: "Unidentified person detected at north perimeter".to_string(),
            image_url: Some(image_url(AlertType::Person).to_string()),
            viewed: false,
        },
        Alert {
            id: "2".to_string(),
            camera_id: "2".to_string(),
            camera_name: "Barn Area".to_string(),
            timestamp: at(45),
            kind: AlertType::Animal,
            description: "Large animal detected near barn storage area".to_string(),
            image_url: Some(image_url(AlertType::Animal).to_string()),
            viewed: true,
        },
        Alert {
            id: "3".to_string(),
            camera_id: "1".to_string(),
            camera_name: "North Field Camera".to_string(),
            timestamp: at(120),
            kind: AlertType::Vehicle,
            description: "Unauthorized vehicle approaching north field".to_string(),
            image_url: Some(image_url(AlertType::Vehicle).to_string()),
            viewed: true,
        },
    ]
}
