//! Dashboard summary view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Alert, Camera};

/// Alerts counted as "recent" on the stats card.
pub const RECENT_ALERT_WINDOW: usize = 24;
/// Alerts listed in the recent-alerts panel.
pub const RECENT_ALERTS_SHOWN: usize = 5;
/// Cameras listed in the camera summary panel.
pub const CAMERAS_SHOWN: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_cameras: usize,
    pub total_cameras: usize,
    /// Rounded share of cameras online; absent when there are no cameras
    pub percent_online: Option<u32>,
    pub recent_alerts: usize,
    pub unread_alerts: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAlert {
    #[serde(flatten)]
    pub alert: Alert,
    pub time_ago: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub cameras: Vec<Camera>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    pub recent_alerts: Vec<RecentAlert>,
    pub camera_summary: CameraSummary,
}

impl DashboardSummary {
    /// Build the summary from store snapshots. `alerts` is newest first.
    pub fn build(cameras: &[Camera], alerts: &[Alert], now: DateTime<Utc>) -> Self {
        let online = cameras.iter().filter(|c| c.is_online()).count();
        let total = cameras.len();

        let percent_online = if total == 0 {
            None
        } else {
            Some(((online as f64 / total as f64) * 100.0).round() as u32)
        };

        let stats = DashboardStats {
            active_cameras: online,
            total_cameras: total,
            percent_online,
            recent_alerts: alerts.len().min(RECENT_ALERT_WINDOW),
            unread_alerts: alerts.iter().filter(|a| !a.viewed).count(),
        };

        let recent_alerts = alerts
            .iter()
            .take(RECENT_ALERTS_SHOWN)
            .map(|alert| RecentAlert {
                time_ago: time_ago_from_str(&alert.timestamp, now),
                alert: alert.clone(),
            })
            .collect();

        let camera_summary = CameraSummary {
            total,
            online,
            offline: total - online,
            cameras: cameras.iter().take(CAMERAS_SHOWN).cloned().collect(),
        };

        Self {
            stats,
            recent_alerts,
            camera_summary,
        }
    }
}

fn time_ago_from_str(timestamp: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(at) => format_time_ago(at.with_timezone(&Utc), now),
        Err(_) => {
            tracing::debug!(timestamp, "Unparsable alert timestamp");
            "unknown".to_string()
        }
    }
}

/// Relative time such as "5 minutes ago". Months are 30 days.
pub fn format_time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds().max(0);
    if seconds < 60 {
        return format!("{} seconds ago", seconds);
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }

    let days = hours / 24;
    if days < 30 {
        return plural(days, "day");
    }

    plural(days / 30, "month")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {} ago", n, unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::demo_alerts;
    use crate::models::CameraStatus;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_format_time_ago_units() {
        let now = now();
        assert_eq!(format_time_ago(now - Duration::seconds(5), now), "5 seconds ago");
        assert_eq!(format_time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_time_ago(now - Duration::minutes(45), now), "45 minutes ago");
        assert_eq!(format_time_ago(now - Duration::hours(2), now), "2 hours ago");
        assert_eq!(format_time_ago(now - Duration::days(1), now), "1 day ago");
        assert_eq!(format_time_ago(now - Duration::days(65), now), "2 months ago");
    }

    #[test]
    fn test_future_timestamp_clamps_to_zero() {
        let now = now();
        assert_eq!(format_time_ago(now + Duration::minutes(3), now), "0 seconds ago");
    }

    fn camera(id: &str, status: CameraStatus) -> Camera {
        Camera {
            id: id.to_string(),
            name: id.to_string(),
            location: "Farm".to_string(),
            status,
            last_alert: None,
        }
    }

    #[test]
    fn test_summary_without_cameras() {
        let summary = DashboardSummary::build(&[], &demo_alerts(now()), now());
        assert_eq!(summary.stats.percent_online, None);
        assert_eq!(summary.stats.recent_alerts, 3);
        assert_eq!(summary.stats.unread_alerts, 1);
        assert_eq!(summary.recent_alerts[0].time_ago, "15 minutes ago");
        assert_eq!(summary.recent_alerts[2].time_ago, "2 hours ago");
        assert!(summary.camera_summary.cameras.is_empty());
    }

    #[test]
    fn test_summary_counts_and_truncation() {
        let cameras = vec![
            camera("a", CameraStatus::Online),
            camera("b", CameraStatus::Offline),
            camera("c", CameraStatus::Online),
            camera("d", CameraStatus::Online),
        ];
        let mut alerts = Vec::new();
        for _ in 0..10 {
            alerts.extend(demo_alerts(now()));
        }

        let summary = DashboardSummary::build(&cameras, &alerts, now());
        assert_eq!(summary.stats.active_cameras, 3);
        assert_eq!(summary.stats.percent_online, Some(75));
        assert_eq!(summary.stats.recent_alerts, RECENT_ALERT_WINDOW);
        assert_eq!(summary.stats.unread_alerts, 10);
        assert_eq!(summary.recent_alerts.len(), RECENT_ALERTS_SHOWN);
        assert_eq!(summary.camera_summary.offline, 1);
        assert_eq!(summary.camera_summary.cameras.len(), CAMERAS_SHOWN);
    }

    #[test]
    fn test_recent_alert_flattens() {
        let summary = DashboardSummary::build(&[], &demo_alerts(now()), now());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["recentAlerts"][0]["type"], "person");
        assert_eq!(json["recentAlerts"][0]["timeAgo"], "15 minutes ago");
        assert!(json["stats"]["percentOnline"].is_null());
    }
}
