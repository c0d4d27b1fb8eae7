//! Alert model and list filters.

use serde::{Deserialize, Serialize};

use super::contains_ignore_case;

/// Category of a detected (simulated) security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Motion,
    Person,
    Animal,
    Vehicle,
    Other,
}

impl AlertType {
    /// Every category, in the order the generator draws from.
    pub const ALL: [AlertType; 5] = [
        AlertType::Motion,
        AlertType::Person,
        AlertType::Animal,
        AlertType::Vehicle,
        AlertType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Motion => "motion",
            AlertType::Person => "person",
            AlertType::Animal => "animal",
            AlertType::Vehicle => "vehicle",
            AlertType::Other => "other",
        }
    }
}

/// A timestamped security event tied to a camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub camera_id: String,
    pub camera_name: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub viewed: bool,
}

/// Read-state selector for the alert list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatusFilter {
    #[default]
    All,
    Unread,
    Read,
}

/// Query parameters for listing alerts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    /// Matched against description or camera name
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: AlertStatusFilter,
    /// `None` (or `all` on the query string) selects every type
    #[serde(default, rename = "type", deserialize_with = "deserialize_type_filter")]
    pub kind: Option<AlertType>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        let matches_search = contains_ignore_case(&alert.description, &self.q)
            || contains_ignore_case(&alert.camera_name, &self.q);
        let matches_status = match self.status {
            AlertStatusFilter::All => true,
            AlertStatusFilter::Unread => !alert.viewed,
            AlertStatusFilter::Read => alert.viewed,
        };
        let matches_type = self.kind.map_or(true, |kind| alert.kind == kind);
        matches_search && matches_status && matches_type
    }
}

fn deserialize_type_filter<'de, D>(deserializer: D) -> Result<Option<AlertType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if raw.is_empty() || raw == "all" {
        return Ok(None);
    }

    AlertType::ALL
        .into_iter()
        .find(|kind| kind.as_str() == raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown alert type '{}'", raw)))
}
