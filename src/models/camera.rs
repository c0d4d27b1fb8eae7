//! Camera model and the requests/filters that operate on it.

use serde::{Deserialize, Serialize};

use super::contains_ignore_case;
use crate::errors::AppError;

/// Connectivity state of a camera as shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Online,
    Offline,
}

/// Client-side metadata about a monitoring device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub id: String,
    pub name: String,
    pub location: String,
    pub status: CameraStatus,
    /// Timestamp of the most recent alert raised by this camera
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_alert: Option<String>,
}

impl Camera {
    pub fn is_online(&self) -> bool {
        self.status == CameraStatus::Online
    }
}

/// Request body for registering a camera.
///
/// `status` is accepted for compatibility but ignored: new cameras always start online.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCameraRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: Option<CameraStatus>,
}

impl CreateCameraRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() || self.location.trim().is_empty() {
            return Err(AppError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request body for partially updating a camera.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCameraRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<CameraStatus>,
    #[serde(default)]
    pub last_alert: Option<String>,
}

impl UpdateCameraRequest {
    /// Merge the present fields into `camera`.
    pub fn apply_to(&self, camera: &mut Camera) {
        if let Some(name) = &self.name {
            camera.name = name.clone();
        }
        if let Some(location) = &self.location {
            camera.location = location.clone();
        }
        if let Some(status) = self.status {
            camera.status = status;
        }
        if let Some(last_alert) = &self.last_alert {
            camera.last_alert = Some(last_alert.clone());
        }
    }
}

/// Status selector for the camera list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatusFilter {
    #[default]
    All,
    Online,
    Offline,
}

/// Query parameters for listing cameras.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraFilter {
    /// Matched against name or location
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: CameraStatusFilter,
}

impl CameraFilter {
    pub fn matches(&self, camera: &Camera) -> bool {
        let matches_search = contains_ignore_case(&camera.name, &self.q)
            || contains_ignore_case(&camera.location, &self.q);
        let matches_status = match self.status {
            CameraStatusFilter::All => true,
            CameraStatusFilter::Online => camera.status == CameraStatus::Online,
            CameraStatusFilter::Offline => camera.status == CameraStatus::Offline,
        };
        matches_search && matches_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(name: &str, location: &str, status: CameraStatus) -> Camera {
        Camera {
            id: name.to_lowercase(),
            name: name.to_string(),
            location: location.to_string(),
            status,
            last_alert: None,
        }
    }

    #[test]
    fn test_filter_is_case_insensitive_on_name_or_location() {
        let cam = camera("North Field Camera", "North Boundary", CameraStatus::Online);

        let by_name = CameraFilter {
            q: "FIELD".to_string(),
            ..Default::default()
        };
        let by_location = CameraFilter {
            q: "boundary".to_string(),
            ..Default::default()
        };
        let miss = CameraFilter {
            q: "barn".to_string(),
            ..Default::default()
        };

        assert!(by_name.matches(&cam));
        assert!(by_location.matches(&cam));
        assert!(!miss.matches(&cam));
    }

    #[test]
    fn test_filter_combines_text_and_status_with_and() {
        let online = camera("Barn Area", "Barn", CameraStatus::Online);
        let offline = camera("Barn Loft", "Barn", CameraStatus::Offline);

        let filter = CameraFilter {
            q: "barn".to_string(),
            status: CameraStatusFilter::Offline,
        };

        assert!(!filter.matches(&online));
        assert!(filter.matches(&offline));
    }

    #[test]
    fn test_update_merges_only_present_fields() {
        let mut cam = camera("Gate", "East Gate", CameraStatus::Online);
        UpdateCameraRequest {
            status: Some(CameraStatus::Offline),
            ..Default::default()
        }
        .apply_to(&mut cam);

        assert_eq!(cam.name, "Gate");
        assert_eq!(cam.location, "East Gate");
        assert_eq!(cam.status, CameraStatus::Offline);
    }

    #[test]
    fn test_create_requires_name_and_location() {
        let req = CreateCameraRequest {
            name: "Gate".to_string(),
            location: "  ".to_string(),
            status: None,
        };
        assert_eq!(
            req.validate().unwrap_err().message(),
            "Please fill in all fields"
        );
    }
}
