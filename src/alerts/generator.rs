//! Synthetic alert generation.
//!
//! A [`AlertGenerator`] runs one trial per tick. What a trial produces is decided by an
//! [`AlertSource`]; the bundled [`SyntheticAlertSource`] flips a biased coin and invents
//! an alert for a random online camera.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use super::AlertEngine;
use crate::auth::AuthStore;
use crate::cameras::CameraStore;
use crate::errors::AppError;
use crate::models::{Alert, AlertType, Camera, UpdateCameraRequest};

/// Default period between trials.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
/// Default chance that a trial yields an alert.
pub const DEFAULT_PROBABILITY: f64 = 0.1;

/// An alert before it has an id and a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDraft {
    pub camera_id: String,
    pub camera_name: String,
    pub kind: AlertType,
    pub description: String,
    pub image_url: Option<String>,
}

impl AlertDraft {
    pub fn into_alert(self, id: String, at: DateTime<Utc>) -> Alert {
        Alert {
            id,
            camera_id: self.camera_id,
            camera_name: self.camera_name,
            timestamp: at.to_rfc3339(),
            kind: self.kind,
            description: self.description,
            image_url: self.image_url,
            viewed: false,
        }
    }
}

/// Producer of detection events.
pub trait AlertSource: Send {
    /// Called once per tick with the cameras currently online (never empty).
    fn poll(&mut self, online: &[Camera]) -> Option<AlertDraft>;
}

/// Illustrative image for each category.
pub fn image_url(kind: AlertType) -> &'static str {
    match kind {
        AlertType::Person => "https://images.pexels.com/photos/2132171/pexels-photo-2132171.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1",
        AlertType::Animal => "https://images.pexels.com/photos/1252825/pexels-photo-1252825.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1",
        AlertType::Vehicle => "https://images.pexels.com/photos/1178448/pexels-photo-1178448.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1",
        AlertType::Motion => "https://images.pexels.com/photos/533850/pexels-photo-533850.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1",
        AlertType::Other => "https://images.pexels.com/photos/681335/pexels-photo-681335.jpeg?auto=compress&cs=tinysrgb&w=1260&h=750&dpr=1",
    }
}

/// Human-readable description for a category at a location.
pub fn describe(kind: AlertType, location: &str) -> String {
    match kind {
        AlertType::Person => format!("Person detected at {}", location),
        AlertType::Animal => format!("Animal detected near {}", location),
        AlertType::Vehicle => format!("Vehicle approaching {}", location),
        AlertType::Motion => format!("Motion detected at {}", location),
        AlertType::Other => format!("Unknown activity at {}", location),
    }
}

/// Bernoulli trial per tick; on success a uniformly chosen camera and category.
pub struct SyntheticAlertSource<R> {
    rng: R,
    probability: f64,
}

impl<R: Rng> SyntheticAlertSource<R> {
    /// `probability` is clamped to `[0, 1]`; a non-finite value falls back to
    /// [`DEFAULT_PROBABILITY`].
    pub fn new(rng: R, probability: f64) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            tracing::warn!(probability, "Alert probability is not a number, using default");
            DEFAULT_PROBABILITY
        };
        Self { rng, probability }
    }
}

impl SyntheticAlertSource<StdRng> {
    pub fn from_entropy(probability: f64) -> Self {
        Self::new(StdRng::from_entropy(), probability)
    }
}

impl<R: Rng + Send> AlertSource for SyntheticAlertSource<R> {
    fn poll(&mut self, online: &[Camera]) -> Option<AlertDraft> {
        if !self.rng.gen_bool(self.probability) {
            return None;
        }

        let camera = online.choose(&mut self.rng)?;
        let kind = *AlertType::ALL.choose(&mut self.rng)?;

        Some(AlertDraft {
            camera_id: camera.id.clone(),
            camera_name: camera.name.clone(),
            kind,
            description: describe(kind, &camera.location),
            image_url: Some(image_url(kind).to_string()),
        })
    }
}

/// Drives an [`AlertSource`] against the live stores.
pub struct AlertGenerator {
    auth: Arc<AuthStore>,
    cameras: Arc<CameraStore>,
    alerts: Arc<AlertEngine>,
    source: Mutex<Box<dyn AlertSource>>,
}

impl AlertGenerator {
    pub fn new(
        auth: Arc<AuthStore>,
        cameras: Arc<CameraStore>,
        alerts: Arc<AlertEngine>,
        source: Box<dyn AlertSource>,
    ) -> Self {
        Self {
            auth,
            cameras,
            alerts,
            source: Mutex::new(source),
        }
    }

    /// Run a single trial.
    ///
    /// Nothing happens while signed out, while session data is still loading, or while no
    /// camera is online.
    pub async fn tick(&self) -> Result<Option<Alert>, AppError> {
        if !self.auth.is_authenticated().await {
            return Ok(None);
        }

        if !self.cameras.is_loaded().await || !self.alerts.is_loaded().await {
            tracing::debug!("Session data not loaded yet, skipping trial");
            return Ok(None);
        }

        let online = self.cameras.online().await;
        if online.is_empty() {
            return Ok(None);
        }

        let draft = {
            let mut source = self
                .source
                .lock()
                .map_err(|_| AppError::Internal("Alert source lock poisoned".to_string()))?;
            source.poll(&online)
        };

        let Some(draft) = draft else {
            return Ok(None);
        };

        let alert = self.alerts.record(draft).await?;

        let stamp = UpdateCameraRequest {
            last_alert: Some(alert.timestamp.clone()),
            ..Default::default()
        };
        if let Err(e) = self.cameras.update(&alert.camera_id, &stamp).await {
            // The camera may have been removed between the trial and now.
            tracing::warn!(camera_id = %alert.camera_id, error = %e, "Could not stamp lastAlert");
        }

        Ok(Some(alert))
    }

    /// Tick every `period` until the task is aborted. The first trial happens one
    /// period after start.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);

        loop {
            interval.tick().await;

            match self.tick().await {
                Ok(Some(alert)) => {
                    tracing::debug!(alert_id = %alert.id, "Synthetic alert generated");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Synthetic alert generation failed");
                }
            }
        }
    }

    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tracing::info!(period_secs = period.as_secs_f64(), "Starting alert generator");
        tokio::spawn(self.run(period))
    }
}
