//! Camera registry.
//!
//! The list exists only between `load` and `clear`. Every mutation derives a new list
//! under the write lock, persists it, then swaps it in; outside a loaded session
//! mutations fail instead of overwriting the stored list.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::clock::{timestamp_id, Clock};
use crate::errors::AppError;
use crate::models::{Camera, CameraFilter, CameraStatus, CreateCameraRequest, UpdateCameraRequest};
use crate::storage::{KvStore, LoadOutcome, CAMERAS_KEY};

pub struct CameraStore {
    kv: KvStore,
    clock: Arc<dyn Clock>,
    /// `None` until loaded for the current session
    cameras: RwLock<Option<Vec<Camera>>>,
    delay: Duration,
}

fn not_loaded() -> AppError {
    AppError::SessionNotReady("Cameras are not loaded".to_string())
}

impl CameraStore {
    pub fn new(kv: KvStore, clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            kv,
            clock,
            cameras: RwLock::new(None),
            delay,
        }
    }

    /// Load the persisted camera list for a new session.
    ///
    /// The write lock is held for the whole load, so writers queue behind it.
    pub async fn load(&self) -> Result<usize, AppError> {
        let mut guard = self.cameras.write().await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let cameras = match self.kv.load::<Vec<Camera>>(CAMERAS_KEY).await? {
            LoadOutcome::Corrupt => {
                tracing::warn!("Stored camera list was unreadable; starting empty");
                Vec::new()
            }
            outcome => outcome.into_option().unwrap_or_default(),
        };

        let count = cameras.len();
        *guard = Some(cameras);
        tracing::debug!(count, "Cameras loaded");
        Ok(count)
    }

    /// Forget the in-memory list. Storage is untouched.
    pub async fn clear(&self) {
        *self.cameras.write().await = None;
    }

    pub async fn is_loaded(&self) -> bool {
        self.cameras.read().await.is_some()
    }

    pub async fn list(&self) -> Vec<Camera> {
        self.cameras.read().await.clone().unwrap_or_default()
    }

    pub async fn filtered(&self, filter: &CameraFilter) -> Vec<Camera> {
        self.cameras
            .read()
            .await
            .iter()
            .flatten()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<Camera> {
        self.cameras
            .read()
            .await
            .iter()
            .flatten()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn online(&self) -> Vec<Camera> {
        self.cameras
            .read()
            .await
            .iter()
            .flatten()
            .filter(|c| c.is_online())
            .cloned()
            .collect()
    }

    /// Register a camera. New cameras always start online; no health check is made.
    pub async fn add(&self, request: &CreateCameraRequest) -> Result<Camera, AppError> {
        request.validate()?;

        let mut guard = self.cameras.write().await;
        let cameras = guard.as_mut().ok_or_else(not_loaded)?;
        let id = timestamp_id(self.clock.now(), |id| cameras.iter().any(|c| c.id == id));

        let camera = Camera {
            id,
            name: request.name.trim().to_string(),
            location: request.location.trim().to_string(),
            status: CameraStatus::Online,
            last_alert: None,
        };

        let mut updated = cameras.clone();
        updated.push(camera.clone());
        self.kv.save(CAMERAS_KEY, &updated).await?;
        *cameras = updated;

        tracing::info!(camera_id = %camera.id, name = %camera.name, "Camera added");
        Ok(camera)
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdateCameraRequest,
    ) -> Result<Camera, AppError> {
        let mut guard = self.cameras.write().await;
        let cameras = guard.as_mut().ok_or_else(not_loaded)?;

        let mut updated = cameras.clone();
        let camera = updated
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Camera {} not found", id)))?;
        request.apply_to(camera);
        let camera = camera.clone();

        self.kv.save(CAMERAS_KEY, &updated).await?;
        *cameras = updated;

        tracing::debug!(camera_id = %id, "Camera updated");
        Ok(camera)
    }

    pub async fn remove(&self, id: &str) -> Result<(), AppError> {
        let mut guard = self.cameras.write().await;
        let cameras = guard.as_mut().ok_or_else(not_loaded)?;

        let updated: Vec<Camera> = cameras.iter().filter(|c| c.id != id).cloned().collect();
        if updated.len() == cameras.len() {
            return Err(AppError::NotFound(format!("Camera {} not found", id)));
        }

        self.kv.save(CAMERAS_KEY, &updated).await?;
        *cameras = updated;

        tracing::info!(camera_id = %id, "Camera removed");
        Ok(())
    }
}
