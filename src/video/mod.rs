//! Video processing collaborator.
//!
//! No processing backend ships with this service. The trait is the seam where one would
//! plug in; the bundled implementations either echo their input or refuse.

use std::str::FromStr;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::AppError;

/// Capacity of the channel carrying processed frames back to the caller.
pub const FRAME_CHANNEL_CAPACITY: usize = 32;

/// Which implementation to wire in at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoServiceKind {
    Passthrough,
    Unavailable,
}

impl FromStr for VideoServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(VideoServiceKind::Passthrough),
            "unavailable" | "none" => Ok(VideoServiceKind::Unavailable),
            other => Err(format!("unknown video service '{}'", other)),
        }
    }
}

#[async_trait]
pub trait VideoProcessingService: Send + Sync {
    /// Process a whole video in one go.
    async fn transcode(&self, video: Vec<u8>) -> Result<Vec<u8>, AppError>;

    /// Transform a stream of frames.
    ///
    /// Processed frames come back in the order they were sent. The output channel closes
    /// after the input channel closes and every frame has been handled.
    fn transform_frames(
        &self,
        frames: mpsc::Receiver<Vec<u8>>,
    ) -> mpsc::Receiver<Result<Vec<u8>, AppError>>;
}

/// Build the configured implementation.
pub fn build(kind: VideoServiceKind) -> std::sync::Arc<dyn VideoProcessingService> {
    match kind {
        VideoServiceKind::Passthrough => std::sync::Arc::new(PassthroughVideoService),
        VideoServiceKind::Unavailable => std::sync::Arc::new(UnavailableVideoService),
    }
}

/// Returns every input unchanged.
#[derive(Debug, Default)]
pub struct PassthroughVideoService;

#[async_trait]
impl VideoProcessingService for PassthroughVideoService {
    async fn transcode(&self, video: Vec<u8>) -> Result<Vec<u8>, AppError> {
        if video.is_empty() {
            return Err(AppError::Validation("Video payload is empty".to_string()));
        }
        tracing::debug!(bytes = video.len(), "Passthrough transcode");
        Ok(video)
    }

    fn transform_frames(
        &self,
        mut frames: mpsc::Receiver<Vec<u8>>,
    ) -> mpsc::Receiver<Result<Vec<u8>, AppError>> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if tx.send(Ok(frame)).await.is_err() {
                    tracing::debug!("Frame consumer went away");
                    break;
                }
            }
        });
        rx
    }
}

/// Stand-in when no processing backend is configured.
#[derive(Debug, Default)]
pub struct UnavailableVideoService;

fn unavailable() -> AppError {
    AppError::ServiceUnavailable("Video processing service is not configured".to_string())
}

#[async_trait]
impl VideoProcessingService for UnavailableVideoService {
    async fn transcode(&self, _video: Vec<u8>) -> Result<Vec<u8>, AppError> {
        Err(unavailable())
    }

    fn transform_frames(
        &self,
        _frames: mpsc::Receiver<Vec<u8>>,
    ) -> mpsc::Receiver<Result<Vec<u8>, AppError>> {
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a fresh channel: try_send cannot fail here.
        let _ = tx.try_send(Err(unavailable()));
        rx
    }
}
