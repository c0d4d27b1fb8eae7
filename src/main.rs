//! FarmProtect Backend
//!
//! Serves the farm-security dashboard: demo sign-in, camera registry and a simulated
//! alert feed, persisted to a local SQLite key-value store.

mod alerts;
mod api;
mod auth;
mod cameras;
mod clock;
mod config;
mod dashboard;
mod errors;
mod models;
mod notify;
mod storage;
mod video;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use alerts::{AlertEngine, AlertGenerator, SyntheticAlertSource};
use auth::AuthStore;
use cameras::CameraStore;
use clock::{Clock, SystemClock};
use config::Config;
use errors::AppError;
use notify::{Notifier, TracingNotifier};
use storage::KvStore;
use video::VideoProcessingService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthStore>,
    pub cameras: Arc<CameraStore>,
    pub alerts: Arc<AlertEngine>,
    pub notifier: Arc<dyn Notifier>,
    pub video: Arc<dyn VideoProcessingService>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire up every store on top of one key-value store.
    pub fn new(config: Config, kv: KvStore) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier::new(config.notifications));
        let delay = config.simulated_delay;

        Self {
            auth: Arc::new(AuthStore::new(kv.clone(), delay)),
            cameras: Arc::new(CameraStore::new(kv.clone(), clock.clone(), delay)),
            alerts: Arc::new(AlertEngine::new(kv, clock.clone(), notifier.clone(), delay)),
            notifier,
            video: video::build(config.video_service),
            clock,
            config: Arc::new(config),
        }
    }

    /// Load per-session data after a sign-in (or a restored session).
    pub async fn start_session(&self) -> Result<(), AppError> {
        let cameras = self.cameras.load().await?;
        let alerts = self.alerts.load().await?;
        tracing::info!(cameras, alerts, "Session data loaded");
        Ok(())
    }

    /// Drop per-session data from memory after sign-out.
    pub async fn end_session(&self) {
        self.cameras.clear().await;
        self.alerts.clear().await;
    }

    /// Synthetic alert generator driven by the configured probability.
    pub fn alert_generator(&self) -> Arc<AlertGenerator> {
        let source = SyntheticAlertSource::from_entropy(self.config.alert_probability);
        Arc::new(AlertGenerator::new(
            self.auth.clone(),
            self.cameras.clone(),
            self.alerts.clone(),
            Box::new(source),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FarmProtect Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    let pool = storage::init_database(&config.db_path).await?;
    let state = AppState::new(config.clone(), KvStore::new(pool));

    if let Some(user) = state.auth.restore().await? {
        tracing::info!("Resuming session for {}", user.email);
        state.start_session().await?;
    }

    let generator = state.alert_generator().spawn(config.alert_interval);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    generator.abort();
    tracing::info!("Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that need a signed-in user
    let session_routes = Router::new()
        // Cameras
        .route("/cameras", get(api::list_cameras).post(api::create_camera))
        .route(
            "/cameras/{id}",
            get(api::get_camera)
                .put(api::update_camera)
                .delete(api::delete_camera),
        )
        // Alerts
        .route("/alerts", get(api::list_alerts))
        .route("/alerts/unread-count", get(api::get_unread_count))
        .route("/alerts/read-all", post(api::mark_all_alerts_read))
        .route("/alerts/{id}/read", post(api::mark_alert_read))
        // Dashboard
        .route("/dashboard", get(api::get_dashboard))
        // Video
        .route(
            "/video/process",
            post(api::process_video).layer(DefaultBodyLimit::max(api::MAX_VIDEO_BYTES)),
        )
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_session,
        ));

    let public_routes = Router::new()
        .route("/auth/login", post(api::login))
        .route("/auth/register", post(api::register))
        .route("/auth/logout", post(api::logout))
        .route("/auth/session", get(api::get_session))
        .route(
            "/notifications/permission",
            get(api::get_notification_permission).post(api::request_notification_permission),
        );

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", session_routes.merge(public_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
