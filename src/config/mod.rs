//! Configuration module for the FarmProtect backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::alerts::{DEFAULT_INTERVAL, DEFAULT_PROBABILITY};
use crate::notify::NotificationPolicy;
use crate::video::VideoServiceKind;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file backing the key-value store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Artificial latency applied to login, register and store loads
    pub simulated_delay: Duration,
    /// Period between synthetic alert trials
    pub alert_interval: Duration,
    /// Chance that a single trial produces an alert
    pub alert_probability: f64,
    /// How notification permission prompts are answered
    pub notifications: NotificationPolicy,
    /// Which video processing backend to wire in
    pub video_service: VideoServiceKind,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("FARM_DB_PATH")
            .unwrap_or_else(|_| "./data/farm-protect.sqlite".to_string())
            .into();

        let bind_addr = env::var("FARM_BIND_ADDR")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    eprintln!("Invalid FARM_BIND_ADDR '{}', using default", v);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let log_level = env::var("FARM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let simulated_delay = Duration::from_millis(parse_or("FARM_SIMULATED_DELAY_MS", 800));
        let alert_interval = Duration::from_secs(
            parse_or("FARM_ALERT_INTERVAL_SECS", DEFAULT_INTERVAL.as_secs()).max(1),
        );
        let alert_probability = probability_or_default(parse_or(
            "FARM_ALERT_PROBABILITY",
            DEFAULT_PROBABILITY,
        ));

        let notifications = env::var("FARM_NOTIFICATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(NotificationPolicy::Prompt);

        let video_service = env::var("FARM_VIDEO_SERVICE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(VideoServiceKind::Passthrough);

        Self {
            db_path,
            bind_addr,
            log_level,
            simulated_delay,
            alert_interval,
            alert_probability,
            notifications,
            video_service,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Clamp to `[0, 1]`; `NaN` and infinities parse as `f64` but are not probabilities.
fn probability_or_default(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        eprintln!("Invalid FARM_ALERT_PROBABILITY '{}', using default", p);
        DEFAULT_PROBABILITY
    }
}
