//! Key-value store with versioned, schema-checked values.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use super::SCHEMA_VERSION;
use crate::errors::AppError;

/// Envelope written around every persisted value.
#[derive(Serialize)]
struct Envelope<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct StoredEnvelope {
    version: u32,
    data: Value,
}

/// Result of reading a typed value from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    /// Nothing stored under the key
    Missing,
    /// Current-version value
    Loaded(T),
    /// Older (unversioned) value, already rewritten in the current format
    Migrated(T),
    /// Unparsable or from a newer build; the key has been cleared
    Corrupt,
}

impl<T> LoadOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            LoadOutcome::Loaded(value) | LoadOutcome::Migrated(value) => Some(value),
            LoadOutcome::Missing | LoadOutcome::Corrupt => None,
        }
    }
}

/// Persistent key-value store.
#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the raw value stored under `key`.
    pub async fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    /// Store a raw value under `key`, replacing any previous value.
    pub async fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub async fn remove_item(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Serialize `value` inside a versioned envelope and store it.
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let encoded = serde_json::to_string(&Envelope {
            version: SCHEMA_VERSION,
            data: value,
        })
        .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", key, e)))?;
        self.set_item(key, &encoded).await
    }

    /// Read and decode the value under `key`.
    ///
    /// Unversioned values are migrated in place. Values that fail to parse, or that were
    /// written by a newer schema, are logged, removed and reported as `Corrupt`.
    pub async fn load<T>(&self, key: &str) -> Result<LoadOutcome<T>, AppError>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(raw) = self.get_item(key).await? else {
            return Ok(LoadOutcome::Missing);
        };

        match decode::<T>(&raw) {
            Decoded::Current(value) => Ok(LoadOutcome::Loaded(value)),
            Decoded::Legacy(value) => {
                tracing::info!(key, "Migrating unversioned value to schema v{}", SCHEMA_VERSION);
                self.save(key, &value).await?;
                Ok(LoadOutcome::Migrated(value))
            }
            Decoded::Invalid(reason) => {
                tracing::warn!(key, %reason, "Discarding unreadable stored value");
                self.remove_item(key).await?;
                Ok(LoadOutcome::Corrupt)
            }
        }
    }
}

enum Decoded<T> {
    Current(T),
    Legacy(T),
    Invalid(String),
}

fn decode<T: DeserializeOwned>(raw: &str) -> Decoded<T> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return Decoded::Invalid(format!("not JSON: {}", e)),
    };

    let is_envelope = value
        .as_object()
        .is_some_and(|o| o.contains_key("version") && o.contains_key("data"));

    if !is_envelope {
        return match serde_json::from_value(value) {
            Ok(v) => Decoded::Legacy(v),
            Err(e) => Decoded::Invalid(format!("unversioned value does not match schema: {}", e)),
        };
    }

    let envelope: StoredEnvelope = match serde_json::from_value(value) {
        Ok(env) => env,
        Err(e) => return Decoded::Invalid(format!("malformed envelope: {}", e)),
    };

    if envelope.version > SCHEMA_VERSION {
        return Decoded::Invalid(format!(
            "schema v{} is newer than supported v{}",
            envelope.version, SCHEMA_VERSION
        ));
    }

    match serde_json::from_value(envelope.data) {
        Ok(v) if envelope.version == SCHEMA_VERSION => Decoded::Current(v),
        Ok(v) => Decoded::Legacy(v),
        Err(e) => Decoded::Invalid(format!("payload does not match schema: {}", e)),
    }
}
