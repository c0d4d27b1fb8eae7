//! Demo authentication.
//!
//! Credentials live in a fixed in-memory table. The signed-in user is persisted so a
//! restart keeps the session. Password checks use constant-time comparison.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::User;
use crate::storage::{KvStore, LoadOutcome, USER_KEY};

/// A row of the demo credential table.
struct DemoCredential {
    id: &'static str,
    email: &'static str,
    password: &'static str,
    name: &'static str,
}

impl DemoCredential {
    fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: self.email.to_string(),
            name: self.name.to_string(),
        }
    }
}

const DEMO_USERS: &[DemoCredential] = &[DemoCredential {
    id: "1",
    email: "demo@farmprotect.com",
    password: "password123",
    name: "Demo User",
}];

/// Holds the current session.
pub struct AuthStore {
    kv: KvStore,
    session: RwLock<Option<User>>,
    delay: Duration,
}

impl AuthStore {
    pub fn new(kv: KvStore, delay: Duration) -> Self {
        Self {
            kv,
            session: RwLock::new(None),
            delay,
        }
    }

    /// Restore a persisted session, if any.
    pub async fn restore(&self) -> Result<Option<User>, AppError> {
        let user = match self.kv.load::<User>(USER_KEY).await? {
            LoadOutcome::Corrupt => {
                tracing::warn!("Stored session was unreadable; starting signed out");
                None
            }
            outcome => outcome.into_option(),
        };

        if let Some(user) = &user {
            tracing::info!(user_id = %user.id, "Restored session");
        }

        *self.session.write().await = user.clone();
        Ok(user)
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        self.simulate_latency().await;

        let found = DEMO_USERS
            .iter()
            .find(|u| u.email == email && constant_time_compare(password, u.password));

        let Some(credential) = found else {
            tracing::info!(email, "Login rejected");
            return Err(AppError::InvalidCredentials(
                "Invalid email or password".to_string(),
            ));
        };

        let user = credential.to_user();
        self.start_session(user.clone()).await?;
        tracing::info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Create a session for a new account.
    ///
    /// The credential table is not extended, so the account cannot log in again after
    /// logging out, and every registration gets the same id.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        _password: &str,
    ) -> Result<User, AppError> {
        self.simulate_latency().await;

        if DEMO_USERS.iter().any(|u| u.email == email) {
            return Err(AppError::UserExists("User already exists".to_string()));
        }

        let user = User {
            id: (DEMO_USERS.len() + 1).to_string(),
            email: email.to_string(),
            name: name.to_string(),
        };

        self.start_session(user.clone()).await?;
        tracing::info!(user_id = %user.id, "Registered");
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        let mut session = self.session.write().await;
        self.kv.remove_item(USER_KEY).await?;
        if let Some(user) = session.take() {
            tracing::info!(user_id = %user.id, "Logged out");
        }
        Ok(())
    }

    async fn start_session(&self, user: User) -> Result<(), AppError> {
        let mut session = self.session.write().await;
        self.kv.save(USER_KEY, &user).await?;
        *session = Some(user);
        Ok(())
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Middleware rejecting requests when nobody is signed in.
pub async fn require_session(
    State(auth): State<Arc<AuthStore>>,
    request: Request,
    next: Next,
) -> Response {
    if auth.is_authenticated().await {
        next.run(request).await
    } else {
        AppError::Unauthorized("Sign in required".to_string()).into_response()
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
