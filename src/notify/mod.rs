//! User-visible notification surface.
//!
//! The alert engine calls into a [`Notifier`] opportunistically. Whether a notification
//! is delivered never affects alert bookkeeping.

use std::str::FromStr;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Title used for every alert notification.
pub const ALERT_NOTIFICATION_TITLE: &str = "Farm Protection Alert";

/// Platform permission state for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Not asked yet
    Default,
    Granted,
    Denied,
}

/// How a permission prompt is answered by this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPolicy {
    /// Already granted at start-up
    Granted,
    /// Already denied at start-up
    Denied,
    /// Starts at `Default`, granted when requested
    Prompt,
}

impl FromStr for NotificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(NotificationPolicy::Granted),
            "denied" => Ok(NotificationPolicy::Denied),
            "prompt" | "default" => Ok(NotificationPolicy::Prompt),
            other => Err(format!("unknown notification policy '{}'", other)),
        }
    }
}

/// A notification as handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Ask for permission. Returns the resulting state.
    fn request_permission(&self) -> NotificationPermission;

    fn notify(&self, notification: &Notification);
}

/// Notifier that writes notifications to the log.
pub struct TracingNotifier {
    policy: NotificationPolicy,
    permission: RwLock<NotificationPermission>,
}

impl TracingNotifier {
    pub fn new(policy: NotificationPolicy) -> Self {
        let permission = match policy {
            NotificationPolicy::Granted => NotificationPermission::Granted,
            NotificationPolicy::Denied => NotificationPermission::Denied,
            NotificationPolicy::Prompt => NotificationPermission::Default,
        };
        Self {
            policy,
            permission: RwLock::new(permission),
        }
    }
}

impl Notifier for TracingNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
            .read()
            .map(|p| *p)
            .unwrap_or(NotificationPermission::Denied)
    }

    fn request_permission(&self) -> NotificationPermission {
        let Ok(mut permission) = self.permission.write() else {
            return NotificationPermission::Denied;
        };

        // Only an unanswered prompt can change; an explicit answer sticks.
        if *permission == NotificationPermission::Default {
            *permission = match self.policy {
                NotificationPolicy::Denied => NotificationPermission::Denied,
                NotificationPolicy::Granted | NotificationPolicy::Prompt => {
                    NotificationPermission::Granted
                }
            };
            tracing::info!(permission = ?*permission, "Notification permission answered");
        }

        *permission
    }

    fn notify(&self, notification: &Notification) {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            "Notification"
        );
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_policy_grants_on_request() {
        let notifier = TracingNotifier::new(NotificationPolicy::Prompt);
        assert_eq!(notifier.permission(), NotificationPermission::Default);
        assert_eq!(
            notifier.request_permission(),
            NotificationPermission::Granted
        );
        assert_eq!(notifier.permission(), NotificationPermission::Granted);
    }

    #[test]
    fn test_denied_policy_sticks() {
        let notifier = TracingNotifier::new(NotificationPolicy::Denied);
        assert_eq!(notifier.permission(), NotificationPermission::Denied);
        assert_eq!(notifier.request_permission(), NotificationPermission::Denied);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Granted".parse(), Ok(NotificationPolicy::Granted));
        assert_eq!(" default ".parse(), Ok(NotificationPolicy::Prompt));
        assert!("maybe".parse::<NotificationPolicy>().is_err());
    }
}
