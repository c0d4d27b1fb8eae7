//! Data models for the FarmProtect dashboard.
//!
//! Field names serialize in camelCase so persisted records match the dashboard's shapes.

mod alert;
mod camera;
mod user;

pub use alert::*;
pub use camera::*;
pub use user::*;

/// Case-insensitive substring match used by the list filters.
///
/// An empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}
