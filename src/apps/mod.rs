//! Application registry
//!
//! Every app ships its migrations as plain values. The history used by a
//! process is built once from the apps enabled in its configuration.

pub mod video;

use crate::migration::{Migration, MigrationError, MigrationHistory, MigrationResult};

/// Labels of every app this build knows about
pub const KNOWN_APPS: &[&str] = &[video::APP];

/// Migrations of one app, or `None` if the label is unknown
pub fn migrations(app: &str) -> Option<Vec<Migration>> {
    match app {
        video::APP => Some(video::migrations()),
        _ => None,
    }
}

/// Builds the validated history of the enabled apps.
///
/// # Errors
///
/// `DELTA_UNKNOWN_APP` for an unknown label, or any graph validation error.
pub fn history(enabled: &[String]) -> MigrationResult<MigrationHistory> {
    let mut all = Vec::new();
    for app in enabled {
        let mut app_migrations = migrations(app).ok_or_else(|| MigrationError::unknown_app(app))?;
        all.append(&mut app_migrations);
    }
    MigrationHistory::new(all)
}
