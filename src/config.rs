//! Configuration types for the scheduler.

use serde::Deserialize;

/// Scheduler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Shared store configuration.
    pub store: StoreConfig,
    /// Cache bootstrap configuration.
    pub bootstrap: BootstrapConfig,
}

/// Shared store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection URL.
    pub url: String,
    /// Database index; determines the keyspace-notification channel prefix.
    pub database: u32,
    /// Maximum pool connections.
    pub max_connections: usize,
    /// Issue `CONFIG SET notify-keyspace-events AKE` at startup.
    ///
    /// Disable for managed stores that forbid CONFIG and have notifications
    /// enabled out of band.
    pub configure_notifications: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_owned(),
            database: 0,
            max_connections: 4,
            configure_notifications: true,
        }
    }
}

/// Cache bootstrap configuration.
///
/// The minimal contract only guarantees correct behaviour for events observed
/// after subscription begins, so seeding is off by default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Seed caches by scanning existing keys before subscribing.
    pub seed_on_start: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { seed_on_start: false }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.store.url, "redis://localhost:6379");
        assert_eq!(config.store.database, 0);
        assert!(config.store.configure_notifications);
        assert!(!config.bootstrap.seed_on_start);
    }
}
