use std::time::Duration;

/// Configuration for store recovery behavior.
///
/// # Example
///
/// ```rust
/// use statekv::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_min_recovery_ttl(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Minimum remaining TTL a volatile entry needs to survive recovery
    /// (default: 1 second). Entries closer to expiry than this are
    /// dropped instead of getting an expiration task.
    pub min_recovery_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_recovery_ttl: Duration::from_secs(1),
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum remaining TTL for entries restored from a
    /// snapshot.
    ///
    /// Arming a timer for an entry about to expire anyway is wasted
    /// work; anything below this threshold is dropped during recovery.
    pub fn with_min_recovery_ttl(mut self, ttl: Duration) -> Self {
        self.min_recovery_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.min_recovery_ttl, Duration::from_secs(1));
    }

    #[test]
    fn test_custom_recovery_ttl() {
        let config = StoreConfig::default().with_min_recovery_ttl(Duration::from_millis(250));
        assert_eq!(config.min_recovery_ttl, Duration::from_millis(250));
    }
}
