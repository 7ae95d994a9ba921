//! Configuration for the resync engine.

use std::time::Duration;

/// Configuration for resync passes.
#[derive(Debug, Clone)]
pub struct ResyncConfig {
    /// Log progress every this many examined keys (0 disables).
    pub progress_interval: u64,
    /// Upper bound for a single throttling pause.
    pub max_pause: Option<Duration>,
    /// Whether to verify that both scans really arrive in key order.
    pub check_order: bool,
}

impl ResyncConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            progress_interval: 10_000,
            max_pause: None,
            check_order: true,
        }
    }

    /// Sets the progress logging interval.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Caps each throttling pause.
    pub fn with_max_pause(mut self, max_pause: Duration) -> Self {
        self.max_pause = Some(max_pause);
        self
    }

    /// Enables or disables the key order check.
    pub fn with_order_check(mut self, check_order: bool) -> Self {
        self.check_order = check_order;
        self
    }
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = ResyncConfig::new()
            .with_progress_interval(50)
            .with_max_pause(Duration::from_millis(250))
            .with_order_check(false);

        assert_eq!(config.progress_interval, 50);
        assert_eq!(config.max_pause, Some(Duration::from_millis(250)));
        assert!(!config.check_order);
    }

    #[test]
    fn defaults() {
        let config = ResyncConfig::default();
        assert_eq!(config.progress_interval, 10_000);
        assert!(config.max_pause.is_none());
        assert!(config.check_order);
    }
}
