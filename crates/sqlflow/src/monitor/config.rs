use std::time::Duration;

/// Timeout and monitoring switches for [`InstrumentedClient`](super::InstrumentedClient).
///
/// Monitoring is off by default; hooks run regardless.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorConfig {
    /// Interrupt statements running longer than this.
    pub query_timeout: Option<Duration>,
    /// Statements slower than this trigger `on_slow_query`.
    pub slow_query_threshold: Option<Duration>,
    pub monitoring_enabled: bool,
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements exceeding `timeout` are interrupted and fail with
    /// [`OrmError::Timeout`](crate::OrmError::Timeout).
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn enable_monitoring(mut self) -> Self {
        self.monitoring_enabled = true;
        self
    }

    pub fn disable_monitoring(mut self) -> Self {
        self.monitoring_enabled = false;
        self
    }

    pub(crate) fn is_slow(&self, duration: Duration) -> bool {
        self.slow_query_threshold.is_some_and(|t| duration > t)
    }
}
