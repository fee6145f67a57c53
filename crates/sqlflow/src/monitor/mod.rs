//! Statement monitoring, hooks and timeouts.
//!
//! [`InstrumentedClient`] wraps any [`GenericClient`](crate::GenericClient). Hooks see every
//! statement before it runs and may rewrite or veto it; monitors receive timings once
//! monitoring is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlflow::monitor::{InstrumentedClient, LoggingMonitor, MonitorConfig, TracingSqlHook};
//! use std::time::Duration;
//!
//! let config = MonitorConfig::new()
//!     .with_query_timeout(Duration::from_secs(5))
//!     .with_slow_query_threshold(Duration::from_millis(200))
//!     .enable_monitoring();
//!
//! let client = InstrumentedClient::new(SqliteClient::open("app.db")?)
//!     .with_config(config)
//!     .with_monitor(LoggingMonitor::new())
//!     .with_hook(TracingSqlHook::new());
//! ```

mod config;
mod instrumented;
mod monitors;
mod tracing_hook;
mod types;


pub use config::MonitorConfig;
pub use instrumented::InstrumentedClient;
pub use monitors::{
    CompositeHook, CompositeMonitor, LoggingMonitor, NoopMonitor, QueryStats, StatsMonitor,
};
pub use tracing_hook::TracingSqlHook;
pub use types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryType};

/// Longest prefix of `sql` within `max_bytes` that ends on a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn truncate_display(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}
