use super::config::MonitorConfig;
use super::monitors::{CompositeHook, NoopMonitor};
use super::types::{HookAction, QueryContext, QueryHook, QueryMonitor, QueryResult};
use crate::client::{GenericClient, StatementState, StatementToken};
use crate::convert::ConverterRegistry;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::SqlValue;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A [`GenericClient`] wrapper that runs hooks, reports to a monitor and enforces the
/// configured query timeout.
///
/// On timeout a call still waiting for the connection is cancelled and never runs. A call
/// already executing is interrupted through the inner client's
/// [`interrupt_handle`](GenericClient::interrupt_handle) and awaited, so [`OrmError::Timeout`]
/// is only reported when the statement did not take effect. A statement that completed
/// before the interrupt landed returns its real result.
pub struct InstrumentedClient<C> {
    client: C,
    monitor: Arc<dyn QueryMonitor>,
    hook: Option<Arc<dyn QueryHook>>,
    config: MonitorConfig,
}

impl<C: GenericClient> InstrumentedClient<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            monitor: Arc::new(NoopMonitor),
            hook: None,
            config: MonitorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_monitor<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.with_monitor_arc(Arc::new(monitor))
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Replace any existing hook.
    pub fn with_hook<H: QueryHook + 'static>(mut self, hook: H) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Add a hook after the existing ones.
    pub fn add_hook<H: QueryHook + 'static>(self, hook: H) -> Self {
        self.add_hook_arc(Arc::new(hook))
    }

    pub fn add_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.hook = Some(match self.hook.take() {
            None => hook,
            Some(existing) => Arc::new(CompositeHook::new().add_arc(existing).add_arc(hook)),
        });
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = Some(timeout);
        self
    }

    pub fn enable_monitoring(mut self) -> Self {
        self.config.monitoring_enabled = true;
        self
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.config.monitoring_enabled
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    fn prepare(&self, sql: &str, param_count: usize) -> OrmResult<QueryContext> {
        let mut ctx = QueryContext::new(sql, param_count);
        if let Some(hook) = &self.hook {
            match hook.before_query(&ctx) {
                HookAction::Continue => {}
                HookAction::ModifySql(sql) => ctx.replace_sql(sql),
                HookAction::Abort(reason) => {
                    return Err(OrmError::validation(format!(
                        "Query aborted by hook: {reason}"
                    )));
                }
            }
        }
        if self.config.monitoring_enabled {
            self.monitor.on_query_start(&ctx);
        }
        Ok(ctx)
    }

    fn report(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        if !self.config.monitoring_enabled {
            return;
        }
        if let Some(hook) = &self.hook {
            hook.after_query(ctx, duration, result);
        }
        self.monitor.on_query_complete(ctx, duration, result);
        if self.config.is_slow(duration) {
            self.monitor.on_slow_query(ctx, duration);
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>> + Send,
    {
        let Some(timeout) = self.config.query_timeout else {
            return future.await;
        };
        let token = StatementToken::new();
        let future = Arc::clone(&token).scope(future);
        tokio::pin!(future);
        tokio::select! {
            result = &mut future => return result,
            _ = tokio::time::sleep(timeout) => {}
        }

        let seen = token.cancel(|| {
            if let Some(handle) = self.client.interrupt_handle() {
                handle.interrupt();
            }
        });
        match seen {
            // Never reached the connection and never will.
            StatementState::Queued | StatementState::Cancelled => Err(OrmError::Timeout(timeout)),
            // Wait for the statement to unwind so the outcome reflects what happened.
            StatementState::Running => match future.await {
                Err(e) if e.is_interrupted() => Err(OrmError::Timeout(timeout)),
                other => other,
            },
            StatementState::Finished => future.await,
        }
    }

    async fn observe<T, F>(
        &self,
        ctx: &QueryContext,
        future: F,
        summarize: fn(&T) -> QueryResult,
    ) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>> + Send,
    {
        let start = Instant::now();
        let result = self.with_timeout(future).await;
        let outcome = match &result {
            Ok(value) => summarize(value),
            Err(OrmError::Timeout(d)) => QueryResult::error(format!("timeout after {d:?}")),
            Err(e) => QueryResult::error(e.to_string()),
        };
        self.report(ctx, start.elapsed(), &outcome);
        result
    }
}

impl<C: GenericClient> GenericClient for InstrumentedClient<C> {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> OrmResult<Vec<Row>> {
        let ctx = self.prepare(sql, params.len())?;
        self.observe(&ctx, self.client.query(&ctx.sql, params), |rows| {
            QueryResult::Rows(rows.len())
        })
        .await
    }

    async fn query_opt(&self, sql: &str, params: &[SqlValue]) -> OrmResult<Option<Row>> {
        let ctx = self.prepare(sql, params.len())?;
        self.observe(&ctx, self.client.query_opt(&ctx.sql, params), |row| {
            QueryResult::OptionalRow(row.is_some())
        })
        .await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> OrmResult<u64> {
        let ctx = self.prepare(sql, params.len())?;
        self.observe(&ctx, self.client.execute(&ctx.sql, params), |n| {
            QueryResult::Affected(*n)
        })
        .await
    }

    async fn execute_insert(&self, sql: &str, params: &[SqlValue]) -> OrmResult<i64> {
        let ctx = self.prepare(sql, params.len())?;
        self.observe(&ctx, self.client.execute_insert(&ctx.sql, params), |id| {
            QueryResult::Inserted(*id)
        })
        .await
    }

    fn converters(&self) -> &ConverterRegistry {
        self.client.converters()
    }

    fn interrupt_handle(&self) -> Option<Arc<rusqlite::InterruptHandle>> {
        self.client.interrupt_handle()
    }
}
