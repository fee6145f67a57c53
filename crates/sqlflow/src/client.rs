//! Generic client trait for unified database access.

use crate::convert::ConverterRegistry;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::SqlValue;
use std::sync::{Arc, Mutex, PoisonError};

/// A trait over the storage collaborator that executes compiled statements.
///
/// Builders and result factories only talk to this trait, so a monitored client
/// ([`InstrumentedClient`](crate::monitor::InstrumentedClient)) or a test double can stand in
/// for [`SqliteClient`](crate::SqliteClient).
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`OrmError::NotFound`]
    /// - 1 or more rows: returns the first row
    fn query_one(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<Row>> + Send {
        async move {
            self.query_opt(sql, params)
                .await?
                .ok_or_else(|| OrmError::not_found("Expected 1 row, got 0"))
        }
    }

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<Option<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Execute an INSERT and return the rowid of the inserted row.
    fn execute_insert(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<i64>> + Send;

    /// Converters used when compiling statements for this client.
    fn converters(&self) -> &ConverterRegistry {
        ConverterRegistry::builtin()
    }

    /// Handle for interrupting the statement currently running on this client.
    ///
    /// Only called through [`StatementToken::cancel`], while the token's statement holds
    /// the connection.
    fn interrupt_handle(&self) -> Option<Arc<rusqlite::InterruptHandle>> {
        None
    }
}

impl<C: GenericClient> GenericClient for &C {
    fn query(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn query_opt(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<Option<Row>>> + Send {
        (**self).query_opt(sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }

    fn execute_insert(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl std::future::Future<Output = OrmResult<i64>> + Send {
        (**self).execute_insert(sql, params)
    }

    fn converters(&self) -> &ConverterRegistry {
        (**self).converters()
    }

    fn interrupt_handle(&self) -> Option<Arc<rusqlite::InterruptHandle>> {
        (**self).interrupt_handle()
    }
}

/// Where a tracked call is on its way through the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementState {
    /// Waiting for the connection.
    #[default]
    Queued,
    /// Holding the connection and executing.
    Running,
    /// Done with the connection.
    Finished,
    /// Cancelled before it reached the connection; it will never run.
    Cancelled,
}

tokio::task_local! {
    static CURRENT_TOKEN: Arc<StatementToken>;
}

/// Per-call cancellation token.
///
/// The caller installs it with [`scope`](Self::scope); a client that owns a connection picks
/// it up with [`current`](Self::current) and reports [`begin`](Self::begin) and
/// [`finish`](Self::finish) while it holds the connection lock. [`cancel`](Self::cancel)
/// either stops a queued call from ever running or interrupts it while it is the statement
/// on the connection, never someone else's.
#[derive(Debug, Default)]
pub struct StatementToken {
    state: Mutex<StatementState>,
}

impl StatementToken {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The token installed for the running task, if any.
    pub fn current() -> Option<Arc<Self>> {
        CURRENT_TOKEN.try_with(Arc::clone).ok()
    }

    /// Run `future` with this token as the current one.
    pub async fn scope<F: std::future::Future>(self: Arc<Self>, future: F) -> F::Output {
        CURRENT_TOKEN.scope(self, future).await
    }

    pub fn state(&self) -> StatementState {
        *self.lock()
    }

    /// Mark the call as running. Returns `false` when it was cancelled and must be skipped.
    pub fn begin(&self) -> bool {
        let mut state = self.lock();
        if *state == StatementState::Cancelled {
            return false;
        }
        *state = StatementState::Running;
        true
    }

    /// Mark the call as done with the connection. Must run before the connection is released.
    pub fn finish(&self) {
        let mut state = self.lock();
        if *state == StatementState::Running {
            *state = StatementState::Finished;
        }
    }

    /// Cancel the call and return the state it was in.
    ///
    /// A queued call becomes [`StatementState::Cancelled`]. A running call gets `interrupt`
    /// invoked while the state is held, so the statement cannot finish and hand the
    /// connection to another caller in between.
    pub fn cancel(&self, interrupt: impl FnOnce()) -> StatementState {
        let mut state = self.lock();
        let seen = *state;
        match seen {
            StatementState::Queued => *state = StatementState::Cancelled,
            StatementState::Running => interrupt(),
            StatementState::Finished | StatementState::Cancelled => {}
        }
        seen
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatementState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
