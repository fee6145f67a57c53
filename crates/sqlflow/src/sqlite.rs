//! SQLite storage collaborator backed by `rusqlite`.

use crate::client::{GenericClient, StatementToken};
use crate::config::SqliteConfig;
use crate::convert::{ConverterRegistry, TypeConverter};
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::SqlValue;
use rusqlite::{Connection, InterruptHandle, OpenFlags, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A single SQLite connection shared behind a mutex.
///
/// Every statement runs on tokio's blocking pool; rows are materialized there and handed
/// back owned. Cloning shares the connection.
#[derive(Clone)]
pub struct SqliteClient {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
    converters: Arc<ConverterRegistry>,
}

impl std::fmt::Debug for SqliteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteClient")
            .field("converters", &self.converters)
            .finish_non_exhaustive()
    }
}

impl SqliteClient {
    /// Open (or create) a database file with default settings.
    pub fn open(path: impl AsRef<Path>) -> OrmResult<Self> {
        Self::with_config(&SqliteConfig::file(path))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> OrmResult<Self> {
        Self::with_config(&SqliteConfig::new())
    }

    /// Open a connection and apply the configured pragmas.
    pub fn with_config(config: &SqliteConfig) -> OrmResult<Self> {
        let conn = match &config.path {
            Some(path) => {
                let flags = if config.read_only {
                    OpenFlags::SQLITE_OPEN_READ_ONLY
                        | OpenFlags::SQLITE_OPEN_URI
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX
                } else {
                    OpenFlags::default()
                };
                Connection::open_with_flags(path, flags).map_err(OrmError::from_db_error)?
            }
            None => Connection::open_in_memory().map_err(OrmError::from_db_error)?,
        };

        conn.busy_timeout(config.busy_timeout_duration())
            .map_err(OrmError::from_db_error)?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)
            .map_err(OrmError::from_db_error)?;

        let journal_mode = if config.path.is_some() && !config.read_only {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_str(), |row| {
                    row.get(0)
                })
                .map_err(OrmError::from_db_error)?;
            Some(mode)
        } else {
            None
        };

        tracing::debug!(
            target: "sqlflow.sqlite",
            path = ?config.path,
            read_only = config.read_only,
            foreign_keys = config.foreign_keys,
            journal_mode = journal_mode.as_deref().unwrap_or("memory"),
            "opened sqlite connection"
        );

        Ok(Self::from_connection(conn))
    }

    /// Wrap an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            converters: Arc::new(ConverterRegistry::with_builtins()),
        }
    }

    /// Replace the converter registry used to compile statements for this client.
    pub fn with_converters(mut self, registry: ConverterRegistry) -> Self {
        self.converters = Arc::new(registry);
        self
    }

    /// Register an additional converter on this client's registry.
    pub fn register_converter<C: TypeConverter>(&mut self, converter: C) -> &mut Self {
        Arc::make_mut(&mut self.converters).register(converter);
        self
    }

    /// Interrupt the statement currently running on this connection, if any.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    /// Run a batch of semicolon-separated statements without parameters.
    pub async fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        let sql = sql.to_string();
        self.with_conn(move |conn| conn.execute_batch(&sql).map_err(OrmError::from_db_error))
            .await
    }

    async fn with_conn<T, F>(&self, f: F) -> OrmResult<T>
    where
        F: FnOnce(&Connection) -> OrmResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let token = StatementToken::current();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| OrmError::Other("sqlite connection mutex poisoned".to_string()))?;
            let Some(token) = token else {
                return f(&guard);
            };
            if !token.begin() {
                tracing::debug!(target: "sqlflow.sqlite", "skipping cancelled statement");
                return Err(OrmError::Other("statement cancelled before it ran".to_string()));
            }
            let result = f(&guard);
            token.finish();
            result
        })
        .await
        .map_err(|e| OrmError::Other(format!("sqlite task failed: {e}")))?
    }
}

fn fetch_rows(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
    limit: Option<usize>,
) -> OrmResult<Vec<Row>> {
    let mut stmt = conn.prepare(sql).map_err(OrmError::from_db_error)?;
    let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt
        .query(params_from_iter(params.iter()))
        .map_err(OrmError::from_db_error)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(OrmError::from_db_error)? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(row.get::<_, SqlValue>(i).map_err(OrmError::from_db_error)?);
        }
        out.push(Row::new(Arc::clone(&columns), values));
        if limit.is_some_and(|n| out.len() >= n) {
            break;
        }
    }
    Ok(out)
}

fn run_statement(conn: &Connection, sql: &str, params: &[SqlValue]) -> OrmResult<usize> {
    let mut stmt = conn.prepare(sql).map_err(OrmError::from_db_error)?;
    stmt.execute(params_from_iter(params.iter()))
        .map_err(OrmError::from_db_error)
}

impl GenericClient for SqliteClient {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> OrmResult<Vec<Row>> {
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_conn(move |conn| fetch_rows(conn, &sql, &params, None))
            .await
    }

    async fn query_opt(&self, sql: &str, params: &[SqlValue]) -> OrmResult<Option<Row>> {
        let (sql, params) = (sql.to_string(), params.to_vec());
        let rows = self
            .with_conn(move |conn| fetch_rows(conn, &sql, &params, Some(1)))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> OrmResult<u64> {
        let (sql, params) = (sql.to_string(), params.to_vec());
        let changed = self
            .with_conn(move |conn| run_statement(conn, &sql, &params))
            .await?;
        Ok(changed as u64)
    }

    async fn execute_insert(&self, sql: &str, params: &[SqlValue]) -> OrmResult<i64> {
        let (sql, params) = (sql.to_string(), params.to_vec());
        self.with_conn(move |conn| {
            run_statement(conn, &sql, &params)?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    fn interrupt_handle(&self) -> Option<Arc<InterruptHandle>> {
        Some(Arc::clone(&self.interrupt))
    }
}
