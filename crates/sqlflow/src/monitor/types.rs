use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// The kind of statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    /// `INSERT` and `REPLACE`
    Insert,
    Update,
    Delete,
    /// DDL, pragmas and anything else
    Other,
}

impl QueryType {
    /// Classify a statement by its leading keyword.
    ///
    /// Comments and opening parentheses are skipped. For `WITH` the keyword after the last
    /// top-level CTE body decides.
    pub fn from_sql(sql: &str) -> Self {
        use crate::qb::{starts_with_keyword, strip_sql_prefix};

        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") || starts_with_keyword(trimmed, "VALUES") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") || starts_with_keyword(trimmed, "REPLACE")
        {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else if starts_with_keyword(trimmed, "WITH") {
            Self::after_cte(trimmed)
        } else {
            QueryType::Other
        }
    }

    /// Classify the statement that follows the CTE list of a `WITH` statement.
    fn after_cte(sql: &str) -> Self {
        use crate::qb::{starts_with_keyword, strip_sql_prefix};

        let bytes = sql.as_bytes();
        let mut depth = 0i32;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let rest = strip_sql_prefix(&sql[i + 1..]);
                        // `, next AS (...)` or `name(cols) AS (...)` keep the CTE list going
                        if !rest.starts_with(',') && !starts_with_keyword(rest, "AS") {
                            return Self::main_statement(rest);
                        }
                    }
                }
                quote @ (b'\'' | b'"' | b'`') => {
                    i += 1;
                    while i < bytes.len() {
                        if bytes[i] == quote {
                            if bytes.get(i + 1) == Some(&quote) {
                                i += 1;
                            } else {
                                break;
                            }
                        }
                        i += 1;
                    }
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i += 2;
                    while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                        i += 1;
                    }
                    i += 1;
                }
                _ => {}
            }
            i += 1;
        }
        QueryType::Select
    }

    fn main_statement(rest: &str) -> Self {
        use crate::qb::starts_with_keyword;

        if starts_with_keyword(rest, "INSERT") || starts_with_keyword(rest, "REPLACE") {
            QueryType::Insert
        } else if starts_with_keyword(rest, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(rest, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Select
        }
    }
}

/// What the monitoring layer knows about a statement.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// SQL sent to the connection (hooks may have rewritten it).
    pub sql: String,
    /// Number of bound parameters.
    pub param_count: usize,
    pub query_type: QueryType,
    /// Optional label supplied by the caller.
    pub tag: Option<String>,
    /// Low-cardinality structured fields.
    pub fields: BTreeMap<String, String>,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize) -> Self {
        Self {
            sql: sql.to_string(),
            param_count,
            query_type: QueryType::from_sql(sql),
            tag: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub(crate) fn replace_sql(&mut self, sql: String) {
        self.query_type = QueryType::from_sql(&sql);
        self.sql = sql;
    }
}

const MAX_ERROR_LEN: usize = 512;

/// Outcome of one statement as reported to monitors.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Rows(usize),
    Affected(u64),
    /// Rowid produced by an INSERT.
    Inserted(i64),
    OptionalRow(bool),
    /// Error message, truncated to 512 bytes.
    Error(String),
}

impl QueryResult {
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() <= MAX_ERROR_LEN {
            return Self::Error(msg);
        }
        Self::Error(format!(
            "{}...",
            super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)
        ))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Inserted(id) => write!(f, "inserted rowid {id}"),
            QueryResult::OptionalRow(found) => f.write_str(if *found { "1 row" } else { "0 rows" }),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Observes statement execution.
pub trait QueryMonitor: Send + Sync {
    fn on_query_start(&self, _ctx: &QueryContext) {}

    /// Called once per statement, on success and on failure.
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called after `on_query_complete` when the statement exceeded the slow threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}
}

/// Decision returned by [`QueryHook::before_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum HookAction {
    Continue,
    /// Execute this SQL instead.
    ModifySql(String),
    /// Fail the call with a validation error.
    Abort(String),
}

/// Inspects, rewrites or vetoes statements before they run.
pub trait QueryHook: Send + Sync {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let _ = ctx;
        HookAction::Continue
    }

    fn after_query(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}
