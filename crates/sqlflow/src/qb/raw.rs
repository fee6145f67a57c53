//! Hand-written SQL with `?` placeholders.
//!
//! ```ignore
//! use sqlflow::qb::raw;
//!
//! let n: i64 = raw("SELECT count(*) FROM users WHERE name LIKE ?")
//!     .bind("a%")
//!     .fetch_one::<(i64,)>(&conn)
//!     .await?
//!     .0;
//! ```

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::monitor::QueryType;
use crate::notify::PrimaryAction;
use crate::qb::traits::{MutationQb, Query, SqlQb};
use crate::qb::writer::SqlWriter;
use crate::result::{OptionalRow, RowList, SingleRow};
use crate::row::FromRow;
use crate::value::{IntoValue, Value};

/// Strip leading whitespace, comments (`--`, `/* */`) and opening parentheses.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if let Some(rest) = s.strip_prefix("--") {
            match rest.find('\n') {
                Some(pos) => s = &rest[pos + 1..],
                None => return "",
            }
        } else if let Some(rest) = s.strip_prefix("/*") {
            match rest.find("*/") {
                Some(pos) => s = &rest[pos + 2..],
                None => return "",
            }
        } else if let Some(rest) = s.strip_prefix('(') {
            s = rest;
        }
        if s == before {
            return s;
        }
    }
}

/// Case-insensitive keyword match followed by a non-identifier character.
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    let Some(head) = s.get(..keyword.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(keyword) {
        return false;
    }
    match s.as_bytes().get(keyword.len()) {
        None => true,
        Some(&b) => !(b.is_ascii_alphanumeric() || b == b'_'),
    }
}

/// Split `sql` at each `?` that sits outside string literals, quoted identifiers and
/// comments.
fn split_placeholders(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
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
            b'[' => {
                while i < bytes.len() && bytes[i] != b']' {
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
            b'?' => {
                segments.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&sql[start.min(sql.len())..]);
    segments
}

/// A raw statement with bound values.
#[derive(Debug, Clone)]
pub struct RawQuery {
    sql: String,
    params: Vec<Value>,
    table: String,
}

impl RawQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            table: String::new(),
        }
    }

    /// Bind the next `?`.
    pub fn bind(mut self, value: impl IntoValue) -> Self {
        self.params.push(value.into_value());
        self
    }

    pub fn bind_all<V: IntoValue>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.params
            .extend(values.into_iter().map(IntoValue::into_value));
        self
    }

    /// Table reported to change listeners.
    pub fn affecting(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn query_type(&self) -> QueryType {
        QueryType::from_sql(&self.sql)
    }

    fn ensure_select(&self) -> OrmResult<()> {
        if self.query_type() == QueryType::Select {
            Ok(())
        } else {
            Err(OrmError::NotSelect(self.sql.clone()))
        }
    }

    pub fn fetch_all<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<Vec<T>>> + Send {
        async move {
            self.ensure_select()?;
            self.run(conn, &RowList::<T>::new()).await
        }
    }

    pub fn fetch_one<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<T>> + Send {
        async move {
            self.ensure_select()?;
            self.run(conn, &SingleRow::<T>::new()).await
        }
    }

    pub fn fetch_opt<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<Option<T>>> + Send {
        async move {
            self.ensure_select()?;
            self.run(conn, &OptionalRow::<T>::new()).await
        }
    }
}

impl Query for RawQuery {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        let segments = split_placeholders(&self.sql);
        let last = segments.len() - 1;
        for (i, segment) in segments.into_iter().enumerate() {
            w.push(segment);
            if i < last {
                match self.params.get(i) {
                    Some(value) => {
                        w.push_value(value, None, false);
                    }
                    None => {
                        w.push_char('?');
                    }
                }
            }
        }
    }
}

impl SqlQb for RawQuery {
    fn validate(&self) -> OrmResult<()> {
        let placeholders = split_placeholders(&self.sql).len() - 1;
        if placeholders != self.params.len() {
            return Err(OrmError::validation(format!(
                "statement has {placeholders} placeholders but {} values were bound",
                self.params.len()
            )));
        }
        Ok(())
    }
}

impl MutationQb for RawQuery {
    fn primary_action(&self) -> PrimaryAction {
        match self.query_type() {
            QueryType::Insert => PrimaryAction::Insert,
            QueryType::Update => PrimaryAction::Update,
            QueryType::Delete => PrimaryAction::Delete,
            QueryType::Select | QueryType::Other => PrimaryAction::Change,
        }
    }

    fn table_name(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConverterRegistry;
    use crate::qb::raw;
    use crate::value::SqlValue;

    #[test]
    fn keyword_detection() {
        assert!(starts_with_keyword("select 1", "SELECT"));
        assert!(starts_with_keyword("SELECT", "SELECT"));
        assert!(!starts_with_keyword("selection", "SELECT"));
        assert!(!starts_with_keyword("sel", "SELECT"));
        assert_eq!(strip_sql_prefix("  -- c\n /* d */ ((SELECT 1))"), "SELECT 1))");
        assert_eq!(strip_sql_prefix("-- only a comment"), "");
    }

    #[test]
    fn placeholders_skip_literals() {
        let q = raw("SELECT '?', \"a?\" FROM t WHERE x = ? -- ?\n AND y = ?")
            .bind(1)
            .bind("z");
        assert!(q.validate().is_ok());
        assert_eq!(
            q.to_sql(),
            "SELECT '?', \"a?\" FROM t WHERE x = 1 -- ?\n AND y = 'z'"
        );
        let compiled = q.compile(ConverterRegistry::builtin());
        assert_eq!(
            compiled.params(),
            &[SqlValue::Integer(1), SqlValue::Text("z".to_string())]
        );
    }

    #[test]
    fn bind_count_is_validated() {
        assert!(raw("SELECT ?").validate().is_err());
        assert!(raw("SELECT 1").bind(2).validate().is_err());
    }

    #[test]
    fn primary_action_from_text() {
        assert_eq!(raw("insert into t values (1)").primary_action(), PrimaryAction::Insert);
        assert_eq!(
            raw("WITH x AS (SELECT 1) UPDATE t SET a = 1").primary_action(),
            PrimaryAction::Update
        );
        assert_eq!(
            raw("WITH ids AS (SELECT 1) DELETE FROM t WHERE id IN (SELECT * FROM ids)")
                .primary_action(),
            PrimaryAction::Delete
        );
        assert_eq!(raw("DROP TABLE t").primary_action(), PrimaryAction::Change);
    }

    #[tokio::test]
    async fn fetch_rejects_non_select() {
        let conn = crate::SqliteClient::open_in_memory().unwrap();
        let err = raw("DELETE FROM t")
            .fetch_all::<crate::Row>(&conn)
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::NotSelect(_)));

        let err = raw("WITH ids AS (SELECT 1) DELETE FROM t WHERE id IN (SELECT * FROM ids)")
            .fetch_all::<crate::Row>(&conn)
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::NotSelect(_)));
    }
}
