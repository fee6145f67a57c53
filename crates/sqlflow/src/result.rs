//! Strategies that turn an executed statement into a typed result.
//!
//! A [`ResultFactory`] receives the compiled statement and the client exactly once per
//! execution. The standard factories cover the usual shapes:
//!
//! | Factory | Output | Zero rows |
//! |---|---|---|
//! | [`NoResult`] | `()` | - |
//! | [`AffectedRows`] | `u64` | - |
//! | [`InsertRowId`] | `i64` | - |
//! | [`ScalarLong`] | `i64` | `0` |
//! | [`ScalarString`] | `Option<String>` | `None` |
//! | [`SingleRow<T>`] | `T` | [`OrmError::NotFound`] |
//! | [`OptionalRow<T>`] | `Option<T>` | `None` |
//! | [`RowList<T>`] | `Vec<T>` | empty vec |
//! | [`HasData`] | `bool` | `false` (errors also degrade to `false`) |

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::qb::CompiledQuery;
use crate::row::{FromRow, Row};
use crate::value::SqlValue;
use std::fmt;
use std::marker::PhantomData;

/// Produces an `R` from a compiled statement.
pub trait ResultFactory<R>: Send + Sync {
    fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> impl std::future::Future<Output = OrmResult<R>> + Send;
}

/// Execute and discard the outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResult;

impl ResultFactory<()> for NoResult {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<()> {
        conn.execute(query.sql(), query.params()).await?;
        Ok(())
    }
}

/// Number of rows changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AffectedRows;

impl ResultFactory<u64> for AffectedRows {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<u64> {
        conn.execute(query.sql(), query.params()).await
    }
}

/// Rowid of the inserted row.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertRowId;

impl ResultFactory<i64> for InsertRowId {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<i64> {
        conn.execute_insert(query.sql(), query.params()).await
    }
}

fn first_value(row: Option<Row>) -> Option<SqlValue> {
    row.and_then(|r| r.into_values().into_iter().next())
}

fn first_column_name(row: &Option<Row>) -> String {
    row.as_ref()
        .and_then(|r| r.columns().first().cloned())
        .unwrap_or_else(|| "0".to_string())
}

/// First column of the first row as an integer; `0` when there is no row or it is NULL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarLong;

impl ResultFactory<i64> for ScalarLong {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<i64> {
        let row = conn.query_opt(query.sql(), query.params()).await?;
        let column = first_column_name(&row);
        match first_value(row) {
            None | Some(SqlValue::Null) => Ok(0),
            Some(SqlValue::Integer(v)) => Ok(v),
            Some(SqlValue::Real(v)) => Ok(v as i64),
            Some(SqlValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| OrmError::decode(column, e.to_string())),
            Some(SqlValue::Blob(_)) => Err(OrmError::decode(column, "BLOB is not an integer")),
        }
    }
}

/// First column of the first row as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarString;

impl ResultFactory<Option<String>> for ScalarString {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<Option<String>> {
        let row = conn.query_opt(query.sql(), query.params()).await?;
        let column = first_column_name(&row);
        match first_value(row) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Text(s)) => Ok(Some(s)),
            Some(SqlValue::Integer(v)) => Ok(Some(v.to_string())),
            Some(SqlValue::Real(v)) => Ok(Some(v.to_string())),
            Some(SqlValue::Blob(b)) => String::from_utf8(b)
                .map(Some)
                .map_err(|e| OrmError::decode(column, e.to_string())),
        }
    }
}

macro_rules! row_factory {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<T>(PhantomData<fn() -> T>);

        impl<T> $name<T> {
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self::new()
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}<{}>", stringify!($name), std::any::type_name::<T>())
            }
        }
    };
}

row_factory!(
    /// Exactly one row mapped to `T`; [`OrmError::NotFound`] when there is none.
    SingleRow
);
row_factory!(
    /// At most one row mapped to `T`.
    OptionalRow
);
row_factory!(
    /// All rows mapped to `T`. Zero rows is an empty vec, never an error.
    RowList
);

impl<T: FromRow> ResultFactory<T> for SingleRow<T> {
    async fn create_result<C: GenericClient>(&self, query: &CompiledQuery, conn: &C) -> OrmResult<T> {
        let row = conn.query_one(query.sql(), query.params()).await?;
        T::from_row(&row)
    }
}

impl<T: FromRow> ResultFactory<Option<T>> for OptionalRow<T> {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<Option<T>> {
        let row = conn.query_opt(query.sql(), query.params()).await?;
        row.as_ref().map(T::from_row).transpose()
    }
}

impl<T: FromRow> ResultFactory<Vec<T>> for RowList<T> {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<Vec<T>> {
        let rows = conn.query(query.sql(), query.params()).await?;
        rows.iter().map(T::from_row).collect()
    }
}

/// Whether the statement returns at least one row.
///
/// Advisory: driver errors are logged at WARN and reported as `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasData;

impl ResultFactory<bool> for HasData {
    async fn create_result<C: GenericClient>(
        &self,
        query: &CompiledQuery,
        conn: &C,
    ) -> OrmResult<bool> {
        match conn.query_opt(query.sql(), query.params()).await {
            Ok(row) => Ok(row.is_some()),
            Err(error) => {
                tracing::warn!(
                    target: "sqlflow.result",
                    sql = query.sql(),
                    %error,
                    "existence check failed, reporting no data"
                );
                Ok(false)
            }
        }
    }
}
