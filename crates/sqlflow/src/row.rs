//! Row mapping traits and utilities

use crate::convert::ConverterRegistry;
use crate::error::{OrmError, OrmResult};
use crate::value::SqlValue;
use rusqlite::types::{FromSql, ValueRef};
use std::any::Any;
use std::sync::Arc;

/// An owned result row.
///
/// Rows are materialized on the blocking pool and handed back to async code, so they own
/// their values. Column names are shared by every row of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

/// Column lookup by position or by name.
pub trait ColumnIndex {
    fn position(&self, row: &Row) -> OrmResult<usize>;
}

impl ColumnIndex for usize {
    fn position(&self, row: &Row) -> OrmResult<usize> {
        if *self < row.values.len() {
            Ok(*self)
        } else {
            Err(OrmError::decode(
                self.to_string(),
                format!("column index out of range (row has {})", row.values.len()),
            ))
        }
    }
}

impl ColumnIndex for &str {
    fn position(&self, row: &Row) -> OrmResult<usize> {
        row.columns
            .iter()
            .position(|c| c.as_str() == *self)
            .ok_or_else(|| OrmError::decode(*self, "no such column"))
    }
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw stored value.
    pub fn get_value(&self, index: impl ColumnIndex) -> OrmResult<&SqlValue> {
        let pos = index.position(self)?;
        Ok(&self.values[pos])
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    /// Decode a column with the driver's `FromSql` conversions.
    pub fn try_get<T: FromSql>(&self, index: impl ColumnIndex) -> OrmResult<T> {
        let pos = index.position(self)?;
        T::column_result(ValueRef::from(&self.values[pos]))
            .map_err(|e| OrmError::decode(self.column_label(pos), e.to_string()))
    }

    /// Decode a column through the converter registered for `T`.
    pub fn try_get_converted<T: Any>(
        &self,
        index: impl ColumnIndex,
        registry: &ConverterRegistry,
    ) -> OrmResult<T> {
        let pos = index.position(self)?;
        registry
            .decode::<T>(&self.values[pos])
            .map_err(|e| OrmError::decode(self.column_label(pos), e.to_string()))
    }

    fn column_label(&self, pos: usize) -> String {
        self.columns
            .get(pos)
            .cloned()
            .unwrap_or_else(|| pos.to_string())
    }
}

/// Trait for converting a result row into a Rust type.
///
/// # Example
///
/// ```ignore
/// use sqlflow::{FromRow, OrmResult, Row};
///
/// struct User {
///     id: i64,
///     username: String,
///     email: Option<String>,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> OrmResult<Self> {
///         Ok(Self {
///             id: row.try_get("id")?,
///             username: row.try_get("username")?,
///             email: row.try_get("email")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

macro_rules! impl_from_row_tuple {
    ($($t:ident => $i:tt),+) => {
        impl<$($t: FromSql),+> FromRow for ($($t,)+) {
            fn from_row(row: &Row) -> OrmResult<Self> {
                Ok(($(row.try_get::<$t>($i as usize)?,)+))
            }
        }
    };
}

impl_from_row_tuple!(A => 0);
impl_from_row_tuple!(A => 0, B => 1);
impl_from_row_tuple!(A => 0, B => 1, C => 2);
impl_from_row_tuple!(A => 0, B => 1, C => 2, D => 3);

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(
            Arc::from(vec!["id".to_string(), "name".to_string(), "born".to_string()]),
            vec![
                SqlValue::Integer(7),
                SqlValue::Null,
                SqlValue::Text("2001-09-09".to_string()),
            ],
        )
    }

    #[test]
    fn get_by_name_and_index() {
        let row = row();
        assert_eq!(row.try_get::<i64>("id").unwrap(), 7);
        assert_eq!(row.try_get::<i64>(0usize).unwrap(), 7);
        assert_eq!(row.try_get::<Option<String>>("name").unwrap(), None);
    }

    #[test]
    fn decode_error_names_column() {
        let err = row().try_get::<String>("name").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "name"));
        let err = row().try_get::<i64>("missing").unwrap_err();
        assert!(matches!(err, OrmError::Decode { .. }));
    }

    #[test]
    fn converted_column() {
        let date: chrono::NaiveDate = row()
            .try_get_converted("born", ConverterRegistry::builtin())
            .unwrap();
        assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2001, 9, 9).unwrap());
    }

    #[test]
    fn tuple_from_row() {
        let (id, name): (i64, Option<String>) = FromRow::from_row(&row()).unwrap();
        assert_eq!(id, 7);
        assert!(name.is_none());
    }
}
