//! Values that can appear on the right-hand side of an operator or in an INSERT row.
//!
//! A [`Value`] is rendered either as an inline SQL literal or as a bound `?` parameter,
//! depending on the [`SqlWriter`](crate::qb::SqlWriter) mode.

use crate::qb::{Operand, Property, Query};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Parameter value handed to the driver.
pub type SqlValue = rusqlite::types::Value;

/// A value usable in conditions, assignments and INSERT rows.
#[derive(Clone, Debug)]
pub enum Value {
    /// SQL `NULL`
    Null,
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Real(f64),
    /// Text literal
    Text(String),
    /// Byte blob, rendered as `X'..'`
    Blob(Vec<u8>),
    /// Enumeration variant, rendered as its symbolic name
    Enum(Cow<'static, str>),
    /// Another column or expression
    Operand(Operand),
    /// Nested statement, rendered parenthesized
    Query(Arc<dyn Query>),
    /// A value whose stored representation comes from a type converter
    Custom(CustomValue),
}

impl Value {
    /// Wrap an arbitrary value for conversion through the registry.
    pub fn custom<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        Value::Custom(CustomValue::new(value))
    }

    /// Wrap an enumeration variant.
    pub fn enumeration<E: SqlEnum + ?Sized>(value: &E) -> Self {
        Value::Enum(Cow::Borrowed(value.sql_name()))
    }

    /// Wrap a nested statement.
    pub fn query<Q: Query + 'static>(query: Q) -> Self {
        Value::Query(Arc::new(query))
    }

    /// Whether this is SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The driver representation of a scalar value.
    ///
    /// Returns `None` for operands, nested statements and unconverted custom values.
    pub fn to_sql_value(&self) -> Option<SqlValue> {
        match self {
            Value::Null => Some(SqlValue::Null),
            Value::Integer(v) => Some(SqlValue::Integer(*v)),
            Value::Real(v) => Some(SqlValue::Real(*v)),
            Value::Text(v) => Some(SqlValue::Text(v.clone())),
            Value::Blob(v) => Some(SqlValue::Blob(v.clone())),
            Value::Enum(v) => Some(SqlValue::Text(v.to_string())),
            Value::Operand(_) | Value::Query(_) | Value::Custom(_) => None,
        }
    }
}

impl From<SqlValue> for Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(v) => Value::Integer(v),
            SqlValue::Real(v) => Value::Real(v),
            SqlValue::Text(v) => Value::Text(v),
            SqlValue::Blob(v) => Value::Blob(v),
        }
    }
}

/// A type-erased value awaiting conversion by a [`TypeConverter`](crate::TypeConverter).
#[derive(Clone)]
pub struct CustomValue {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
    display: String,
}

impl CustomValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        let display = value.to_string();
        Self {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            display,
        }
    }

    /// Runtime type of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The wrapped value.
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        &*self.value
    }

    /// Display text used when no converter is registered.
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("type", &self.type_name)
            .field("display", &self.display)
            .finish()
    }
}

/// An enumeration stored by its symbolic name.
pub trait SqlEnum {
    fn sql_name(&self) -> &'static str;
}

/// Conversion into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &Value {
    fn into_value(self) -> Value {
        self.clone()
    }
}

macro_rules! impl_into_value_int {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::Integer(i64::from(self))
                }
            }
        )*
    };
}

impl_into_value_int!(i8, i16, i32, i64, u8, u16, u32);

impl IntoValue for isize {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        match i64::try_from(self) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Real(self as f64),
        }
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        (self as u64).into_value()
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Real(f64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for Cow<'_, str> {
    fn into_value(self) -> Value {
        Value::Text(self.into_owned())
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Blob(self)
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl IntoValue for Operand {
    fn into_value(self) -> Value {
        Value::Operand(self)
    }
}

impl IntoValue for &Operand {
    fn into_value(self) -> Value {
        Value::Operand(self.clone())
    }
}

impl<T> IntoValue for Property<T> {
    fn into_value(self) -> Value {
        Value::Operand(self.into_operand())
    }
}

impl<T> IntoValue for &Property<T> {
    fn into_value(self) -> Value {
        Value::Operand(self.operand().clone())
    }
}

impl IntoValue for SqlValue {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

macro_rules! impl_into_value_custom {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::custom(self)
                }
            }
        )*
    };
}

impl_into_value_custom!(
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    serde_json::Value
);

/// One INSERT row: an array or `Vec` of a single value type, or a tuple of mixed types.
///
/// ```
/// use sqlflow::qb::{self, Query};
///
/// let q = qb::insert("users").columns(["name", "age"])?.values(("ann", 31))?;
/// assert_eq!(q.to_sql(), r#"INSERT INTO "users"("name","age") VALUES ('ann',31)"#);
/// # Ok::<(), sqlflow::OrmError>(())
/// ```
pub trait IntoRow {
    fn into_row(self) -> Vec<Value>;
}

impl<V: IntoValue, const N: usize> IntoRow for [V; N] {
    fn into_row(self) -> Vec<Value> {
        self.into_iter().map(IntoValue::into_value).collect()
    }
}

impl<V: IntoValue> IntoRow for Vec<V> {
    fn into_row(self) -> Vec<Value> {
        self.into_iter().map(IntoValue::into_value).collect()
    }
}

macro_rules! impl_into_row_tuple {
    ($($t:ident => $i:tt),+) => {
        impl<$($t: IntoValue),+> IntoRow for ($($t,)+) {
            fn into_row(self) -> Vec<Value> {
                vec![$(self.$i.into_value()),+]
            }
        }
    };
}

impl_into_row_tuple!(A => 0);
impl_into_row_tuple!(A => 0, B => 1);
impl_into_row_tuple!(A => 0, B => 1, C => 2);
impl_into_row_tuple!(A => 0, B => 1, C => 2, D => 3);
impl_into_row_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_into_row_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_into_row_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_into_row_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

/// Write `s` as a single-quoted SQL string literal, doubling embedded quotes.
pub(crate) fn write_text_literal(out: &mut String, s: &str) {
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str("''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
}

/// Write a byte blob as `X'<hex>'`.
pub(crate) fn write_blob_literal(out: &mut String, bytes: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.reserve(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out.push('\'');
}

/// Write a floating point literal SQLite can parse back.
pub(crate) fn write_real_literal(out: &mut String, v: f64) {
    if v.is_nan() {
        out.push_str("NULL");
    } else if v.is_infinite() {
        out.push_str(if v > 0.0 { "9e999" } else { "-9e999" });
    } else {
        out.push_str(&format!("{v:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(f: impl FnOnce(&mut String)) -> String {
        let mut out = String::new();
        f(&mut out);
        out
    }

    #[test]
    fn text_literal_doubles_quotes() {
        assert_eq!(text(|o| write_text_literal(o, "it's")), "'it''s'");
    }

    #[test]
    fn blob_literal_is_hex() {
        assert_eq!(
            text(|o| write_blob_literal(o, &[0x00, 0xAB, 0x7f])),
            "X'00AB7F'"
        );
    }

    #[test]
    fn real_literal_keeps_fraction() {
        assert_eq!(text(|o| write_real_literal(o, 1.0)), "1.0");
        assert_eq!(text(|o| write_real_literal(o, 0.25)), "0.25");
        assert_eq!(text(|o| write_real_literal(o, f64::NAN)), "NULL");
    }

    #[test]
    fn into_value_primitives() {
        assert!(matches!(5i32.into_value(), Value::Integer(5)));
        assert!(matches!(true.into_value(), Value::Integer(1)));
        assert!(matches!(None::<i64>.into_value(), Value::Null));
        assert!(matches!(u64::MAX.into_value(), Value::Real(_)));
        assert!(matches!("a".into_value(), Value::Text(ref s) if s == "a"));
    }

    #[test]
    fn custom_value_keeps_type() {
        let id = uuid::Uuid::nil();
        let Value::Custom(custom) = id.into_value() else {
            panic!("expected custom value");
        };
        assert_eq!(custom.type_id(), TypeId::of::<uuid::Uuid>());
        assert_eq!(custom.display(), "00000000-0000-0000-0000-000000000000");
    }

    #[derive(Debug)]
    enum Status {
        Active,
    }

    impl SqlEnum for Status {
        fn sql_name(&self) -> &'static str {
            match self {
                Status::Active => "ACTIVE",
            }
        }
    }

    #[test]
    fn enum_value_uses_symbolic_name() {
        let v = Value::enumeration(&Status::Active);
        assert_eq!(
            v.to_sql_value(),
            Some(SqlValue::Text("ACTIVE".to_string()))
        );
    }
}
