//! Pluggable type conversion between model values and stored representations.
//!
//! A [`TypeConverter`] turns a model type (e.g. `uuid::Uuid`) into a [`Value`] the database
//! understands and decodes it back from a stored [`SqlValue`]. Converters are collected in a
//! [`ConverterRegistry`] keyed by model type. The registry is passed explicitly: the
//! [`SqlWriter`](crate::qb::SqlWriter) consults it while rendering and clients expose their
//! own via [`GenericClient::converters`](crate::GenericClient::converters).
//!
//! ```ignore
//! use sqlflow::{ConverterRegistry, TypeConverter, Value, SqlValue, OrmResult};
//!
//! struct Cents;
//! impl TypeConverter for Cents {
//!     type Model = Money;
//!     fn to_db(&self, m: &Money) -> Value { Value::Integer(m.cents) }
//!     fn from_db(&self, v: &SqlValue) -> OrmResult<Money> { ... }
//! }
//!
//! let registry = ConverterRegistry::with_builtins().with(Cents);
//! ```

use crate::error::{OrmError, OrmResult};
use crate::value::{CustomValue, SqlValue, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Converts a model type to and from its stored representation.
pub trait TypeConverter: Send + Sync + 'static {
    type Model: Any + Send + Sync;

    /// Stored representation of `model`.
    fn to_db(&self, model: &Self::Model) -> Value;

    /// Decode a stored value back into the model type.
    fn from_db(&self, value: &SqlValue) -> OrmResult<Self::Model>;
}

/// Object-safe view of a [`TypeConverter`].
pub trait ErasedConverter: Send + Sync {
    fn model_type(&self) -> TypeId;

    fn model_name(&self) -> &'static str;

    /// Convert a model value; `None` when `model` is not this converter's model type.
    fn to_db_any(&self, model: &(dyn Any + Send + Sync)) -> Option<Value>;

    fn from_db_any(&self, value: &SqlValue) -> OrmResult<Box<dyn Any + Send>>;
}

impl<C: TypeConverter> ErasedConverter for C {
    fn model_type(&self) -> TypeId {
        TypeId::of::<C::Model>()
    }

    fn model_name(&self) -> &'static str {
        std::any::type_name::<C::Model>()
    }

    fn to_db_any(&self, model: &(dyn Any + Send + Sync)) -> Option<Value> {
        model.downcast_ref::<C::Model>().map(|m| self.to_db(m))
    }

    fn from_db_any(&self, value: &SqlValue) -> OrmResult<Box<dyn Any + Send>> {
        let model = self.from_db(value)?;
        Ok(Box::new(model))
    }
}

/// Shared handle to a converter attached to an operand or operator.
pub type ConverterRef = Arc<dyn ErasedConverter>;

/// Wrap a converter for attaching to an operand.
pub fn converter<C: TypeConverter>(converter: C) -> ConverterRef {
    Arc::new(converter)
}

/// Convert a custom value with an explicit converter, if the model types match.
pub(crate) fn apply(converter: &dyn ErasedConverter, value: &CustomValue) -> Option<Value> {
    if converter.model_type() != value.type_id() {
        return None;
    }
    converter.to_db_any(value.as_any())
}

/// A set of converters keyed by model type.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, ConverterRef>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in converters.
    pub fn with_builtins() -> Self {
        Self::new()
            .with(UuidConverter)
            .with(DateTimeUtcConverter)
            .with(NaiveDateConverter)
            .with(NaiveDateTimeConverter)
            .with(JsonConverter)
    }

    /// The shared, immutable registry of built-in converters.
    pub fn builtin() -> &'static ConverterRegistry {
        static BUILTIN: OnceLock<ConverterRegistry> = OnceLock::new();
        BUILTIN.get_or_init(Self::with_builtins)
    }

    /// Register a converter, replacing any previous one for the same model type.
    pub fn register<C: TypeConverter>(&mut self, converter: C) -> Option<ConverterRef> {
        self.converters
            .insert(TypeId::of::<C::Model>(), Arc::new(converter))
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<C: TypeConverter>(mut self, converter: C) -> Self {
        self.register(converter);
        self
    }

    /// Whether a converter is registered for `T`.
    pub fn contains<T: Any>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    pub fn get(&self, type_id: TypeId) -> Option<&ConverterRef> {
        self.converters.get(&type_id)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Convert a custom value to its stored representation.
    pub fn convert(&self, value: &CustomValue) -> Option<Value> {
        self.converters
            .get(&value.type_id())
            .and_then(|c| c.to_db_any(value.as_any()))
    }

    /// Decode a stored value into `T` using the registered converter.
    pub fn decode<T: Any>(&self, value: &SqlValue) -> OrmResult<T> {
        let converter = self.converters.get(&TypeId::of::<T>()).ok_or_else(|| {
            OrmError::conversion(format!(
                "no converter registered for {}",
                std::any::type_name::<T>()
            ))
        })?;
        let decoded = converter.from_db_any(value)?;
        decoded.downcast::<T>().map(|b| *b).map_err(|_| {
            OrmError::conversion(format!(
                "converter for {} produced a different type",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.converters.values().map(|c| c.model_name()).collect();
        names.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("converters", &names)
            .finish()
    }
}

fn expect_text<'a>(value: &'a SqlValue, model: &str) -> OrmResult<&'a str> {
    match value {
        SqlValue::Text(s) => Ok(s),
        other => Err(OrmError::conversion(format!(
            "expected TEXT for {model}, got {:?}",
            other.data_type()
        ))),
    }
}

/// `uuid::Uuid` stored as its hyphenated text form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidConverter;

impl TypeConverter for UuidConverter {
    type Model = uuid::Uuid;

    fn to_db(&self, model: &uuid::Uuid) -> Value {
        Value::Text(model.hyphenated().to_string())
    }

    fn from_db(&self, value: &SqlValue) -> OrmResult<uuid::Uuid> {
        match value {
            SqlValue::Blob(bytes) => uuid::Uuid::from_slice(bytes)
                .map_err(|e| OrmError::conversion(e.to_string())),
            other => uuid::Uuid::parse_str(expect_text(other, "Uuid")?)
                .map_err(|e| OrmError::conversion(e.to_string())),
        }
    }
}

/// `DateTime<Utc>` stored as milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeUtcConverter;

impl TypeConverter for DateTimeUtcConverter {
    type Model = DateTime<Utc>;

    fn to_db(&self, model: &DateTime<Utc>) -> Value {
        Value::Integer(model.timestamp_millis())
    }

    fn from_db(&self, value: &SqlValue) -> OrmResult<DateTime<Utc>> {
        match value {
            SqlValue::Integer(ms) => DateTime::<Utc>::from_timestamp_millis(*ms)
                .ok_or_else(|| OrmError::conversion(format!("timestamp {ms} out of range"))),
            other => expect_text(other, "DateTime<Utc>")?
                .parse::<DateTime<Utc>>()
                .map_err(|e| OrmError::conversion(e.to_string())),
        }
    }
}

/// `NaiveDate` stored as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveDateConverter;

impl TypeConverter for NaiveDateConverter {
    type Model = NaiveDate;

    fn to_db(&self, model: &NaiveDate) -> Value {
        Value::Text(model.format(DATE_FORMAT).to_string())
    }

    fn from_db(&self, value: &SqlValue) -> OrmResult<NaiveDate> {
        NaiveDate::parse_from_str(expect_text(value, "NaiveDate")?, DATE_FORMAT)
            .map_err(|e| OrmError::conversion(e.to_string()))
    }
}

/// `NaiveDateTime` stored as `YYYY-MM-DD HH:MM:SS[.fff]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveDateTimeConverter;

impl TypeConverter for NaiveDateTimeConverter {
    type Model = NaiveDateTime;

    fn to_db(&self, model: &NaiveDateTime) -> Value {
        Value::Text(model.format(DATETIME_FORMAT).to_string())
    }

    fn from_db(&self, value: &SqlValue) -> OrmResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(expect_text(value, "NaiveDateTime")?, DATETIME_FORMAT)
            .map_err(|e| OrmError::conversion(e.to_string()))
    }
}

/// `serde_json::Value` stored as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl TypeConverter for JsonConverter {
    type Model = serde_json::Value;

    fn to_db(&self, model: &serde_json::Value) -> Value {
        Value::Text(model.to_string())
    }

    fn from_db(&self, value: &SqlValue) -> OrmResult<serde_json::Value> {
        serde_json::from_str(expect_text(value, "JSON")?)
            .map_err(|e| OrmError::conversion(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::IntoValue;

    fn custom(v: impl IntoValue) -> CustomValue {
        match v.into_value() {
            Value::Custom(c) => c,
            other => panic!("expected custom value, got {other:?}"),
        }
    }

    #[test]
    fn builtin_registry_converts_uuid() {
        let id = uuid::Uuid::nil();
        let stored = ConverterRegistry::builtin().convert(&custom(id));
        assert!(matches!(
            stored,
            Some(Value::Text(ref s)) if s == "00000000-0000-0000-0000-000000000000"
        ));
    }

    #[test]
    fn datetime_round_trips_through_millis() {
        let registry = ConverterRegistry::with_builtins();
        let now = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let Some(Value::Integer(ms)) = registry.convert(&custom(now)) else {
            panic!("expected integer millis");
        };
        assert_eq!(ms, 1_700_000_000_123);
        let back: DateTime<Utc> = registry.decode(&SqlValue::Integer(ms)).unwrap();
        assert_eq!(back, now);
    }

    #[test]
    fn naive_date_is_iso_text() {
        let registry = ConverterRegistry::with_builtins();
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert!(matches!(
            registry.convert(&custom(date)),
            Some(Value::Text(ref s)) if s == "2024-02-29"
        ));
        let back: NaiveDate = registry
            .decode(&SqlValue::Text("2024-02-29".to_string()))
            .unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn decode_without_converter_fails() {
        let registry = ConverterRegistry::new();
        let err = registry
            .decode::<uuid::Uuid>(&SqlValue::Text("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, OrmError::Conversion(_)));
    }

    struct ShoutingJson;

    impl TypeConverter for ShoutingJson {
        type Model = serde_json::Value;

        fn to_db(&self, model: &serde_json::Value) -> Value {
            Value::Text(model.to_string().to_uppercase())
        }

        fn from_db(&self, value: &SqlValue) -> OrmResult<serde_json::Value> {
            JsonConverter.from_db(value)
        }
    }

    #[test]
    fn register_replaces_builtin() {
        let registry = ConverterRegistry::with_builtins().with(ShoutingJson);
        let stored = registry.convert(&custom(serde_json::json!({"a": "b"})));
        assert!(matches!(stored, Some(Value::Text(ref s)) if s == r#"{"A":"B"}"#));
        // the shared builtin registry is untouched
        let stored = ConverterRegistry::builtin().convert(&custom(serde_json::json!({"a": "b"})));
        assert!(matches!(stored, Some(Value::Text(ref s)) if s == r#"{"a":"b"}"#));
    }

    #[test]
    fn explicit_converter_requires_matching_type() {
        let conv = converter(UuidConverter);
        assert!(apply(conv.as_ref(), &custom(uuid::Uuid::nil())).is_some());
        assert!(apply(conv.as_ref(), &custom(serde_json::json!(1))).is_none());
    }
}
