//! Rendering context shared by every statement, condition and join.
//!
//! A [`SqlWriter`] accumulates SQL text and, in positional mode, the bound parameters in
//! render order. Every node writes itself through the same writer so nested statements
//! share one parameter list and placeholder positions always line up.

use crate::convert::{self, ConverterRegistry, ErasedConverter};
use crate::ident::Ident;
use crate::qb::operand::Operand;
use crate::qb::traits::Query;
use crate::value::{self, SqlValue, Value};
use std::borrow::Cow;

/// How scalar values are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Escaped literals embedded in the text.
    Inline,
    /// `?` placeholders with values collected into a [`ParamList`].
    Positional,
}

/// Bound parameters in placeholder order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<SqlValue>,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based index.
    pub fn push(&mut self, value: SqlValue) -> usize {
        self.params.push(value);
        self.params.len()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_slice(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_vec(self) -> Vec<SqlValue> {
        self.params
    }
}

/// SQL text plus the parameters bound to its `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    params: ParamList,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, params: ParamList) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        self.params.as_slice()
    }

    /// Split into the SQL text and its parameters.
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params.into_vec())
    }
}

/// Accumulates SQL text for one statement.
#[derive(Debug)]
pub struct SqlWriter<'r> {
    sql: String,
    params: ParamList,
    mode: BindMode,
    registry: &'r ConverterRegistry,
}

impl<'r> SqlWriter<'r> {
    pub fn new(mode: BindMode, registry: &'r ConverterRegistry) -> Self {
        Self {
            sql: String::with_capacity(128),
            params: ParamList::new(),
            mode,
            registry,
        }
    }

    /// Writer that embeds every value as a literal.
    pub fn inline(registry: &'r ConverterRegistry) -> Self {
        Self::new(BindMode::Inline, registry)
    }

    /// Writer that emits `?` placeholders for scalar values.
    pub fn positional(registry: &'r ConverterRegistry) -> Self {
        Self::new(BindMode::Positional, registry)
    }

    pub fn mode(&self) -> BindMode {
        self.mode
    }

    pub fn registry(&self) -> &'r ConverterRegistry {
        self.registry
    }

    /// The text written so far.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn push(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self
    }

    pub fn push_char(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }

    /// Write an identifier including its alias.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        ident.write_sql(&mut self.sql);
        self
    }

    /// Write an identifier without its alias.
    pub fn push_full_name(&mut self, ident: &Ident) -> &mut Self {
        ident.write_full_name(&mut self.sql);
        self
    }

    /// Write identifiers without aliases, separated by `,`.
    pub fn push_name_list<'a>(&mut self, idents: impl IntoIterator<Item = &'a Ident>) -> &mut Self {
        for (i, ident) in idents.into_iter().enumerate() {
            if i > 0 {
                self.sql.push(',');
            }
            ident.write_full_name(&mut self.sql);
        }
        self
    }

    /// Remove trailing whitespace.
    pub fn trim_end(&mut self) -> &mut Self {
        let len = self.sql.trim_end().len();
        self.sql.truncate(len);
        self
    }

    /// Write a column or expression including its alias.
    pub fn push_operand(&mut self, operand: &Operand) -> &mut Self {
        operand.write_sql(self);
        self
    }

    /// Write a column or expression without its alias.
    pub fn push_operand_name(&mut self, operand: &Operand) -> &mut Self {
        operand.write_full_name(self);
        self
    }

    /// Write a nested statement as `(<sql>)`, sharing this writer's parameters.
    pub fn push_query(&mut self, query: &dyn Query) -> &mut Self {
        self.sql.push('(');
        query.write_sql(self);
        self.trim_end();
        self.sql.push(')');
        self
    }

    /// Write a value as a literal or a placeholder depending on the mode.
    ///
    /// `converter` takes precedence over the registry for custom values. With `bypass` set,
    /// custom values are written from their display text.
    pub fn push_value(
        &mut self,
        value: &Value,
        converter: Option<&dyn ErasedConverter>,
        bypass: bool,
    ) -> &mut Self {
        let resolved = self.resolve(value, converter, bypass);
        match resolved.as_ref() {
            Value::Null => self.sql.push_str("NULL"),
            Value::Operand(operand) => operand.write_full_name(self),
            Value::Query(query) => {
                self.push_query(query.as_ref());
            }
            Value::Custom(custom) => self.push_scalar(SqlValue::Text(custom.display().to_string())),
            scalar => {
                if let Some(v) = scalar.to_sql_value() {
                    self.push_scalar(v);
                }
            }
        }
        self
    }

    /// Run `f` with values forced inline, restoring the previous mode afterwards.
    pub fn with_inline<F: FnOnce(&mut Self)>(&mut self, f: F) -> &mut Self {
        let previous = self.mode;
        self.mode = BindMode::Inline;
        f(self);
        self.mode = previous;
        self
    }

    pub fn finish(self) -> CompiledQuery {
        CompiledQuery {
            sql: self.sql,
            params: self.params,
        }
    }

    pub fn into_sql(self) -> String {
        self.sql
    }

    fn resolve<'v>(
        &self,
        value: &'v Value,
        converter: Option<&dyn ErasedConverter>,
        bypass: bool,
    ) -> Cow<'v, Value> {
        let Value::Custom(custom) = value else {
            return Cow::Borrowed(value);
        };
        if bypass {
            return Cow::Borrowed(value);
        }
        let converted = converter
            .and_then(|c| convert::apply(c, custom))
            .or_else(|| self.registry.convert(custom));
        match converted {
            Some(v) => Cow::Owned(v),
            None => Cow::Borrowed(value),
        }
    }

    fn push_scalar(&mut self, value: SqlValue) {
        match self.mode {
            BindMode::Positional => {
                self.params.push(value);
                self.sql.push('?');
            }
            BindMode::Inline => match &value {
                SqlValue::Null => self.sql.push_str("NULL"),
                SqlValue::Integer(v) => self.sql.push_str(&v.to_string()),
                SqlValue::Real(v) => value::write_real_literal(&mut self.sql, *v),
                SqlValue::Text(s) => value::write_text_literal(&mut self.sql, s),
                SqlValue::Blob(b) => value::write_blob_literal(&mut self.sql, b),
            },
        }
    }
}

/// Render a single value as an inline literal using the built-in converters.
pub fn literal(value: &Value) -> String {
    let mut w = SqlWriter::inline(ConverterRegistry::builtin());
    w.push_value(value, None, false);
    w.into_sql()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::IntoValue;

    #[test]
    fn inline_scalars() {
        assert_eq!(literal(&5.into_value()), "5");
        assert_eq!(literal(&"o'k".into_value()), "'o''k'");
        assert_eq!(literal(&Value::Null), "NULL");
        assert_eq!(literal(&vec![1u8, 2].into_value()), "X'0102'");
        assert_eq!(literal(&2.5.into_value()), "2.5");
    }

    #[test]
    fn positional_collects_params_in_order() {
        let registry = ConverterRegistry::new();
        let mut w = SqlWriter::positional(&registry);
        w.push("a=")
            .push_value(&1.into_value(), None, false)
            .push(" AND b=")
            .push_value(&"x".into_value(), None, false)
            .push(" AND c IS ")
            .push_value(&Value::Null, None, false);
        let compiled = w.finish();
        assert_eq!(compiled.sql(), "a=? AND b=? AND c IS NULL");
        assert_eq!(
            compiled.params(),
            &[SqlValue::Integer(1), SqlValue::Text("x".to_string())]
        );
    }

    #[test]
    fn custom_value_uses_registry_or_display() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            literal(&id.into_value()),
            "'00000000-0000-0000-0000-000000000000'"
        );

        let empty = ConverterRegistry::new();
        let mut w = SqlWriter::inline(&empty);
        let now = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(0).unwrap();
        w.push_value(&now.into_value(), None, false);
        // no converter: display text
        assert_eq!(w.sql(), "'1970-01-01 00:00:00 UTC'");
    }

    #[test]
    fn bypass_skips_conversion() {
        let now = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(0).unwrap();
        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        w.push_value(&now.into_value(), None, true);
        assert_eq!(w.sql(), "'1970-01-01 00:00:00 UTC'");

        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        w.push_value(&now.into_value(), None, false);
        assert_eq!(w.sql(), "0");
    }

    #[test]
    fn with_inline_restores_mode() {
        let registry = ConverterRegistry::new();
        let mut w = SqlWriter::positional(&registry);
        w.with_inline(|w| {
            w.push_value(&7.into_value(), None, false);
        });
        w.push(",").push_value(&8.into_value(), None, false);
        let compiled = w.finish();
        assert_eq!(compiled.sql(), "7,?");
        assert_eq!(compiled.params(), &[SqlValue::Integer(8)]);
    }

    #[test]
    fn trim_end_strips_trailing_space() {
        let registry = ConverterRegistry::new();
        let mut w = SqlWriter::inline(&registry);
        w.push("SELECT * ").trim_end();
        assert_eq!(w.sql(), "SELECT *");
    }
}
