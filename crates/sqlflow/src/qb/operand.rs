//! Column references.
//!
//! [`Operand`] is an untyped column or expression; [`Property<T>`] wraps one with the Rust
//! type of the column so comparisons only accept matching values.
//!
//! ```ignore
//! use sqlflow::qb::Property;
//!
//! static ID: LazyLock<Property<i64>> = LazyLock::new(|| Property::new("id"));
//! let cond = ID.eq(5); // "id"=5
//! ```

use crate::convert::{ConverterRef, ConverterRegistry, ErasedConverter};
use crate::ident::Ident;
use crate::qb::clause::OrderBy;
use crate::qb::expr::{Op, Operator, Rhs};
use crate::qb::traits::Query;
use crate::qb::writer::SqlWriter;
use crate::value::{IntoValue, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// An untyped column or expression reference.
#[derive(Clone)]
pub struct Operand {
    /// For expressions only the alias is used.
    ident: Ident,
    expr: Option<Arc<[Part]>>,
    converter: Option<ConverterRef>,
}

/// Piece of a function call or arithmetic expression.
#[derive(Clone, Debug)]
enum Part {
    Sql(&'static str),
    Name(String),
    Value(Value),
}

impl Operand {
    /// A quoted column: `"name"`.
    pub fn column(name: impl Into<String>) -> Self {
        Self::from_ident(Ident::new(name))
    }

    /// A qualified column: `"table"."name"`.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_ident(Ident::qualified(table, name))
    }

    /// An expression written without quoting.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::from_ident(Ident::raw(sql))
    }

    /// `*`
    pub fn all() -> Self {
        Self::raw("*")
    }

    /// `"table".*`
    pub fn all_of(table: impl Into<String>) -> Self {
        Self::from_ident(Ident::builder("*").table(table).quote_name(false).build())
    }

    /// A literal value used where a column is expected, e.g. `SELECT 1`.
    ///
    /// The value is bound like any other when the statement is compiled.
    pub fn literal(value: impl IntoValue) -> Self {
        Self::expression(vec![Part::Value(value.into_value())])
    }

    /// `name(arg, …)`; arguments are rendered through the statement's writer.
    pub(crate) fn call(name: impl Into<String>, args: Vec<Value>) -> Self {
        let mut parts = Vec::with_capacity(args.len() * 2 + 2);
        parts.push(Part::Name(name.into()));
        parts.push(Part::Sql("("));
        for (i, arg) in args.into_iter().enumerate() {
            if i > 0 {
                parts.push(Part::Sql(","));
            }
            parts.push(Part::Value(arg));
        }
        parts.push(Part::Sql(")"));
        Self::expression(parts)
    }

    /// `CAST(expr AS type)`
    pub(crate) fn cast(expr: Operand, ty: &'static str) -> Self {
        Self::expression(vec![
            Part::Sql("CAST("),
            Part::Value(Value::Operand(expr)),
            Part::Sql(" AS "),
            Part::Sql(ty),
            Part::Sql(")"),
        ])
    }

    fn expression(parts: Vec<Part>) -> Self {
        Self {
            ident: Ident::empty(),
            expr: Some(parts.into()),
            converter: None,
        }
    }

    pub fn from_ident(ident: Ident) -> Self {
        Self {
            ident,
            expr: None,
            converter: None,
        }
    }

    /// Attach a converter for values compared against this column.
    pub fn with_converter(mut self, converter: ConverterRef) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Alias this operand: `"col" AS "alias"`.
    pub fn as_(mut self, alias: impl Into<String>) -> Self {
        self.ident = self.ident.with_alias(alias);
        self
    }

    /// Qualify with a table name. Expressions are left unchanged.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        if self.expr.is_none() {
            self.ident = self.ident.to_builder().table(table).build();
        }
        self
    }

    pub fn without_table(mut self) -> Self {
        self.ident = self.ident.unqualified();
        self
    }

    /// The column identifier. Expressions have an empty one carrying only the alias.
    pub fn ident(&self) -> &Ident {
        &self.ident
    }

    /// Convert to an identifier. Expressions are rendered inline into a raw identifier.
    pub fn into_ident(self) -> Ident {
        if self.expr.is_none() {
            return self.ident;
        }
        let mut raw = Ident::raw(self.to_sql());
        if let Some(alias) = self.ident.alias() {
            raw = raw.with_alias(alias);
        }
        raw
    }

    /// The column name; empty for expressions.
    pub fn name(&self) -> &str {
        self.ident.name()
    }

    pub fn is_expression(&self) -> bool {
        self.expr.is_some()
    }

    pub fn converter(&self) -> Option<&dyn ErasedConverter> {
        self.converter.as_deref()
    }

    /// Render as it appears in a condition (no alias), with inline literals.
    pub fn to_sql(&self) -> String {
        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        self.write_full_name(&mut w);
        w.into_sql()
    }

    /// Write without the alias, as in conditions, GROUP BY and ORDER BY.
    pub(crate) fn write_full_name(&self, w: &mut SqlWriter<'_>) {
        let Some(parts) = &self.expr else {
            w.push_full_name(&self.ident);
            return;
        };
        for part in parts.iter() {
            match part {
                Part::Sql(sql) => {
                    w.push(sql);
                }
                Part::Name(name) => {
                    w.push(name);
                }
                Part::Value(value) => {
                    w.push_value(value, None, false);
                }
            }
        }
    }

    /// Write including ` AS "alias"`, as in a projection.
    pub(crate) fn write_sql(&self, w: &mut SqlWriter<'_>) {
        if self.expr.is_none() {
            w.push_ident(&self.ident);
            return;
        }
        self.write_full_name(w);
        if self.ident.alias().is_some() {
            w.push(" AS ").push(&self.ident.reference());
        }
    }

    /// How ORDER BY refers to this operand: the alias when set.
    pub(crate) fn write_reference(&self, w: &mut SqlWriter<'_>) {
        if self.ident.alias().is_some() {
            w.push(&self.ident.reference());
        } else {
            self.write_full_name(w);
        }
    }

    fn op(&self, op: Op, rhs: Rhs) -> Operator {
        Operator::new(self.clone(), op, rhs).with_converter_opt(self.converter.clone())
    }

    fn value_op(&self, op: Op, value: impl IntoValue) -> Operator {
        self.op(op, Rhs::Value(value.into_value()))
    }

    /// `"col"=value`
    pub fn eq(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::Eq, value)
    }

    /// `"col"!=value`
    pub fn ne(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::Ne, value)
    }

    pub fn lt(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::Lt, value)
    }

    pub fn lte(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::Lte, value)
    }

    pub fn gt(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::Gt, value)
    }

    pub fn gte(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::Gte, value)
    }

    pub fn like(&self, pattern: impl IntoValue) -> Operator {
        self.value_op(Op::Like, pattern)
    }

    pub fn not_like(&self, pattern: impl IntoValue) -> Operator {
        self.value_op(Op::NotLike, pattern)
    }

    pub fn glob(&self, pattern: impl IntoValue) -> Operator {
        self.value_op(Op::Glob, pattern)
    }

    pub fn not_glob(&self, pattern: impl IntoValue) -> Operator {
        self.value_op(Op::NotGlob, pattern)
    }

    /// Full-text `MATCH`.
    pub fn match_(&self, query: impl IntoValue) -> Operator {
        self.value_op(Op::Match, query)
    }

    pub fn is(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::Is, value)
    }

    pub fn is_not(&self, value: impl IntoValue) -> Operator {
        self.value_op(Op::IsNot, value)
    }

    pub fn is_null(&self) -> Operator {
        self.op(Op::IsNull, Rhs::None)
    }

    pub fn is_not_null(&self) -> Operator {
        self.op(Op::IsNotNull, Rhs::None)
    }

    pub fn between(&self, low: impl IntoValue, high: impl IntoValue) -> Operator {
        self.op(Op::Between, Rhs::Between(low.into_value(), high.into_value()))
    }

    pub fn not_between(&self, low: impl IntoValue, high: impl IntoValue) -> Operator {
        self.op(
            Op::NotBetween,
            Rhs::Between(low.into_value(), high.into_value()),
        )
    }

    /// `"col" IN (v1,v2,…)`. An empty list renders `IN ()`, which matches nothing.
    pub fn in_list<V: IntoValue>(&self, values: impl IntoIterator<Item = V>) -> Operator {
        self.op(
            Op::In,
            Rhs::List(values.into_iter().map(IntoValue::into_value).collect()),
        )
    }

    pub fn not_in<V: IntoValue>(&self, values: impl IntoIterator<Item = V>) -> Operator {
        self.op(
            Op::NotIn,
            Rhs::List(values.into_iter().map(IntoValue::into_value).collect()),
        )
    }

    /// `"col" IN (<sub-select>)`
    pub fn in_query<Q: Query + 'static>(&self, query: Q) -> Operator {
        self.op(Op::In, Rhs::Query(Arc::new(query)))
    }

    pub fn not_in_query<Q: Query + 'static>(&self, query: Q) -> Operator {
        self.op(Op::NotIn, Rhs::Query(Arc::new(query)))
    }

    /// `"col" ASC`
    pub fn asc(&self) -> OrderBy {
        OrderBy::asc(self.clone())
    }

    /// `"col" DESC`
    pub fn desc(&self) -> OrderBy {
        OrderBy::desc(self.clone())
    }

    fn binary(&self, token: &'static str, rhs: impl IntoValue) -> Operand {
        let mut left = self.clone();
        left.ident = left.ident.to_builder().no_alias().build();
        Operand::expression(vec![
            Part::Value(Value::Operand(left)),
            Part::Sql(token),
            Part::Value(rhs.into_value()),
        ])
    }

    /// `"col" + rhs`
    pub fn plus(&self, rhs: impl IntoValue) -> Operand {
        self.binary(" + ", rhs)
    }

    /// `"col" - rhs`
    pub fn minus(&self, rhs: impl IntoValue) -> Operand {
        self.binary(" - ", rhs)
    }

    /// `"col" * rhs`
    pub fn times(&self, rhs: impl IntoValue) -> Operand {
        self.binary(" * ", rhs)
    }

    /// `"col" / rhs`
    pub fn div(&self, rhs: impl IntoValue) -> Operand {
        self.binary(" / ", rhs)
    }

    /// `"col" % rhs`
    pub fn rem(&self, rhs: impl IntoValue) -> Operand {
        self.binary(" % ", rhs)
    }

    /// `"col" || rhs`
    pub fn concat(&self, rhs: impl IntoValue) -> Operand {
        self.binary(" || ", rhs)
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operand")
            .field("ident", &self.ident)
            .field("expr", &self.expr)
            .field("converter", &self.converter.as_ref().map(|c| c.model_name()))
            .finish()
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::column(name)
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::column(name)
    }
}

impl From<Ident> for Operand {
    fn from(ident: Ident) -> Self {
        Operand::from_ident(ident)
    }
}

impl From<&Operand> for Operand {
    fn from(operand: &Operand) -> Self {
        operand.clone()
    }
}

impl From<Operand> for Ident {
    fn from(operand: Operand) -> Self {
        operand.into_ident()
    }
}

impl From<&Operand> for Ident {
    fn from(operand: &Operand) -> Self {
        operand.clone().into_ident()
    }
}

/// A column whose values are of type `T`.
pub struct Property<T> {
    operand: Operand,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_operand(Operand::column(name))
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_operand(Operand::qualified(table, name))
    }

    pub fn from_operand(operand: Operand) -> Self {
        Self {
            operand,
            _marker: PhantomData,
        }
    }

    pub fn with_converter(self, converter: ConverterRef) -> Self {
        Self::from_operand(self.operand.with_converter(converter))
    }

    pub fn with_table(&self, table: impl Into<String>) -> Self {
        Self::from_operand(self.operand.clone().with_table(table))
    }

    pub fn as_(&self, alias: impl Into<String>) -> Self {
        Self::from_operand(self.operand.clone().as_(alias))
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn into_operand(self) -> Operand {
        self.operand
    }

    pub fn ident(&self) -> &Ident {
        self.operand.ident()
    }

    pub fn name(&self) -> &str {
        self.operand.name()
    }

    pub fn is_null(&self) -> Operator {
        self.operand.is_null()
    }

    pub fn is_not_null(&self) -> Operator {
        self.operand.is_not_null()
    }

    /// Compare against another column of the same type.
    pub fn eq_prop(&self, other: &Property<T>) -> Operator {
        self.operand.eq(&other.operand)
    }

    pub fn like(&self, pattern: impl Into<String>) -> Operator {
        self.operand.like(pattern.into())
    }

    pub fn not_like(&self, pattern: impl Into<String>) -> Operator {
        self.operand.not_like(pattern.into())
    }

    pub fn glob(&self, pattern: impl Into<String>) -> Operator {
        self.operand.glob(pattern.into())
    }

    pub fn in_query<Q: Query + 'static>(&self, query: Q) -> Operator {
        self.operand.in_query(query)
    }

    pub fn not_in_query<Q: Query + 'static>(&self, query: Q) -> Operator {
        self.operand.not_in_query(query)
    }

    pub fn asc(&self) -> OrderBy {
        self.operand.asc()
    }

    pub fn desc(&self) -> OrderBy {
        self.operand.desc()
    }
}

impl<T: IntoValue> Property<T> {
    pub fn eq(&self, value: impl Into<T>) -> Operator {
        self.operand.eq(value.into())
    }

    pub fn ne(&self, value: impl Into<T>) -> Operator {
        self.operand.ne(value.into())
    }

    pub fn lt(&self, value: impl Into<T>) -> Operator {
        self.operand.lt(value.into())
    }

    pub fn lte(&self, value: impl Into<T>) -> Operator {
        self.operand.lte(value.into())
    }

    pub fn gt(&self, value: impl Into<T>) -> Operator {
        self.operand.gt(value.into())
    }

    pub fn gte(&self, value: impl Into<T>) -> Operator {
        self.operand.gte(value.into())
    }

    pub fn is(&self, value: impl Into<T>) -> Operator {
        self.operand.is(value.into())
    }

    pub fn is_not(&self, value: impl Into<T>) -> Operator {
        self.operand.is_not(value.into())
    }

    pub fn between(&self, low: impl Into<T>, high: impl Into<T>) -> Operator {
        self.operand.between(low.into(), high.into())
    }

    pub fn not_between(&self, low: impl Into<T>, high: impl Into<T>) -> Operator {
        self.operand.not_between(low.into(), high.into())
    }

    pub fn in_list(&self, values: impl IntoIterator<Item = T>) -> Operator {
        self.operand.in_list(values)
    }

    pub fn not_in(&self, values: impl IntoIterator<Item = T>) -> Operator {
        self.operand.not_in(values)
    }

    /// Assignment for SET lists: `"col"=value`.
    pub fn set(&self, value: impl Into<T>) -> Operator {
        self.eq(value)
    }
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::from_operand(self.operand.clone())
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("type", &std::any::type_name::<T>())
            .field("operand", &self.operand)
            .finish()
    }
}

impl<T> From<Property<T>> for Operand {
    fn from(property: Property<T>) -> Self {
        property.operand
    }
}

impl<T> From<&Property<T>> for Operand {
    fn from(property: &Property<T>) -> Self {
        property.operand.clone()
    }
}

impl<T> From<&Property<T>> for Ident {
    fn from(property: &Property<T>) -> Self {
        property.ident().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{converter, TypeConverter, UuidConverter};
    use crate::error::OrmResult;
    use crate::value::SqlValue;

    #[test]
    fn typed_property_comparisons() {
        let id: Property<i64> = Property::new("id");
        assert_eq!(id.eq(5).to_sql(), r#""id"=5"#);
        assert_eq!(id.gte(2).to_sql(), r#""id">=2"#);
        assert_eq!(id.in_list([1, 2]).to_sql(), r#""id" IN (1,2)"#);

        let name: Property<String> = Property::new("name");
        assert_eq!(name.eq("bob").to_sql(), r#""name"='bob'"#);
        assert_eq!(name.like("b%").to_sql(), r#""name" LIKE 'b%'"#);
    }

    #[test]
    fn qualified_and_aliased() {
        let op = Operand::qualified("u", "id").as_("uid");
        assert_eq!(op.ident().to_sql(), r#""u"."id" AS "uid""#);
        // conditions never carry the alias
        assert_eq!(op.eq(1).to_sql(), r#""u"."id"=1"#);
    }

    #[test]
    fn literal_operand() {
        assert_eq!(Operand::literal(1).to_sql(), "1");
        assert_eq!(Operand::literal("x").to_sql(), "'x'");
        assert_eq!(Operand::all().to_sql(), "*");
        assert_eq!(Operand::all_of("t").to_sql(), r#""t".*"#);
    }

    #[test]
    fn arithmetic_builds_expressions() {
        let price = Operand::column("price");
        let qty = Operand::column("qty");
        assert_eq!(price.times(&qty).to_sql(), r#""price" * "qty""#);
        assert_eq!(price.plus(1).eq(10).to_sql(), r#""price" + 1=10"#);
        assert_eq!(
            Operand::column("first").concat(" ").to_sql(),
            r#""first" || ' '"#
        );
    }

    #[test]
    fn expression_values_are_bound_in_render_order() {
        use crate::convert::ConverterRegistry;
        use crate::qb::{update, Filterable, Query};

        let q = update("items")
            .set_value("stock", Operand::column("stock").minus(2))
            .filter(Operand::column("price").times(3).gt(10));
        let compiled = q.compile(ConverterRegistry::builtin());
        assert_eq!(
            compiled.sql(),
            r#"UPDATE "items" SET "stock"="stock" - ? WHERE "price" * ?>? "#
        );
        assert_eq!(
            compiled.params(),
            &[SqlValue::Integer(2), SqlValue::Integer(3), SqlValue::Integer(10)]
        );
        assert_eq!(Operand::literal(1).as_("one").into_ident().to_sql(), r#"1 AS "one""#);
    }

    #[test]
    fn operand_converter_applies_to_values() {
        struct Compact;
        impl TypeConverter for Compact {
            type Model = uuid::Uuid;
            fn to_db(&self, model: &uuid::Uuid) -> Value {
                Value::Text(model.simple().to_string())
            }
            fn from_db(&self, value: &SqlValue) -> OrmResult<uuid::Uuid> {
                UuidConverter.from_db(value)
            }
        }
        let col = Operand::column("id").with_converter(converter(Compact));
        assert_eq!(
            col.eq(uuid::Uuid::nil()).to_sql(),
            r#""id"='00000000000000000000000000000000'"#
        );
    }
}
