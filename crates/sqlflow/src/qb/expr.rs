//! Condition layer for WHERE/HAVING/ON clauses, SET assignments and trigger WHEN guards.
//!
//! An [`Operator`] is a single node (`"col"=5`, `"a" IN (1,2)`, `EXISTS (SELECT …)`), and an
//! [`OperatorGroup`] is an ordered chain of conditions joined by AND/OR, or by commas when it
//! is used as an assignment list. Connectives render in insertion order without regard to
//! precedence, so `c1.and(c2).or(c3)` renders as `c1 AND c2 OR c3`. Nested groups are
//! parenthesized.

use crate::convert::{ConverterRef, ConverterRegistry};
use crate::ident::Ident;
use crate::qb::operand::Operand;
use crate::qb::traits::Query;
use crate::qb::writer::SqlWriter;
use crate::value::{IntoValue, Value};
use std::fmt;
use std::sync::Arc;

/// Comparison or assignment token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    Glob,
    NotGlob,
    Match,
    Is,
    IsNot,
    IsNull,
    IsNotNull,
    Between,
    NotBetween,
    In,
    NotIn,
    Exists,
    NotExists,
}

impl Op {
    /// The SQL token written between the left operand and the right-hand side.
    pub fn token(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Like => " LIKE ",
            Op::NotLike => " NOT LIKE ",
            Op::Glob => " GLOB ",
            Op::NotGlob => " NOT GLOB ",
            Op::Match => " MATCH ",
            Op::Is => " IS ",
            Op::IsNot => " IS NOT ",
            Op::IsNull => " IS NULL",
            Op::IsNotNull => " IS NOT NULL",
            Op::Between => " BETWEEN ",
            Op::NotBetween => " NOT BETWEEN ",
            Op::In => " IN ",
            Op::NotIn => " NOT IN ",
            Op::Exists => "EXISTS ",
            Op::NotExists => "NOT EXISTS ",
        }
    }
}

/// Right-hand side of an [`Operator`].
#[derive(Clone, Debug)]
pub enum Rhs {
    /// Unary operators (IS NULL / IS NOT NULL).
    None,
    Value(Value),
    Between(Value, Value),
    List(Vec<Value>),
    Query(Arc<dyn Query>),
}

/// A single condition or assignment.
#[derive(Clone)]
pub struct Operator {
    left: Operand,
    op: Op,
    rhs: Rhs,
    post_modifier: Option<String>,
    converter: Option<ConverterRef>,
    bypass_conversion: bool,
}

impl Operator {
    pub fn new(left: impl Into<Operand>, op: Op, rhs: Rhs) -> Self {
        Self {
            left: left.into(),
            op,
            rhs,
            post_modifier: None,
            converter: None,
            bypass_conversion: false,
        }
    }

    /// Attach a converter used for custom values on the right-hand side.
    pub fn with_converter(mut self, converter: ConverterRef) -> Self {
        self.converter = Some(converter);
        self
    }

    pub(crate) fn with_converter_opt(mut self, converter: Option<ConverterRef>) -> Self {
        self.converter = converter;
        self
    }

    /// Write custom values from their display text instead of converting them.
    pub fn bypass_conversion(mut self) -> Self {
        self.bypass_conversion = true;
        self
    }

    /// Append ` COLLATE <name>`.
    pub fn collate(mut self, collation: impl AsRef<str>) -> Self {
        self.post_modifier = Some(format!(" COLLATE {}", collation.as_ref()));
        self
    }

    pub fn collate_nocase(self) -> Self {
        self.collate("NOCASE")
    }

    pub fn left(&self) -> &Operand {
        &self.left
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn rhs(&self) -> &Rhs {
        &self.rhs
    }

    /// The single right-hand value, if this operator has one.
    pub fn value(&self) -> Option<&Value> {
        match &self.rhs {
            Rhs::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Start a group: `self AND other`.
    pub fn and(self, other: impl Into<Condition>) -> OperatorGroup {
        OperatorGroup::new().and(self).and(other)
    }

    /// Start a group: `self OR other`.
    pub fn or(self, other: impl Into<Condition>) -> OperatorGroup {
        OperatorGroup::new().and(self).or(other)
    }

    pub fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push_operand_name(&self.left);
        w.push(self.op.token());
        let converter = self.converter.as_deref();
        let bypass = self.bypass_conversion;
        match &self.rhs {
            Rhs::None => {}
            Rhs::Value(v) => {
                w.push_value(v, converter, bypass);
            }
            Rhs::Between(low, high) => {
                w.push_value(low, converter, bypass);
                w.push(" AND ");
                w.push_value(high, converter, bypass);
            }
            Rhs::List(values) => {
                w.push_char('(');
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        w.push_char(',');
                    }
                    w.push_value(v, converter, bypass);
                }
                w.push_char(')');
            }
            Rhs::Query(q) => {
                w.push_query(q.as_ref());
            }
        }
        if let Some(modifier) = &self.post_modifier {
            w.push(modifier);
        }
    }

    /// Render with inline literals.
    pub fn to_sql(&self) -> String {
        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        self.write_sql(&mut w);
        w.into_sql()
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("left", &self.left)
            .field("op", &self.op)
            .field("rhs", &self.rhs)
            .field("post_modifier", &self.post_modifier)
            .field("has_converter", &self.converter.is_some())
            .field("bypass_conversion", &self.bypass_conversion)
            .finish()
    }
}

/// `EXISTS (<sub-select>)`
pub fn exists<Q: Query + 'static>(query: Q) -> Operator {
    Operator::new(Ident::empty(), Op::Exists, Rhs::Query(Arc::new(query)))
}

/// `NOT EXISTS (<sub-select>)`
pub fn not_exists<Q: Query + 'static>(query: Q) -> Operator {
    Operator::new(Ident::empty(), Op::NotExists, Rhs::Query(Arc::new(query)))
}

/// How an entry joins the entry before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn token(self) -> &'static str {
        match self {
            Connective::And => " AND ",
            Connective::Or => " OR ",
        }
    }
}

/// One entry of an [`OperatorGroup`].
#[derive(Clone, Debug)]
pub enum Condition {
    Op(Operator),
    Group(OperatorGroup),
    /// SQL fragment written as-is.
    Raw(String),
}

impl Condition {
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    fn is_empty(&self) -> bool {
        match self {
            Condition::Op(_) => false,
            Condition::Group(g) => g.is_empty(),
            Condition::Raw(sql) => sql.trim().is_empty(),
        }
    }

    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        match self {
            Condition::Op(op) => op.write_sql(w),
            Condition::Group(group) => {
                w.push_char('(');
                group.write_sql(w);
                w.push_char(')');
            }
            Condition::Raw(sql) => {
                w.push(sql);
            }
        }
    }
}

impl From<Operator> for Condition {
    fn from(op: Operator) -> Self {
        Condition::Op(op)
    }
}

impl From<OperatorGroup> for Condition {
    fn from(group: OperatorGroup) -> Self {
        Condition::Group(group)
    }
}

/// Ordered chain of conditions.
#[derive(Clone, Debug, Default)]
pub struct OperatorGroup {
    entries: Vec<(Condition, Connective)>,
    comma_separated: bool,
}

impl OperatorGroup {
    /// Create a new empty group joined by AND/OR.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group whose entries are joined by `,` (SET lists).
    pub fn comma_separated() -> Self {
        Self {
            entries: Vec::new(),
            comma_separated: true,
        }
    }

    /// Create a group from a single condition.
    pub fn of(condition: impl Into<Condition>) -> Self {
        Self::new().and(condition)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_comma_separated(&self) -> bool {
        self.comma_separated
    }

    /// Entries in insertion order with the connective that precedes each.
    pub fn entries(&self) -> impl Iterator<Item = (&Condition, Connective)> {
        self.entries.iter().map(|(c, conn)| (c, *conn))
    }

    /// Operators at the top level of this group.
    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.entries.iter().filter_map(|(c, _)| match c {
            Condition::Op(op) => Some(op),
            _ => None,
        })
    }

    /// Append a condition. Empty nested groups are ignored.
    pub fn push(&mut self, condition: impl Into<Condition>, connective: Connective) {
        let condition = condition.into();
        if condition.is_empty() {
            return;
        }
        self.entries.push((condition, connective));
    }

    pub fn and(mut self, condition: impl Into<Condition>) -> Self {
        self.push(condition, Connective::And);
        self
    }

    pub fn or(mut self, condition: impl Into<Condition>) -> Self {
        self.push(condition, Connective::Or);
        self
    }

    pub fn and_all<C: Into<Condition>>(mut self, conditions: impl IntoIterator<Item = C>) -> Self {
        for c in conditions {
            self.push(c, Connective::And);
        }
        self
    }

    pub fn or_all<C: Into<Condition>>(mut self, conditions: impl IntoIterator<Item = C>) -> Self {
        for c in conditions {
            self.push(c, Connective::Or);
        }
        self
    }

    /// Append a raw SQL fragment joined by AND.
    pub fn raw(self, sql: impl Into<String>) -> Self {
        self.and(Condition::raw(sql))
    }

    pub fn write_sql(&self, w: &mut SqlWriter<'_>) {
        for (i, (condition, connective)) in self.entries.iter().enumerate() {
            if i > 0 {
                if self.comma_separated {
                    w.push_char(',');
                } else {
                    w.push(connective.token());
                }
            }
            condition.write_sql(w);
        }
    }

    /// Render with inline literals.
    pub fn to_sql(&self) -> String {
        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        self.write_sql(&mut w);
        w.into_sql()
    }
}

impl<C: Into<Condition>> FromIterator<C> for OperatorGroup {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        OperatorGroup::new().and_all(iter)
    }
}

/// Build an assignment `"col"=value` for SET lists and INSERT column/value pairs.
pub fn assign(column: impl Into<Operand>, value: impl IntoValue) -> Operator {
    Operator::new(column, Op::Eq, Rhs::Value(value.into_value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::operand::Operand;
    use crate::value::SqlValue;

    fn col(name: &str) -> Operand {
        Operand::column(name)
    }

    #[test]
    fn simple_eq() {
        assert_eq!(col("name").eq("alice").to_sql(), r#""name"='alice'"#);
    }

    #[test]
    fn connectives_keep_insertion_order() {
        let group = OperatorGroup::new()
            .and(col("a").eq(1))
            .and(col("b").eq(2))
            .or(col("c").eq(3));
        assert_eq!(group.to_sql(), r#""a"=1 AND "b"=2 OR "c"=3"#);
    }

    #[test]
    fn first_connective_is_not_rendered() {
        let group = OperatorGroup::new().or(col("a").eq(1)).and(col("b").eq(2));
        assert_eq!(group.to_sql(), r#""a"=1 AND "b"=2"#);
    }

    #[test]
    fn nested_group_is_parenthesized() {
        let group = OperatorGroup::new()
            .and(col("status").eq("active"))
            .and(col("role").eq("admin").or(col("role").eq("owner")));
        assert_eq!(
            group.to_sql(),
            r#""status"='active' AND ("role"='admin' OR "role"='owner')"#
        );
    }

    #[test]
    fn empty_nested_group_is_skipped() {
        let group = OperatorGroup::new()
            .and(col("a").eq(1))
            .and(OperatorGroup::new());
        assert_eq!(group.to_sql(), r#""a"=1"#);
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn comma_mode_ignores_connective() {
        let group = OperatorGroup::comma_separated()
            .and(assign("a", 1))
            .or(assign("b", 2));
        assert_eq!(group.to_sql(), r#""a"=1,"b"=2"#);
    }

    #[test]
    fn in_list_has_no_spaces() {
        assert_eq!(
            col("col").in_list([1, 2, 3]).to_sql(),
            r#""col" IN (1,2,3)"#
        );
        assert_eq!(
            col("col").not_in(Vec::<i64>::new()).to_sql(),
            r#""col" NOT IN ()"#
        );
    }

    #[test]
    fn between_and_null_checks() {
        assert_eq!(col("c").between(1, 5).to_sql(), r#""c" BETWEEN 1 AND 5"#);
        assert_eq!(col("c").is_null().to_sql(), r#""c" IS NULL"#);
        assert_eq!(col("c").is_not_null().to_sql(), r#""c" IS NOT NULL"#);
    }

    #[test]
    fn like_with_collation() {
        let op = col("name").like("a%").collate_nocase();
        assert_eq!(op.to_sql(), r#""name" LIKE 'a%' COLLATE NOCASE"#);
    }

    #[test]
    fn null_value_is_inlined_in_positional_mode() {
        let registry = ConverterRegistry::new();
        let mut w = SqlWriter::positional(&registry);
        col("a").is(Value::Null).write_sql(&mut w);
        let compiled = w.finish();
        assert_eq!(compiled.sql(), r#""a" IS NULL"#);
        assert!(compiled.params().is_empty());
    }

    #[test]
    fn positional_between_binds_both_bounds() {
        let registry = ConverterRegistry::new();
        let mut w = SqlWriter::positional(&registry);
        col("a").between(1, 9).write_sql(&mut w);
        let compiled = w.finish();
        assert_eq!(compiled.sql(), r#""a" BETWEEN ? AND ?"#);
        assert_eq!(
            compiled.params(),
            &[SqlValue::Integer(1), SqlValue::Integer(9)]
        );
    }

    #[test]
    fn column_to_column_comparison() {
        let op = Operand::qualified("a", "id").eq(Operand::qualified("b", "a_id"));
        assert_eq!(op.to_sql(), r#""a"."id"="b"."a_id""#);
    }

    #[test]
    fn raw_condition() {
        let group = OperatorGroup::new().and(col("a").eq(1)).raw("1=1");
        assert_eq!(group.to_sql(), r#""a"=1 AND 1=1"#);
    }
}
