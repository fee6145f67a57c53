//! JOIN clauses.

use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::qb::expr::{Condition, OperatorGroup};
use crate::qb::operand::Operand;
use crate::qb::traits::Query;
use crate::qb::writer::SqlWriter;
use std::sync::Arc;

/// Join kinds supported by SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    LeftOuter,
    Inner,
    Cross,
    Natural,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::LeftOuter => "LEFT OUTER",
            JoinKind::Inner => "INNER",
            JoinKind::Cross => "CROSS",
            JoinKind::Natural => "NATURAL",
        }
    }
}

/// What is being joined.
#[derive(Debug, Clone)]
pub enum JoinSource {
    Table(Ident),
    Query(Arc<dyn Query>),
}

/// How joined rows are matched.
#[derive(Debug, Clone, Default)]
pub enum JoinCondition {
    #[default]
    None,
    On(OperatorGroup),
    Using(Vec<Ident>),
}

/// A secondary source in a SELECT.
///
/// `NATURAL` joins match on shared column names and reject explicit conditions:
///
/// ```
/// use sqlflow::OrmError;
/// use sqlflow::qb::{Join, Operand};
///
/// let err = Join::natural("orders").on(Operand::column("order_id").eq(1)).unwrap_err();
/// assert!(matches!(err, OrmError::NaturalJoinCondition { .. }));
/// ```
#[derive(Debug, Clone)]
pub struct Join {
    kind: JoinKind,
    source: JoinSource,
    alias: Option<String>,
    condition: JoinCondition,
}

impl Join {
    /// Join a table. An alias on `table` becomes the join alias.
    pub fn new(kind: JoinKind, table: impl Into<Ident>) -> Self {
        let ident = table.into();
        let alias = ident.alias().map(str::to_string);
        Self {
            kind,
            source: JoinSource::Table(ident.to_builder().no_alias().build()),
            alias,
            condition: JoinCondition::None,
        }
    }

    /// Join a sub-select under `alias`.
    pub fn sub_query<Q: Query + 'static>(kind: JoinKind, query: Q, alias: impl Into<String>) -> Self {
        Self {
            kind,
            source: JoinSource::Query(Arc::new(query)),
            alias: Some(alias.into()),
            condition: JoinCondition::None,
        }
    }

    pub fn inner(table: impl Into<Ident>) -> Self {
        Self::new(JoinKind::Inner, table)
    }

    pub fn left_outer(table: impl Into<Ident>) -> Self {
        Self::new(JoinKind::LeftOuter, table)
    }

    pub fn cross(table: impl Into<Ident>) -> Self {
        Self::new(JoinKind::Cross, table)
    }

    pub fn natural(table: impl Into<Ident>) -> Self {
        Self::new(JoinKind::Natural, table)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn source(&self) -> &JoinSource {
        &self.source
    }

    pub fn condition(&self) -> &JoinCondition {
        &self.condition
    }

    /// Alias if set, else the table name.
    pub fn display_name(&self) -> String {
        match (&self.alias, &self.source) {
            (Some(alias), _) => alias.clone(),
            (None, JoinSource::Table(ident)) => ident.name().to_string(),
            (None, JoinSource::Query(_)) => String::new(),
        }
    }

    fn reject_natural(&self) -> OrmResult<()> {
        if self.kind == JoinKind::Natural {
            return Err(OrmError::NaturalJoinCondition {
                alias: self.display_name(),
            });
        }
        Ok(())
    }

    /// Set `ON <condition>`.
    pub fn on(mut self, condition: impl Into<Condition>) -> OrmResult<Self> {
        self.reject_natural()?;
        self.condition = JoinCondition::On(OperatorGroup::of(condition));
        Ok(self)
    }

    /// Set `USING ("a","b")`.
    pub fn using<C: Into<Operand>>(mut self, columns: impl IntoIterator<Item = C>) -> OrmResult<Self> {
        self.reject_natural()?;
        self.condition = JoinCondition::Using(
            columns
                .into_iter()
                .map(|c| c.into().into_ident().unqualified())
                .collect(),
        );
        Ok(self)
    }

    /// Set the condition without the NATURAL check; callers pick a non-natural kind.
    pub(crate) fn with_condition(mut self, condition: JoinCondition) -> Self {
        debug_assert!(self.kind != JoinKind::Natural || matches!(condition, JoinCondition::None));
        self.condition = condition;
        self
    }

    pub(crate) fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push(self.kind.keyword()).push(" JOIN ");
        match &self.source {
            JoinSource::Table(ident) => {
                w.push_full_name(ident);
            }
            JoinSource::Query(query) => {
                w.push_query(query.as_ref());
            }
        }
        if let Some(alias) = &self.alias {
            w.push(" AS ").push(&crate::ident::quote(alias));
        }
        w.push_char(' ');
        match &self.condition {
            JoinCondition::None => {}
            JoinCondition::On(group) => {
                w.push("ON ");
                group.write_sql(w);
                w.push_char(' ');
            }
            JoinCondition::Using(columns) => {
                w.push("USING (").push_name_list(columns).push(") ");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConverterRegistry;

    fn render(join: &Join) -> String {
        let mut w = SqlWriter::inline(ConverterRegistry::builtin());
        join.write_sql(&mut w);
        w.into_sql()
    }

    #[test]
    fn inner_join_on() {
        let join = Join::inner("orders")
            .alias("o")
            .on(Operand::qualified("o", "user_id").eq(Operand::qualified("u", "id")))
            .unwrap();
        assert_eq!(
            render(&join),
            r#"INNER JOIN "orders" AS "o" ON "o"."user_id"="u"."id" "#
        );
    }

    #[test]
    fn left_outer_join_using() {
        let join = Join::left_outer("b").using(["id", "kind"]).unwrap();
        assert_eq!(render(&join), r#"LEFT OUTER JOIN "b" USING ("id","kind") "#);
    }

    #[test]
    fn natural_join_renders_without_condition() {
        assert_eq!(render(&Join::natural("b")), r#"NATURAL JOIN "b" "#);
    }

    #[test]
    fn natural_join_rejects_on_and_using() {
        let err = Join::natural("b")
            .alias("bb")
            .on(Operand::column("a").eq(1))
            .unwrap_err();
        assert!(matches!(err, OrmError::NaturalJoinCondition { ref alias } if alias == "bb"));

        let err = Join::natural("b").using(["id"]).unwrap_err();
        assert!(matches!(err, OrmError::NaturalJoinCondition { ref alias } if alias == "b"));
    }

    #[test]
    fn alias_taken_from_ident() {
        let join = Join::cross(Ident::new("t").with_alias("x"));
        assert_eq!(render(&join), r#"CROSS JOIN "t" AS "x" "#);
    }
}
