//! SELECT statements.
//!
//! `select(..)` returns a [`SelectStart`]; only `from` / `from_query` turn it into an
//! executable [`SelectQb`], so a statement always has exactly one source.

use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::ident::{self, Ident};
use crate::qb::clause::Tail;
use crate::qb::expr::{Condition, OperatorGroup};
use crate::qb::func;
use crate::qb::join::{Join, JoinCondition};
use crate::qb::operand::Operand;
use crate::qb::traits::{Filterable, Query, SqlQb, Transformable};
use crate::qb::writer::SqlWriter;
use crate::result::{HasData, OptionalRow, RowList, ScalarLong, ScalarString, SingleRow};
use crate::row::FromRow;
use std::sync::Arc;

/// `DISTINCT` / `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Distinct,
    All,
}

impl Quantifier {
    fn keyword(self) -> &'static str {
        match self {
            Quantifier::Distinct => "DISTINCT ",
            Quantifier::All => "ALL ",
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Table(Ident),
    Query(Arc<dyn Query>, Option<String>),
}

/// Projection chosen, source not yet bound.
#[derive(Debug, Clone)]
pub struct SelectStart {
    quantifier: Option<Quantifier>,
    projection: Vec<Operand>,
}

impl SelectStart {
    pub(crate) fn new(projection: Vec<Operand>) -> Self {
        Self {
            quantifier: None,
            projection,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.quantifier = Some(Quantifier::Distinct);
        self
    }

    pub fn all(mut self) -> Self {
        self.quantifier = Some(Quantifier::All);
        self
    }

    /// Select from a table. An alias on `table` renders as `"t" AS "a"`.
    pub fn from(self, table: impl Into<Ident>) -> SelectQb {
        self.bind(Source::Table(table.into()))
    }

    /// Select from a sub-query under `alias`.
    pub fn from_query<Q: Query + 'static>(self, query: Q, alias: impl Into<String>) -> SelectQb {
        self.bind(Source::Query(Arc::new(query), Some(alias.into())))
    }

    fn bind(self, source: Source) -> SelectQb {
        SelectQb {
            quantifier: self.quantifier,
            projection: self.projection,
            source,
            joins: Vec::new(),
            where_group: OperatorGroup::new(),
            tail: Tail::default(),
        }
    }
}

/// SELECT builder.
#[derive(Debug, Clone)]
pub struct SelectQb {
    quantifier: Option<Quantifier>,
    /// Empty means `*`.
    projection: Vec<Operand>,
    source: Source,
    joins: Vec<Join>,
    where_group: OperatorGroup,
    tail: Tail,
}

impl SelectQb {
    /// Alias the source: `FROM "users" AS "u"`.
    pub fn as_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.source = match self.source {
            Source::Table(ident) => Source::Table(ident.with_alias(alias)),
            Source::Query(query, _) => Source::Query(query, Some(alias)),
        };
        self
    }

    /// Append projection columns.
    pub fn column<C: Into<Operand>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.projection.extend(columns.into_iter().map(Into::into));
        self
    }

    // ==================== JOIN ====================

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// `INNER JOIN <table> ON <condition>`
    pub fn inner_join(self, table: impl Into<Ident>, on: impl Into<Condition>) -> Self {
        self.join(Join::inner(table).with_condition(JoinCondition::On(OperatorGroup::of(on))))
    }

    /// `LEFT OUTER JOIN <table> ON <condition>`
    pub fn left_join(self, table: impl Into<Ident>, on: impl Into<Condition>) -> Self {
        self.join(Join::left_outer(table).with_condition(JoinCondition::On(OperatorGroup::of(on))))
    }

    pub fn cross_join(self, table: impl Into<Ident>) -> Self {
        self.join(Join::cross(table))
    }

    pub fn natural_join(self, table: impl Into<Ident>) -> Self {
        self.join(Join::natural(table))
    }

    // ==================== Inspection ====================

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn where_group(&self) -> &OperatorGroup {
        &self.where_group
    }

    pub fn tail(&self) -> &Tail {
        &self.tail
    }

    /// `SELECT COUNT(*) FROM (<this statement>)`
    pub fn count_query(&self) -> SelectQb {
        SelectStart::new(vec![func::count_all()])
            .bind(Source::Query(Arc::new(self.clone()), None))
    }

    /// A copy limited to at most one row.
    fn single(&self) -> SelectQb {
        let mut q = self.clone();
        if q.tail.limit.is_none_or(|n| !(0..=1).contains(&n)) {
            q.tail.limit = Some(1);
        }
        q
    }

    // ==================== Execution ====================

    pub fn fetch_all<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<Vec<T>>> + Send {
        async move { self.run(conn, &RowList::<T>::new()).await }
    }

    /// First row; [`OrmError::NotFound`](crate::OrmError::NotFound) when there is none.
    pub fn fetch_one<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<T>> + Send {
        async move { self.single().run(conn, &SingleRow::<T>::new()).await }
    }

    pub fn fetch_opt<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<Option<T>>> + Send {
        async move { self.single().run(conn, &OptionalRow::<T>::new()).await }
    }

    /// Number of rows this statement returns.
    pub fn count(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<i64>> + Send {
        async move { self.count_query().run(conn, &ScalarLong).await }
    }

    /// Whether at least one row matches. Driver errors are logged and reported as `false`.
    pub fn exists(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<bool>> + Send {
        async move { self.single().run(conn, &HasData).await }
    }

    /// First column of the first row as an integer (0 when absent).
    pub fn long_value(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<i64>> + Send {
        async move { self.single().run(conn, &ScalarLong).await }
    }

    pub fn string_value(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<Option<String>>> + Send {
        async move { self.single().run(conn, &ScalarString).await }
    }
}

impl Query for SelectQb {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("SELECT ");
        if let Some(q) = self.quantifier {
            w.push(q.keyword());
        }
        if self.projection.is_empty() {
            w.push_char('*');
        }
        for (i, column) in self.projection.iter().enumerate() {
            if i > 0 {
                w.push_char(',');
            }
            w.push_operand(column);
        }

        w.push(" FROM ");
        match &self.source {
            Source::Table(table) => {
                w.push_ident(table);
            }
            Source::Query(query, alias) => {
                w.push_query(query.as_ref());
                if let Some(alias) = alias {
                    w.push(" AS ").push(&ident::quote(alias));
                }
            }
        }
        w.push_char(' ');

        for join in &self.joins {
            join.write_sql(w);
        }
        if !self.where_group.is_empty() {
            w.push("WHERE ");
            self.where_group.write_sql(w);
            w.push_char(' ');
        }
        self.tail.write_sql(w);
    }
}

impl SqlQb for SelectQb {}

impl Filterable for SelectQb {
    fn where_mut(&mut self) -> &mut OperatorGroup {
        &mut self.where_group
    }
}

impl Transformable for SelectQb {
    fn tail_mut(&mut self) -> &mut Tail {
        &mut self.tail
    }
}
