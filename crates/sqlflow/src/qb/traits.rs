//! Trait definitions for query builders.

use crate::client::GenericClient;
use crate::convert::ConverterRegistry;
use crate::error::OrmResult;
use crate::notify::{ChangeListener, PrimaryAction};
use crate::qb::clause::{OrderBy, Tail};
use crate::qb::expr::{Condition, Connective, OperatorGroup};
use crate::qb::operand::Operand;
use crate::qb::writer::{CompiledQuery, SqlWriter};
use crate::result::{AffectedRows, ResultFactory};
use crate::table::TableDescriptor;
use crate::value::IntoValue;
use std::fmt;

/// Anything that renders to a SQL statement.
///
/// Object safe, so statements can be nested as sub-queries (`Arc<dyn Query>`).
pub trait Query: Send + Sync + fmt::Debug {
    /// Write the statement into `w`.
    fn write_sql(&self, w: &mut SqlWriter<'_>);

    /// Render with inline literals, converting custom values with the built-in converters.
    fn to_sql(&self) -> String {
        self.to_sql_with(ConverterRegistry::builtin())
    }

    /// Render with inline literals using `registry`.
    fn to_sql_with(&self, registry: &ConverterRegistry) -> String {
        let mut w = SqlWriter::inline(registry);
        self.write_sql(&mut w);
        w.into_sql()
    }

    /// Render with `?` placeholders and collect the bound parameters.
    fn compile(&self, registry: &ConverterRegistry) -> CompiledQuery {
        let mut w = SqlWriter::positional(registry);
        self.write_sql(&mut w);
        w.finish()
    }
}

/// Base trait for executable builders.
pub trait SqlQb: Query {
    /// Validate builder state before execution.
    fn validate(&self) -> OrmResult<()> {
        Ok(())
    }

    /// Validate, then compile with `registry`.
    fn build(&self, registry: &ConverterRegistry) -> OrmResult<CompiledQuery> {
        self.validate()?;
        Ok(self.compile(registry))
    }

    /// Validate, compile once with the client's converters and hand the result to `factory`.
    fn run<R, F>(
        &self,
        conn: &impl GenericClient,
        factory: &F,
    ) -> impl std::future::Future<Output = OrmResult<R>> + Send
    where
        F: ResultFactory<R>,
    {
        async move {
            let compiled = self.build(conn.converters())?;
            factory.create_result(&compiled, conn).await
        }
    }
}

/// Trait for mutation builders (INSERT/UPDATE/DELETE).
pub trait MutationQb: SqlQb {
    /// What kind of change this statement makes.
    fn primary_action(&self) -> PrimaryAction;

    /// The table being modified.
    fn table_name(&self) -> &str;

    /// Execute and return affected row count.
    fn execute(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        async move { self.run(conn, &AffectedRows).await }
    }

    /// Execute, then report `(table, action)` to `listener` on success.
    fn execute_notify<L: ChangeListener>(
        &self,
        conn: &impl GenericClient,
        listener: &L,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        async move {
            let affected = self.execute(conn).await?;
            listener.on_change(self.table_name(), self.primary_action());
            Ok(affected)
        }
    }
}

/// Builders with a WHERE clause.
pub trait Filterable: Sized {
    fn where_mut(&mut self) -> &mut OperatorGroup;

    /// Add a condition joined by AND.
    fn filter(mut self, condition: impl Into<Condition>) -> Self {
        self.where_mut().push(condition, Connective::And);
        self
    }

    /// Alias for [`filter`](Self::filter).
    fn and(self, condition: impl Into<Condition>) -> Self {
        self.filter(condition)
    }

    /// Add a condition joined by OR.
    fn or(mut self, condition: impl Into<Condition>) -> Self {
        self.where_mut().push(condition, Connective::Or);
        self
    }

    /// Add several conditions, each joined by AND.
    fn filter_all<C: Into<Condition>>(mut self, conditions: impl IntoIterator<Item = C>) -> Self {
        for c in conditions {
            self.where_mut().push(c, Connective::And);
        }
        self
    }

    /// Restrict to the row identified by `key` (primary key values in key order).
    fn filter_identity<V: IntoValue>(
        self,
        table: &TableDescriptor,
        key: impl IntoIterator<Item = V>,
    ) -> OrmResult<Self> {
        let predicate = table.identity_predicate(key)?;
        Ok(self.filter(predicate))
    }
}

/// Builders with GROUP BY / HAVING / ORDER BY / LIMIT / OFFSET.
pub trait Transformable: Sized {
    fn tail_mut(&mut self) -> &mut Tail;

    fn group_by<C: Into<Operand>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        let tail = self.tail_mut();
        tail.group_by
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add a HAVING condition joined by AND.
    fn having(mut self, condition: impl Into<Condition>) -> Self {
        self.tail_mut().having.push(condition, Connective::And);
        self
    }

    fn order_by(mut self, term: OrderBy) -> Self {
        self.tail_mut().order_by.push(term);
        self
    }

    fn order_by_asc(self, column: impl Into<Operand>) -> Self {
        self.order_by(OrderBy::asc(column))
    }

    fn order_by_desc(self, column: impl Into<Operand>) -> Self {
        self.order_by(OrderBy::desc(column))
    }

    fn limit(mut self, n: i64) -> Self {
        self.tail_mut().limit = Some(n);
        self
    }

    fn offset(mut self, n: i64) -> Self {
        self.tail_mut().offset = Some(n);
        self
    }

    /// Pagination helper.
    ///
    /// `page` is 1-based (clamped to >= 1).
    /// `per_page` is clamped to >= 1.
    fn paginate(mut self, page: i64, per_page: i64) -> Self {
        let p = page.max(1);
        let size = per_page.max(1);
        let tail = self.tail_mut();
        tail.limit = Some(size);
        tail.offset = Some((p - 1) * size);
        self
    }
}
