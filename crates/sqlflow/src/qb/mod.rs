//! Query builders and the SQL compiler.
//!
//! Every statement is a consuming builder that renders through a [`SqlWriter`]:
//!
//! - [`Query::to_sql`] writes inline literals (display, logging, DDL).
//! - [`Query::compile`] writes `?` placeholders and collects the bound values. Execution
//!   helpers always go through this path using the client's converter registry.
//!
//! AND / OR connectives render in the order they were added; nothing is re-ordered by
//! precedence. Use nested [`OperatorGroup`]s for explicit parentheses.
//!
//! # Usage
//!
//! ```ignore
//! use sqlflow::qb::{self, Filterable, Transformable};
//! use sqlflow::Operand;
//!
//! // SELECT
//! let adults: Vec<Row> = qb::select_all()
//!     .from("users")
//!     .filter(Operand::column("age").gte(18))
//!     .order_by_asc("name")
//!     .limit(20)
//!     .fetch_all(&conn)
//!     .await?;
//!
//! // INSERT
//! let id = qb::insert("users")
//!     .columns(["name", "age"])?
//!     .values(("alice", 31))?
//!     .execute_insert(&conn)
//!     .await?;
//!
//! // UPDATE
//! qb::update("users")
//!     .set_value("age", 32)
//!     .filter(Operand::column("id").eq(id))
//!     .execute(&conn)
//!     .await?;
//!
//! // DELETE
//! qb::delete("users")
//!     .filter(Operand::column("id").eq(id))
//!     .execute(&conn)
//!     .await?;
//! ```

mod clause;
mod delete;
mod expr;
pub mod func;
mod index;
mod insert;
mod join;
mod operand;
mod raw;
mod select;
mod traits;
mod trigger;
mod update;
mod writer;

pub use clause::{ConflictPolicy, Direction, OrderBy, Tail};
pub use delete::DeleteQb;
pub use expr::{
    assign, exists, not_exists, Condition, Connective, Op, Operator, OperatorGroup, Rhs,
};
pub use func::{Cast, SqlType};
pub use index::IndexQb;
pub use insert::InsertQb;
pub use join::{Join, JoinCondition, JoinKind, JoinSource};
pub use operand::{Operand, Property};
pub use raw::RawQuery;
pub(crate) use raw::{starts_with_keyword, strip_sql_prefix};
pub use select::{Quantifier, SelectQb, SelectStart};
pub use traits::{Filterable, MutationQb, Query, SqlQb, Transformable};
pub use trigger::{
    new_row, old_row, CompletedTrigger, Trigger, TriggerEvent, TriggerMethod, TriggerTiming,
};
pub use update::UpdateQb;
pub use writer::{literal, BindMode, CompiledQuery, ParamList, SqlWriter};

use crate::ident::Ident;

/// Start a SELECT with the given projection. Call `from` to pick the source.
///
/// # Example
/// ```
/// use sqlflow::qb::Query;
///
/// let q = sqlflow::qb::select(["id", "name"]).from("users");
/// assert_eq!(q.to_sql(), r#"SELECT "id","name" FROM "users" "#);
/// ```
pub fn select<C: Into<Operand>>(columns: impl IntoIterator<Item = C>) -> SelectStart {
    SelectStart::new(columns.into_iter().map(Into::into).collect())
}

/// `SELECT * ...`
pub fn select_all() -> SelectStart {
    SelectStart::new(Vec::new())
}

/// Start an INSERT into `table`.
///
/// # Example
/// ```
/// use sqlflow::qb::Query;
///
/// let q = sqlflow::qb::insert("T").columns(["a", "b"])?.values([1, 2])?;
/// assert_eq!(q.to_sql(), r#"INSERT INTO "T"("a","b") VALUES (1,2)"#);
/// # Ok::<(), sqlflow::OrmError>(())
/// ```
pub fn insert(table: impl Into<Ident>) -> InsertQb {
    InsertQb::new(table)
}

/// Start an UPDATE of `table`.
///
/// # Example
/// ```
/// use sqlflow::qb::{Filterable, Operand, Query};
///
/// let q = sqlflow::qb::update("T")
///     .set_value("a", 1)
///     .filter(Operand::column("id").eq(2));
/// assert_eq!(q.to_sql(), r#"UPDATE "T" SET "a"=1 WHERE "id"=2 "#);
/// ```
pub fn update(table: impl Into<Ident>) -> UpdateQb {
    UpdateQb::new(table)
}

/// Start a DELETE from `table`.
///
/// Without a filter every row is deleted.
pub fn delete(table: impl Into<Ident>) -> DeleteQb {
    DeleteQb::new(table)
}

/// A hand-written statement with `?` placeholders.
pub fn raw(sql: impl Into<String>) -> RawQuery {
    RawQuery::new(sql)
}

/// `CREATE INDEX "name" ON "table"(...)`
pub fn create_index(name: impl Into<String>, table: impl Into<Ident>) -> IndexQb {
    IndexQb::new(name, table)
}

/// Start a `CREATE TRIGGER`.
pub fn trigger(name: impl Into<String>) -> Trigger {
    Trigger::new(name)
}

#[cfg(test)]
mod tests;
