//! CREATE TRIGGER.
//!
//! A trigger is built in three steps, each a distinct type:
//!
//! 1. [`Trigger`]: name, `TEMP`, `IF NOT EXISTS` and timing.
//! 2. [`TriggerMethod`]: the event and table, `FOR EACH ROW`, `WHEN`.
//! 3. [`CompletedTrigger`]: one or more body statements. Only this step renders.
//!
//! ```ignore
//! use sqlflow::qb::{self, new_row, trigger};
//!
//! let t = trigger("touch_users")
//!     .after()
//!     .on_update("users")
//!     .for_each_row()
//!     .begin(qb::update("users").set_value("touched", 1).filter(
//!         sqlflow::Operand::column("id").eq(new_row("id")),
//!     ));
//! ```
//!
//! Body statements and the WHEN clause are always written with inline literals.

use crate::ident::{self, Ident};
use crate::notify::PrimaryAction;
use crate::qb::expr::{Condition, OperatorGroup};
use crate::qb::operand::Operand;
use crate::qb::traits::{MutationQb, Query, SqlQb};
use crate::qb::writer::SqlWriter;
use std::sync::Arc;

/// `NEW."column"` inside a trigger body.
pub fn new_row(column: impl Into<String>) -> Operand {
    row_ref("NEW", column)
}

/// `OLD."column"` inside a trigger body.
pub fn old_row(column: impl Into<String>) -> Operand {
    row_ref("OLD", column)
}

fn row_ref(table: &str, column: impl Into<String>) -> Operand {
    Operand::from_ident(Ident::builder(column).table(table).quote_table(false).build())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    fn keyword(self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE ",
            TriggerTiming::After => "AFTER ",
            TriggerTiming::InsteadOf => "INSTEAD OF ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Delete,
    /// `UPDATE`, or `UPDATE OF <columns>` when the list is non-empty.
    Update(Vec<Ident>),
}

/// First step: name and timing.
#[derive(Debug, Clone)]
pub struct Trigger {
    name: String,
    temp: bool,
    if_not_exists: bool,
    timing: Option<TriggerTiming>,
}

impl Trigger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            temp: false,
            if_not_exists: false,
            timing: None,
        }
    }

    pub fn temp(mut self) -> Self {
        self.temp = true;
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn before(mut self) -> Self {
        self.timing = Some(TriggerTiming::Before);
        self
    }

    pub fn after(mut self) -> Self {
        self.timing = Some(TriggerTiming::After);
        self
    }

    /// Only valid on views.
    pub fn instead_of(mut self) -> Self {
        self.timing = Some(TriggerTiming::InsteadOf);
        self
    }

    pub fn on_insert(self, table: impl Into<Ident>) -> TriggerMethod {
        self.on(TriggerEvent::Insert, table)
    }

    pub fn on_delete(self, table: impl Into<Ident>) -> TriggerMethod {
        self.on(TriggerEvent::Delete, table)
    }

    pub fn on_update(self, table: impl Into<Ident>) -> TriggerMethod {
        self.on(TriggerEvent::Update(Vec::new()), table)
    }

    /// `UPDATE OF "a","b" ON ...`
    pub fn on_update_of<C: Into<Operand>>(
        self,
        table: impl Into<Ident>,
        columns: impl IntoIterator<Item = C>,
    ) -> TriggerMethod {
        let columns = columns
            .into_iter()
            .map(|c| c.into().into_ident().unqualified())
            .collect();
        self.on(TriggerEvent::Update(columns), table)
    }

    fn on(self, event: TriggerEvent, table: impl Into<Ident>) -> TriggerMethod {
        TriggerMethod {
            trigger: self,
            event,
            table: table.into(),
            for_each_row: false,
            when: OperatorGroup::new(),
        }
    }

    /// `DROP TRIGGER IF EXISTS "name"`
    pub fn drop_sql(&self) -> String {
        format!("DROP TRIGGER IF EXISTS {}", ident::quote(&self.name))
    }
}

/// Second step: event, table and optional WHEN condition.
#[derive(Debug, Clone)]
pub struct TriggerMethod {
    trigger: Trigger,
    event: TriggerEvent,
    table: Ident,
    for_each_row: bool,
    when: OperatorGroup,
}

impl TriggerMethod {
    pub fn for_each_row(mut self) -> Self {
        self.for_each_row = true;
        self
    }

    /// Add a WHEN condition; repeated calls are joined by AND.
    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.when = self.when.and(condition);
        self
    }

    /// Supply the first body statement.
    pub fn begin<Q: Query + 'static>(self, statement: Q) -> CompletedTrigger {
        CompletedTrigger {
            method: self,
            body: vec![Arc::new(statement)],
        }
    }
}

/// A trigger with at least one body statement.
#[derive(Debug, Clone)]
pub struct CompletedTrigger {
    method: TriggerMethod,
    body: Vec<Arc<dyn Query>>,
}

impl CompletedTrigger {
    /// Append another body statement.
    pub fn then<Q: Query + 'static>(mut self, statement: Q) -> Self {
        self.body.push(Arc::new(statement));
        self
    }

    pub fn name(&self) -> &str {
        &self.method.trigger.name
    }

    pub fn drop_sql(&self) -> String {
        self.method.trigger.drop_sql()
    }
}

impl Query for CompletedTrigger {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        let TriggerMethod {
            trigger,
            event,
            table,
            for_each_row,
            when,
        } = &self.method;

        w.push("CREATE ");
        if trigger.temp {
            w.push("TEMP ");
        }
        w.push("TRIGGER ");
        if trigger.if_not_exists {
            w.push("IF NOT EXISTS ");
        }
        w.push(&ident::quote(&trigger.name)).push_char(' ');
        if let Some(timing) = trigger.timing {
            w.push(timing.keyword());
        }
        match event {
            TriggerEvent::Insert => {
                w.push("INSERT ");
            }
            TriggerEvent::Delete => {
                w.push("DELETE ");
            }
            TriggerEvent::Update(columns) if columns.is_empty() => {
                w.push("UPDATE ");
            }
            TriggerEvent::Update(columns) => {
                w.push("UPDATE OF ").push_name_list(columns).push_char(' ');
            }
        }
        w.push("ON ").push_full_name(table).push_char(' ');
        if *for_each_row {
            w.push("FOR EACH ROW ");
        }

        w.with_inline(|w| {
            if !when.is_empty() {
                w.push("WHEN ");
                when.write_sql(w);
                w.push_char(' ');
            }
            w.push("BEGIN ");
            for statement in &self.body {
                statement.write_sql(w);
                w.trim_end().push("; ");
            }
        });
        w.push("END");
    }
}

impl SqlQb for CompletedTrigger {}

impl MutationQb for CompletedTrigger {
    fn primary_action(&self) -> PrimaryAction {
        PrimaryAction::Change
    }

    fn table_name(&self) -> &str {
        self.method.table.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConverterRegistry;
    use crate::qb::{delete, insert, trigger, update};
    use crate::qb::traits::Filterable;

    #[test]
    fn update_of_with_when() {
        let t = trigger("audit_names")
            .after()
            .on_update_of("users", ["name"])
            .for_each_row()
            .when(old_row("name").ne(new_row("name")))
            .begin(
                insert("audit")
                    .columns(["user_id", "old_name"])
                    .unwrap()
                    .values([new_row("id"), old_row("name")])
                    .unwrap(),
            );
        assert_eq!(
            t.to_sql(),
            concat!(
                r#"CREATE TRIGGER "audit_names" AFTER UPDATE OF "name" ON "users" "#,
                r#"FOR EACH ROW WHEN OLD."name"!=NEW."name" "#,
                r#"BEGIN INSERT INTO "audit"("user_id","old_name") VALUES (NEW."id",OLD."name"); END"#
            )
        );
    }

    #[test]
    fn body_is_inline_when_compiled() {
        let t = trigger("cleanup")
            .temp()
            .if_not_exists()
            .before()
            .on_delete("users")
            .begin(delete("sessions").filter(Operand::column("user_id").eq(old_row("id"))))
            .then(
                update("stats")
                    .set_value("deleted", Operand::column("deleted").plus(1))
                    .filter(Operand::column("kind").eq("user")),
            );
        let compiled = t.compile(ConverterRegistry::builtin());
        assert_eq!(
            compiled.sql(),
            concat!(
                r#"CREATE TEMP TRIGGER IF NOT EXISTS "cleanup" BEFORE DELETE ON "users" BEGIN "#,
                r#"DELETE FROM "sessions" WHERE "user_id"=OLD."id"; "#,
                r#"UPDATE "stats" SET "deleted"="deleted" + 1 WHERE "kind"='user'; END"#
            )
        );
        assert!(compiled.params().is_empty());
        assert_eq!(t.drop_sql(), r#"DROP TRIGGER IF EXISTS "cleanup""#);
        assert_eq!(t.table_name(), "users");
    }

    #[test]
    fn insert_event_without_timing() {
        let t = trigger("t").on_insert("users").begin(delete("x"));
        assert_eq!(
            t.to_sql(),
            r#"CREATE TRIGGER "t" INSERT ON "users" BEGIN DELETE FROM "x"; END"#
        );
    }
}
