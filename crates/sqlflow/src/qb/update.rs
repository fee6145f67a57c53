//! UPDATE statements.

use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::notify::PrimaryAction;
use crate::qb::clause::{ConflictPolicy, Tail};
use crate::qb::expr::{Operator, OperatorGroup};
use crate::qb::operand::Operand;
use crate::qb::traits::{Filterable, MutationQb, Query, SqlQb, Transformable};
use crate::qb::writer::SqlWriter;
use crate::value::IntoValue;

/// UPDATE builder.
#[derive(Debug, Clone)]
pub struct UpdateQb {
    table: Ident,
    policy: Option<ConflictPolicy>,
    /// Comma separated `"col"=value` assignments.
    set: OperatorGroup,
    where_group: OperatorGroup,
    tail: Tail,
}

impl UpdateQb {
    pub fn new(table: impl Into<Ident>) -> Self {
        Self {
            table: table.into(),
            policy: None,
            set: OperatorGroup::comma_separated(),
            where_group: OperatorGroup::new(),
            tail: Tail::default(),
        }
    }

    /// `UPDATE OR <policy> ...`
    ///
    /// Named apart from [`Filterable::or`], which adds an OR condition.
    pub fn on_conflict(mut self, policy: ConflictPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn or_replace(self) -> Self {
        self.on_conflict(ConflictPolicy::Replace)
    }

    pub fn or_ignore(self) -> Self {
        self.on_conflict(ConflictPolicy::Ignore)
    }

    pub fn or_fail(self) -> Self {
        self.on_conflict(ConflictPolicy::Fail)
    }

    /// Add an assignment, usually built with `Property::set` or [`assign`](crate::qb::assign).
    pub fn set(mut self, assignment: Operator) -> Self {
        self.set = self.set.and(assignment);
        self
    }

    /// Add several assignments.
    pub fn set_all(mut self, assignments: impl IntoIterator<Item = Operator>) -> Self {
        self.set = self.set.and_all(assignments);
        self
    }

    /// `"column"=value`
    pub fn set_value(self, column: impl Into<Operand>, value: impl IntoValue) -> Self {
        self.set(column.into().eq(value))
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn assignments(&self) -> &OperatorGroup {
        &self.set
    }
}

impl Query for UpdateQb {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("UPDATE ");
        ConflictPolicy::write_opt(self.policy, w);
        w.push_full_name(&self.table).push(" SET ");
        self.set.write_sql(w);
        w.push_char(' ');
        if !self.where_group.is_empty() {
            w.push("WHERE ");
            self.where_group.write_sql(w);
            w.push_char(' ');
        }
        self.tail.write_sql(w);
    }
}

impl SqlQb for UpdateQb {
    fn validate(&self) -> OrmResult<()> {
        if self.set.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE \"{}\" has no SET assignments",
                self.table.name()
            )));
        }
        Ok(())
    }
}

impl MutationQb for UpdateQb {
    fn primary_action(&self) -> PrimaryAction {
        PrimaryAction::Update
    }

    fn table_name(&self) -> &str {
        self.table.name()
    }
}

impl Filterable for UpdateQb {
    fn where_mut(&mut self) -> &mut OperatorGroup {
        &mut self.where_group
    }
}

impl Transformable for UpdateQb {
    fn tail_mut(&mut self) -> &mut Tail {
        &mut self.tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::operand::Property;
    use crate::qb::update;

    #[test]
    fn set_and_filter() {
        let q = update("T")
            .set_value("a", 1)
            .filter(Operand::column("id").eq(2));
        assert_eq!(q.to_sql(), r#"UPDATE "T" SET "a"=1 WHERE "id"=2 "#);
    }

    #[test]
    fn several_assignments_with_policy() {
        let name: Property<String> = Property::new("name");
        let q = update("users")
            .or_fail()
            .set(name.set("bo"))
            .set_value("visits", Operand::column("visits").plus(1))
            .order_by_desc("id")
            .limit(5);
        assert_eq!(
            q.to_sql(),
            r#"UPDATE OR FAIL "users" SET "name"='bo',"visits"="visits" + 1 ORDER BY "id" DESC LIMIT 5 "#
        );
    }

    #[test]
    fn requires_assignments() {
        assert!(update("T").validate().is_err());
        assert!(update("T").set_value("a", 1).validate().is_ok());
    }
}
