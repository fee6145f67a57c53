//! DELETE statements.

use crate::ident::Ident;
use crate::notify::PrimaryAction;
use crate::qb::clause::Tail;
use crate::qb::expr::OperatorGroup;
use crate::qb::traits::{Filterable, MutationQb, Query, SqlQb, Transformable};
use crate::qb::writer::SqlWriter;

/// DELETE builder. Without a filter it deletes every row.
#[derive(Debug, Clone)]
pub struct DeleteQb {
    table: Ident,
    where_group: OperatorGroup,
    tail: Tail,
}

impl DeleteQb {
    pub fn new(table: impl Into<Ident>) -> Self {
        Self {
            table: table.into(),
            where_group: OperatorGroup::new(),
            tail: Tail::default(),
        }
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }
}

impl Query for DeleteQb {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("DELETE FROM ").push_full_name(&self.table).push_char(' ');
        if !self.where_group.is_empty() {
            w.push("WHERE ");
            self.where_group.write_sql(w);
            w.push_char(' ');
        }
        self.tail.write_sql(w);
    }
}

impl SqlQb for DeleteQb {}

impl MutationQb for DeleteQb {
    fn primary_action(&self) -> PrimaryAction {
        PrimaryAction::Delete
    }

    fn table_name(&self) -> &str {
        self.table.name()
    }
}

impl Filterable for DeleteQb {
    fn where_mut(&mut self) -> &mut OperatorGroup {
        &mut self.where_group
    }
}

impl Transformable for DeleteQb {
    fn tail_mut(&mut self) -> &mut Tail {
        &mut self.tail
    }
}
