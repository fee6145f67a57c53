//! CREATE INDEX / DROP INDEX.

use crate::error::{OrmError, OrmResult};
use crate::ident::{self, Ident};
use crate::notify::PrimaryAction;
use crate::qb::expr::OperatorGroup;
use crate::qb::operand::Operand;
use crate::qb::raw::RawQuery;
use crate::qb::traits::{Filterable, MutationQb, Query, SqlQb};
use crate::qb::writer::SqlWriter;

/// CREATE INDEX builder.
///
/// A filter turns it into a partial index; the WHERE clause is always written with inline
/// literals since SQLite does not accept parameters in schema statements.
#[derive(Debug, Clone)]
pub struct IndexQb {
    name: String,
    table: Ident,
    columns: Vec<Ident>,
    unique: bool,
    if_not_exists: bool,
    where_group: OperatorGroup,
}

impl IndexQb {
    pub fn new(name: impl Into<String>, table: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
            unique: false,
            if_not_exists: false,
            where_group: OperatorGroup::new(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn columns<C: Into<Operand>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns
            .extend(columns.into_iter().map(|c| c.into().into_ident()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `DROP INDEX IF EXISTS "name"`
    pub fn drop_sql(&self) -> String {
        format!("DROP INDEX IF EXISTS {}", ident::quote(&self.name))
    }

    /// [`drop_sql`](Self::drop_sql) as an executable statement.
    pub fn drop_query(&self) -> RawQuery {
        RawQuery::new(self.drop_sql()).affecting(self.table.name())
    }
}

impl Query for IndexQb {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("CREATE ");
        if self.unique {
            w.push("UNIQUE ");
        }
        w.push("INDEX ");
        if self.if_not_exists {
            w.push("IF NOT EXISTS ");
        }
        w.push(&ident::quote(&self.name))
            .push(" ON ")
            .push_full_name(&self.table)
            .push_char('(')
            .push_name_list(&self.columns)
            .push_char(')');
        if !self.where_group.is_empty() {
            w.push(" WHERE ");
            w.with_inline(|w| self.where_group.write_sql(w));
        }
    }
}

impl SqlQb for IndexQb {
    fn validate(&self) -> OrmResult<()> {
        if self.columns.is_empty() {
            return Err(OrmError::validation(format!(
                "index \"{}\" has no columns",
                self.name
            )));
        }
        Ok(())
    }
}

impl MutationQb for IndexQb {
    fn primary_action(&self) -> PrimaryAction {
        PrimaryAction::Change
    }

    fn table_name(&self) -> &str {
        self.table.name()
    }
}

impl Filterable for IndexQb {
    fn where_mut(&mut self) -> &mut OperatorGroup {
        &mut self.where_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConverterRegistry;
    use crate::qb::create_index;

    #[test]
    fn create_and_drop() {
        let idx = create_index("users_name_age", "users").columns(["name", "age"]);
        assert_eq!(
            idx.to_sql(),
            r#"CREATE INDEX "users_name_age" ON "users"("name","age")"#
        );
        assert_eq!(idx.drop_sql(), r#"DROP INDEX IF EXISTS "users_name_age""#);

        let idx = create_index("u_email", "users")
            .unique()
            .if_not_exists()
            .columns(["email"]);
        assert_eq!(
            idx.to_sql(),
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "u_email" ON "users"("email")"#
        );
    }

    #[test]
    fn partial_index_is_inline_when_compiled() {
        let idx = create_index("active_users", "users")
            .columns(["name"])
            .filter(Operand::column("active").eq(true));
        let compiled = idx.compile(ConverterRegistry::builtin());
        assert_eq!(
            compiled.sql(),
            r#"CREATE INDEX "active_users" ON "users"("name") WHERE "active"=1"#
        );
        assert!(compiled.params().is_empty());
    }

    #[test]
    fn requires_columns() {
        assert!(create_index("i", "t").validate().is_err());
    }
}
