//! INSERT statements.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::notify::PrimaryAction;
use crate::qb::clause::ConflictPolicy;
use crate::qb::expr::{Op, Operator, Rhs};
use crate::qb::operand::Operand;
use crate::qb::traits::{MutationQb, Query, SqlQb};
use crate::qb::writer::SqlWriter;
use crate::result::InsertRowId;
use crate::value::{IntoRow, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct ArityError {
    expected: usize,
    got: usize,
    row: usize,
}

impl From<ArityError> for OrmError {
    fn from(e: ArityError) -> Self {
        OrmError::ArityMismatch {
            expected: e.expected,
            got: e.got,
            row: e.row,
        }
    }
}

/// INSERT builder.
///
/// Rows come from `values` (checked against the column list as they are added), from a
/// sub-select, or from `DEFAULT VALUES`; exactly one of the three.
#[derive(Debug, Clone)]
pub struct InsertQb {
    table: Ident,
    policy: Option<ConflictPolicy>,
    /// Columns keep their operand so per-column converters apply to values.
    columns: Vec<Operand>,
    rows: Vec<Vec<Value>>,
    source: Option<Arc<dyn Query>>,
    default_values: bool,
}

impl InsertQb {
    pub fn new(table: impl Into<Ident>) -> Self {
        Self {
            table: table.into(),
            policy: None,
            columns: Vec::new(),
            rows: Vec::new(),
            source: None,
            default_values: false,
        }
    }

    /// `INSERT OR <policy> INTO ...`
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

    /// Declare the column list.
    ///
    /// Fails with [`OrmError::ArityMismatch`] when rows added earlier have a different width.
    pub fn columns<C: Into<Operand>>(
        mut self,
        columns: impl IntoIterator<Item = C>,
    ) -> OrmResult<Self> {
        let columns: Vec<Operand> = columns.into_iter().map(Into::into).collect();
        if let Some((row, values)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns.len())
        {
            return Err(ArityError {
                expected: columns.len(),
                got: values.len(),
                row,
            }
            .into());
        }
        self.columns = columns;
        Ok(self)
    }

    /// Append one row of values.
    ///
    /// Fails with [`OrmError::ArityMismatch`] when the row width differs from the column
    /// list (or from the first row when no columns are declared).
    pub fn values(mut self, row: impl IntoRow) -> OrmResult<Self> {
        let row = row.into_row();
        let expected = if self.columns.is_empty() {
            self.rows.first().map(Vec::len)
        } else {
            Some(self.columns.len())
        };
        if let Some(expected) = expected {
            if row.len() != expected {
                return Err(ArityError {
                    expected,
                    got: row.len(),
                    row: self.rows.len(),
                }
                .into());
            }
        }
        self.rows.push(row);
        Ok(self)
    }

    /// Append several rows; an empty set fails with [`OrmError::EmptyValues`].
    pub fn values_rows<R: IntoRow>(mut self, rows: impl IntoIterator<Item = R>) -> OrmResult<Self> {
        let mut any = false;
        for row in rows {
            self = self.values(row)?;
            any = true;
        }
        if !any {
            return Err(OrmError::EmptyValues);
        }
        Ok(self)
    }

    /// Derive the column list and one row from `"col"=value` assignments.
    pub fn column_values(mut self, assignments: impl IntoIterator<Item = Operator>) -> OrmResult<Self> {
        let mut columns = Vec::new();
        let mut row = Vec::new();
        for op in assignments {
            match (op.op(), op.rhs()) {
                (Op::Eq, Rhs::Value(value)) => {
                    columns.push(op.left().clone());
                    row.push(value.clone());
                }
                _ => {
                    return Err(OrmError::validation(format!(
                        "column_values expects assignments, got {}",
                        op.to_sql()
                    )));
                }
            }
        }
        if !self.rows.is_empty() {
            let same = columns.len() == self.columns.len()
                && columns
                    .iter()
                    .zip(&self.columns)
                    .all(|(a, b)| a.ident().same_key(b.ident()));
            if !same {
                return Err(OrmError::validation(
                    "column_values columns differ from the existing column list",
                ));
            }
        } else {
            self.columns = columns;
        }
        self.values(row)
    }

    /// `INSERT INTO "T"(...) SELECT ...`
    pub fn select<Q: Query + 'static>(mut self, query: Q) -> Self {
        self.source = Some(Arc::new(query));
        self
    }

    /// `INSERT INTO "T" DEFAULT VALUES`
    pub fn default_values(mut self) -> Self {
        self.default_values = true;
        self
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Execute and return the rowid of the last inserted row.
    pub fn execute_insert(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<i64>> + Send {
        async move { self.run(conn, &InsertRowId).await }
    }
}

impl Query for InsertQb {
    fn write_sql(&self, w: &mut SqlWriter<'_>) {
        w.push("INSERT ");
        ConflictPolicy::write_opt(self.policy, w);
        w.push("INTO ").push_full_name(&self.table);

        if self.default_values {
            w.push(" DEFAULT VALUES");
            return;
        }
        if !self.columns.is_empty() {
            w.push_char('(')
                .push_name_list(self.columns.iter().map(Operand::ident))
                .push_char(')');
        }
        if let Some(source) = &self.source {
            w.push_char(' ');
            source.write_sql(w);
            w.trim_end();
            return;
        }

        w.push(" VALUES ");
        for (r, row) in self.rows.iter().enumerate() {
            if r > 0 {
                w.push_char(',');
            }
            w.push_char('(');
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    w.push_char(',');
                }
                let converter = self.columns.get(i).and_then(Operand::converter);
                w.push_value(value, converter, false);
            }
            w.push_char(')');
        }
    }
}

impl SqlQb for InsertQb {
    fn validate(&self) -> OrmResult<()> {
        if self.default_values {
            if !self.rows.is_empty() || self.source.is_some() || !self.columns.is_empty() {
                return Err(OrmError::validation(
                    "DEFAULT VALUES cannot be combined with columns, values or a sub-select",
                ));
            }
            return Ok(());
        }
        match (self.rows.is_empty(), self.source.is_some()) {
            (true, false) => Err(OrmError::EmptyValues),
            (false, true) => Err(OrmError::validation(
                "INSERT cannot have both VALUES rows and a sub-select",
            )),
            _ => Ok(()),
        }
    }
}

impl MutationQb for InsertQb {
    fn primary_action(&self) -> PrimaryAction {
        PrimaryAction::Insert
    }

    fn table_name(&self) -> &str {
        self.table.name()
    }
}
