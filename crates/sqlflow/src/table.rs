//! Table metadata: column set, primary key and identity predicates.

use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::qb::{Op, Operand, Operator, OperatorGroup, Rhs};
use crate::value::{IntoValue, Value};

/// Primary key values of one row.
#[derive(Debug, Clone)]
pub enum IdentityKey {
    Single(Value),
    /// Values in primary key column order.
    Composite(Vec<Value>),
}

impl IdentityKey {
    pub fn values(&self) -> &[Value] {
        match self {
            IdentityKey::Single(v) => std::slice::from_ref(v),
            IdentityKey::Composite(vs) => vs,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

/// Static description of a table.
///
/// ```ignore
/// static USERS: LazyLock<TableDescriptor> = LazyLock::new(|| {
///     TableDescriptor::new("users", ["id", "name", "email"], ["id"]).expect("valid table")
/// });
///
/// let q = delete(&*USERS).filter(USERS.identity_predicate([7])?);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<String>,
    primary_key: Vec<String>,
}

impl TableDescriptor {
    /// Describe a table. Every primary key column must be one of `columns`.
    pub fn new<C, K>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = C>,
        primary_key: impl IntoIterator<Item = K>,
    ) -> OrmResult<Self>
    where
        C: Into<String>,
        K: Into<String>,
    {
        let table = Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
        };
        if let Some(missing) = table
            .primary_key
            .iter()
            .find(|pk| !table.columns.contains(pk))
        {
            return Err(table.unknown(missing));
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The table as a FROM / INTO target.
    pub fn ident(&self) -> Ident {
        Ident::new(&self.name)
    }

    /// The table under an alias (`"users" AS "u"`).
    pub fn aliased(&self, alias: impl Into<String>) -> Ident {
        self.ident().with_alias(alias)
    }

    /// Unqualified column reference.
    pub fn property(&self, column: &str) -> OrmResult<Operand> {
        if !self.has_column(column) {
            return Err(self.unknown(column));
        }
        Ok(Operand::column(column))
    }

    /// Column reference qualified with the table name.
    pub fn qualified(&self, column: &str) -> OrmResult<Operand> {
        Ok(self.property(column)?.with_table(&self.name))
    }

    /// Every column, unqualified, in declaration order.
    pub fn all_columns(&self) -> Vec<Operand> {
        self.columns.iter().map(Operand::column).collect()
    }

    /// Package primary key values, checking the count against the key width.
    pub fn identity_key<V: IntoValue>(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> OrmResult<IdentityKey> {
        let mut values: Vec<Value> = values.into_iter().map(IntoValue::into_value).collect();
        if self.primary_key.is_empty() {
            return Err(OrmError::validation(format!(
                "table '{}' has no primary key",
                self.name
            )));
        }
        if values.len() != self.primary_key.len() {
            return Err(OrmError::validation(format!(
                "table '{}' has a {}-column primary key, got {} values",
                self.name,
                self.primary_key.len(),
                values.len()
            )));
        }
        Ok(match values.len() {
            1 => IdentityKey::Single(values.remove(0)),
            _ => IdentityKey::Composite(values),
        })
    }

    /// `"pk1"=v1 AND "pk2"=v2 ...` for the given key values.
    pub fn identity_predicate<V: IntoValue>(
        &self,
        values: impl IntoIterator<Item = V>,
    ) -> OrmResult<OperatorGroup> {
        let key = self.identity_key(values)?;
        self.key_predicate(&key)
    }

    /// Predicate for an already packaged key.
    pub fn key_predicate(&self, key: &IdentityKey) -> OrmResult<OperatorGroup> {
        if key.len() != self.primary_key.len() {
            return Err(OrmError::validation(format!(
                "key has {} values, primary key of '{}' has {} columns",
                key.len(),
                self.name,
                self.primary_key.len()
            )));
        }
        Ok(self
            .primary_key
            .iter()
            .zip(key.values())
            .map(|(column, value)| {
                Operator::new(Ident::new(column), Op::Eq, Rhs::Value(value.clone()))
            })
            .collect())
    }

    fn unknown(&self, column: &str) -> OrmError {
        OrmError::UnknownColumn {
            table: self.name.clone(),
            column: column.to_string(),
        }
    }
}

impl From<&TableDescriptor> for Ident {
    fn from(table: &TableDescriptor) -> Self {
        table.ident()
    }
}
