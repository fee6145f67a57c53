//! SQL identifier handling.
//!
//! [`Ident`] is a column or table name with an optional table qualifier and an optional
//! alias. Rendering follows SQLite quoting rules:
//!
//! - Quoted segments are wrapped in `"` and embedded `"` are doubled.
//! - Raw identifiers (already valid SQL fragments such as function calls) are written as-is.
//! - An identifier with neither name nor alias renders as the empty string.
//!
//! # Example
//! ```
//! use sqlflow::Ident;
//!
//! let col = Ident::builder("id").table("users").alias("user_id").build();
//! assert_eq!(col.to_sql(), r#""users"."id" AS "user_id""#);
//! ```

use std::fmt;

/// Write `s` wrapped in double quotes, doubling any embedded quote.
pub(crate) fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        if ch == '"' {
            out.push('"');
            out.push('"');
        } else {
            out.push(ch);
        }
    }
    out.push('"');
}

/// Quote a single identifier segment.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    write_quoted(&mut out, s);
    out
}

/// A SQL identifier (column or table), optionally qualified and aliased.
///
/// `Ident` is an immutable value; use [`Ident::to_builder`] to derive a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    name: String,
    table: Option<String>,
    alias: Option<String>,
    quote_name: bool,
    quote_table: bool,
    quote_alias: bool,
}

/// Lookup key of an identifier: `(table, name)`, ignoring the alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentKey {
    pub table: Option<String>,
    pub name: String,
}

impl Ident {
    /// Create a quoted identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    /// Create a qualified, quoted identifier: `"table"."name"`.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::builder(name).table(table).build()
    }

    /// Create a raw identifier that is written without quoting.
    ///
    /// Use this for fragments that are already valid SQL (e.g. `COUNT(*)`).
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::builder(sql).quote_name(false).build()
    }

    /// The empty identifier, used for placeholder operands.
    pub fn empty() -> Self {
        Self::raw("")
    }

    /// Start building an identifier.
    pub fn builder(name: impl Into<String>) -> IdentBuilder {
        IdentBuilder {
            ident: Ident {
                name: name.into(),
                table: None,
                alias: None,
                quote_name: true,
                quote_table: true,
                quote_alias: true,
            },
        }
    }

    /// Copy this identifier into a builder for overriding fields.
    pub fn to_builder(&self) -> IdentBuilder {
        IdentBuilder {
            ident: self.clone(),
        }
    }

    /// Return a copy with `alias` set.
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        self.to_builder().alias(alias).build()
    }

    /// Return a copy without a table qualifier.
    pub fn unqualified(&self) -> Self {
        let mut ident = self.clone();
        ident.table = None;
        ident
    }

    /// The bare name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table qualifier, if any.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// The alias, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Whether the name is written without quoting.
    pub fn is_raw(&self) -> bool {
        !self.quote_name
    }

    /// Whether this identifier renders as nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.alias.is_none()
    }

    /// Lookup key, independent of alias.
    pub fn key(&self) -> IdentKey {
        IdentKey {
            table: self.table.clone(),
            name: self.name.clone(),
        }
    }

    /// Whether both identifiers refer to the same `(table, name)`.
    pub fn same_key(&self, other: &Ident) -> bool {
        self.name == other.name && self.table == other.table
    }

    /// Write the quoted name alone (no qualifier, no alias).
    pub(crate) fn write_name(&self, out: &mut String) {
        if self.quote_name {
            write_quoted(out, &self.name);
        } else {
            out.push_str(&self.name);
        }
    }

    /// Write `table.name` without the alias.
    pub(crate) fn write_full_name(&self, out: &mut String) {
        if self.name.is_empty() {
            return;
        }
        if let Some(table) = &self.table {
            if self.quote_table {
                write_quoted(out, table);
            } else {
                out.push_str(table);
            }
            out.push('.');
        }
        self.write_name(out);
    }

    /// Write the full rendering, including ` AS "alias"`.
    pub(crate) fn write_sql(&self, out: &mut String) {
        self.write_full_name(out);
        if let Some(alias) = &self.alias {
            if !self.name.is_empty() {
                out.push_str(" AS ");
            }
            if self.quote_alias {
                write_quoted(out, alias);
            } else {
                out.push_str(alias);
            }
        }
    }

    /// Render `table.name` without the alias.
    pub fn full_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 8);
        self.write_full_name(&mut out);
        out
    }

    /// Render the identifier as SQL, including its alias.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 8);
        self.write_sql(&mut out);
        out
    }

    /// Render the name as the alias would be referenced (alias if set, else full name).
    pub fn reference(&self) -> String {
        match &self.alias {
            Some(alias) if self.quote_alias => quote(alias),
            Some(alias) => alias.clone(),
            None => self.full_name(),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Copy-and-override builder for [`Ident`].
#[derive(Debug, Clone)]
pub struct IdentBuilder {
    ident: Ident,
}

impl IdentBuilder {
    /// Set the table qualifier.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.ident.table = Some(table.into());
        self
    }

    /// Remove the table qualifier.
    pub fn no_table(mut self) -> Self {
        self.ident.table = None;
        self
    }

    /// Set the alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.ident.alias = Some(alias.into());
        self
    }

    /// Remove the alias.
    pub fn no_alias(mut self) -> Self {
        self.ident.alias = None;
        self
    }

    /// Override the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.ident.name = name.into();
        self
    }

    /// Whether to quote the name.
    pub fn quote_name(mut self, quote: bool) -> Self {
        self.ident.quote_name = quote;
        self
    }

    /// Whether to quote the table qualifier.
    pub fn quote_table(mut self, quote: bool) -> Self {
        self.ident.quote_table = quote;
        self
    }

    /// Whether to quote the alias.
    pub fn quote_alias(mut self, quote: bool) -> Self {
        self.ident.quote_alias = quote;
        self
    }

    pub fn build(self) -> Ident {
        self.ident
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::new(name)
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident::new(name)
    }
}

impl From<&Ident> for Ident {
    fn from(ident: &Ident) -> Self {
        ident.clone()
    }
}
