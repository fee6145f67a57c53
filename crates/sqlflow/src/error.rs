//! Error types for sqlflow

use thiserror::Error;

/// Result type alias for sqlflow operations
pub type OrmResult<T> = Result<T, OrmError>;

// SQLite extended result codes for constraint failures.
const SQLITE_CONSTRAINT_CHECK: i32 = 275;
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;
const SQLITE_CONSTRAINT_NOTNULL: i32 = 1299;
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

/// Error types for query construction and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Query execution error reported by the driver
    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique or primary key constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// NOT NULL constraint violation
    #[error("Not null violation: {0}")]
    NotNullViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// ON or USING attached to a NATURAL join
    #[error("NATURAL JOIN '{alias}' cannot have an ON or USING clause")]
    NaturalJoinCondition { alias: String },

    /// INSERT value row does not match the declared column list
    #[error("INSERT row {row} has {got} values but {expected} columns were declared")]
    ArityMismatch {
        expected: usize,
        got: usize,
        row: usize,
    },

    /// INSERT without value rows or a sub-select
    #[error("INSERT requires at least one row of values, a sub-select, or DEFAULT VALUES")]
    EmptyValues,

    /// Column lookup on a table descriptor failed
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Row results requested from a statement that does not produce rows
    #[error("Cannot fetch rows from a non-SELECT statement: {0}")]
    NotSelect(String),

    /// Type converter failure
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a conversion error
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the driver stopped the statement because the connection was interrupted
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Query(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::OperationInterrupted
        )
    }

    /// Check if this error was raised while building a statement, before any execution
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::NaturalJoinCondition { .. }
                | Self::ArityMismatch { .. }
                | Self::EmptyValues
                | Self::UnknownColumn { .. }
                | Self::NotSelect(_)
                | Self::Validation(_)
        )
    }

    /// Parse a rusqlite error into a more specific OrmError
    pub fn from_db_error(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ffi_err, message) = &err {
            if ffi_err.code == rusqlite::ErrorCode::ConstraintViolation {
                let message = message
                    .clone()
                    .unwrap_or_else(|| ffi_err.to_string());
                match ffi_err.extended_code {
                    SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return Self::UniqueViolation(message);
                    }
                    SQLITE_CONSTRAINT_FOREIGNKEY => return Self::ForeignKeyViolation(message),
                    SQLITE_CONSTRAINT_CHECK => return Self::CheckViolation(message),
                    SQLITE_CONSTRAINT_NOTNULL => return Self::NotNullViolation(message),
                    _ => {}
                }
            }
        }
        Self::Query(err)
    }
}
