//! # sqlflow
//!
//! Typed, composable query construction and SQL compilation for SQLite.
//!
//! ## Features
//!
//! - **Consuming builders**: SELECT / INSERT / UPDATE / DELETE / INDEX / TRIGGER statements
//!   built by chaining calls over column references
//! - **Deterministic compiler**: AND / OR render in call order, identifiers are always
//!   quoted, literals escaped
//! - **Positional binding**: execution compiles once to `?` placeholders plus parameters;
//!   `to_sql()` renders inline literals for display and DDL
//! - **Pluggable conversion**: a [`ConverterRegistry`] maps custom Rust types to storable values
//! - **Result factories**: one strategy per result shape (rows, single row, scalar, rowid, ...)
//! - **Query monitoring**: hooks, monitors, slow-query logging and timeouts
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use sqlflow::prelude::*;
//!
//! let conn = SqliteClient::open_in_memory()?;
//!
//! let users: Vec<Row> = qb::select_all()
//!     .from("users")
//!     .filter(Operand::column("age").gte(18))
//!     .order_by_asc("name")
//!     .fetch_all(&conn)
//!     .await?;
//!
//! qb::update("users")
//!     .set_value("active", false)
//!     .filter(Operand::column("id").eq(7))
//!     .execute(&conn)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod ident;
pub mod monitor;
pub mod notify;
pub mod prelude;
pub mod qb;
pub mod result;
pub mod row;
pub mod sqlite;
pub mod table;
pub mod value;

pub use client::{GenericClient, StatementState, StatementToken};
pub use config::{JournalMode, SqliteConfig};
pub use convert::{
    converter, ConverterRef, ConverterRegistry, DateTimeUtcConverter, ErasedConverter,
    JsonConverter, NaiveDateConverter, NaiveDateTimeConverter, TypeConverter, UuidConverter,
};
pub use error::{OrmError, OrmResult};
pub use ident::{Ident, IdentBuilder, IdentKey};
pub use monitor::{
    CompositeHook, CompositeMonitor, HookAction, InstrumentedClient, LoggingMonitor, MonitorConfig,
    NoopMonitor, QueryContext, QueryHook, QueryMonitor, QueryResult, QueryStats, QueryType,
    StatsMonitor, TracingSqlHook,
};
pub use notify::{ChangeListener, PrimaryAction, TracingListener};
pub use result::{
    AffectedRows, HasData, InsertRowId, NoResult, OptionalRow, ResultFactory, RowList,
    ScalarLong, ScalarString, SingleRow,
};
pub use row::{ColumnIndex, FromRow, Row};
pub use sqlite::SqliteClient;
pub use table::{IdentityKey, TableDescriptor};
pub use value::{CustomValue, IntoRow, IntoValue, SqlEnum, SqlValue, Value};

// Re-export the query builder entry points for easy access
pub use qb::{
    create_index, delete, insert, raw, select, select_all, trigger, update, CompiledQuery,
    DeleteQb, Filterable, IndexQb, InsertQb, MutationQb, Operand, Operator, OperatorGroup,
    Property, Query, RawQuery, SelectQb, SqlQb, Transformable, UpdateQb,
};
