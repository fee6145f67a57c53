//! Convenient imports for typical `sqlflow` usage.
//!
//! ```ignore
//! use sqlflow::prelude::*;
//! ```

pub use crate::{
    FromRow, GenericClient, IntoRow, IntoValue, MutationQb, Operand, OrmError, OrmResult,
    Property, Query, Row, SqlQb, SqliteClient, SqliteConfig, Value,
};
pub use crate::{Filterable, Transformable};
pub use crate::qb;
