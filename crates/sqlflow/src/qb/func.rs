//! SQLite scalar and aggregate functions as expression operands.
//!
//! Column arguments take `impl Into<Operand>` (a `&str` is a column name); value arguments
//! take `impl IntoValue` (a `&str` is a text literal).

use crate::qb::operand::Operand;
use crate::value::{IntoValue, Value};

fn call(name: &str, args: &[Value]) -> Operand {
    Operand::call(name, args.to_vec())
}

fn col(operand: impl Into<Operand>) -> Value {
    Value::Operand(operand.into())
}

/// `COUNT("col")`
pub fn count(column: impl Into<Operand>) -> Operand {
    call("COUNT", &[col(column)])
}

/// `COUNT(*)`
pub fn count_all() -> Operand {
    Operand::raw("COUNT(*)")
}

pub fn sum(column: impl Into<Operand>) -> Operand {
    call("SUM", &[col(column)])
}

/// `TOTAL("col")`: like SUM but always a float and 0.0 on no rows.
pub fn total(column: impl Into<Operand>) -> Operand {
    call("TOTAL", &[col(column)])
}

pub fn avg(column: impl Into<Operand>) -> Operand {
    call("AVG", &[col(column)])
}

pub fn max(column: impl Into<Operand>) -> Operand {
    call("MAX", &[col(column)])
}

pub fn min(column: impl Into<Operand>) -> Operand {
    call("MIN", &[col(column)])
}

pub fn group_concat(column: impl Into<Operand>) -> Operand {
    call("GROUP_CONCAT", &[col(column)])
}

/// `GROUP_CONCAT("col",'sep')`
pub fn group_concat_sep(column: impl Into<Operand>, separator: &str) -> Operand {
    call("GROUP_CONCAT", &[col(column), separator.into_value()])
}

/// `COALESCE("col",fallback)`
pub fn coalesce(column: impl Into<Operand>, fallback: impl IntoValue) -> Operand {
    call("COALESCE", &[col(column), fallback.into_value()])
}

/// `IFNULL("col",fallback)`
pub fn ifnull(column: impl Into<Operand>, fallback: impl IntoValue) -> Operand {
    call("IFNULL", &[col(column), fallback.into_value()])
}

/// `NULLIF("col",value)`
pub fn nullif(column: impl Into<Operand>, value: impl IntoValue) -> Operand {
    call("NULLIF", &[col(column), value.into_value()])
}

pub fn length(column: impl Into<Operand>) -> Operand {
    call("LENGTH", &[col(column)])
}

pub fn lower(column: impl Into<Operand>) -> Operand {
    call("LOWER", &[col(column)])
}

pub fn upper(column: impl Into<Operand>) -> Operand {
    call("UPPER", &[col(column)])
}

pub fn abs(column: impl Into<Operand>) -> Operand {
    call("ABS", &[col(column)])
}

/// `REPLACE("col",'from','to')`
pub fn replace(column: impl Into<Operand>, from: &str, to: &str) -> Operand {
    call(
        "REPLACE",
        &[col(column), from.into_value(), to.into_value()],
    )
}

/// `SUBSTR("col",start,len)`; `start` is 1-based.
pub fn substr(column: impl Into<Operand>, start: i64, len: i64) -> Operand {
    call(
        "SUBSTR",
        &[col(column), start.into_value(), len.into_value()],
    )
}

/// `DATE(value, modifiers…)`, e.g. `date("now", ["start of month"])`.
pub fn date<'a>(value: impl IntoValue, modifiers: impl IntoIterator<Item = &'a str>) -> Operand {
    time_fn("DATE", value, modifiers)
}

/// `DATETIME(value, modifiers…)`
pub fn datetime<'a>(
    value: impl IntoValue,
    modifiers: impl IntoIterator<Item = &'a str>,
) -> Operand {
    time_fn("DATETIME", value, modifiers)
}

/// `STRFTIME('format', value, modifiers…)`
pub fn strftime<'a>(
    format: &str,
    value: impl IntoValue,
    modifiers: impl IntoIterator<Item = &'a str>,
) -> Operand {
    let mut args = vec![format.into_value(), value.into_value()];
    args.extend(modifiers.into_iter().map(IntoValue::into_value));
    call("STRFTIME", &args)
}

fn time_fn<'a>(
    name: &str,
    value: impl IntoValue,
    modifiers: impl IntoIterator<Item = &'a str>,
) -> Operand {
    let mut args = vec![value.into_value()];
    args.extend(modifiers.into_iter().map(IntoValue::into_value));
    call(name, &args)
}

/// SQLite storage classes usable as CAST targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

impl SqlType {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Blob => "BLOB",
            SqlType::Numeric => "NUMERIC",
        }
    }
}

/// Pending `CAST(expr AS …)`; finish with [`Cast::as_`].
#[derive(Debug, Clone)]
pub struct Cast {
    expr: Operand,
}

/// Start a `CAST` expression.
pub fn cast(expr: impl Into<Operand>) -> Cast {
    Cast { expr: expr.into() }
}

impl Cast {
    pub fn as_(self, ty: SqlType) -> Operand {
        Operand::cast(self.expr, ty.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates() {
        assert_eq!(count("id").to_sql(), r#"COUNT("id")"#);
        assert_eq!(count_all().to_sql(), "COUNT(*)");
        assert_eq!(
            max(Operand::qualified("o", "total")).to_sql(),
            r#"MAX("o"."total")"#
        );
    }

    #[test]
    fn aliased_function_in_projection() {
        let ident = count_all().as_("n").into_ident();
        assert_eq!(ident.to_sql(), r#"COUNT(*) AS "n""#);
    }

    #[test]
    fn value_arguments_are_literals() {
        assert_eq!(coalesce("nick", "anon").to_sql(), r#"COALESCE("nick",'anon')"#);
        assert_eq!(substr("name", 1, 3).to_sql(), r#"SUBSTR("name",1,3)"#);
        assert_eq!(
            date("now", ["start of month", "+1 month"]).to_sql(),
            "DATE('now','start of month','+1 month')"
        );
        assert_eq!(
            strftime("%Y", Operand::column("created"), []).to_sql(),
            r#"STRFTIME('%Y',"created")"#
        );
    }

    #[test]
    fn nested_functions() {
        assert_eq!(lower(upper("a")).to_sql(), r#"LOWER(UPPER("a"))"#);
    }

    #[test]
    fn cast_expression() {
        assert_eq!(
            cast("price").as_(SqlType::Integer).to_sql(),
            r#"CAST("price" AS INTEGER)"#
        );
    }

    #[test]
    fn arguments_follow_the_statement_registry() {
        use crate::convert::{ConverterRegistry, TypeConverter, UuidConverter};
        use crate::error::OrmResult;
        use crate::qb::{select, Query};
        use crate::value::SqlValue;

        struct Compact;
        impl TypeConverter for Compact {
            type Model = uuid::Uuid;
            fn to_db(&self, model: &uuid::Uuid) -> Value {
                Value::Text(model.simple().to_string())
            }
            fn from_db(&self, value: &SqlValue) -> OrmResult<uuid::Uuid> {
                UuidConverter.from_db(value)
            }
        }

        let q = select([ifnull("owner", uuid::Uuid::nil()).as_("owner")]).from("docs");
        let compiled = q.compile(ConverterRegistry::builtin());
        assert_eq!(
            compiled.sql(),
            r#"SELECT IFNULL("owner",?) AS "owner" FROM "docs" "#
        );
        assert_eq!(
            compiled.params(),
            &[SqlValue::Text(
                "00000000-0000-0000-0000-000000000000".to_string()
            )]
        );

        let compact = ConverterRegistry::new().with(Compact);
        assert_eq!(
            q.compile(&compact).params(),
            &[SqlValue::Text("00000000000000000000000000000000".to_string())]
        );
    }

    #[test]
    fn function_in_condition() {
        assert_eq!(length("name").gt(3).to_sql(), r#"LENGTH("name")>3"#);
    }
}
