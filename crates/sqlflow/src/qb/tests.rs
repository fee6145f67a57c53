//! Rendering tests across builders.

use crate::convert::ConverterRegistry;
use crate::error::OrmError;
use crate::qb::{
    delete, exists, func, insert, raw, select, select_all, update, Filterable, Join, Operand,
    OperatorGroup, Query, SqlQb, Transformable,
};
use crate::table::TableDescriptor;
use crate::value::{SqlValue, Value};

fn col(name: &str) -> Operand {
    Operand::column(name)
}

#[test]
fn test_select_where_pk() {
    let q = select_all().from("T").filter(col("pk").eq(5));
    assert_eq!(q.to_sql(), r#"SELECT * FROM "T" WHERE "pk"=5 "#);
}

#[test]
fn test_insert_two_columns() {
    let q = insert("T").columns(["a", "b"]).unwrap().values([1, 2]).unwrap();
    assert_eq!(q.to_sql(), r#"INSERT INTO "T"("a","b") VALUES (1,2)"#);
}

#[test]
fn test_update_set_where() {
    let q = update("T").set_value("a", 1).filter(col("id").eq(2));
    assert_eq!(q.to_sql(), r#"UPDATE "T" SET "a"=1 WHERE "id"=2 "#);
}

#[test]
fn test_identity_predicate() {
    let table = TableDescriptor::new("memberships", ["k1", "k2", "role"], ["k1", "k2"]).unwrap();
    let predicate = table
        .identity_predicate([Value::Integer(3), Value::Text("x".to_string())])
        .unwrap();
    assert_eq!(predicate.to_sql(), r#""k1"=3 AND "k2"='x'"#);

    let q = select_all()
        .from(&table)
        .filter_identity(&table, [Value::Integer(3), Value::Text("x".to_string())])
        .unwrap();
    assert_eq!(
        q.to_sql(),
        r#"SELECT * FROM "memberships" WHERE ("k1"=3 AND "k2"='x') "#
    );
}

#[test]
fn test_in_list() {
    let q = select(["id"]).from("T").filter(col("col").in_list([1, 2, 3]));
    assert_eq!(q.to_sql(), r#"SELECT "id" FROM "T" WHERE "col" IN (1,2,3) "#);
}

#[test]
fn test_compile_is_idempotent() {
    let q = select_all()
        .from("users")
        .filter(col("name").like("a%"))
        .or(col("age").between(18, 30))
        .order_by_desc("age")
        .paginate(3, 10);
    let registry = ConverterRegistry::builtin();
    let first = q.compile(registry);
    let second = q.compile(registry);
    assert_eq!(first, second);
    assert_eq!(q.to_sql(), q.to_sql());
    assert_eq!(
        first.sql(),
        r#"SELECT * FROM "users" WHERE "name" LIKE ? OR "age" BETWEEN ? AND ? ORDER BY "age" DESC LIMIT 10 OFFSET 20 "#
    );
    assert_eq!(
        first.params(),
        &[
            SqlValue::Text("a%".to_string()),
            SqlValue::Integer(18),
            SqlValue::Integer(30)
        ]
    );
}

#[test]
fn test_connectives_render_in_call_order() {
    let q = delete("T")
        .filter(col("c1").eq(1))
        .and(col("c2").eq(2))
        .or(col("c3").eq(3));
    assert_eq!(
        q.to_sql(),
        r#"DELETE FROM "T" WHERE "c1"=1 AND "c2"=2 OR "c3"=3 "#
    );

    let grouped = OperatorGroup::new()
        .and(col("c2").eq(2))
        .or(col("c3").eq(3));
    let q = delete("T").filter(col("c1").eq(1)).and(grouped);
    assert_eq!(
        q.to_sql(),
        r#"DELETE FROM "T" WHERE "c1"=1 AND ("c2"=2 OR "c3"=3) "#
    );
}

#[test]
fn test_natural_join_rejects_conditions() {
    let err = Join::natural("profiles")
        .alias("p")
        .on(col("id").eq(1))
        .unwrap_err();
    assert!(matches!(err, OrmError::NaturalJoinCondition { ref alias } if alias == "p"));

    let err = Join::natural("profiles").using(["id"]).unwrap_err();
    assert!(matches!(err, OrmError::NaturalJoinCondition { ref alias } if alias == "profiles"));
}

#[test]
fn test_nested_sub_queries_share_params() {
    let recent = select(["user_id"])
        .from("orders")
        .filter(col("total").gt(100));
    let q = select(["name"])
        .from("users")
        .filter(col("id").in_query(recent))
        .and(exists(select_all().from("bans").filter(col("level").eq(2))));
    assert_eq!(
        q.to_sql(),
        concat!(
            r#"SELECT "name" FROM "users" WHERE "id" IN (SELECT "user_id" FROM "orders" WHERE "total">100) "#,
            r#"AND EXISTS (SELECT * FROM "bans" WHERE "level"=2) "#
        )
    );
    let compiled = q.compile(ConverterRegistry::builtin());
    assert_eq!(
        compiled.params(),
        &[SqlValue::Integer(100), SqlValue::Integer(2)]
    );
}

#[test]
fn test_group_by_having() {
    let q = select([col("dept"), func::count_all().as_("n")])
        .from("staff")
        .group_by(["dept"])
        .having(func::count_all().gt(3))
        .order_by_asc("dept");
    assert_eq!(
        q.to_sql(),
        r#"SELECT "dept",COUNT(*) AS "n" FROM "staff" GROUP BY "dept" HAVING COUNT(*)>3 ORDER BY "dept" ASC "#
    );
}

#[test]
fn test_offset_without_limit() {
    let q = select_all().from("T").offset(5);
    assert_eq!(q.to_sql(), r#"SELECT * FROM "T" LIMIT -1 OFFSET 5 "#);
}

#[test]
fn test_builders_are_reusable_values() {
    let base = select_all().from("users");
    let filtered = base.clone().filter(col("active").eq(true));
    assert_eq!(base.to_sql(), r#"SELECT * FROM "users" "#);
    assert_eq!(filtered.to_sql(), r#"SELECT * FROM "users" WHERE "active"=1 "#);
}

#[test]
fn test_build_validates_first() {
    let registry = ConverterRegistry::builtin();
    assert!(matches!(
        insert("T").columns(["a"]).unwrap().build(registry),
        Err(OrmError::EmptyValues)
    ));
    assert!(update("T").build(registry).is_err());
    assert!(raw("SELECT ?").build(registry).is_err());
    assert!(raw("SELECT ?").bind(1).build(registry).is_ok());
}
