//! End-to-end tests against an in-memory database.

use sqlflow::prelude::*;
use sqlflow::qb::{func, new_row, old_row};
use sqlflow::{
    ChangeListener, ConverterRegistry, HasData, PrimaryAction, ResultFactory, RowList,
    TableDescriptor,
};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
    age: Option<i64>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            age: row.try_get("age")?,
        })
    }
}

async fn setup() -> SqliteClient {
    let conn = SqliteClient::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, age INTEGER);
         INSERT INTO users (name, age) VALUES ('ann', 31), ('bob', 17), ('cy', NULL);",
    )
    .await
    .unwrap();
    conn
}

#[tokio::test]
async fn select_maps_rows() {
    let conn = setup().await;

    let adults: Vec<User> = qb::select_all()
        .from("users")
        .filter(Operand::column("age").gte(18))
        .fetch_all(&conn)
        .await
        .unwrap();
    assert_eq!(
        adults,
        vec![User {
            id: 1,
            name: "ann".into(),
            age: Some(31)
        }]
    );

    let none: Vec<User> = qb::select_all()
        .from("users")
        .filter(Operand::column("age").gt(100))
        .fetch_all(&conn)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn single_row_helpers() {
    let conn = setup().await;
    let by_name = |name: &str| {
        qb::select_all()
            .from("users")
            .filter(Operand::column("name").eq(name.to_string()))
    };

    let bob: User = by_name("bob").fetch_one(&conn).await.unwrap();
    assert_eq!(bob.age, Some(17));

    let err = by_name("zed").fetch_one::<User>(&conn).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(by_name("zed").fetch_opt::<User>(&conn).await.unwrap().is_none());

    assert!(by_name("cy").exists(&conn).await.unwrap());
    assert!(!by_name("zed").exists(&conn).await.unwrap());
}

#[tokio::test]
async fn scalars_and_count() {
    let conn = setup().await;
    let all = qb::select_all().from("users");
    assert_eq!(all.count(&conn).await.unwrap(), 3);

    let oldest = qb::select([func::max("age")]).from("users");
    assert_eq!(oldest.long_value(&conn).await.unwrap(), 31);

    let first = qb::select(["name"]).from("users").order_by_asc("name");
    assert_eq!(first.string_value(&conn).await.unwrap().as_deref(), Some("ann"));

    let missing = qb::select(["name"])
        .from("users")
        .filter(Operand::column("id").eq(99));
    assert_eq!(missing.long_value(&conn).await.unwrap(), 0);
    assert_eq!(missing.string_value(&conn).await.unwrap(), None);
}

#[tokio::test]
async fn mutations_round_trip() {
    let conn = setup().await;

    let id = qb::insert("users")
        .columns(["name", "age"])
        .unwrap()
        .values(("dee", 40))
        .unwrap()
        .execute_insert(&conn)
        .await
        .unwrap();
    assert_eq!(id, 4);

    let changed = qb::update("users")
        .set_value("age", Operand::column("age").plus(1))
        .filter(Operand::column("age").is_not_null())
        .execute(&conn)
        .await
        .unwrap();
    assert_eq!(changed, 3);

    let removed = qb::delete("users")
        .filter(Operand::column("age").lt(20))
        .execute(&conn)
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let names: Vec<(String,)> = qb::select(["name"])
        .from("users")
        .order_by_asc("id")
        .fetch_all(&conn)
        .await
        .unwrap();
    let names: Vec<String> = names.into_iter().map(|(n,)| n).collect();
    assert_eq!(names, ["ann", "cy", "dee"]);
}

#[tokio::test]
async fn constraint_violation_is_classified() {
    let conn = setup().await;
    let err = qb::insert("users")
        .columns(["name"])
        .unwrap()
        .values(["ann"])
        .unwrap()
        .execute(&conn)
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());

    let ignored = qb::insert("users")
        .or_ignore()
        .columns(["name"])
        .unwrap()
        .values(["ann"])
        .unwrap()
        .execute(&conn)
        .await
        .unwrap();
    assert_eq!(ignored, 0);
}

#[tokio::test]
async fn identity_lookup() {
    let conn = setup().await;
    let users = TableDescriptor::new("users", ["id", "name", "age"], ["id"]).unwrap();
    let user: User = qb::select_all()
        .from(&users)
        .filter_identity(&users, [2])
        .unwrap()
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(user.name, "bob");
}

#[tokio::test]
async fn converters_bind_custom_values() {
    let conn = SqliteClient::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE events (id TEXT PRIMARY KEY, at INTEGER, body TEXT)")
        .await
        .unwrap();

    let id = uuid::Uuid::new_v4();
    let at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
    let body = serde_json::json!({"kind": "login"});
    qb::insert("events")
        .columns(["id", "at", "body"])
        .unwrap()
        .values((id, at, body.clone()))
        .unwrap()
        .execute(&conn)
        .await
        .unwrap();

    let row: Row = qb::select_all()
        .from("events")
        .filter(Operand::column("id").eq(id))
        .fetch_one(&conn)
        .await
        .unwrap();
    let registry = ConverterRegistry::builtin();
    assert_eq!(row.try_get::<i64>("at").unwrap(), 1_700_000_000_123);
    assert_eq!(
        row.try_get_converted::<uuid::Uuid>("id", registry).unwrap(),
        id
    );
    assert_eq!(
        row.try_get_converted::<chrono::DateTime<chrono::Utc>>("at", registry)
            .unwrap(),
        at
    );
    assert_eq!(
        row.try_get_converted::<serde_json::Value>("body", registry)
            .unwrap(),
        body
    );
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(String, PrimaryAction)>>);

impl ChangeListener for Recorder {
    fn on_change(&self, table: &str, action: PrimaryAction) {
        self.0.lock().unwrap().push((table.to_string(), action));
    }
}

#[tokio::test]
async fn execute_notify_reports_changes() {
    let conn = setup().await;
    let recorder = Recorder::default();

    qb::update("users")
        .set_value("age", 1)
        .filter(Operand::column("name").eq("cy"))
        .execute_notify(&conn, &recorder)
        .await
        .unwrap();
    qb::raw("DELETE FROM users WHERE name = ?")
        .bind("bob")
        .affecting("users")
        .execute_notify(&conn, &recorder)
        .await
        .unwrap();
    // failed statements are not reported
    assert!(qb::update("missing")
        .set_value("a", 1)
        .execute_notify(&conn, &recorder)
        .await
        .is_err());

    assert_eq!(
        recorder.0.into_inner().unwrap(),
        vec![
            ("users".to_string(), PrimaryAction::Update),
            ("users".to_string(), PrimaryAction::Delete),
        ]
    );
}

#[tokio::test]
async fn raw_queries() {
    let conn = setup().await;
    let (n,): (i64,) = qb::raw("SELECT count(*) FROM users WHERE name LIKE ?")
        .bind("%n%")
        .fetch_one(&conn)
        .await
        .unwrap();
    assert_eq!(n, 1);

    let err = qb::raw("UPDATE users SET age = 1")
        .fetch_all::<Row>(&conn)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::NotSelect(_)));
}

#[tokio::test]
async fn index_and_trigger_ddl() {
    let conn = setup().await;
    conn.execute_batch("CREATE TABLE audit (user_id INTEGER, old_age INTEGER)")
        .await
        .unwrap();

    let index = qb::create_index("users_age", "users")
        .if_not_exists()
        .columns(["age"]);
    index.execute(&conn).await.unwrap();
    index.drop_query().execute(&conn).await.unwrap();

    qb::trigger("audit_age")
        .after()
        .on_update_of("users", ["age"])
        .for_each_row()
        .begin(
            qb::insert("audit")
                .columns(["user_id", "old_age"])
                .unwrap()
                .values([new_row("id"), old_row("age")])
                .unwrap(),
        )
        .execute(&conn)
        .await
        .unwrap();

    qb::update("users")
        .set_value("age", 50)
        .filter(Operand::column("id").eq(1))
        .execute(&conn)
        .await
        .unwrap();
    let rows: Vec<(i64, i64)> = qb::select(["user_id", "old_age"])
        .from("audit")
        .fetch_all(&conn)
        .await
        .unwrap();
    assert_eq!(rows, vec![(1, 31)]);
}

#[tokio::test]
async fn factories_can_be_used_directly() {
    let conn = setup().await;
    let compiled = qb::select_all()
        .from("users")
        .build(conn.converters())
        .unwrap();
    let rows = RowList::<Row>::new()
        .create_result(&compiled, &conn)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);

    // errors degrade to false
    let broken = qb::raw("SELECT * FROM nowhere")
        .build(conn.converters())
        .unwrap();
    assert!(!HasData.create_result(&broken, &conn).await.unwrap());
}
