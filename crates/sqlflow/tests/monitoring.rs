//! Builders executed through an instrumented client.

use sqlflow::prelude::*;
use sqlflow::{
    HookAction, InstrumentedClient, LoggingMonitor, QueryContext, QueryHook, StatsMonitor,
    TracingSqlHook,
};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sqlflow=debug")
        .with_test_writer()
        .try_init();
}

async fn client() -> SqliteClient {
    let conn = SqliteClient::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
         INSERT INTO items (label) VALUES ('a'), ('b');",
    )
    .await
    .unwrap();
    conn
}

#[tokio::test]
async fn stats_follow_builder_kinds() {
    init_tracing();
    let stats = Arc::new(StatsMonitor::new());
    let conn = InstrumentedClient::new(client().await)
        .enable_monitoring()
        .with_monitor_arc(stats.clone())
        .with_hook(TracingSqlHook::new());

    let rows: Vec<Row> = qb::select_all().from("items").fetch_all(&conn).await.unwrap();
    assert_eq!(rows.len(), 2);
    qb::insert("items")
        .columns(["label"])
        .unwrap()
        .values(["c"])
        .unwrap()
        .execute_insert(&conn)
        .await
        .unwrap();
    qb::update("items")
        .set_value("label", "z")
        .filter(Operand::column("id").eq(1))
        .execute(&conn)
        .await
        .unwrap();
    qb::delete("items")
        .filter(Operand::column("id").eq(2))
        .execute(&conn)
        .await
        .unwrap();

    let s = stats.stats();
    assert_eq!(s.total_queries, 4);
    assert_eq!(s.select_count, 1);
    assert_eq!(s.insert_count, 1);
    assert_eq!(s.update_count, 1);
    assert_eq!(s.delete_count, 1);
}

struct DenyDeletes;

impl QueryHook for DenyDeletes {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        if ctx.query_type == sqlflow::QueryType::Delete {
            HookAction::Abort("deletes are disabled".to_string())
        } else {
            HookAction::Continue
        }
    }
}

#[tokio::test]
async fn hook_can_abort_builder_execution() {
    let conn = InstrumentedClient::new(client().await).with_hook(DenyDeletes);
    let err = qb::delete("items").execute(&conn).await.unwrap_err();
    assert!(matches!(err, OrmError::Validation(ref m) if m.contains("deletes are disabled")));

    let count = qb::select_all().from("items").count(&conn).await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn config_drives_monitoring() {
    init_tracing();
    let config =
        SqliteConfig::from_json(r#"{"slow_query_threshold_ms": 0, "query_timeout_ms": 1000}"#)
            .unwrap();
    assert_eq!(config.query_timeout_duration(), Some(Duration::from_secs(1)));

    let conn = InstrumentedClient::new(SqliteClient::with_config(&config).unwrap())
        .with_config(config.monitor_config())
        .with_monitor(LoggingMonitor::new());
    assert!(conn.is_monitoring_enabled());

    let (one,): (i64,) = qb::raw("SELECT 1").fetch_one(&conn).await.unwrap();
    assert_eq!(one, 1);
}
