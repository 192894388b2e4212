//! Integration tests against live PostgreSQL and MySQL servers.
//!
//! Set TEST_POSTGRES_URL or TEST_MYSQL_URL to run them; otherwise they skip.

use db_bridge_mcp::db::{ConnectionSettings, Connector, RetryPolicy};
use db_bridge_mcp::mcp::{BridgeService, EXECUTE_QUERY_TOOL, LIST_TABLES_TOOL};
use rmcp::model::{CallToolResult, JsonObject};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn create_service(db_url: &str) -> BridgeService {
    let settings = ConnectionSettings::new(db_url, None, None, Duration::from_secs(10)).unwrap();
    BridgeService::new(
        Arc::new(Connector::new(settings, RetryPolicy::disabled())),
        Duration::from_secs(30),
    )
}

fn text_of(result: &CallToolResult) -> String {
    let value = serde_json::to_value(result).unwrap();
    value["content"][0]["text"].as_str().unwrap().to_string()
}

async fn execute(service: &BridgeService, sql: &str, params: Value) -> CallToolResult {
    let Value::Object(arguments) = json!({ "sql": sql, "params": params }) else {
        unreachable!()
    };
    service
        .dispatch(EXECUTE_QUERY_TOOL, Some::<JsonObject>(arguments))
        .await
}

/// Runs the same scenario on any backend; `placeholders` are the two
/// positional markers for that backend.
async fn run_scenario(service: &BridgeService, table: &str, placeholders: (&str, &str)) {
    execute(service, &format!("DROP TABLE IF EXISTS {}", table), json!([])).await;

    let created = execute(
        service,
        &format!("CREATE TABLE {} (id INTEGER PRIMARY KEY, name VARCHAR(100))", table),
        json!([]),
    )
    .await;
    assert_ne!(created.is_error, Some(true), "CREATE failed: {}", text_of(&created));

    let inserted = execute(
        service,
        &format!(
            "INSERT INTO {} (id, name) VALUES ({}, {})",
            table, placeholders.0, placeholders.1
        ),
        json!([1, "中文测试"]),
    )
    .await;
    let summary: Value = serde_json::from_str(&text_of(&inserted)).unwrap();
    assert_eq!(summary["rowsAffected"], 1);

    let selected = execute(
        service,
        &format!("SELECT id, name FROM {} ORDER BY id", table),
        json!([]),
    )
    .await;
    let rows: Value = serde_json::from_str(&text_of(&selected)).unwrap();
    assert_eq!(rows, json!([{"id": 1, "name": "中文测试"}]));

    let tables = service.dispatch(LIST_TABLES_TOOL, None).await;
    assert!(text_of(&tables).contains(table));

    let missing = execute(service, "SELECT * FROM db_bridge_no_such_table", json!([])).await;
    assert_eq!(missing.is_error, Some(true));
    assert!(text_of(&missing).contains("\nHint: "));

    execute(service, &format!("DROP TABLE {}", table), json!([])).await;
}

#[tokio::test]
async fn test_postgres_scenario() {
    let url = match std::env::var("TEST_POSTGRES_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_POSTGRES_URL not set");
            return;
        }
    };
    let service = create_service(&url);
    run_scenario(&service, "db_bridge_pg_test", ("$1", "$2")).await;
}

#[tokio::test]
async fn test_postgres_values_without_plain_text_type() {
    let url = match std::env::var("TEST_POSTGRES_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_POSTGRES_URL not set");
            return;
        }
    };
    let service = create_service(&url);

    let result = execute(
        &service,
        "SELECT gen_random_uuid() AS id, \
                '67e55044-10b1-426f-9247-bb680e5fe0c8'::uuid AS fixed_id, \
                interval '1 day 2 hours' AS span, \
                '192.168.0.1'::inet AS addr, \
                ARRAY[1, 2, 3] AS nums",
        json!([]),
    )
    .await;
    assert_ne!(result.is_error, Some(true), "SELECT failed: {}", text_of(&result));

    let rows: Value = serde_json::from_str(&text_of(&result)).unwrap();
    let row = &rows[0];
    assert_eq!(row["id"].as_str().map(str::len), Some(36));
    assert_eq!(row["fixed_id"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
    assert_eq!(row["span"], "P0M1DT7200S");
    assert_eq!(row["addr"], "192.168.0.1");
    assert_eq!(row["nums"], "{1,2,3}");
}

#[tokio::test]
async fn test_mysql_scenario() {
    let url = match std::env::var("TEST_MYSQL_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: TEST_MYSQL_URL not set");
            return;
        }
    };
    let service = create_service(&url);
    run_scenario(&service, "db_bridge_mysql_test", ("?", "?")).await;
}
