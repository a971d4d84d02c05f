use super::parser::{parse_table_cancellable, parse_with_cancel_flag};
use super::*;
use crate::error::CksrError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const CLICKHOUSE_DDL: &str = r#"CREATE TABLE logs.events
(
    `id` UInt64,
    `ip` IPv4,
    `ip6` Nullable(IPv6),
    `tags` Array(String),
    `name` LowCardinality(String) DEFAULT 'unknown',
    `id_str` String MATERIALIZED toString(id),
    `recordTimestamp` Int64 COMMENT 'event time, ms',
    INDEX idx_name name TYPE bloom_filter GRANULARITY 4
)
ENGINE = ReplicatedMergeTree('/clickhouse/tables/{shard}/events', '{replica}')
PARTITION BY toYYYYMM(toDateTime(recordTimestamp / 1000))
ORDER BY (id, recordTimestamp)
SETTINGS index_granularity = 8192"#;

const STARROCKS_DDL: &str = r#"CREATE TABLE `events_sr` (
  `id` bigint(20) NOT NULL COMMENT "",
  `ip_int` bigint(20) NULL COMMENT "",
  `tags` ARRAY<varchar(65533)> NULL COMMENT "",
  `name` varchar(65533) NULL DEFAULT "unknown" COMMENT "",
  `recordTimestamp` bigint(20) NOT NULL COMMENT ""
) ENGINE=OLAP
DUPLICATE KEY(`id`)
DISTRIBUTED BY HASH(`id`) BUCKETS 8
PROPERTIES (
"replication_num" = "3"
);"#;

#[test]
fn test_parse_clickhouse_table() {
    let table = parse_table(CLICKHOUSE_DDL).unwrap();
    assert_eq!(table.db_name, "logs");
    assert_eq!(table.name, "events");
    assert_eq!(table.qualified_name(), "logs.events");

    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "ip", "ip6", "tags", "name", "id_str", "recordTimestamp"]
    );

    let name = table.column("name").unwrap();
    assert_eq!(name.data_type, "LowCardinality(String)");
    assert_eq!(name.default_kind, Some(DefaultKind::Default));
    assert_eq!(name.default_expr.as_deref(), Some("'unknown'"));

    let id_str = table.column("id_str").unwrap();
    assert!(id_str.is_materialized());
    assert_eq!(id_str.default_expr.as_deref(), Some("toString(id)"));

    let ts = table.column("recordTimestamp").unwrap();
    assert_eq!(ts.comment.as_deref(), Some("event time, ms"));
}

#[test]
fn test_parse_starrocks_table() {
    let table = parse_table(STARROCKS_DDL).unwrap();
    assert_eq!(table.db_name, "");
    assert_eq!(table.name, "events_sr");
    assert_eq!(table.columns.len(), 5);

    let id = table.column("id").unwrap();
    assert_eq!(id.data_type, "bigint(20)");
    assert!(!id.nullable);

    let tags = table.column("tags").unwrap();
    assert_eq!(tags.data_type, "ARRAY<varchar(65533)>");
    assert!(tags.nullable);

    let name = table.column("name").unwrap();
    assert_eq!(name.plain_default(), Some("\"unknown\""));
}

#[test]
fn test_parse_backquoted_qualified_name() {
    let ddl = "CREATE TABLE `db`.`t`\n(\n    `a` String\n)\nENGINE = Log";
    let table = parse_table(ddl).unwrap();
    assert_eq!(table.db_name, "db");
    assert_eq!(table.name, "t");
}

#[test]
fn test_unbalanced_nesting_is_parse_error() {
    let ddl = "CREATE TABLE db.t\n(\n    `a` Array(String,\n    `b` String\n)";
    let err = parse_table(ddl).unwrap_err();
    assert!(matches!(err, CksrError::Parse(_)));
}

#[test]
fn test_missing_create_table_is_error() {
    let err = parse_table("    `a` String,\n").unwrap_err();
    assert!(err.to_string().contains("CREATE TABLE"));
}

#[test]
fn test_cancelled_parse_stops() {
    let cancelled = AtomicBool::new(true);
    let err = parse_table_cancellable(CLICKHOUSE_DDL, &cancelled).unwrap_err();
    assert!(matches!(err, CksrError::Parse(_)));
}

#[tokio::test]
async fn test_parse_with_timeout() {
    let table = parse_table_with_timeout(CLICKHOUSE_DDL.to_string(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(table.name, "events");
}

#[tokio::test]
async fn test_parse_with_timeout_propagates_parse_error() {
    let err = parse_table_with_timeout("no ddl here".to_string(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, CksrError::Parse(_)));
}

#[tokio::test]
async fn test_parse_timeout_sets_cancel_flag() {
    let mut ddl = String::from("CREATE TABLE logs.wide\n(\n");
    for i in 0..200_000 {
        ddl.push_str(&format!("    `c{i}` String,\n"));
    }
    ddl.push_str(")\nENGINE = MergeTree\nORDER BY tuple()");

    let cancelled = Arc::new(AtomicBool::new(false));
    let err = parse_with_cancel_flag(ddl, Duration::ZERO, Arc::clone(&cancelled))
        .await
        .unwrap_err();
    assert!(matches!(err, CksrError::ParseTimeout(d) if d == Duration::ZERO));
    assert!(cancelled.load(Ordering::Relaxed));
}
