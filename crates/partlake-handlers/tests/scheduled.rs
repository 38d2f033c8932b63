use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use partlake_config::{LakeConfig, QueryConfig, TablesConfig};
use partlake_core::{LakeError, PartitionLayout, QueryState, QueryStatus};
use partlake_handlers::{create_partitions, transform_missing, transform_partition, FunctionContext};
use partlake_query::testing::ScriptedEngine;
use partlake_query::QueryRunner;

fn config(layout: PartitionLayout) -> LakeConfig {
    LakeConfig {
        query: QueryConfig {
            database: "cf_logs".to_string(),
            output_location: "s3://athena-results/".to_string(),
            poll_interval_ms: 100,
            max_wait_secs: 0,
            ..QueryConfig::default()
        },
        tables: TablesConfig {
            table: "partitioned_gz".to_string(),
            source_table: "partitioned_gz".to_string(),
            target_table: "partitioned_parquet".to_string(),
            layout,
        },
        ..LakeConfig::default()
    }
}

fn context(engine: Arc<ScriptedEngine>, layout: PartitionLayout) -> FunctionContext {
    let config = config(layout);
    let runner = QueryRunner::from_config(engine, &config.query);
    FunctionContext::new(Arc::new(runner), &config)
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_create_partitions_for_next_hour() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    create_partitions(&ctx, at(2021, 12, 31, 23, 30), None)
        .await
        .unwrap();

    assert_eq!(
        engine.submitted_sql(),
        vec!["ALTER TABLE cf_logs.partitioned_gz\n    ADD IF NOT EXISTS\n    PARTITION (\n        year = '2022',\n        month = '01',\n        day = '01',\n        hour = '00' );"]
    );
    let request = &engine.submissions()[0];
    assert_eq!(request.output_location(), "s3://athena-results/");
    assert_eq!(request.database(), Some("cf_logs"));
}

#[tokio::test(start_paused = true)]
async fn test_create_partitions_with_explicit_dth() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    create_partitions(&ctx, at(2030, 6, 1, 12, 0), Some("2021-01-01T00"))
        .await
        .unwrap();

    let sql = &engine.submitted_sql()[0];
    assert!(sql.contains("year = '2021',\n        month = '01',\n        day = '01',\n        hour = '00' );"));
}

#[tokio::test(start_paused = true)]
async fn test_create_partitions_date_hour_layout() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::DateHour);

    create_partitions(&ctx, at(2021, 1, 1, 0, 0), Some("2021-01-01T00"))
        .await
        .unwrap();

    assert_eq!(
        engine.submitted_sql(),
        vec!["ALTER TABLE cf_logs.partitioned_gz\n    ADD IF NOT EXISTS\n    PARTITION (\n        dt = '2021-01-01',\n        hour = '00' );"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_create_partitions_twice_is_harmless() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::Hive);
    let now = at(2021, 1, 1, 10, 5);

    create_partitions(&ctx, now, None).await.unwrap();
    create_partitions(&ctx, now, None).await.unwrap();

    assert_eq!(engine.submissions().len(), 2);
    assert_eq!(engine.registered_partitions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_create_partitions_waits_for_completion() {
    let engine = Arc::new(ScriptedEngine::with_script(vec![
        QueryStatus::new(QueryState::Queued),
        QueryStatus::new(QueryState::Running),
        QueryStatus::new(QueryState::Succeeded),
    ]));
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    let outcome = create_partitions(&ctx, at(2021, 1, 1, 0, 0), None)
        .await
        .unwrap();
    assert_eq!(outcome.polls, 3);
    assert_eq!(outcome.waits, 2);
    assert!(outcome.elapsed >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_dth_submits_nothing() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    let err = create_partitions(&ctx, at(2021, 1, 1, 0, 0), Some("yesterday"))
        .await
        .unwrap_err();
    assert!(matches!(err, LakeError::InvalidInput { .. }));
    assert!(engine.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transform_partition_two_hours_back() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    transform_partition(&ctx, at(2021, 3, 1, 1, 15), None)
        .await
        .unwrap();

    assert_eq!(
        engine.submitted_sql(),
        vec!["INSERT INTO cf_logs.partitioned_parquet\n    SELECT *\n    FROM cf_logs.partitioned_gz\n    WHERE year = '2021'\n        AND month = '02'\n        AND day = '28'\n        AND hour = '23';"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_transform_partition_failure_propagates() {
    let engine = Arc::new(
        ScriptedEngine::succeeding()
            .fail_queries_containing("INSERT INTO", "HIVE_BAD_DATA: malformed row"),
    );
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    let err = transform_partition(&ctx, at(2021, 3, 1, 1, 15), Some("2021-01-01T00"))
        .await
        .unwrap_err();
    match err {
        LakeError::Execution { state, reason, .. } => {
            assert_eq!(state, QueryState::Failed);
            assert_eq!(reason, "HIVE_BAD_DATA: malformed row");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_transform_missing_targets_yesterday() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    transform_missing(&ctx, at(2021, 3, 1, 0, 10), None)
        .await
        .unwrap();

    let sql = &engine.submitted_sql()[0];
    assert!(sql.starts_with("-- Insert missing rows of 2021-02-28"));
    assert!(sql.contains("INSERT INTO cf_logs.partitioned_parquet"));
    assert!(sql.contains("FROM cf_logs.partitioned_gz"));
    assert!(sql.contains("WHERE year = '2021' AND month = '02' AND day = '28'"));
    assert!(sql.contains("WHERE parquet.request_id IS NULL"));
}

#[tokio::test(start_paused = true)]
async fn test_transform_missing_with_explicit_dt() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    transform_missing(&ctx, at(2021, 3, 1, 0, 10), Some("2020-12-31"))
        .await
        .unwrap();

    assert!(engine.submitted_sql()[0].contains("year = '2020' AND month = '12' AND day = '31'"));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_submission_is_reported() {
    let engine = Arc::new(ScriptedEngine::rejecting("AccessDeniedException"));
    let ctx = context(engine.clone(), PartitionLayout::Hive);

    let err = transform_missing(&ctx, at(2021, 3, 1, 0, 10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LakeError::Submission { ref message } if message == "AccessDeniedException"));
    assert_eq!(engine.status_fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transform_missing_follows_date_hour_layout() {
    let engine = Arc::new(ScriptedEngine::succeeding());
    let ctx = context(engine.clone(), PartitionLayout::DateHour);

    transform_missing(&ctx, at(2021, 3, 1, 0, 10), None)
        .await
        .unwrap();

    let sql = &engine.submitted_sql()[0];
    assert!(sql.starts_with("-- Insert missing rows of 2021-02-28"));
    assert_eq!(sql.matches("WHERE dt = '2021-02-28'").count(), 2);
    assert!(sql.contains("ON concat(gz.dt, 'T', gz.hour) = parquet.dth"));
    assert!(!sql.contains("year = "));
}
