use rstest::rstest;
use serde_json::json;
use trino_destination::trino::Error;
use trino_destination::util::on_conflict::UniqueConflictMethod;
use trino_destination::util::schema::TableSchema;
use trino_destination::InsertStats;

mod common;

use common::{events_schema, records, MockCoordinator};

#[test_log::test]
fn test_trino_create_table() {
    let mut coordinator = MockCoordinator::start();
    let connector = coordinator.connector();

    let commands = connector
        .build_create_table_commands(
            &events_schema(),
            "analytics",
            "events",
            "events",
            Some("memory"),
            &["id".to_string()],
        )
        .expect("create should build");

    insta::assert_snapshot!(commands.join("\n"), @"CREATE TABLE IF NOT EXISTS analytics.events (id BIGINT, event_name VARCHAR, amount DOUBLE, is_test BOOLEAN, payload JSON, tags JSON, created_at TIMESTAMP)");

    let (submit, poll) = coordinator.expect_statement(&commands[0], json!([[true]]));
    connector
        .create_table(
            &events_schema(),
            "analytics",
            "events",
            "events",
            Some("memory"),
            &["id".to_string()],
        )
        .expect("create should run");

    submit.assert();
    poll.assert();
}

#[test_log::test]
fn test_trino_alter_table_adds_only_new_columns() {
    let mut coordinator = MockCoordinator::start();
    let connector = coordinator.connector();

    let existing = json!([
        ["id", "bigint", "", ""],
        ["event_name", "varchar", "", ""],
        ["AMOUNT", "double", "", ""],
        ["is_test", "boolean", "", ""],
        ["payload", "json", "", ""],
    ]);
    let (describe, _describe_poll) = coordinator.expect_statement("DESCRIBE analytics.events", existing);
    let (alter, _alter_poll) = coordinator.expect_statement(
        "ALTER TABLE analytics.events ADD COLUMN tags JSON, ADD COLUMN created_at TIMESTAMP",
        json!([[true]]),
    );

    let executed = connector
        .alter_table(&events_schema(), "analytics", "events", "events", None, &[])
        .expect("alter should run");

    assert_eq!(executed, 1);
    describe.assert();
    alter.assert();
}

#[test_log::test]
fn test_trino_alter_table_missing_table_is_an_error() {
    let mut coordinator = MockCoordinator::start();
    let connector = coordinator.connector();

    let _describe = coordinator.fail_statement(
        "DESCRIBE analytics.missing",
        "line 1:1: Table 'memory.analytics.missing' does not exist",
    );

    let result = connector.build_alter_table_commands(
        &events_schema(),
        "analytics",
        "events",
        "missing",
        None,
        &[],
    );

    match result {
        Err(err @ Error::UnableToReconcileSchema { .. }) => {
            assert!(err.to_string().contains("analytics.missing"));
        }
        other => panic!("Expected UnableToReconcileSchema, got {other:?}"),
    }
}

#[test_log::test]
fn test_trino_insert_records() {
    let mut coordinator = MockCoordinator::start();
    let connector = coordinator.connector();

    let batch = records(json!([
        {
            "id": 1,
            "Event Name": "O'Reilly signup",
            "amount": 9.5,
            "is_test": false,
            "payload": {"plan": "pro"},
            "tags": ["a", "b"],
            "created_at": "2024-09-12T10:00:00Z",
        },
        {"id": 2, "tags": [], "Event Name": null},
    ]));

    let commands = connector
        .build_insert_commands(
            &batch,
            &events_schema(),
            "analytics",
            "events",
            None,
            Some(UniqueConflictMethod::Update),
            &["id".to_string()],
        )
        .expect("insert should build");

    assert_eq!(commands.len(), 1);
    insta::assert_snapshot!(&commands[0], @r#"
    INSERT INTO analytics.events (id, event_name, amount, is_test, payload, tags, created_at)
    VALUES (1, 'O''Reilly signup', 9.5, FALSE, JSON '{"plan":"pro"}', JSON '["a","b"]', TIMESTAMP '2024-09-12 10:00:00.000'), (2, NULL, NULL, NULL, NULL, NULL, NULL)
    "#);

    let (submit, poll) = coordinator.expect_statement(&commands[0], json!([[2]]));
    let stats = connector
        .insert_records(
            &batch,
            &events_schema(),
            "analytics",
            "events",
            None,
            Some(UniqueConflictMethod::Update),
            &["id".to_string()],
        )
        .expect("insert should run");

    assert_eq!(
        stats,
        InsertStats {
            records_inserted: 2,
            records_updated: 0,
        }
    );
    submit.assert();
    poll.assert();
}

#[test_log::test]
fn test_trino_insert_empty_batch_sends_nothing() {
    let coordinator = MockCoordinator::start();
    let connector = coordinator.connector();

    let stats = connector
        .insert_records(&[], &events_schema(), "analytics", "events", None, None, &[])
        .expect("empty insert should succeed");

    assert_eq!(stats, InsertStats::default());
}

#[rstest]
#[case(json!([["events"]]), true)]
#[case(json!([]), false)]
#[test_log::test]
fn test_trino_does_table_exist(#[case] rows: serde_json::Value, #[case] expected: bool) {
    let mut coordinator = MockCoordinator::start();
    let connector = coordinator.connector();

    let (show, _show_poll) =
        coordinator.expect_statement("SHOW TABLES FROM analytics LIKE 'events'", rows);

    assert_eq!(
        connector
            .does_table_exist("analytics", "events", None)
            .expect("query should succeed"),
        expected
    );
    show.assert();
}

#[test_log::test]
fn test_trino_reserved_names_are_quoted() {
    let coordinator = MockCoordinator::start();
    let connector = coordinator.connector();

    let schema = TableSchema::from_json(&json!({
        "properties": {
            "order": {"type": "integer"},
            "1st value": {"type": "string"},
        }
    }))
    .expect("schema should parse");

    let commands = connector
        .build_create_table_commands(&schema, "select", "stream", "table", None, &[])
        .expect("create should build");

    assert_eq!(
        commands,
        vec![r#"CREATE TABLE IF NOT EXISTS "select"."table" ("order" BIGINT, _1st_value VARCHAR)"#
            .to_string()]
    );
}

#[test_log::test]
fn test_trino_unsupported_column_type_is_rejected() {
    let result = TableSchema::from_json(&json!({
        "properties": {"id": {"type": "uuid"}}
    }));
    assert!(result.is_err());

    let coordinator = MockCoordinator::start();
    let connector = coordinator.connector();
    let schema = TableSchema::from_json(&json!({
        "properties": {"nothing": {"type": "null"}}
    }))
    .expect("schema should parse");

    let result =
        connector.build_create_table_commands(&schema, "analytics", "s", "t", None, &[]);
    assert!(matches!(result, Err(Error::UnableToMapColumnTypes { .. })));
}

#[test_log::test]
fn test_trino_colliding_column_names_are_rejected() {
    let coordinator = MockCoordinator::start();
    let connector = coordinator.connector();
    let schema = TableSchema::from_json(&json!({
        "properties": {
            "user id": {"type": "integer"},
            "User_Id": {"type": "string"},
        }
    }))
    .expect("schema should parse");

    let result =
        connector.build_create_table_commands(&schema, "analytics", "s", "t", None, &[]);

    match result {
        Err(err @ Error::UnableToMapColumnTypes { .. }) => {
            let message = err.to_string();
            assert!(message.contains("analytics.t"));
            assert!(message.contains("'user id' and 'User_Id' both sanitize to 'user_id'"));
        }
        other => panic!("Expected UnableToMapColumnTypes, got {other:?}"),
    }
}
