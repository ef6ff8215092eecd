//! Integration tests for PgStorage.
//! Run with: DATABASE_URL=... cargo test -p portal-sessions-storage -- --ignored pg_

#![allow(clippy::unwrap_used, reason = "integration test code")]

use std::sync::Arc;

use portal_sessions_core::{Session, SessionType, SessionTypes};
use portal_sessions_storage::{PgStorage, PoolSettings, SessionRepository, StorageError};
use uuid::Uuid;

async fn create_pg_storage() -> PgStorage {
    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for PgStorage integration tests");
    PgStorage::new(&url, PoolSettings::default()).await.expect("Failed to connect to PostgreSQL")
}

/// Each test writes under its own source so runs never see each other's rows.
fn unique_source() -> String {
    format!("test-{}", Uuid::new_v4())
}

fn types() -> SessionTypes {
    SessionTypes::default()
}

fn main_type() -> SessionType {
    types().parse("main_session").unwrap()
}

fn make_session(source: &str, data: &str) -> Session {
    Session::new(source, "main_session", data, &types()).unwrap()
}

#[tokio::test]
#[ignore]
async fn pg_upsert_and_find() {
    let storage = create_pg_storage().await;
    let source = unique_source();

    let stored = storage.upsert_session(&make_session(&source, r#"{"k":"v"}"#)).await.unwrap();
    let id = stored.id().unwrap();

    let found = storage.find_by_id(&source, &main_type(), id).await.unwrap().unwrap();
    assert_eq!(found.data(), &serde_json::json!({"k": "v"}));
    assert_eq!(found.checksum(), stored.checksum());

    let by_checksum =
        storage.find_by_checksum(&source, &main_type(), stored.checksum()).await.unwrap();
    assert_eq!(by_checksum.unwrap().id(), Some(id));
}

#[tokio::test]
#[ignore]
async fn pg_duplicate_checksum_is_typed() {
    let storage = create_pg_storage().await;
    let source = unique_source();

    storage.upsert_session(&make_session(&source, r#"{"a":1,"b":2}"#)).await.unwrap();
    let err = storage.upsert_session(&make_session(&source, r#"{"b":2,"a":1}"#)).await.unwrap_err();
    assert!(matches!(err, StorageError::Duplicate(_)), "got {err:?}");
}

#[tokio::test]
#[ignore]
async fn pg_insert_rejects_taken_id() {
    let storage = create_pg_storage().await;
    let source = unique_source();
    let id = format!("fixed-{}", Uuid::new_v4());

    let first = make_session(&source, r#"{"n":1}"#).with_id(&id).unwrap();
    let second = make_session(&source, r#"{"n":2}"#).with_id(&id).unwrap();
    storage.insert_session(&first).await.unwrap();
    assert!(storage.insert_session(&second).await.unwrap_err().is_duplicate());
}

#[tokio::test]
#[ignore]
async fn pg_update_replaces_data_in_place() {
    let storage = create_pg_storage().await;
    let source = unique_source();

    let mut stored = storage.upsert_session(&make_session(&source, r#"{"k":"v"}"#)).await.unwrap();
    stored.replace_data(r#"{"k":"v2"}"#).unwrap();
    storage.upsert_session(&stored).await.unwrap();

    let listed = storage.list_by_source_and_type(&source, &main_type()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].data(), &serde_json::json!({"k": "v2"}));
}

#[tokio::test]
#[ignore]
async fn pg_replace_data_never_recreates_a_deleted_row() {
    let storage = create_pg_storage().await;
    let source = unique_source();

    let stored = storage.upsert_session(&make_session(&source, r#"{"k":"v"}"#)).await.unwrap();
    let id = stored.id().unwrap().to_owned();
    let mut read = storage.find_by_id(&source, &main_type(), &id).await.unwrap().unwrap();

    assert_eq!(storage.delete_by_id(&source, &main_type(), &id).await.unwrap(), 1);
    read.replace_data(r#"{"k":"v9"}"#).unwrap();
    assert_eq!(storage.replace_data(&read).await.unwrap(), 0);
    assert!(storage.find_by_id(&source, &main_type(), &id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn pg_replace_data_reports_checksum_collision() {
    let storage = create_pg_storage().await;
    let source = unique_source();

    storage.upsert_session(&make_session(&source, r#"{"k":"v"}"#)).await.unwrap();
    let mut other = storage.upsert_session(&make_session(&source, r#"{"k":"w"}"#)).await.unwrap();
    other.replace_data(r#"{"k":"v"}"#).unwrap();
    assert!(storage.replace_data(&other).await.unwrap_err().is_duplicate());
}

#[tokio::test]
#[ignore]
async fn pg_update_never_moves_rows_between_sources() {
    let storage = create_pg_storage().await;
    let owner = unique_source();
    let intruder = unique_source();

    let stored = storage.upsert_session(&make_session(&owner, r#"{"k":"v"}"#)).await.unwrap();
    let hijack = make_session(&intruder, r#"{"k":"x"}"#).with_id(stored.id().unwrap()).unwrap();
    assert!(storage.upsert_session(&hijack).await.unwrap_err().is_duplicate());

    let found = storage.find_by_id(&owner, &main_type(), stored.id().unwrap()).await.unwrap();
    assert_eq!(found.unwrap().data(), &serde_json::json!({"k": "v"}));
}

#[tokio::test]
#[ignore]
async fn pg_query_matches_nested_and_array_values() {
    let storage = create_pg_storage().await;
    let source = unique_source();

    storage
        .upsert_session(&make_session(&source, r#"{"user":{"name":"ann"},"tags":["x","y"]}"#))
        .await
        .unwrap();
    storage
        .upsert_session(&make_session(&source, r#"{"user":{"name":"bob"},"tags":["z"],"n":3}"#))
        .await
        .unwrap();

    let by_name =
        storage.query_by_source_and_type(&source, &main_type(), "user.name", "ann").await.unwrap();
    assert_eq!(by_name.len(), 1);

    let by_tag = storage.query_by_source_and_type(&source, &main_type(), "tags", "z").await.unwrap();
    assert_eq!(by_tag.len(), 1);

    let by_number = storage.query_by_source_and_type(&source, &main_type(), "n", "3").await.unwrap();
    assert_eq!(by_number.len(), 1);

    let none = storage.query_by_source_and_type(&source, &main_type(), "user.name", "eve").await;
    assert!(none.unwrap().is_empty());

    let bad = storage.query_by_source_and_type(&source, &main_type(), "a..b", "x").await;
    assert!(matches!(bad, Err(StorageError::QueryInvalid(_))));
}

#[tokio::test]
#[ignore]
async fn pg_delete_reports_affected_rows() {
    let storage = create_pg_storage().await;
    let source = unique_source();

    let stored = storage.upsert_session(&make_session(&source, r#"{"k":"v"}"#)).await.unwrap();
    let id = stored.id().unwrap();
    assert_eq!(storage.delete_by_id(&source, &main_type(), id).await.unwrap(), 1);
    assert_eq!(storage.delete_by_id(&source, &main_type(), id).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn pg_concurrent_provisioning_and_inserts() {
    let storage = Arc::new(create_pg_storage().await);
    let source = unique_source();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let storage = Arc::clone(&storage);
        let session = make_session(&source, r#"{"same":true}"#);
        handles.push(tokio::spawn(async move { storage.upsert_session(&session).await }));
    }

    let mut stored = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => stored += 1,
            Err(err) => assert!(err.is_duplicate(), "unexpected error: {err:?}"),
        }
    }
    assert_eq!(stored, 1);
    let listed = storage.list_by_source_and_type(&source, &main_type()).await.unwrap();
    assert_eq!(listed.len(), 1);
}
