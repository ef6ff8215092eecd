//! In-memory session store
//!
//! Ephemeral storage for tests and for running without a database.
//! Enforces the same uniqueness rules as the PostgreSQL backend: every write
//! checks `id` and `(source, type, checksum)` under one write lock, so
//! concurrent identical writes admit exactly one winner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use portal_sessions_core::{Session, SessionType};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StorageError;
use crate::filter::FieldFilter;
use crate::traits::SessionRepository;

type Collections = HashMap<SessionType, Vec<Session>>;

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions of a type across all sources.
    pub async fn count(&self, session_type: &SessionType) -> usize {
        self.collections.read().await.get(session_type).map_or(0, Vec::len)
    }

    async fn select<F>(&self, session_type: &SessionType, predicate: F) -> Vec<Session>
    where
        F: Fn(&Session) -> bool + Send,
    {
        let collections = self.collections.read().await;
        collections
            .get(session_type)
            .map(|rows| rows.iter().filter(|s| predicate(*s)).cloned().collect())
            .unwrap_or_default()
    }
}

/// Whether a row other than `skip` holds the same `(source, checksum)` key.
fn checksum_collision(rows: &[Session], session: &Session, skip: Option<usize>) -> bool {
    rows.iter().enumerate().any(|(i, row)| {
        Some(i) != skip
            && row.source() == session.source()
            && row.checksum() == session.checksum()
    })
}

fn duplicate_checksum(session: &Session) -> StorageError {
    StorageError::Duplicate(format!(
        "{}_source_type_checksum_key: ({}, {}, {})",
        session.session_type(),
        session.source(),
        session.session_type(),
        session.checksum()
    ))
}

fn duplicate_id(session_type: &SessionType, id: &str) -> StorageError {
    StorageError::Duplicate(format!("{session_type}_pkey: id '{id}' already taken"))
}

#[async_trait]
impl SessionRepository for MemoryStorage {
    async fn ensure_collection(&self, session_type: &SessionType) -> Result<(), StorageError> {
        let mut collections = self.collections.write().await;
        if !collections.contains_key(session_type) {
            collections.insert(session_type.clone(), Vec::new());
            tracing::info!(session_type = %session_type, "session collection provisioned");
        }
        Ok(())
    }

    async fn upsert_session(&self, session: &Session) -> Result<Session, StorageError> {
        self.ensure_collection(session.session_type()).await?;
        let mut collections = self.collections.write().await;
        let rows = collections.entry(session.session_type().clone()).or_default();

        let Some(id) = session.id() else {
            if checksum_collision(rows, session, None) {
                return Err(duplicate_checksum(session));
            }
            let mut stored = session.clone();
            stored.assign_id(Uuid::new_v4().to_string());
            rows.push(stored.clone());
            return Ok(stored);
        };

        match rows.iter().position(|row| row.id() == Some(id)) {
            Some(index) => {
                if rows.get(index).is_some_and(|row| row.source() != session.source()) {
                    return Err(duplicate_id(session.session_type(), id));
                }
                if checksum_collision(rows, session, Some(index)) {
                    return Err(duplicate_checksum(session));
                }
                if let Some(slot) = rows.get_mut(index) {
                    *slot = session.clone();
                }
            },
            None => {
                if checksum_collision(rows, session, None) {
                    return Err(duplicate_checksum(session));
                }
                rows.push(session.clone());
            },
        }
        Ok(session.clone())
    }

    async fn insert_session(&self, session: &Session) -> Result<Session, StorageError> {
        self.ensure_collection(session.session_type()).await?;
        let mut collections = self.collections.write().await;
        let rows = collections.entry(session.session_type().clone()).or_default();

        let id = session.id().map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
        if rows.iter().any(|row| row.id() == Some(id.as_str())) {
            return Err(duplicate_id(session.session_type(), &id));
        }
        if checksum_collision(rows, session, None) {
            return Err(duplicate_checksum(session));
        }
        let mut stored = session.clone();
        stored.assign_id(id);
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn replace_data(&self, session: &Session) -> Result<u64, StorageError> {
        let Some(id) = session.id() else {
            return Ok(0);
        };
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(session.session_type()) else {
            return Ok(0);
        };
        let Some(index) =
            rows.iter().position(|row| row.source() == session.source() && row.id() == Some(id))
        else {
            return Ok(0);
        };
        if checksum_collision(rows, session, Some(index)) {
            return Err(duplicate_checksum(session));
        }
        if let Some(slot) = rows.get_mut(index) {
            *slot = session.clone();
        }
        Ok(1)
    }

    async fn find_by_checksum(
        &self,
        source: &str,
        session_type: &SessionType,
        checksum: &str,
    ) -> Result<Option<Session>, StorageError> {
        let found = self
            .select(session_type, |s| s.source() == source && s.checksum() == checksum)
            .await;
        Ok(found.into_iter().next())
    }

    async fn find_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<Option<Session>, StorageError> {
        let found = self.select(session_type, |s| s.source() == source && s.id() == Some(id)).await;
        Ok(found.into_iter().next())
    }

    async fn list_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
    ) -> Result<Vec<Session>, StorageError> {
        Ok(self.select(session_type, |s| s.source() == source).await)
    }

    async fn query_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
        field: &str,
        value: &str,
    ) -> Result<Vec<Session>, StorageError> {
        let filter = FieldFilter::parse(field, value)?;
        Ok(self.select(session_type, |s| s.source() == source && filter.matches(s.data())).await)
    }

    async fn delete_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<u64, StorageError> {
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(session_type) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !(row.source() == source && row.id() == Some(id)));
        Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_sessions_core::SessionTypes;

    fn session(source: &str, data: &str) -> Session {
        Session::new(source, "main_session", data, &SessionTypes::default()).unwrap()
    }

    fn main_type() -> SessionType {
        SessionTypes::default().parse("main_session").unwrap()
    }

    #[tokio::test]
    async fn upsert_assigns_id_and_rejects_same_checksum() {
        let store = MemoryStorage::new();
        let stored = store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        assert!(stored.id().is_some());

        let err = store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.count(&main_type()).await, 1);
    }

    #[tokio::test]
    async fn same_payload_under_other_source_is_allowed() {
        let store = MemoryStorage::new();
        store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        store.upsert_session(&session("portalB", r#"{"k":"v"}"#)).await.unwrap();
        assert_eq!(store.count(&main_type()).await, 2);
    }

    #[tokio::test]
    async fn upsert_with_id_replaces_data() {
        let store = MemoryStorage::new();
        let mut stored = store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        stored.replace_data(r#"{"k":"v2"}"#).unwrap();
        store.upsert_session(&stored).await.unwrap();

        let id = stored.id().unwrap();
        let found = store.find_by_id("portalA", &main_type(), id).await.unwrap().unwrap();
        assert_eq!(found.data(), &serde_json::json!({"k": "v2"}));
        assert_eq!(store.count(&main_type()).await, 1);
    }

    #[tokio::test]
    async fn upsert_with_id_rejects_checksum_of_other_row() {
        let store = MemoryStorage::new();
        store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        let mut other = store.upsert_session(&session("portalA", r#"{"k":"w"}"#)).await.unwrap();
        other.replace_data(r#"{"k":"v"}"#).unwrap();
        assert!(store.upsert_session(&other).await.unwrap_err().is_duplicate());
    }

    #[tokio::test]
    async fn replace_data_updates_in_place() {
        let store = MemoryStorage::new();
        let mut stored = store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        stored.replace_data(r#"{"k":"v2"}"#).unwrap();
        assert_eq!(store.replace_data(&stored).await.unwrap(), 1);

        let found = store.find_by_id("portalA", &main_type(), stored.id().unwrap()).await.unwrap();
        assert_eq!(found.unwrap().data(), &serde_json::json!({"k": "v2"}));
    }

    #[tokio::test]
    async fn replace_data_never_recreates_a_deleted_row() {
        let store = MemoryStorage::new();
        let stored = store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        let id = stored.id().unwrap().to_owned();

        let mut read = store.find_by_id("portalA", &main_type(), &id).await.unwrap().unwrap();
        assert_eq!(store.delete_by_id("portalA", &main_type(), &id).await.unwrap(), 1);
        read.replace_data(r#"{"k":"v9"}"#).unwrap();

        assert_eq!(store.replace_data(&read).await.unwrap(), 0);
        assert!(store.find_by_id("portalA", &main_type(), &id).await.unwrap().is_none());
        assert_eq!(store.count(&main_type()).await, 0);
    }

    #[tokio::test]
    async fn replace_data_is_scoped_to_source() {
        let store = MemoryStorage::new();
        let stored = store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        let other = session("portalB", r#"{"k":"x"}"#).with_id(stored.id().unwrap()).unwrap();
        assert_eq!(store.replace_data(&other).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_data_rejects_checksum_of_other_row() {
        let store = MemoryStorage::new();
        store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        let mut other = store.upsert_session(&session("portalA", r#"{"k":"w"}"#)).await.unwrap();
        other.replace_data(r#"{"k":"v"}"#).unwrap();
        assert!(store.replace_data(&other).await.unwrap_err().is_duplicate());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let store = MemoryStorage::new();
        let first = session("portalA", r#"{"n":1}"#).with_id("custom").unwrap();
        let second = session("portalA", r#"{"n":2}"#).with_id("custom").unwrap();
        assert_eq!(store.insert_session(&first).await.unwrap().id(), Some("custom"));
        assert!(store.insert_session(&second).await.unwrap_err().is_duplicate());
    }

    #[tokio::test]
    async fn reads_on_unknown_collection_are_empty() {
        let store = MemoryStorage::new();
        let ty = main_type();
        assert!(store.find_by_id("portalA", &ty, "x").await.unwrap().is_none());
        assert!(store.list_by_source_and_type("portalA", &ty).await.unwrap().is_empty());
        assert_eq!(store.delete_by_id("portalA", &ty, "x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_preserves_insertion_order_and_source() {
        let store = MemoryStorage::new();
        for n in 0..3 {
            store.upsert_session(&session("portalA", &format!(r#"{{"n":{n}}}"#))).await.unwrap();
        }
        store.upsert_session(&session("portalB", r#"{"n":0}"#)).await.unwrap();

        let listed = store.list_by_source_and_type("portalA", &main_type()).await.unwrap();
        let ns: Vec<_> = listed.iter().map(|s| s.data()["n"].clone()).collect();
        assert_eq!(ns, vec![serde_json::json!(0), serde_json::json!(1), serde_json::json!(2)]);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_source() {
        let store = MemoryStorage::new();
        let stored = store.upsert_session(&session("portalA", r#"{"k":"v"}"#)).await.unwrap();
        let id = stored.id().unwrap();
        assert_eq!(store.delete_by_id("portalB", &main_type(), id).await.unwrap(), 0);
        assert_eq!(store.delete_by_id("portalA", &main_type(), id).await.unwrap(), 1);
        assert_eq!(store.delete_by_id("portalA", &main_type(), id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let store = MemoryStorage::new();
        store.ensure_collection(&main_type()).await.unwrap();
        store.ensure_collection(&main_type()).await.unwrap();
        assert_eq!(store.count(&main_type()).await, 0);
    }
}
