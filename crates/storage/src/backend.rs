//! Unified storage backend with enum dispatch.

use async_trait::async_trait;
use portal_sessions_core::{Session, SessionType};

use crate::error::StorageError;
use crate::memory::MemoryStorage;
use crate::pg_storage::{PgStorage, PoolSettings};
use crate::traits::SessionRepository;

macro_rules! dispatch {
    ($self:expr, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            StorageBackend::Postgres(s) => <PgStorage as SessionRepository>::$method(s, $($arg),*).await,
            StorageBackend::Memory(s) => <MemoryStorage as SessionRepository>::$method(s, $($arg),*).await,
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    Postgres(PgStorage),
    Memory(MemoryStorage),
}

impl StorageBackend {
    pub async fn new_postgres(
        database_url: &str,
        settings: PoolSettings,
    ) -> Result<Self, StorageError> {
        Ok(Self::Postgres(PgStorage::new(database_url, settings).await?))
    }

    pub fn new_memory() -> Self {
        Self::Memory(MemoryStorage::new())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl SessionRepository for StorageBackend {
    async fn ensure_collection(&self, session_type: &SessionType) -> Result<(), StorageError> {
        dispatch!(self, ensure_collection(session_type))
    }

    async fn upsert_session(&self, session: &Session) -> Result<Session, StorageError> {
        dispatch!(self, upsert_session(session))
    }

    async fn insert_session(&self, session: &Session) -> Result<Session, StorageError> {
        dispatch!(self, insert_session(session))
    }

    async fn replace_data(&self, session: &Session) -> Result<u64, StorageError> {
        dispatch!(self, replace_data(session))
    }

    async fn find_by_checksum(
        &self,
        source: &str,
        session_type: &SessionType,
        checksum: &str,
    ) -> Result<Option<Session>, StorageError> {
        dispatch!(self, find_by_checksum(source, session_type, checksum))
    }

    async fn find_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<Option<Session>, StorageError> {
        dispatch!(self, find_by_id(source, session_type, id))
    }

    async fn list_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
    ) -> Result<Vec<Session>, StorageError> {
        dispatch!(self, list_by_source_and_type(source, session_type))
    }

    async fn query_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
        field: &str,
        value: &str,
    ) -> Result<Vec<Session>, StorageError> {
        dispatch!(self, query_by_source_and_type(source, session_type, field, value))
    }

    async fn delete_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<u64, StorageError> {
        dispatch!(self, delete_by_id(source, session_type, id))
    }
}
