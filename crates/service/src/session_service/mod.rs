//! Write-with-dedup state machine over the session repository.
//!
//! `add_session` is get-or-create: a write that loses the unique
//! `(source, type, checksum)` race is resolved by one compensating read of the
//! winner. `create_new_session` is strict and reports the same conflict as
//! `SessionAlreadyExists`. Nothing else is retried.

use std::sync::Arc;

use portal_sessions_core::{Session, SessionType, SessionTypes, validate_source};
use portal_sessions_storage::{SessionRepository, StorageBackend, StorageError};

use crate::ServiceError;


pub struct SessionService {
    storage: Arc<StorageBackend>,
    types: SessionTypes,
}

impl SessionService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>, types: SessionTypes) -> Self {
        Self { storage, types }
    }

    #[must_use]
    pub const fn types(&self) -> &SessionTypes {
        &self.types
    }

    /// Validate the `(source, type)` pair addressed by a read or delete.
    fn target(&self, source: &str, session_type: &str) -> Result<SessionType, ServiceError> {
        validate_source(source)?;
        Ok(self.types.parse(session_type)?)
    }

    /// Store a payload, or return the session already holding the same
    /// content under this source and type.
    pub async fn add_session(
        &self,
        source: &str,
        session_type: &str,
        raw_data: &str,
    ) -> Result<Session, ServiceError> {
        let session = Session::new(source, session_type, raw_data, &self.types)?;
        match self.storage.upsert_session(&session).await {
            Ok(stored) => {
                tracing::debug!(
                    source,
                    session_type = %session.session_type(),
                    id = stored.id().unwrap_or_default(),
                    "session stored"
                );
                Ok(stored)
            },
            Err(err) if err.is_duplicate() => {
                tracing::warn!(
                    source,
                    session_type = %session.session_type(),
                    checksum = session.checksum(),
                    "duplicate payload, returning existing session"
                );
                self.storage
                    .find_by_checksum(source, session.session_type(), session.checksum())
                    .await?
                    .ok_or_else(|| {
                        ServiceError::SessionInvalid(
                            "conflicting session was removed before it could be read".to_owned(),
                        )
                    })
            },
            Err(err) => Err(ServiceError::from_write(err)),
        }
    }

    /// Strict create: an existing `id` or identical payload is an error.
    pub async fn create_new_session(
        &self,
        id: Option<&str>,
        source: &str,
        session_type: &str,
        raw_data: &str,
    ) -> Result<Session, ServiceError> {
        let mut session = Session::new(source, session_type, raw_data, &self.types)?;
        if let Some(id) = id {
            session = session.with_id(id)?;
        }
        match self.storage.insert_session(&session).await {
            Ok(stored) => {
                tracing::debug!(
                    source,
                    session_type = %session.session_type(),
                    id = stored.id().unwrap_or_default(),
                    "session created"
                );
                Ok(stored)
            },
            Err(StorageError::Duplicate(detail)) => Err(ServiceError::SessionAlreadyExists(detail)),
            Err(err) => Err(ServiceError::from_write(err)),
        }
    }

    pub async fn get_sessions(
        &self,
        source: &str,
        session_type: &str,
    ) -> Result<Vec<Session>, ServiceError> {
        let ty = self.target(source, session_type)?;
        Ok(self.storage.list_by_source_and_type(source, &ty).await?)
    }

    /// Sessions whose `data` holds `value` at the dot-separated `field` path.
    ///
    /// A well-formed filter that matches nothing yields an empty list.
    pub async fn get_sessions_by_query(
        &self,
        source: &str,
        session_type: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Session>, ServiceError> {
        let ty = self.target(source, session_type)?;
        Ok(self.storage.query_by_source_and_type(source, &ty, field, value).await?)
    }

    pub async fn get_session(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> Result<Session, ServiceError> {
        let ty = self.target(source, session_type)?;
        self.storage
            .find_by_id(source, &ty, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(source, session_type, id))
    }

    /// Replace the payload of an existing session.
    ///
    /// Does not deduplicate: landing on another session's content fails with
    /// `SessionInvalid` instead of merging the two.
    pub async fn update_session(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
        raw_data: &str,
    ) -> Result<Session, ServiceError> {
        let ty = self.target(source, session_type)?;
        let mut session = self
            .storage
            .find_by_id(source, &ty, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(source, session_type, id))?;
        session.replace_data(raw_data)?;
        let changed = self.storage.replace_data(&session).await.map_err(ServiceError::from_write)?;
        if changed == 0 {
            // Deleted between the read and the write.
            return Err(ServiceError::not_found(source, session_type, id));
        }
        tracing::debug!(source, session_type = %ty, id, "session updated");
        Ok(session)
    }

    pub async fn delete_session(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> Result<(), ServiceError> {
        let ty = self.target(source, session_type)?;
        match self.storage.delete_by_id(source, &ty, id).await? {
            0 => Err(ServiceError::not_found(source, session_type, id)),
            _ => {
                tracing::debug!(source, session_type = %ty, id, "session deleted");
                Ok(())
            },
        }
    }
}
