//! SessionRepository implementation for PgStorage.

use super::*;

use crate::error::StorageError;
use crate::filter::FieldFilter;
use crate::traits::SessionRepository;
use async_trait::async_trait;
use uuid::Uuid;

/// Reading from a collection that was never written is not an error.
fn or_missing<T>(result: Result<T, sqlx::Error>, missing: T) -> Result<T, sqlx::Error> {
    match result {
        Err(err) if is_undefined_table(&err) => Ok(missing),
        other => other,
    }
}

impl PgStorage {
    async fn insert_row(&self, id: &str, session: &Session) -> Result<(), StorageError> {
        let table = table_name(session.session_type());
        sqlx::query(&format!(
            "INSERT INTO {table} ({SESSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(id)
        .bind(session.source())
        .bind(session.session_type().as_str())
        .bind(session.checksum())
        .bind(session.data())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PgStorage {
    async fn ensure_collection(&self, session_type: &SessionType) -> Result<(), StorageError> {
        self.provision(session_type).await
    }

    async fn upsert_session(&self, session: &Session) -> Result<Session, StorageError> {
        self.provision(session.session_type()).await?;
        let Some(id) = session.id() else {
            let id = Uuid::new_v4().to_string();
            self.insert_row(&id, session).await?;
            let mut stored = session.clone();
            stored.assign_id(id);
            return Ok(stored);
        };

        let table = table_name(session.session_type());
        let updated = sqlx::query(&format!(
            "INSERT INTO {table} ({SESSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET
               checksum = EXCLUDED.checksum,
               data = EXCLUDED.data,
               updated_at = NOW()
             WHERE {table}.source = EXCLUDED.source AND {table}.type = EXCLUDED.type
             RETURNING id"
        ))
        .bind(id)
        .bind(session.source())
        .bind(session.session_type().as_str())
        .bind(session.checksum())
        .bind(session.data())
        .fetch_optional(&self.pool)
        .await?;
        if updated.is_none() {
            // The id exists under another source; never move rows between owners.
            return Err(StorageError::Duplicate(format!(
                "{}_pkey: id '{id}' already taken",
                session.session_type()
            )));
        }
        Ok(session.clone())
    }

    async fn insert_session(&self, session: &Session) -> Result<Session, StorageError> {
        self.provision(session.session_type()).await?;
        let id = session.id().map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
        self.insert_row(&id, session).await?;
        let mut stored = session.clone();
        stored.assign_id(id);
        Ok(stored)
    }

    async fn replace_data(&self, session: &Session) -> Result<u64, StorageError> {
        let Some(id) = session.id() else {
            return Ok(0);
        };
        let table = table_name(session.session_type());
        let result = sqlx::query(&format!(
            "UPDATE {table}
             SET checksum = $4, data = $5, updated_at = NOW()
             WHERE source = $1 AND type = $2 AND id = $3"
        ))
        .bind(session.source())
        .bind(session.session_type().as_str())
        .bind(id)
        .bind(session.checksum())
        .bind(session.data())
        .execute(&self.pool)
        .await;
        Ok(or_missing(result.map(|r| r.rows_affected()), 0)?)
    }

    async fn find_by_checksum(
        &self,
        source: &str,
        session_type: &SessionType,
        checksum: &str,
    ) -> Result<Option<Session>, StorageError> {
        let table = table_name(session_type);
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM {table}
             WHERE source = $1 AND type = $2 AND checksum = $3"
        ))
        .bind(source)
        .bind(session_type.as_str())
        .bind(checksum)
        .fetch_optional(&self.pool)
        .await;
        or_missing(row, None)?.map(|r| row_to_session(&r, session_type)).transpose()
    }

    async fn find_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<Option<Session>, StorageError> {
        let table = table_name(session_type);
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM {table}
             WHERE source = $1 AND type = $2 AND id = $3"
        ))
        .bind(source)
        .bind(session_type.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        or_missing(row, None)?.map(|r| row_to_session(&r, session_type)).transpose()
    }

    async fn list_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
    ) -> Result<Vec<Session>, StorageError> {
        let table = table_name(session_type);
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM {table}
             WHERE source = $1 AND type = $2
             ORDER BY seq"
        ))
        .bind(source)
        .bind(session_type.as_str())
        .fetch_all(&self.pool)
        .await;
        or_missing(rows, Vec::new())?.iter().map(|r| row_to_session(r, session_type)).collect()
    }

    async fn query_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
        field: &str,
        value: &str,
    ) -> Result<Vec<Session>, StorageError> {
        let filter = FieldFilter::parse(field, value)?;
        tracing::debug!(
            source,
            session_type = %session_type,
            field,
            "querying sessions by field"
        );
        let table = table_name(session_type);
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM {table}
             WHERE source = $1 AND type = $2
               AND (
                 data #> $3::text[] = $4::jsonb
                 OR EXISTS (
                   SELECT 1 FROM jsonb_array_elements(
                     CASE WHEN jsonb_typeof(data #> $3::text[]) = 'array'
                          THEN data #> $3::text[]
                          ELSE '[]'::jsonb END
                   ) AS element(value)
                   WHERE element.value = $4::jsonb
                 )
               )
             ORDER BY seq"
        ))
        .bind(source)
        .bind(session_type.as_str())
        .bind(filter.path())
        .bind(filter.value())
        .fetch_all(&self.pool)
        .await;
        match rows {
            Ok(rows) => rows.iter().map(|r| row_to_session(r, session_type)).collect(),
            Err(err) if is_undefined_table(&err) => Ok(Vec::new()),
            Err(err) => Err(StorageError::from_query(err)),
        }
    }

    async fn delete_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<u64, StorageError> {
        let table = table_name(session_type);
        let result = sqlx::query(&format!(
            "DELETE FROM {table} WHERE source = $1 AND type = $2 AND id = $3"
        ))
        .bind(source)
        .bind(session_type.as_str())
        .bind(id)
        .execute(&self.pool)
        .await;
        Ok(or_missing(result.map(|r| r.rows_affected()), 0)?)
    }
}
