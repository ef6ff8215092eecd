use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use portal_sessions_core::Session;

use crate::AppState;
use crate::api_error::ApiError;
use crate::query_types::{FieldQuery, NewSessionQuery};
use crate::response_types::{DeleteResponse, SessionIdResponse};

/// The store always assigns an id on write; an empty one would mean a
/// backend broke that contract.
fn stored_id(session: &Session) -> Result<SessionIdResponse, ApiError> {
    session
        .id()
        .map(|id| SessionIdResponse { id: id.to_owned() })
        .ok_or_else(|| ApiError::Internal("stored session has no id".to_owned()))
}

pub async fn add_session(
    State(state): State<Arc<AppState>>,
    Path((source, session_type)): Path<(String, String)>,
    body: String,
) -> Result<Json<SessionIdResponse>, ApiError> {
    let session = state.session_service.add_session(&source, &session_type, &body).await?;
    Ok(Json(stored_id(&session)?))
}

pub async fn create_new_session(
    State(state): State<Arc<AppState>>,
    Path((source, session_type)): Path<(String, String)>,
    query: Result<Query<NewSessionQuery>, QueryRejection>,
    body: String,
) -> Result<(StatusCode, Json<SessionIdResponse>), ApiError> {
    let Query(query) = query?;
    let session = state
        .session_service
        .create_new_session(query.id.as_deref(), &source, &session_type, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(stored_id(&session)?)))
}

pub async fn get_sessions(
    State(state): State<Arc<AppState>>,
    Path((source, session_type)): Path<(String, String)>,
) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.session_service.get_sessions(&source, &session_type).await?))
}

pub async fn query_sessions(
    State(state): State<Arc<AppState>>,
    Path((source, session_type)): Path<(String, String)>,
    query: Result<Query<FieldQuery>, QueryRejection>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let Query(query) = query?;
    let sessions = state
        .session_service
        .get_sessions_by_query(&source, &session_type, &query.field, &query.value)
        .await?;
    Ok(Json(sessions))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path((source, session_type, id)): Path<(String, String, String)>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.session_service.get_session(&source, &session_type, &id).await?))
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path((source, session_type, id)): Path<(String, String, String)>,
    body: String,
) -> Result<Json<Session>, ApiError> {
    let session =
        state.session_service.update_session(&source, &session_type, &id, &body).await?;
    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path((source, session_type, id)): Path<(String, String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.session_service.delete_session(&source, &session_type, &id).await?;
    Ok(Json(DeleteResponse { deleted: true, id }))
}
