//! Session Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiError, AppState};
use session_lifecycle::{IncidentDraft, ScheduleRequest};
use storage::{Session, SessionIncident, SessionPhase, SessionRecord, Vitals};

/// Request body for starting a session
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub machine_id: Option<Uuid>,
}

/// Request body for cancelling a session
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// Request body for appending a vitals record
#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub phase: SessionPhase,
    #[serde(flatten)]
    pub vitals: Vitals,
}

/// Response for the records listing
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub data: Vec<SessionRecord>,
    pub count: usize,
}

/// Schedule a new session
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state.sessions.schedule(request)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Fetch a session
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.repository.get_session(id)?))
}

/// scheduled → checked_in
pub async fn check_in(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.check_in(id)?))
}

/// checked_in → in_progress; body may carry the machine to bind
pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<StartRequest>>,
) -> Result<Json<Session>, ApiError> {
    let machine_id = payload.and_then(|Json(p)| p.machine_id);
    Ok(Json(state.sessions.start(id, machine_id)?))
}

/// in_progress → completed
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.complete(id)?))
}

/// {scheduled, checked_in} → cancelled
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.cancel(id, &request.reason)?))
}

/// scheduled → no_show (called by the external timeout scheduler)
pub async fn no_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.sessions.mark_no_show(id)?))
}

/// Append a phase-tagged vitals record to an in-progress session
pub async fn add_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordRequest>,
) -> Result<(StatusCode, Json<SessionRecord>), ApiError> {
    let record = state.sessions.add_record(id, request.phase, request.vitals)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List a session's vitals records
pub async fn get_records(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecordsResponse>, ApiError> {
    // 404 for unknown sessions rather than an empty list
    state.repository.get_session(id)?;
    let data = state.repository.records_for_session(id)?;
    Ok(Json(RecordsResponse {
        count: data.len(),
        data,
    }))
}

/// Report an adverse event on an in-progress session
pub async fn add_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(draft): Json<IncidentDraft>,
) -> Result<(StatusCode, Json<SessionIncident>), ApiError> {
    let incident = state.sessions.add_incident(id, draft)?;
    Ok((StatusCode::CREATED, Json(incident)))
}
