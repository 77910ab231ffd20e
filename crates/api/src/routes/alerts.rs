//! Alert Routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiError, AppState};
use alert_engine::GenerationSummary;
use storage::{AlertStatus, ClinicalAlert};

/// Query parameters for the alerts listing
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Filter by patient
    pub patient_id: Option<Uuid>,
    /// Filter by lifecycle status
    pub status: Option<AlertStatus>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for the alerts listing
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<ClinicalAlert>,
    pub count: usize,
    pub active_count: usize,
}

/// Request body for resolving an alert
#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    pub notes: Option<String>,
}

/// List alerts, newest first
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<AlertResponse>, ApiError> {
    let limit = params.limit.min(500);
    let data = state
        .repository
        .list_alerts(params.patient_id, params.status, limit)?;
    let active_count = data
        .iter()
        .filter(|a| a.status == AlertStatus::Active)
        .count();
    Ok(Json(AlertResponse {
        count: data.len(),
        active_count,
        data,
    }))
}

/// Trigger one rule-engine pass over the active patient population
pub async fn generate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenerationSummary>, ApiError> {
    Ok(Json(state.alert_engine.generate()?))
}

/// active → acknowledged
pub async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClinicalAlert>, ApiError> {
    Ok(Json(state.alert_lifecycle.acknowledge(id)?))
}

/// {active, acknowledged} → resolved
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ResolveRequest>>,
) -> Result<Json<ClinicalAlert>, ApiError> {
    let notes = payload.and_then(|Json(p)| p.notes);
    Ok(Json(state.alert_lifecycle.resolve(id, notes.as_deref())?))
}

/// active → dismissed
pub async fn dismiss(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClinicalAlert>, ApiError> {
    Ok(Json(state.alert_lifecycle.dismiss(id)?))
}
