//! Machine Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ApiError, AppState};
use storage::Machine;

/// Query parameters for the availability endpoint
#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    /// Restrict to isolation-only machines
    #[serde(default)]
    pub for_isolation: bool,
}

/// Response for the availability endpoint
#[derive(Debug, Serialize)]
pub struct MachineResponse {
    pub data: Vec<Machine>,
    pub count: usize,
}

/// Machines available for a session, in machine-number order
pub async fn available(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailableQuery>,
) -> Result<Json<MachineResponse>, ApiError> {
    let data = state.allocator.find_available(params.for_isolation)?;
    Ok(Json(MachineResponse {
        count: data.len(),
        data,
    }))
}
