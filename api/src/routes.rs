// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The `/v1/pvn` HTTP surface: thin handlers over [`PvnOrchestrator`] and
//! [`PvnModel`], preserving the plain-text request/response shapes of the
//! system this daemon replaces rather than "improving" them into a JSON
//! envelope.

use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use orchestrator::{PvnId, PvnModel, PvnOrchestrator, PvnRecord, RawDescription};
use serde::Deserialize;

use crate::errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PvnOrchestrator>,
    pub model: Arc<PvnModel>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/pvn", post(create_pvn))
        .route("/v1/pvn/{id}", get(get_pvn))
        .route("/v1/pvn/{id}", delete(delete_pvn))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreatePvnRequest {
    client_ip: IpAddr,
    pvn: RawDescription,
}

/// `POST /v1/pvn`: 200 body is the decimal PVN id as plain text, not JSON.
async fn create_pvn(
    State(state): State<AppState>,
    Json(req): Json<CreatePvnRequest>,
) -> Result<String, ApiError> {
    let id = state.orchestrator.initialize(req.client_ip, req.pvn).await?;
    Ok(id.to_string())
}

async fn get_pvn(
    State(state): State<AppState>,
    Path(id): Path<PvnId>,
) -> Result<Json<PvnRecord>, ApiError> {
    let record = state.model.get(id).await?;
    Ok(Json(record))
}

/// `DELETE /v1/pvn/{id}`: 200 with an empty body unconditionally, matching
/// `delete_pvn.py`'s tolerance of a PVN that is already gone.
async fn delete_pvn(State(state): State<AppState>, Path(id): Path<PvnId>) -> StatusCode {
    state.orchestrator.teardown(id, false).await;
    StatusCode::OK
}
