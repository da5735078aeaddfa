// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Maps library errors onto plain-text HTTP responses: 400/404 bodies are
//! `to_string()`, not a JSON error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orchestrator::{ModelError, OrchestratorError};

pub enum ApiError {
    Orchestrator(OrchestratorError),
    Model(ModelError),
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        ApiError::Orchestrator(e)
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::Model(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Orchestrator(e) => (orchestrator_status(e), e.to_string()),
            ApiError::Model(e) => (model_status(e), e.to_string()),
        };
        (status, message).into_response()
    }
}

fn orchestrator_status(e: &OrchestratorError) -> StatusCode {
    match e {
        OrchestratorError::Validation(_) | OrchestratorError::DuplicateClient => StatusCode::BAD_REQUEST,
        OrchestratorError::NotFound => StatusCode::NOT_FOUND,
        OrchestratorError::InvalidState(_)
        | OrchestratorError::NetApi(_)
        | OrchestratorError::Steering(_)
        | OrchestratorError::ContainerStartTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn model_status(e: &ModelError) -> StatusCode {
    match e {
        ModelError::NotFound(_) => StatusCode::NOT_FOUND,
        ModelError::DuplicateClient => StatusCode::BAD_REQUEST,
        ModelError::InvalidState { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
