// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

use crate::model::ModelError;
use crate::validator::ValidationError;
use net_api::NetApiError;
use steering::SteeringError;

/// Top-level orchestrator error. `Validation` and `DuplicateClient` surface
/// as HTTP 400; everything else is an internal failure that triggers
/// compensating teardown.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a PVN for this source IP address already exists")]
    DuplicateClient,
    #[error("PVN not found")]
    NotFound,
    #[error(transparent)]
    InvalidState(#[from] ModelError),
    #[error("downstream network API call failed: {0}")]
    NetApi(#[from] NetApiError),
    #[error("downstream steering call failed: {0}")]
    Steering(#[from] SteeringError),
    #[error("container {0} did not leave the creating state in time")]
    ContainerStartTimeout(String),
}
