// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

use crate::types::{ContainerId, NeutronPortId};

#[derive(Debug, Error)]
pub enum NetApiError {
    #[error("error parsing url: {0}")]
    Url(#[from] url::ParseError),
    #[error("error making http request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("port {0} not found")]
    PortNotFound(NeutronPortId),
    #[error("container {0} not found")]
    ContainerNotFound(ContainerId),
    #[error("container {0} did not leave the creating state within the poll budget")]
    ContainerStartTimeout(ContainerId),
}
