// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("flow install failed: {0}")]
    Install(String),
    #[error("flow uninstall failed: {0}")]
    Uninstall(String),
}
