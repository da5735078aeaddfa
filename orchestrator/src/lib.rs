// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The PVN orchestrator: validates chain descriptions, drives concurrent
//! resource provisioning with fan-out and join, and tears down partially or
//! fully provisioned PVNs.

pub mod driver;
pub mod errors;
pub mod gateway;
pub mod model;
pub mod validator;

pub use driver::PvnOrchestrator;
pub use errors::OrchestratorError;
pub use gateway::GatewaySeeder;
pub use model::{ModelError, PvnId, PvnModel, PvnRecord, PvnStatus};
pub use validator::{Description, RawDescription, ValidationError};
