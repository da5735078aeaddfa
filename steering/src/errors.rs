// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use net_api::NeutronPortId;
use thiserror::Error;

use crate::types::SteeringRuleId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SteeringError {
    #[error("steering rule {0} not found")]
    NotFound(SteeringRuleId),
    #[error("port {0} not found")]
    PortNotFound(NeutronPortId),
    #[error("src_ip/dest_ip is set but ethertype is not")]
    MissingEthertype,
    #[error("src_port/dest_port is set but protocol is not tcp(6) or udp(17)")]
    MissingProtocol,
}
