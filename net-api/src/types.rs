// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Wire-adjacent types shared by the [`NetworkApi`](crate::NetworkApi) and
//! [`ContainerApi`](crate::ContainerApi) client surfaces.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Opaque SDN port identifier, as handed back by the network fabric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeutronPortId(pub String);

impl fmt::Display for NeutronPortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NeutronPortId {
    fn from(value: String) -> Self {
        NeutronPortId(value)
    }
}

/// Opaque container identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub String);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A port as returned by the network fabric on creation or lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    pub id: NeutronPortId,
    pub mac_address: String,
    /// Fixed IPs assigned to the port; the primary address is `fixed_ips[0]`.
    pub fixed_ips: Vec<FixedIp>,
}

impl PortInfo {
    /// The primary fixed IP of the port, mirroring `fixed_ips[0]["ip_address"]`
    /// in the upstream driver. Multiple-fixed-IP ports beyond the primary are
    /// out of scope.
    pub fn primary_ip(&self) -> Option<IpAddr> {
        self.fixed_ips.first().map(|f| f.ip_address)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedIp {
    pub ip_address: IpAddr,
}

/// Lifecycle status reported by the container backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Creating,
    Created,
    Running,
    Exited,
    Dead,
}

impl ContainerStatus {
    /// `run()` polling treats any status other than `creating`/`created` as
    /// having left the startup window, successfully or not.
    pub fn has_left_startup(self) -> bool {
        !matches!(self, ContainerStatus::Creating | ContainerStatus::Created)
    }
}

/// A single application entry in a submitted PVN description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    pub image: String,
    #[serde(default)]
    pub args: Vec<String>,
}
