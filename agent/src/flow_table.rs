// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The integration-bridge OpenFlow surface. The switch and its rule
//! installer live outside this system's scope; `FlowTable` is the trait
//! boundary `AgentFlowManager` talks to, matching the original's `self.int_br`
//! bridge handle.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::AgentError;

/// Priority of an installed steering rule that rewrites the destination MAC.
pub const STEERING_PRIORITY: u16 = 100;
/// Priority of the bare-port default-deny rule.
pub const DROP_PRIORITY: u16 = 99;

/// Flow match fields, after ethertype/protocol expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowMatch {
    pub in_port: u32,
    pub eth_type: u16,
    pub ipv4_src: Option<Ipv4Addr>,
    pub ipv4_dst: Option<Ipv4Addr>,
    pub ipv6_src: Option<Ipv6Addr>,
    pub ipv6_dst: Option<Ipv6Addr>,
    pub tcp_src: Option<u16>,
    pub tcp_dst: Option<u16>,
    pub udp_src: Option<u16>,
    pub udp_dst: Option<u16>,
}

/// The action half of an installed flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowAction {
    /// Rewrite `eth_dst` to the given MAC and resubmit to `NORMAL`.
    SetDestMacAndNormal(String),
    /// Drop the packet.
    Drop,
}

#[async_trait]
pub trait FlowTable: Send + Sync + 'static {
    async fn install(
        &self,
        m: FlowMatch,
        action: FlowAction,
        priority: u16,
    ) -> Result<(), AgentError>;

    /// Uninstalls are strict: match and priority must both match the
    /// originally installed flow.
    async fn uninstall(&self, m: FlowMatch, priority: u16) -> Result<(), AgentError>;
}

/// In-memory flow table recording installed flows, for tests and for the
/// production stub's initial deployment target (an OVS integration bridge
/// RPC endpoint is out of scope for this system).
#[derive(Default)]
pub struct InMemoryFlowTable {
    flows: Mutex<Vec<(FlowMatch, FlowAction, u16)>>,
}

impl InMemoryFlowTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed_flows(&self) -> Vec<(FlowMatch, FlowAction, u16)> {
        self.flows.lock().unwrap().clone()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.lock().unwrap().len()
    }
}

#[async_trait]
impl FlowTable for InMemoryFlowTable {
    async fn install(
        &self,
        m: FlowMatch,
        action: FlowAction,
        priority: u16,
    ) -> Result<(), AgentError> {
        let mut flows = self.flows.lock().unwrap();
        if !flows.iter().any(|(fm, fa, p)| fm == &m && fa == &action && p == &priority) {
            flows.push((m, action, priority));
        }
        Ok(())
    }

    async fn uninstall(&self, m: FlowMatch, priority: u16) -> Result<(), AgentError> {
        let mut flows = self.flows.lock().unwrap();
        flows.retain(|(fm, _, p)| !(fm == &m && p == &priority));
        Ok(())
    }
}
