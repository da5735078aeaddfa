// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! [`PortDirectory`] is the read-only view of port existence and MAC
//! addresses that `SteeringStore` and `SteeringPlugin` need for FK checks and
//! `overwrite_mac` enrichment, without depending on the full `NetworkApi`
//! surface.

use async_trait::async_trait;
use std::sync::Arc;

use crate::network_api::NetworkApi;
use crate::types::NeutronPortId;

#[async_trait]
pub trait PortDirectory: Send + Sync + 'static {
    /// Whether the given port currently exists on the fabric.
    async fn exists(&self, port_id: &NeutronPortId) -> bool;

    /// The port's MAC address, if it exists.
    async fn mac_address(&self, port_id: &NeutronPortId) -> Option<String>;
}

/// Adapts a live [`NetworkApi`] client into a [`PortDirectory`].
pub struct NetworkApiPortDirectory<N> {
    net: Arc<N>,
}

impl<N> NetworkApiPortDirectory<N> {
    pub fn new(net: Arc<N>) -> Self {
        NetworkApiPortDirectory { net }
    }
}

#[async_trait]
impl<N: NetworkApi> PortDirectory for NetworkApiPortDirectory<N> {
    async fn exists(&self, port_id: &NeutronPortId) -> bool {
        self.net.get_port(port_id).await.is_ok()
    }

    async fn mac_address(&self, port_id: &NeutronPortId) -> Option<String> {
        self.net.get_port(port_id).await.ok().map(|p| p.mac_address)
    }
}
