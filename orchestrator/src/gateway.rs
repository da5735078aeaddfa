// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! On startup, ensures a permissive steering rule (a DROP marker) exists for
//! the well-known ingress and egress gateway ports. Must run — and finish —
//! before the HTTP listener starts accepting connections, so no PVN can be
//! created before the gateway markers exist.

use std::sync::Arc;

use config::PvnConfig;
use net_api::NeutronPortId;
use steering::{FilterValue, ListFilters, NewSteeringRule, Page, SteeringError, SteeringPlugin};

pub struct GatewaySeeder {
    steering: Arc<SteeringPlugin>,
    config: Arc<PvnConfig>,
}

impl GatewaySeeder {
    pub fn new(steering: Arc<SteeringPlugin>, config: Arc<PvnConfig>) -> Self {
        GatewaySeeder { steering, config }
    }

    pub async fn seed(&self) -> Result<(), SteeringError> {
        self.ensure_drop_marker(NeutronPortId(self.config.network.ingress_port.clone())).await?;
        self.ensure_drop_marker(NeutronPortId(self.config.network.egress_port.clone())).await?;
        Ok(())
    }

    async fn ensure_drop_marker(&self, port: NeutronPortId) -> Result<(), SteeringError> {
        let filters = ListFilters {
            src_neutron_port: Some(FilterValue::Value(port.clone())),
            dest_neutron_port: Some(FilterValue::IsNull),
            ..Default::default()
        };
        let existing = self.steering.list(&filters, &Page::default()).await;
        if !existing.is_empty() {
            tracing::debug!(%port, "gateway DROP marker already present");
            return Ok(());
        }
        tracing::info!(%port, "seeding gateway DROP marker");
        self.steering
            .create(NewSteeringRule {
                project_id: self.config.project_id.clone(),
                src_neutron_port: port,
                dest_neutron_port: None,
                src_ip: None,
                dest_ip: None,
                src_port: None,
                dest_port: None,
                ethertype: None,
                protocol: None,
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_api::fakes::FakeNetworkApi;
    use steering::{SteeringBus, SteeringStore};

    async fn test_config(net: &FakeNetworkApi, ingress: &str, egress: &str) -> Arc<PvnConfig> {
        net.register_port(ingress);
        net.register_port(egress);
        Arc::new(PvnConfig {
            api: config::ApiConfig {
                host_ip: "0.0.0.0".parse().unwrap(),
                port: 8080,
            },
            network: config::NetworkConfig {
                id: "net".into(),
                ingress_port: ingress.into(),
                egress_port: egress.into(),
            },
            credentials: Default::default(),
            project_id: "default".into(),
        })
    }

    #[tokio::test]
    async fn seed_creates_markers_once() {
        let net = Arc::new(FakeNetworkApi::new());
        let cfg = test_config(&net, "ingress", "egress").await;
        let store = Arc::new(SteeringStore::new(net.clone()));
        let bus = Arc::new(SteeringBus::new());
        let plugin = Arc::new(SteeringPlugin::new(store, bus, net));
        let seeder = GatewaySeeder::new(plugin.clone(), cfg.clone());

        seeder.seed().await.unwrap();
        let filters = ListFilters {
            src_neutron_port: Some(FilterValue::Value(NeutronPortId("ingress".into()))),
            dest_neutron_port: Some(FilterValue::IsNull),
            ..Default::default()
        };
        assert_eq!(plugin.list(&filters, &Page::default()).await.len(), 1);

        // re-seeding is a no-op, not a duplicate
        seeder.seed().await.unwrap();
        assert_eq!(plugin.list(&filters, &Page::default()).await.len(), 1);
    }
}
