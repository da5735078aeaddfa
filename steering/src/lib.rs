// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The port-steering data-plane's service side: the authoritative rule
//! store, its pub/sub fan-out to agents, and the plugin facade that ties the
//! two together.

pub mod bus;
pub mod errors;
pub mod plugin;
pub mod store;
pub mod types;

pub use bus::{SteeringBus, SteeringEvent};
pub use errors::SteeringError;
pub use plugin::SteeringPlugin;
pub use store::SteeringStore;
pub use types::{
    FilterValue, ListFilters, NewSteeringRule, Page, SteeringRule, SteeringRuleId,
    SteeringRuleRecord, ETHERTYPE_IPV4, ETHERTYPE_IPV6, PROTO_TCP, PROTO_UDP,
};

#[cfg(test)]
mod tests {
    use super::*;
    use net_api::fakes::FakeNetworkApi;
    use net_api::{NetworkApi, NeutronPortId};
    use std::sync::Arc;

    async fn plugin_with_two_ports() -> (SteeringPlugin, NeutronPortId, NeutronPortId) {
        let net = Arc::new(FakeNetworkApi::new());
        let src = net.create_port("src", "net").await.unwrap().id;
        let dst = net.create_port("dst", "net").await.unwrap().id;
        let store = Arc::new(SteeringStore::new(net.clone()));
        let bus = Arc::new(SteeringBus::new());
        let plugin = SteeringPlugin::new(store, bus, net);
        (plugin, src, dst)
    }

    fn rule(src: NeutronPortId, dest: Option<NeutronPortId>) -> NewSteeringRule {
        NewSteeringRule {
            project_id: "default".into(),
            src_neutron_port: src,
            dest_neutron_port: dest,
            src_ip: None,
            dest_ip: None,
            src_port: None,
            dest_port: None,
            ethertype: None,
            protocol: None,
        }
    }

    #[tokio::test]
    async fn create_enriches_with_destination_mac() {
        let (plugin, src, dst) = plugin_with_two_ports().await;
        let record = plugin.create(rule(src, Some(dst))).await.unwrap();
        assert!(record.overwrite_mac.is_some());
    }

    #[tokio::test]
    async fn bare_port_rule_has_no_overwrite_mac() {
        let (plugin, src, _dst) = plugin_with_two_ports().await;
        let record = plugin.create(rule(src, None)).await.unwrap();
        assert!(record.overwrite_mac.is_none());
    }

    #[tokio::test]
    async fn create_publishes_to_subscribers() {
        let (plugin, src, dst) = plugin_with_two_ports().await;
        let mut rx = plugin.subscribe();
        let record = plugin.create(rule(src, Some(dst))).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event, SteeringEvent::Create(record));
    }

    #[tokio::test]
    async fn delete_publishes_to_subscribers() {
        let (plugin, src, _dst) = plugin_with_two_ports().await;
        let record = plugin.create(rule(src, None)).await.unwrap();
        let mut rx = plugin.subscribe();
        plugin.delete(&record.rule.id).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event, SteeringEvent::Delete(record));
    }

    #[tokio::test]
    async fn get_port_steering_returns_rules_for_requested_ports() {
        let (plugin, src, dst) = plugin_with_two_ports().await;
        plugin.create(rule(src.clone(), Some(dst))).await.unwrap();
        let results = plugin.get_port_steering(&[src]).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn on_port_deleted_cascades_and_publishes_delete() {
        let (plugin, src, dst) = plugin_with_two_ports().await;
        let record = plugin.create(rule(src, Some(dst.clone()))).await.unwrap();
        let mut rx = plugin.subscribe();
        plugin.on_port_deleted(&dst).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event, SteeringEvent::Delete(record));
        assert!(plugin.get(&record.rule.id).await.is_err());
    }
}
