// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The host-local half of the port-steering data plane: rule-to-match
//! expansion and the reconciler that keeps installed OpenFlow rules in sync
//! with what the plugin publishes.

pub mod errors;
pub mod flow_table;
pub mod manager;
pub mod matches;

pub use errors::AgentError;
pub use flow_table::{FlowAction, FlowMatch, FlowTable, InMemoryFlowTable, DROP_PRIORITY, STEERING_PRIORITY};
pub use manager::AgentFlowManager;
pub use matches::prepare_matches;

#[cfg(test)]
mod tests {
    use super::*;
    use id::Id;
    use net_api::NeutronPortId;
    use std::sync::Arc;
    use steering::{SteeringRule, SteeringRuleRecord};

    fn bare_drop_rule(src: &str) -> SteeringRuleRecord {
        SteeringRuleRecord {
            rule: SteeringRule {
                id: Id::new(),
                project_id: "default".into(),
                src_neutron_port: NeutronPortId(src.into()),
                dest_neutron_port: None,
                src_ip: None,
                dest_ip: None,
                src_port: None,
                dest_port: None,
                ethertype: None,
                protocol: None,
            },
            overwrite_mac: None,
        }
    }

    fn steering_rule(src: &str, mac: &str) -> SteeringRuleRecord {
        let mut r = bare_drop_rule(src);
        r.overwrite_mac = Some(mac.into());
        r
    }

    #[tokio::test]
    async fn handle_port_installs_all_fetched_rules() {
        let flows = Arc::new(InMemoryFlowTable::new());
        let manager = AgentFlowManager::new(flows.clone());
        let port = NeutronPortId("p0".into());
        let rules = vec![bare_drop_rule("p0"), steering_rule("p0", "fa:16:3e:00:00:01")];
        manager.handle_port(port.clone(), 5, rules).await.unwrap();
        // null ethertype expands each rule into two matches
        assert_eq!(flows.flow_count(), 4);
        assert_eq!(manager.tracked_rule_count(&port).await, 2);
    }

    #[tokio::test]
    async fn delete_port_uninstalls_everything_and_drops_tracking() {
        let flows = Arc::new(InMemoryFlowTable::new());
        let manager = AgentFlowManager::new(flows.clone());
        let port = NeutronPortId("p0".into());
        manager
            .handle_port(port.clone(), 5, vec![bare_drop_rule("p0")])
            .await
            .unwrap();
        manager.delete_port(&port).await.unwrap();
        assert_eq!(flows.flow_count(), 0);
        assert_eq!(manager.tracked_rule_count(&port).await, 0);
    }

    #[tokio::test]
    async fn update_then_delete_leaves_fewer_flows_than_update_alone() {
        let flows = Arc::new(InMemoryFlowTable::new());
        let manager = AgentFlowManager::new(flows.clone());
        let port = NeutronPortId("p0".into());
        manager.handle_port(port.clone(), 5, vec![]).await.unwrap();

        let rule = steering_rule("p0", "fa:16:3e:00:00:02");
        manager.update_port_steering(rule.clone()).await.unwrap();
        let after_update = flows.flow_count();
        assert!(after_update > 0);

        manager.delete_port_steering(&rule).await.unwrap();
        assert!(flows.flow_count() < after_update);
    }

    #[tokio::test]
    async fn repeated_update_with_same_body_is_idempotent() {
        let flows = Arc::new(InMemoryFlowTable::new());
        let manager = AgentFlowManager::new(flows.clone());
        let port = NeutronPortId("p0".into());
        manager.handle_port(port.clone(), 5, vec![]).await.unwrap();

        let rule = steering_rule("p0", "fa:16:3e:00:00:02");
        manager.update_port_steering(rule.clone()).await.unwrap();
        let after_first = flows.flow_count();
        manager.update_port_steering(rule.clone()).await.unwrap();
        assert_eq!(flows.flow_count(), after_first);
    }
}
