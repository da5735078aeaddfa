// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Authoritative in-process store of steering-rule records.

use std::collections::HashMap;
use std::sync::Arc;

use net_api::{NeutronPortId, PortDirectory};
use tokio::sync::RwLock;

use crate::errors::SteeringError;
use crate::types::{
    ListFilters, NewSteeringRule, Page, SteeringRule, SteeringRuleId, PROTO_TCP, PROTO_UDP,
};

/// In-memory store of steering rules, guarded by a single lock — reads take
/// it shared, writes take it exclusive. This is an intentional simplification
/// carried over from the system being replaced, which keeps PVN and steering
/// state in a process, not a database.
pub struct SteeringStore {
    rules: RwLock<HashMap<SteeringRuleId, SteeringRule>>,
    ports: Arc<dyn PortDirectory>,
}

impl SteeringStore {
    pub fn new(ports: Arc<dyn PortDirectory>) -> Self {
        SteeringStore {
            rules: RwLock::new(HashMap::new()),
            ports,
        }
    }

    pub async fn get(&self, id: &SteeringRuleId) -> Result<SteeringRule, SteeringError> {
        self.rules
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(SteeringError::NotFound(*id))
    }

    pub async fn list(&self, filters: &ListFilters, page: &Page) -> Vec<SteeringRule> {
        let rules = self.rules.read().await;
        let mut matched: Vec<SteeringRule> = rules
            .values()
            .filter(|r| filters.matches(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.as_raw().cmp(b.id.as_raw()));
        if page.page_reverse {
            matched.reverse();
        }
        if let Some(marker) = &page.marker {
            let start = matched.iter().position(|r| &r.id == marker).map(|i| i + 1).unwrap_or(0);
            matched = matched.split_off(start);
        }
        if let Some(limit) = page.limit {
            matched.truncate(limit);
        }
        matched
    }

    /// Validates cross-field invariants and referential integrity, then
    /// assigns a fresh id and inserts the rule.
    pub async fn create(&self, fields: NewSteeringRule) -> Result<SteeringRule, SteeringError> {
        Self::validate_fields(&fields)?;
        if !self.ports.exists(&fields.src_neutron_port).await {
            return Err(SteeringError::PortNotFound(fields.src_neutron_port));
        }
        if let Some(dest) = &fields.dest_neutron_port {
            if !self.ports.exists(dest).await {
                return Err(SteeringError::PortNotFound(dest.clone()));
            }
        }
        let rule = SteeringRule {
            id: SteeringRuleId::new(),
            project_id: fields.project_id,
            src_neutron_port: fields.src_neutron_port,
            dest_neutron_port: fields.dest_neutron_port,
            src_ip: fields.src_ip,
            dest_ip: fields.dest_ip,
            src_port: fields.src_port,
            dest_port: fields.dest_port,
            ethertype: fields.ethertype,
            protocol: fields.protocol,
        };
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(rule)
    }

    pub async fn delete(&self, id: &SteeringRuleId) -> Result<SteeringRule, SteeringError> {
        self.rules
            .write()
            .await
            .remove(id)
            .ok_or(SteeringError::NotFound(*id))
    }

    /// Removes every rule referencing `port_id` as either its source or
    /// destination port. The source side is a plain FK cascade; the
    /// destination side stands in for the pre-delete hook the original fabric
    /// needed because it never notifies agents of destination-port removal on
    /// its own.
    pub async fn cascade_delete_by_port(&self, port_id: &NeutronPortId) -> Vec<SteeringRule> {
        let mut rules = self.rules.write().await;
        let to_remove: Vec<SteeringRuleId> = rules
            .values()
            .filter(|r| &r.src_neutron_port == port_id || r.dest_neutron_port.as_ref() == Some(port_id))
            .map(|r| r.id)
            .collect();
        to_remove
            .into_iter()
            .filter_map(|id| rules.remove(&id))
            .collect()
    }

    fn validate_fields(fields: &NewSteeringRule) -> Result<(), SteeringError> {
        if (fields.src_ip.is_some() || fields.dest_ip.is_some()) && fields.ethertype.is_none() {
            return Err(SteeringError::MissingEthertype);
        }
        if fields.src_port.is_some() || fields.dest_port.is_some() {
            match fields.protocol {
                Some(PROTO_TCP) | Some(PROTO_UDP) => {}
                _ => return Err(SteeringError::MissingProtocol),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_api::fakes::FakeNetworkApi;
    use net_api::NetworkApi;
    use pretty_assertions::assert_eq;

    async fn store_with_port() -> (SteeringStore, NeutronPortId) {
        let net = Arc::new(FakeNetworkApi::new());
        let port = net.create_port("p0", "net").await.unwrap().id;
        (SteeringStore::new(net), port)
    }

    fn base_rule(src: NeutronPortId) -> NewSteeringRule {
        NewSteeringRule {
            project_id: "default".into(),
            src_neutron_port: src,
            dest_neutron_port: None,
            src_ip: None,
            dest_ip: None,
            src_port: None,
            dest_port: None,
            ethertype: None,
            protocol: None,
        }
    }

    #[tokio::test]
    async fn create_requires_existing_src_port() {
        let net = Arc::new(FakeNetworkApi::new());
        let store = SteeringStore::new(net);
        let err = store
            .create(base_rule(NeutronPortId("missing".into())))
            .await
            .unwrap_err();
        assert_eq!(err, SteeringError::PortNotFound(NeutronPortId("missing".into())));
    }

    #[tokio::test]
    async fn create_rejects_ip_without_ethertype() {
        let (store, port) = store_with_port().await;
        let mut fields = base_rule(port);
        fields.src_ip = Some("10.0.0.1".parse().unwrap());
        let err = store.create(fields).await.unwrap_err();
        assert_eq!(err, SteeringError::MissingEthertype);
    }

    #[tokio::test]
    async fn create_rejects_l4_port_without_protocol() {
        let (store, port) = store_with_port().await;
        let mut fields = base_rule(port);
        fields.src_port = Some(80);
        let err = store.create(fields).await.unwrap_err();
        assert_eq!(err, SteeringError::MissingProtocol);
    }

    #[tokio::test]
    async fn list_coerces_null_literal_filter() {
        let (store, port) = store_with_port().await;
        let rule = store.create(base_rule(port)).await.unwrap();
        let filters = ListFilters {
            dest_neutron_port: Some(crate::types::FilterValue::parse("None")),
            ..Default::default()
        };
        let results = store.list(&filters, &Page::default()).await;
        assert_eq!(results, vec![rule]);
    }

    #[tokio::test]
    async fn cascade_delete_removes_src_and_dest_references() {
        let net = Arc::new(FakeNetworkApi::new());
        let p0 = net.create_port("p0", "net").await.unwrap().id;
        let p1 = net.create_port("p1", "net").await.unwrap().id;
        let store = SteeringStore::new(net);
        let mut as_dest = base_rule(p0.clone());
        as_dest.dest_neutron_port = Some(p1.clone());
        let r1 = store.create(as_dest).await.unwrap();
        let r2 = store.create(base_rule(p1.clone())).await.unwrap();

        let removed = store.cascade_delete_by_port(&p1).await;
        assert_eq!(removed.len(), 2);
        assert!(store.get(&r1.id).await.is_err());
        assert!(store.get(&r2.id).await.is_err());
    }
}
