// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Service facade over [`SteeringStore`]: enriches mutations with the
//! destination MAC and publishes them via [`SteeringBus`].

use std::sync::Arc;

use net_api::{NeutronPortId, PortDirectory};

use crate::bus::SteeringBus;
use crate::errors::SteeringError;
use crate::store::SteeringStore;
use crate::types::{ListFilters, NewSteeringRule, Page, SteeringRule, SteeringRuleId, SteeringRuleRecord};

pub struct SteeringPlugin {
    store: Arc<SteeringStore>,
    bus: Arc<SteeringBus>,
    ports: Arc<dyn PortDirectory>,
}

impl SteeringPlugin {
    pub fn new(store: Arc<SteeringStore>, bus: Arc<SteeringBus>, ports: Arc<dyn PortDirectory>) -> Self {
        SteeringPlugin { store, bus, ports }
    }

    /// Subscribes to rule create/delete notifications, as an agent does on
    /// startup.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::bus::SteeringEvent> {
        self.bus.subscribe()
    }

    pub async fn create(&self, fields: NewSteeringRule) -> Result<SteeringRuleRecord, SteeringError> {
        let rule = self.store.create(fields).await?;
        let record = self.enrich(rule).await;
        self.bus.publish_create(record.clone());
        Ok(record)
    }

    pub async fn create_many(
        &self,
        fields: Vec<NewSteeringRule>,
    ) -> Result<Vec<SteeringRuleRecord>, SteeringError> {
        let mut created = Vec::with_capacity(fields.len());
        for f in fields {
            created.push(self.create(f).await?);
        }
        Ok(created)
    }

    pub async fn delete(&self, id: &SteeringRuleId) -> Result<(), SteeringError> {
        let rule = self.store.delete(id).await?;
        let record = self.enrich(rule).await;
        self.bus.publish_delete(record);
        Ok(())
    }

    pub async fn get(&self, id: &SteeringRuleId) -> Result<SteeringRuleRecord, SteeringError> {
        let rule = self.store.get(id).await?;
        Ok(self.enrich(rule).await)
    }

    pub async fn list(&self, filters: &ListFilters, page: &Page) -> Vec<SteeringRuleRecord> {
        let mut records = Vec::new();
        for rule in self.store.list(filters, page).await {
            records.push(self.enrich(rule).await);
        }
        records
    }

    /// Request/response RPC used by an agent bringing up a port: every rule
    /// whose `src_neutron_port` is in `ports`, enriched with `overwrite_mac`.
    pub async fn get_port_steering(&self, ports: &[NeutronPortId]) -> Vec<SteeringRuleRecord> {
        let mut records = Vec::new();
        for port in ports {
            let filters = ListFilters {
                src_neutron_port: Some(crate::types::FilterValue::Value(port.clone())),
                ..Default::default()
            };
            records.extend(self.list(&filters, &Page::default()).await);
        }
        records
    }

    /// Cascades a fabric port deletion to dependent rules, publishing a
    /// delete notification for each. Called by the orchestrator on
    /// `NetworkApi::delete_port`, since the fabric does not itself notify
    /// agents of destination-port removal.
    pub async fn on_port_deleted(&self, port_id: &NeutronPortId) {
        for rule in self.store.cascade_delete_by_port(port_id).await {
            let record = self.enrich(rule).await;
            self.bus.publish_delete(record);
        }
    }

    async fn enrich(&self, rule: SteeringRule) -> SteeringRuleRecord {
        let overwrite_mac = match &rule.dest_neutron_port {
            Some(port) => self.ports.mac_address(port).await,
            None => None,
        };
        SteeringRuleRecord { rule, overwrite_mac }
    }
}
