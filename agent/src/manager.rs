// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Host-local reconciler: keeps the egress-normal table in sync with the
//! rules the plugin hands out for ports on this host.

use std::collections::HashMap;
use std::sync::Arc;

use net_api::NeutronPortId;
use steering::{SteeringRuleId, SteeringRuleRecord};
use tokio::sync::Mutex;

use crate::errors::AgentError;
use crate::flow_table::{FlowAction, FlowTable, DROP_PRIORITY, STEERING_PRIORITY};
use crate::matches::prepare_matches;

struct PortState {
    rules: HashMap<SteeringRuleId, SteeringRuleRecord>,
    target_ofport: u32,
}

/// Per-agent state: `port_id -> { rule_id -> rule, target_ofport }`, and the
/// handle to the egress-table flow installer.
pub struct AgentFlowManager<F: FlowTable> {
    ports: Mutex<HashMap<NeutronPortId, PortState>>,
    flows: Arc<F>,
}

impl<F: FlowTable> AgentFlowManager<F> {
    pub fn new(flows: Arc<F>) -> Self {
        AgentFlowManager {
            ports: Mutex::new(HashMap::new()),
            flows,
        }
    }

    /// Called the first time the agent sees a port come up, with the rules
    /// already fetched via `SteeringPlugin::get_port_steering`.
    pub async fn handle_port(
        &self,
        port_id: NeutronPortId,
        ofport: u32,
        rules: Vec<SteeringRuleRecord>,
    ) -> Result<(), AgentError> {
        let mut ports = self.ports.lock().await;
        if ports.contains_key(&port_id) {
            // Re-tracking an already-handled port is a no-op, matching the
            // observed upstream behavior.
            return Ok(());
        }
        let mut state = PortState {
            rules: HashMap::new(),
            target_ofport: ofport,
        };
        for record in rules {
            self.install_record(&record, ofport).await?;
            state.rules.insert(record.rule.id, record);
        }
        ports.insert(port_id, state);
        Ok(())
    }

    /// Uninstalls every tracked rule for `port_id` and drops its entry.
    pub async fn delete_port(&self, port_id: &NeutronPortId) -> Result<(), AgentError> {
        let mut ports = self.ports.lock().await;
        if let Some(state) = ports.remove(port_id) {
            for record in state.rules.values() {
                self.uninstall_record(record, state.target_ofport).await?;
            }
        }
        Ok(())
    }

    /// `update_port_steering` notification: install the new rule, uninstalling
    /// any prior rule with the same id first.
    pub async fn update_port_steering(&self, record: SteeringRuleRecord) -> Result<(), AgentError> {
        let mut ports = self.ports.lock().await;
        let Some(state) = ports.get_mut(&record.rule.src_neutron_port) else {
            return Ok(());
        };
        let ofport = state.target_ofport;
        if let Some(prior) = state.rules.get(&record.rule.id).cloned() {
            Self::uninstall_record_with(&self.flows, &prior, ofport).await?;
        }
        Self::install_record_with(&self.flows, &record, ofport).await?;
        state.rules.insert(record.rule.id, record);
        Ok(())
    }

    /// `delete_port_steering` notification: uninstall and drop the rule if the
    /// owning port is tracked.
    pub async fn delete_port_steering(&self, record: &SteeringRuleRecord) -> Result<(), AgentError> {
        let mut ports = self.ports.lock().await;
        let Some(state) = ports.get_mut(&record.rule.src_neutron_port) else {
            return Ok(());
        };
        if let Some(prior) = state.rules.remove(&record.rule.id) {
            let ofport = state.target_ofport;
            Self::uninstall_record_with(&self.flows, &prior, ofport).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub async fn tracked_rule_count(&self, port_id: &NeutronPortId) -> usize {
        self.ports
            .lock()
            .await
            .get(port_id)
            .map(|s| s.rules.len())
            .unwrap_or(0)
    }

    async fn install_record(&self, record: &SteeringRuleRecord, ofport: u32) -> Result<(), AgentError> {
        Self::install_record_with(&self.flows, record, ofport).await
    }

    async fn uninstall_record(&self, record: &SteeringRuleRecord, ofport: u32) -> Result<(), AgentError> {
        Self::uninstall_record_with(&self.flows, record, ofport).await
    }

    async fn install_record_with(flows: &Arc<F>, record: &SteeringRuleRecord, ofport: u32) -> Result<(), AgentError> {
        let (action, priority) = action_and_priority(record);
        for m in prepare_matches(record, ofport) {
            flows.install(m, action.clone(), priority).await?;
        }
        Ok(())
    }

    async fn uninstall_record_with(flows: &Arc<F>, record: &SteeringRuleRecord, ofport: u32) -> Result<(), AgentError> {
        let (_, priority) = action_and_priority(record);
        for m in prepare_matches(record, ofport) {
            flows.uninstall(m, priority).await?;
        }
        Ok(())
    }
}

fn action_and_priority(record: &SteeringRuleRecord) -> (FlowAction, u16) {
    match &record.overwrite_mac {
        Some(mac) => (FlowAction::SetDestMacAndNormal(mac.clone()), STEERING_PRIORITY),
        None => (FlowAction::Drop, DROP_PRIORITY),
    }
}
