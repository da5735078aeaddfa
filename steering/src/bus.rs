// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Pub/sub fan-out of rule mutations to host agents.

use tokio::sync::broadcast;

use crate::types::SteeringRuleRecord;

/// A notification published to every subscribed agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteeringEvent {
    Create(SteeringRuleRecord),
    Delete(SteeringRuleRecord),
}

/// Broadcast channel agents subscribe to for rule create/delete
/// notifications. The plugin-request RPC (`get_port_steering`) is a direct
/// method call on `SteeringPlugin`, not a second channel on this bus.
pub struct SteeringBus {
    tx: broadcast::Sender<SteeringEvent>,
}

/// Default channel capacity; lagging subscribers drop the oldest events
/// rather than block publishers.
const CHANNEL_CAPACITY: usize = 1024;

impl SteeringBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        SteeringBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SteeringEvent> {
        self.tx.subscribe()
    }

    pub fn publish_create(&self, record: SteeringRuleRecord) {
        if self.tx.send(SteeringEvent::Create(record)).is_err() {
            tracing::trace!("no subscribers for steering create notification");
        }
    }

    pub fn publish_delete(&self, record: SteeringRuleRecord) {
        if self.tx.send(SteeringEvent::Delete(record)).is_err() {
            tracing::trace!("no subscribers for steering delete notification");
        }
    }
}

impl Default for SteeringBus {
    fn default() -> Self {
        Self::new()
    }
}
