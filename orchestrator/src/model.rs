// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory PVN registry and state machine. A single write-protected map,
//! the only process-wide mutable structure in the orchestrator; reads return
//! owned copies so a reader's view can never be mutated out from under it.
//!
//! This is an intentional simplification, not an oversight: PVN state does
//! not survive a restart, matching the Non-goal that persistence is out of
//! scope.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use net_api::{ContainerId, NeutronPortId};
use serde::{Deserialize, Serialize};
use steering::SteeringRuleId;
use thiserror::Error;
use tokio::sync::Mutex;

pub type PvnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PvnStatus {
    InitPorts,
    InitApps,
    InitSteering,
    Active,
    TearingDown,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvnRecord {
    pub id: PvnId,
    pub client_ip: IpAddr,
    pub ethertype: u8,
    pub status: PvnStatus,
    pub ports: Vec<NeutronPortId>,
    pub apps: Vec<ContainerId>,
    pub steering: HashSet<SteeringRuleId>,
    /// The status `begin_teardown` moved away from, so a double-teardown or a
    /// best-effort compensation path can tell whether resources were ever
    /// actually provisioned.
    pub status_before_teardown: Option<PvnStatus>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("a PVN for this source IP address already exists")]
    DuplicateClient,
    #[error("PVN {0} not found")]
    NotFound(PvnId),
    #[error("PVN {pvn} in state {actual:?}, expected {expected:?}")]
    InvalidState {
        pvn: PvnId,
        expected: PvnStatus,
        actual: PvnStatus,
    },
}

struct ModelInner {
    next_id: PvnId,
    records: HashMap<PvnId, PvnRecord>,
}

pub struct PvnModel {
    inner: Mutex<ModelInner>,
}

impl PvnModel {
    pub fn new() -> Self {
        PvnModel {
            inner: Mutex::new(ModelInner {
                next_id: 1,
                records: HashMap::new(),
            }),
        }
    }

    /// Fails with `DuplicateClient` if any non-`Deleted` PVN already has this
    /// `client_ip`; otherwise reserves the next id and installs an
    /// `InitPorts` record.
    pub async fn reserve(&self, client_ip: IpAddr, ethertype: u8) -> Result<PvnId, ModelError> {
        let mut inner = self.inner.lock().await;
        if inner
            .records
            .values()
            .any(|r| r.client_ip == client_ip && r.status != PvnStatus::Deleted)
        {
            return Err(ModelError::DuplicateClient);
        }
        let id = inner.next_id;
        inner.next_id += 1;
        inner.records.insert(
            id,
            PvnRecord {
                id,
                client_ip,
                ethertype,
                status: PvnStatus::InitPorts,
                ports: Vec::new(),
                apps: Vec::new(),
                steering: HashSet::new(),
                status_before_teardown: None,
            },
        );
        Ok(id)
    }

    pub async fn set_ports(&self, id: PvnId, ports: Vec<NeutronPortId>) -> Result<(), ModelError> {
        self.transition(id, PvnStatus::InitPorts, PvnStatus::InitApps, |r| {
            r.ports = ports;
        })
        .await
    }

    pub async fn set_apps(&self, id: PvnId, apps: Vec<ContainerId>) -> Result<(), ModelError> {
        self.transition(id, PvnStatus::InitApps, PvnStatus::InitSteering, |r| {
            r.apps = apps;
        })
        .await
    }

    pub async fn set_steerings(
        &self,
        id: PvnId,
        rule_ids: HashSet<SteeringRuleId>,
    ) -> Result<(), ModelError> {
        self.transition(id, PvnStatus::InitSteering, PvnStatus::Active, |r| {
            r.steering = rule_ids;
        })
        .await
    }

    /// Moves the PVN to `TearingDown` from any state; a no-op if it is
    /// already `TearingDown` or `Deleted`, or absent entirely.
    pub async fn begin_teardown(&self, id: PvnId) -> Result<(), ModelError> {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.records.get_mut(&id) else {
            return Ok(());
        };
        if matches!(record.status, PvnStatus::TearingDown | PvnStatus::Deleted) {
            return Ok(());
        }
        record.status_before_teardown = Some(record.status);
        record.status = PvnStatus::TearingDown;
        Ok(())
    }

    pub async fn finalize(&self, id: PvnId) -> Result<(), ModelError> {
        self.transition(id, PvnStatus::TearingDown, PvnStatus::Deleted, |_| {})
            .await
    }

    pub async fn get(&self, id: PvnId) -> Result<PvnRecord, ModelError> {
        self.inner
            .lock()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or(ModelError::NotFound(id))
    }

    pub async fn status(&self, id: PvnId) -> Result<PvnStatus, ModelError> {
        self.get(id).await.map(|r| r.status)
    }

    pub async fn get_by_client_ip(&self, client_ip: IpAddr) -> Option<PvnRecord> {
        self.inner
            .lock()
            .await
            .records
            .values()
            .find(|r| r.client_ip == client_ip && r.status != PvnStatus::Deleted)
            .cloned()
    }

    async fn transition(
        &self,
        id: PvnId,
        expected: PvnStatus,
        next: PvnStatus,
        mutate: impl FnOnce(&mut PvnRecord),
    ) -> Result<(), ModelError> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.get_mut(&id).ok_or(ModelError::NotFound(id))?;
        if record.status != expected {
            return Err(ModelError::InvalidState {
                pvn: id,
                expected,
                actual: record.status,
            });
        }
        mutate(record);
        record.status = next;
        Ok(())
    }
}

impl Default for PvnModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn reserve_rejects_duplicate_client_ip() {
        let model = PvnModel::new();
        model.reserve(ip("10.0.0.1"), 4).await.unwrap();
        let err = model.reserve(ip("10.0.0.1"), 4).await.unwrap_err();
        assert_eq!(err, ModelError::DuplicateClient);
    }

    #[tokio::test]
    async fn reserve_allows_reuse_after_delete() {
        let model = PvnModel::new();
        let id1 = model.reserve(ip("10.0.0.1"), 4).await.unwrap();
        model.begin_teardown(id1).await.unwrap();
        model.finalize(id1).await.unwrap();
        assert!(model.reserve(ip("10.0.0.1"), 4).await.is_ok());
    }

    #[tokio::test]
    async fn state_advances_only_along_allowed_transitions() {
        let model = PvnModel::new();
        let id = model.reserve(ip("10.0.0.1"), 4).await.unwrap();
        let err = model.set_apps(id, vec![]).await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidState { .. }));
        model.set_ports(id, vec![]).await.unwrap();
        assert_eq!(model.status(id).await.unwrap(), PvnStatus::InitApps);
    }

    #[tokio::test]
    async fn begin_teardown_is_idempotent() {
        let model = PvnModel::new();
        let id = model.reserve(ip("10.0.0.1"), 4).await.unwrap();
        model.begin_teardown(id).await.unwrap();
        model.begin_teardown(id).await.unwrap();
        assert_eq!(model.status(id).await.unwrap(), PvnStatus::TearingDown);
    }

    #[tokio::test]
    async fn get_returns_independent_snapshot() {
        let model = PvnModel::new();
        let id = model.reserve(ip("10.0.0.1"), 4).await.unwrap();
        let mut snapshot = model.get(id).await.unwrap();
        snapshot.ports.push(NeutronPortId("forged".into()));
        let fresh = model.get(id).await.unwrap();
        assert!(fresh.ports.is_empty());
    }
}
