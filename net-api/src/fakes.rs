// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Process-local fakes for the outbound client traits. These are real,
//! minimal implementations rather than recorded-interaction mocks — each one
//! tracks enough state to make assertions about what the orchestrator
//! actually did.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::container_api::ContainerApi;
use crate::errors::NetApiError;
use crate::network_api::NetworkApi;
use crate::port_directory::PortDirectory;
use crate::types::{ContainerId, ContainerStatus, FixedIp, NeutronPortId, PortInfo};

/// In-memory [`NetworkApi`] fake. Ports are allocated sequentially; an
/// injected failure list can force `create_port` to fail for specific names,
/// used to exercise the partial-provisioning-failure teardown path.
pub struct FakeNetworkApi {
    inner: Mutex<FakeNetworkApiState>,
}

struct FakeNetworkApiState {
    next_id: u64,
    ports: HashMap<NeutronPortId, PortInfo>,
    deleted: Vec<NeutronPortId>,
    fail_create_for: Vec<String>,
}

impl FakeNetworkApi {
    pub fn new() -> Self {
        FakeNetworkApi {
            inner: Mutex::new(FakeNetworkApiState {
                next_id: 1,
                ports: HashMap::new(),
                deleted: Vec::new(),
                fail_create_for: Vec::new(),
            }),
        }
    }

    /// Causes the next `create_port` call for `name` to fail.
    pub fn fail_create_for(&self, name: impl Into<String>) {
        self.inner.lock().unwrap().fail_create_for.push(name.into());
    }

    /// Port ids passed to `delete_port`, in call order.
    pub fn deleted_ports(&self) -> Vec<NeutronPortId> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn port_count(&self) -> usize {
        self.inner.lock().unwrap().ports.len()
    }

    /// Registers a port under a caller-chosen id rather than one of the
    /// synthetic `port-{n}` ids `create_port` assigns. Used by test rigs that
    /// need a known, stable id for well-known ports (e.g. the gateway
    /// ingress/egress ports named directly in config).
    pub fn register_port(&self, id: impl Into<String>) -> PortInfo {
        let mut state = self.inner.lock().unwrap();
        let id = NeutronPortId(id.into());
        state.next_id += 1;
        let octets = state.next_id as u8;
        let info = PortInfo {
            id: id.clone(),
            mac_address: format!("fa:16:3e:00:00:{octets:02x}"),
            fixed_ips: vec![FixedIp {
                ip_address: IpAddr::V4(Ipv4Addr::new(192, 0, 2, octets)),
            }],
        };
        state.ports.insert(id, info.clone());
        info
    }
}

impl Default for FakeNetworkApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkApi for FakeNetworkApi {
    async fn create_port(&self, name: &str, _network_id: &str) -> Result<PortInfo, NetApiError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(pos) = state.fail_create_for.iter().position(|n| n == name) {
            state.fail_create_for.remove(pos);
            return Err(NetApiError::PortNotFound(NeutronPortId(name.to_string())));
        }
        let id = NeutronPortId(format!("port-{}", state.next_id));
        state.next_id += 1;
        let octets = state.next_id as u8;
        let info = PortInfo {
            id: id.clone(),
            mac_address: format!("fa:16:3e:00:00:{octets:02x}"),
            fixed_ips: vec![FixedIp {
                ip_address: IpAddr::V4(Ipv4Addr::new(192, 0, 2, octets)),
            }],
        };
        state.ports.insert(id, info.clone());
        Ok(info)
    }

    async fn delete_port(&self, port_id: &NeutronPortId) -> Result<(), NetApiError> {
        let mut state = self.inner.lock().unwrap();
        state.ports.remove(port_id);
        state.deleted.push(port_id.clone());
        Ok(())
    }

    async fn get_port(&self, port_id: &NeutronPortId) -> Result<PortInfo, NetApiError> {
        self.inner
            .lock()
            .unwrap()
            .ports
            .get(port_id)
            .cloned()
            .ok_or_else(|| NetApiError::PortNotFound(port_id.clone()))
    }
}

#[async_trait]
impl PortDirectory for FakeNetworkApi {
    async fn exists(&self, port_id: &NeutronPortId) -> bool {
        self.inner.lock().unwrap().ports.contains_key(port_id)
    }

    async fn mac_address(&self, port_id: &NeutronPortId) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .ports
            .get(port_id)
            .map(|p| p.mac_address.clone())
    }
}

/// In-memory [`ContainerApi`] fake. Containers start in `Creating` and can be
/// advanced to a terminal status either immediately (`run_outcome`) or left
/// to be observed across a bounded number of `status` polls.
pub struct FakeContainerApi {
    inner: Mutex<FakeContainerApiState>,
}

struct FakeContainerApiState {
    next_id: u64,
    containers: HashMap<ContainerId, ContainerStatus>,
    fail_run_for: Vec<String>,
    /// Ports at which `.status()` calls leave `Creating` before reporting `Running`.
    creating_polls: HashMap<ContainerId, u32>,
    stopped: Vec<ContainerId>,
}

impl FakeContainerApi {
    pub fn new() -> Self {
        FakeContainerApi {
            inner: Mutex::new(FakeContainerApiState {
                next_id: 1,
                containers: HashMap::new(),
                fail_run_for: Vec::new(),
                creating_polls: HashMap::new(),
                stopped: Vec::new(),
            }),
        }
    }

    pub fn fail_run_for(&self, image: impl Into<String>) {
        self.inner.lock().unwrap().fail_run_for.push(image.into());
    }

    pub fn stopped_containers(&self) -> Vec<ContainerId> {
        self.inner.lock().unwrap().stopped.clone()
    }
}

impl Default for FakeContainerApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerApi for FakeContainerApi {
    async fn run(
        &self,
        image: &str,
        _args: Vec<String>,
        _port: NeutronPortId,
    ) -> Result<ContainerId, NetApiError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(pos) = state.fail_run_for.iter().position(|i| i == image) {
            state.fail_run_for.remove(pos);
            return Err(NetApiError::ContainerNotFound(ContainerId(image.to_string())));
        }
        let id = ContainerId(format!("container-{}", state.next_id));
        state.next_id += 1;
        state.containers.insert(id.clone(), ContainerStatus::Creating);
        state.creating_polls.insert(id.clone(), 1);
        Ok(id)
    }

    async fn status(&self, id: &ContainerId) -> Result<ContainerStatus, NetApiError> {
        let mut guard = self.inner.lock().unwrap();
        let state = &mut *guard;
        let status = state
            .containers
            .get(id)
            .copied()
            .ok_or_else(|| NetApiError::ContainerNotFound(id.clone()))?;
        if status != ContainerStatus::Creating {
            return Ok(status);
        }
        let remaining = state.creating_polls.entry(id.clone()).or_insert(0);
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(ContainerStatus::Creating);
        }
        state.containers.insert(id.clone(), ContainerStatus::Running);
        Ok(ContainerStatus::Running)
    }

    async fn stop(&self, id: &ContainerId, _timeout: Duration) -> Result<(), NetApiError> {
        let mut state = self.inner.lock().unwrap();
        state.containers.remove(id);
        state.stopped.push(id.clone());
        Ok(())
    }
}
