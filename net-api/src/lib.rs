// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Outbound client surfaces for the two systems the PVN orchestrator does
//! not own: the SDN port fabric (`NetworkApi`) and the container runtime
//! (`ContainerApi`), plus the narrower `PortDirectory` view `steering` needs
//! for FK checks and MAC enrichment.

pub mod container_api;
pub mod errors;
pub mod fakes;
pub mod network_api;
pub mod port_directory;
pub mod types;

pub use container_api::{ContainerApi, HttpContainerApi};
pub use errors::NetApiError;
pub use network_api::{HttpNetworkApi, NetworkApi};
pub use port_directory::{NetworkApiPortDirectory, PortDirectory};
pub use types::{AppSpec, ContainerId, ContainerStatus, FixedIp, NeutronPortId, PortInfo};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fake_network_api_allocates_distinct_ports() {
        let api = fakes::FakeNetworkApi::new();
        let p1 = api.create_port("pvn.1.app.0", "net-1").await.unwrap();
        let p2 = api.create_port("pvn.1.app.1", "net-1").await.unwrap();
        assert_ne!(p1.id, p2.id);
        assert_eq!(api.port_count(), 2);
    }

    #[tokio::test]
    async fn fake_network_api_honors_injected_failure() {
        let api = fakes::FakeNetworkApi::new();
        api.fail_create_for("pvn.1.app.1");
        assert!(api.create_port("pvn.1.app.1", "net-1").await.is_err());
        // the failure is consumed; a second attempt with the same name succeeds
        assert!(api.create_port("pvn.1.app.1", "net-1").await.is_ok());
    }

    #[tokio::test]
    async fn fake_container_api_leaves_creating_after_polls() {
        let api = fakes::FakeContainerApi::new();
        let id = api
            .run("myimage", vec!["10.0.0.1".into()], NeutronPortId("port-1".into()))
            .await
            .unwrap();
        let status = api.status(&id).await.unwrap();
        assert_eq!(status, ContainerStatus::Creating);
        let status2 = api.status(&id).await.unwrap();
        assert!(status2.has_left_startup());
    }

    #[tokio::test]
    async fn fake_container_api_stop_records_call() {
        let api = fakes::FakeContainerApi::new();
        let id = api
            .run("myimage", vec![], NeutronPortId("port-1".into()))
            .await
            .unwrap();
        api.stop(&id, Duration::from_secs(3)).await.unwrap();
        assert_eq!(api.stopped_containers(), vec![id]);
    }
}
