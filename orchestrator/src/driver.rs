// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Top-level driver: drives port creation, parallel container starts,
//! steering-rule assembly, and compensating teardown.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use config::PvnConfig;
use futures::future::try_join_all;
use net_api::{AppSpec, ContainerApi, ContainerId, ContainerStatus, NeutronPortId, NetworkApi, PortInfo};
use steering::{NewSteeringRule, SteeringPlugin, SteeringRuleId};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;

use crate::errors::OrchestratorError;
use crate::model::{PvnId, PvnModel, PvnStatus};
use crate::validator::{self, Description, Edge, RawDescription};

const CONTAINER_START_POLL_INTERVAL: Duration = Duration::from_millis(100);
const CONTAINER_START_POLL_ATTEMPTS: u32 = 20;
const CONTAINER_STOP_TIMEOUT: Duration = Duration::from_secs(3);

const ETHERTYPE_IPV4: u16 = steering::ETHERTYPE_IPV4;
const ETHERTYPE_IPV6: u16 = steering::ETHERTYPE_IPV6;

/// Resolves an abstract app index (`-1` end user, `len(apps)` egress,
/// otherwise an app port) to a concrete port and the IP to match against.
struct ResolvedIndex {
    port: NeutronPortId,
    ip: Option<IpAddr>,
}

pub struct PvnOrchestrator {
    model: Arc<PvnModel>,
    net: Arc<dyn NetworkApi>,
    containers: Arc<dyn ContainerApi>,
    steering: Arc<SteeringPlugin>,
    config: Arc<PvnConfig>,
    tasks: AsyncMutex<JoinSet<()>>,
}

impl PvnOrchestrator {
    pub fn new(
        model: Arc<PvnModel>,
        net: Arc<dyn NetworkApi>,
        containers: Arc<dyn ContainerApi>,
        steering: Arc<SteeringPlugin>,
        config: Arc<PvnConfig>,
    ) -> Self {
        PvnOrchestrator {
            model,
            net,
            containers,
            steering,
            config,
            tasks: AsyncMutex::new(JoinSet::new()),
        }
    }

    /// The synchronous portion of provisioning: validate, reserve an id, and
    /// schedule the background work. Must return without I/O against the
    /// downstream APIs.
    pub async fn initialize(
        self: &Arc<Self>,
        client_ip: IpAddr,
        raw: RawDescription,
    ) -> Result<PvnId, OrchestratorError> {
        let description = Description::try_from(raw)?;
        validator::validate(&description)?;

        if self.model.get_by_client_ip(client_ip).await.is_some() {
            return Err(OrchestratorError::DuplicateClient);
        }
        let ethertype = if client_ip.is_ipv4() { 4 } else { 6 };
        let id = self
            .model
            .reserve(client_ip, ethertype)
            .await
            .map_err(|_| OrchestratorError::DuplicateClient)?;

        let this = Arc::clone(self);
        self.tasks.lock().await.spawn(async move {
            if let Err(e) = this.start(id, client_ip, ethertype, description).await {
                tracing::error!(pvn_id = id, error = %e, "provisioning failed, compensating");
                this.teardown(id, true).await;
            }
        });

        Ok(id)
    }

    async fn start(
        &self,
        id: PvnId,
        client_ip: IpAddr,
        ethertype: u8,
        description: Description,
    ) -> Result<(), OrchestratorError> {
        let mut ports = Vec::with_capacity(description.apps.len());
        for (i, _app) in description.apps.iter().enumerate() {
            let name = format!("pvn.{id}.app.{i}");
            let port = self.net.create_port(&name, &self.config.network.id).await?;
            ports.push(port);
        }
        let port_ids: Vec<NeutronPortId> = ports.iter().map(|p| p.id.clone()).collect();
        self.model.set_ports(id, port_ids.clone()).await?;

        let app_ids = self.start_apps(client_ip, &description.apps, &port_ids).await?;
        self.model.set_apps(id, app_ids).await?;

        let rule_ids = self
            .create_steering(id, client_ip, ethertype, &ports, &description)
            .await?;
        self.model.set_steerings(id, rule_ids).await?;

        tracing::info!(pvn_id = id, "PVN active");
        Ok(())
    }

    async fn start_apps(
        &self,
        client_ip: IpAddr,
        apps: &[AppSpec],
        ports: &[NeutronPortId],
    ) -> Result<Vec<ContainerId>, OrchestratorError> {
        let starts = apps.iter().zip(ports.iter()).map(|(app, port)| {
            let mut args = app.args.clone();
            args.push(client_ip.to_string());
            self.run_and_wait(app.image.clone(), args, port.clone())
        });
        try_join_all(starts).await
    }

    async fn run_and_wait(
        &self,
        image: String,
        args: Vec<String>,
        port: NeutronPortId,
    ) -> Result<ContainerId, OrchestratorError> {
        let container_id = self.containers.run(&image, args, port).await?;
        let mut interval = tokio::time::interval(CONTAINER_START_POLL_INTERVAL);
        for _ in 0..CONTAINER_START_POLL_ATTEMPTS {
            interval.tick().await;
            let status = self.containers.status(&container_id).await?;
            if status.has_left_startup() {
                return Ok(container_id);
            }
        }
        Err(OrchestratorError::ContainerStartTimeout(container_id.to_string()))
    }

    async fn create_steering(
        &self,
        id: PvnId,
        client_ip: IpAddr,
        ethertype: u8,
        ports: &[PortInfo],
        description: &Description,
    ) -> Result<HashSet<SteeringRuleId>, OrchestratorError> {
        let mut new_rules = Vec::new();
        for chain in &description.chains {
            for edge in &chain.edges {
                new_rules.push(self.prepare_steering(chain.origin, client_ip, ethertype, ports, edge));
            }
        }
        for port in ports {
            new_rules.push(NewSteeringRule {
                project_id: self.config.project_id.clone(),
                src_neutron_port: port.id.clone(),
                dest_neutron_port: None,
                src_ip: None,
                dest_ip: None,
                src_port: None,
                dest_port: None,
                ethertype: None,
                protocol: None,
            });
        }
        let records = self.steering.create_many(new_rules).await?;
        Ok(records.into_iter().map(|r| r.rule.id).collect())
    }

    fn prepare_steering(
        &self,
        chain_origin: i64,
        client_ip: IpAddr,
        ethertype: u8,
        ports: &[PortInfo],
        edge: &Edge,
    ) -> NewSteeringRule {
        let resolve = |index: i64| -> ResolvedIndex {
            if index == -1 {
                ResolvedIndex {
                    port: NeutronPortId(self.config.network.ingress_port.clone()),
                    ip: Some(client_ip),
                }
            } else if index as usize == ports.len() {
                ResolvedIndex {
                    port: NeutronPortId(self.config.network.egress_port.clone()),
                    ip: None,
                }
            } else {
                let port = &ports[index as usize];
                ResolvedIndex {
                    port: port.id.clone(),
                    ip: port.primary_ip(),
                }
            }
        };

        let src = resolve(edge.from);
        let dest = resolve(edge.to);
        let origin_ip = resolve(chain_origin).ip;
        let dest_ip = edge.destination.and_then(|d| resolve(d).ip);

        NewSteeringRule {
            project_id: self.config.project_id.clone(),
            src_neutron_port: src.port,
            dest_neutron_port: Some(dest.port),
            src_ip: origin_ip,
            dest_ip,
            src_port: edge.source_port,
            dest_port: edge.destination_port,
            ethertype: Some(if ethertype == 4 { ETHERTYPE_IPV4 } else { ETHERTYPE_IPV6 }),
            protocol: edge.protocol,
        }
    }

    /// Tears down a PVN's resources. When `force` is false and the PVN was
    /// not `Active`, this flips the state to `TearingDown` without deleting
    /// anything — the background `start` task's own error handler will call
    /// this again with `force=true` once it unwinds, avoiding a double
    /// teardown race.
    pub async fn teardown(&self, id: PvnId, force: bool) {
        let status_before = match self.model.status(id).await {
            Ok(s) if s != PvnStatus::Deleted => s,
            _ => return,
        };
        if self.model.begin_teardown(id).await.is_err() {
            return;
        }
        if !force && status_before != PvnStatus::Active {
            return;
        }

        let Ok(record) = self.model.get(id).await else {
            return;
        };

        let mut delete_tasks: JoinSet<()> = JoinSet::new();
        for rule_id in record.steering.clone() {
            let steering = Arc::clone(&self.steering);
            delete_tasks.spawn(async move {
                if let Err(e) = steering.delete(&rule_id).await {
                    tracing::warn!(%rule_id, error = %e, "steering rule delete failed during teardown");
                }
            });
        }
        for container_id in record.apps.clone() {
            let containers = Arc::clone(&self.containers);
            delete_tasks.spawn(async move {
                if let Err(e) = containers.stop(&container_id, CONTAINER_STOP_TIMEOUT).await {
                    tracing::warn!(%container_id, error = %e, "container stop failed during teardown");
                }
            });
        }
        for port_id in record.ports.clone() {
            let net = Arc::clone(&self.net);
            let steering = Arc::clone(&self.steering);
            delete_tasks.spawn(async move {
                steering.on_port_deleted(&port_id).await;
                if let Err(e) = net.delete_port(&port_id).await {
                    tracing::warn!(%port_id, error = %e, "port delete failed during teardown");
                }
            });
        }
        while delete_tasks.join_next().await.is_some() {}

        if let Err(e) = self.model.finalize(id).await {
            tracing::warn!(pvn_id = id, error = %e, "finalize failed during teardown");
        }
    }

    /// Awaits every in-flight background `start` task. Called on graceful
    /// shutdown so outstanding provisioning work is not silently dropped.
    pub async fn join_background_tasks(&self) {
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }
}
