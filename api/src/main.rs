// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all)]

mod errors;
mod routes;

use std::sync::Arc;

use agent::{AgentFlowManager, InMemoryFlowTable};
use config::PvnConfig;
use net_api::{ContainerApi, HttpContainerApi, HttpNetworkApi, NetworkApi, NetworkApiPortDirectory};
use orchestrator::{GatewaySeeder, PvnModel, PvnOrchestrator};
use routes::AppState;
use steering::{SteeringBus, SteeringPlugin, SteeringStore};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_env_filter(EnvFilter::new("debug,hyper=off,h2=off"))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!("starting pvnd");

    let config = Arc::new(PvnConfig::load_default()?);

    let http_client = reqwest::Client::new();
    let net_client = Arc::new(HttpNetworkApi::new(
        http_client.clone(),
        config.credentials.network_api_base_url.parse()?,
        config.credentials.network_api_token.clone(),
    ));
    let containers: Arc<dyn ContainerApi> = Arc::new(HttpContainerApi::new(
        http_client,
        config.credentials.container_api_base_url.parse()?,
        config.credentials.container_api_token.clone(),
    ));

    let ports = Arc::new(NetworkApiPortDirectory::new(Arc::clone(&net_client)));
    let store = Arc::new(SteeringStore::new(ports.clone()));
    let bus = Arc::new(SteeringBus::new());
    let steering = Arc::new(SteeringPlugin::new(store, bus, ports));
    let net: Arc<dyn NetworkApi> = net_client;

    let seeder = GatewaySeeder::new(Arc::clone(&steering), Arc::clone(&config));
    seeder.seed().await?;
    tracing::info!("gateway DROP markers seeded");

    let model = Arc::new(PvnModel::new());
    let orchestrator = Arc::new(PvnOrchestrator::new(
        Arc::clone(&model),
        net,
        containers,
        Arc::clone(&steering),
        Arc::clone(&config),
    ));

    spawn_agent_reconciler(Arc::clone(&steering));

    let app = routes::router(AppState {
        orchestrator: Arc::clone(&orchestrator),
        model,
    });

    let addr = std::net::SocketAddr::new(config.api.host_ip, config.api.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.join_background_tasks().await;
    tracing::info!("pvnd stopped");
    Ok(())
}

/// Runs the host-local reconciler against the same process's steering bus.
/// Wiring a real `handle_port` call to an OVS VIF-bind notification is out of
/// scope here (that's the job of the OVS integration bridge); this only
/// drives the update/delete notifications `AgentFlowManager` already tracks
/// for ports it knows about.
fn spawn_agent_reconciler(steering: Arc<SteeringPlugin>) {
    let flows = Arc::new(InMemoryFlowTable::new());
    let manager = Arc::new(AgentFlowManager::new(flows));
    let mut events = steering.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(steering::SteeringEvent::Create(record)) => {
                    if let Err(e) = manager.update_port_steering(record).await {
                        tracing::warn!(error = %e, "agent failed to install steering update");
                    }
                }
                Ok(steering::SteeringEvent::Delete(record)) => {
                    if let Err(e) = manager.delete_port_steering(&record).await {
                        tracing::warn!(error = %e, "agent failed to uninstall steering rule");
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "agent reconciler lagged behind steering bus");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received, draining in-flight work");
}
