// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Client surface for the container runtime, this system's "ContainerAPI".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::errors::NetApiError;
use crate::types::{ContainerId, ContainerStatus, NeutronPortId};

#[async_trait]
pub trait ContainerApi: Send + Sync + 'static {
    async fn run(
        &self,
        image: &str,
        args: Vec<String>,
        port: NeutronPortId,
    ) -> Result<ContainerId, NetApiError>;

    async fn status(&self, id: &ContainerId) -> Result<ContainerStatus, NetApiError>;

    async fn stop(&self, id: &ContainerId, timeout: Duration) -> Result<(), NetApiError>;
}

/// Production client talking to the container runtime's REST surface.
pub struct HttpContainerApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpContainerApi {
    pub fn new(client: Client, base_url: Url, token: Option<String>) -> Self {
        HttpContainerApi {
            client,
            base_url,
            token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.base_url.join(path).expect("path must be valid relative to base_url");
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[derive(serde::Deserialize)]
struct RunResponse {
    uuid: String,
}

#[derive(serde::Deserialize)]
struct StatusResponse {
    status: ContainerStatus,
}

#[async_trait]
impl ContainerApi for HttpContainerApi {
    async fn run(
        &self,
        image: &str,
        args: Vec<String>,
        port: NeutronPortId,
    ) -> Result<ContainerId, NetApiError> {
        let body = serde_json::json!({
            "image": image,
            "command": args,
            "nets": [{ "port": port.0 }],
            "auto_remove": true,
        });
        tracing::debug!(image, %port, "starting container");
        let resp: RunResponse = self
            .request(reqwest::Method::POST, "containers")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ContainerId(resp.uuid))
    }

    async fn status(&self, id: &ContainerId) -> Result<ContainerStatus, NetApiError> {
        let resp: StatusResponse = self
            .request(reqwest::Method::GET, &format!("containers/{id}"))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
                    NetApiError::ContainerNotFound(id.clone())
                } else {
                    NetApiError::Request(e)
                }
            })?
            .json()
            .await?;
        Ok(resp.status)
    }

    async fn stop(&self, id: &ContainerId, timeout: Duration) -> Result<(), NetApiError> {
        tracing::debug!(%id, ?timeout, "stopping container");
        self.request(reqwest::Method::POST, &format!("containers/{id}/stop"))
            .json(&serde_json::json!({ "timeout_seconds": timeout.as_secs() }))
            .timeout(timeout + Duration::from_secs(1))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
