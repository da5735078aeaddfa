// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Client surface for the SDN port fabric, this system's "NetworkAPI".

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::errors::NetApiError;
use crate::types::{NeutronPortId, PortInfo};

/// Port lifecycle operations against the network fabric.
#[async_trait]
pub trait NetworkApi: Send + Sync + 'static {
    async fn create_port(&self, name: &str, network_id: &str) -> Result<PortInfo, NetApiError>;

    async fn delete_port(&self, port_id: &NeutronPortId) -> Result<(), NetApiError>;

    async fn get_port(&self, port_id: &NeutronPortId) -> Result<PortInfo, NetApiError>;
}

/// Production client talking to the fabric's REST surface over HTTP.
pub struct HttpNetworkApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpNetworkApi {
    pub fn new(client: Client, base_url: Url, token: Option<String>) -> Self {
        HttpNetworkApi {
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

#[async_trait]
impl NetworkApi for HttpNetworkApi {
    async fn create_port(&self, name: &str, network_id: &str) -> Result<PortInfo, NetApiError> {
        let body = serde_json::json!({
            "port": { "name": name, "network_id": network_id },
        });
        tracing::debug!(name, network_id, "creating port");
        let resp = self
            .request(reqwest::Method::POST, "ports")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<PortInfo>()
            .await?;
        Ok(resp)
    }

    async fn delete_port(&self, port_id: &NeutronPortId) -> Result<(), NetApiError> {
        tracing::debug!(%port_id, "deleting port");
        self.request(reqwest::Method::DELETE, &format!("ports/{port_id}"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn get_port(&self, port_id: &NeutronPortId) -> Result<PortInfo, NetApiError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("ports/{port_id}"))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| {
                if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
                    NetApiError::PortNotFound(port_id.clone())
                } else {
                    NetApiError::Request(e)
                }
            })?
            .json::<PortInfo>()
            .await?;
        Ok(resp)
    }
}
