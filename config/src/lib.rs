// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration for the PVN orchestrator daemon.
//!
//! [`PvnConfig`] is loaded from a TOML file, mirroring the `API_CONFIG_GROUP`,
//! `NETWORK_CONFIG_GROUP` and `AUTH_CONFIG_GROUP` groups of the system this
//! daemon replaces. The file path defaults to `/etc/pvnd/config.toml` and can
//! be overridden with the `PVND_CONFIG` environment variable.

mod errors;

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use errors::ConfigError;

/// Environment variable used to override the default config file location.
pub const CONFIG_PATH_VAR: &str = "PVND_CONFIG";

/// Default config file location, used when `PVND_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pvnd/config.toml";

/// Top-level daemon configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PvnConfig {
    pub api: ApiConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Tenant identifier stamped onto steering rules this process creates.
    /// There is no independent session/identity layer (out of scope), so
    /// this is a single configured value rather than derived per-request.
    #[serde(default = "default_project_id")]
    pub project_id: String,
}

fn default_project_id() -> String {
    "default".to_string()
}

/// `API_CONFIG_GROUP`: where the HTTP surface binds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiConfig {
    pub host_ip: IpAddr,
    pub port: u16,
}

/// `NETWORK_CONFIG_GROUP`: the fabric network this daemon manages PVNs on,
/// and the well-known ingress/egress neutron ports seeded with drop rules at
/// startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkConfig {
    pub id: String,
    pub ingress_port: String,
    pub egress_port: String,
}

/// `AUTH_CONFIG_GROUP`: credentials and base URLs for the two collaborating
/// services this daemon does not own.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub network_api_base_url: String,
    #[serde(default)]
    pub network_api_token: Option<String>,
    #[serde(default)]
    pub container_api_base_url: String,
    #[serde(default)]
    pub container_api_token: Option<String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        CredentialsConfig {
            network_api_base_url: String::new(),
            network_api_token: None,
            container_api_base_url: String::new(),
            container_api_token: None,
        }
    }
}

impl PvnConfig {
    /// Load configuration from the path named by `PVND_CONFIG`, or
    /// [`DEFAULT_CONFIG_PATH`] if that variable is unset.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load(&path)
    }

    /// Load and validate configuration from a specific TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: PvnConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.network.id.is_empty() {
            return Err(ConfigError::MissingParameter("network.id"));
        }
        if self.network.ingress_port.is_empty() {
            return Err(ConfigError::MissingParameter("network.ingress_port"));
        }
        if self.network.egress_port.is_empty() {
            return Err(ConfigError::MissingParameter("network.egress_port"));
        }
        if self.network.ingress_port == self.network.egress_port {
            return Err(ConfigError::InvalidValue(
                "network.egress_port",
                "must differ from network.ingress_port".to_string(),
            ));
        }
        if self.api.port == 0 {
            return Err(ConfigError::InvalidValue(
                "api.port",
                "must be nonzero".to_string(),
            ));
        }
        if self.credentials.network_api_base_url.is_empty() {
            return Err(ConfigError::MissingParameter("credentials.network_api_base_url"));
        }
        if self.credentials.container_api_base_url.is_empty() {
            return Err(ConfigError::MissingParameter("credentials.container_api_base_url"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Scratch TOML file, removed on drop; avoids a `tempfile` dev-dependency
    /// for a handful of tests.
    struct TempFile {
        path: PathBuf,
    }

    impl TempFile {
        fn new(contents: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!(
                "pvnd-config-test-{}-{}.toml",
                std::process::id(),
                COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            std::fs::write(&path, contents).expect("write temp config");
            TempFile { path }
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    const VALID: &str = r#"
        [api]
        host_ip = "0.0.0.0"
        port = 8080

        [network]
        id = "net-1"
        ingress_port = "port-in"
        egress_port = "port-out"

        [credentials]
        network_api_base_url = "http://neutron.local"
        container_api_base_url = "http://docker.local"
    "#;

    #[test]
    fn loads_valid_config() {
        let f = TempFile::new(VALID);
        let cfg = PvnConfig::load(&f.path).expect("should load");
        assert_eq!(cfg.network.id, "net-1");
        assert_eq!(cfg.api.port, 8080);
        assert_eq!(
            cfg.credentials.network_api_base_url,
            "http://neutron.local"
        );
    }

    #[test]
    fn rejects_missing_file() {
        let path = PathBuf::from("/nonexistent/pvnd-config-test.toml");
        let err = PvnConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let f = TempFile::new("not = [valid");
        let err = PvnConfig::load(&f.path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_, _)));
    }

    #[test]
    fn rejects_same_ingress_and_egress_port() {
        let contents = VALID.replace("port-out", "port-in");
        let f = TempFile::new(&contents);
        let err = PvnConfig::load(&f.path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue("network.egress_port", _)
        ));
    }
}
