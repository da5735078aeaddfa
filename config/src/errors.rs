// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration loading failures.

use std::path::PathBuf;
use thiserror::Error;

/// The reasons why configuration loading may fail.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse configuration file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("missing mandatory parameter: {0}")]
    MissingParameter(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
