//! Wicket configuration structures to map the wicket.toml configuration.

#![deny(missing_docs)]

mod lms;
mod loader;

use std::{
    borrow::Cow,
    net::SocketAddr,
    path::{Path, PathBuf},
};

pub use lms::{AutoPrivilege, LmsConfig};
use serde::Deserialize;

/// Main configuration structure for the Wicket application.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote learning-management system configuration settings.
    pub lms: LmsConfig,
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// Fails when the file is missing or does not parse, and when required
    /// fields such as `lms.base_url` are absent. The gateway cannot run
    /// without a remote system to delegate to, so there is no default.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }
}

/// HTTP server configuration settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The socket address the server should listen on.
    pub listen_address: Option<SocketAddr>,
    /// TLS configuration for secure connections.
    pub tls: Option<TlsServerConfig>,
    /// Health endpoint configuration.
    #[serde(default)]
    pub health: HealthConfig,
}

/// TLS configuration for secure connections.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsServerConfig {
    /// Path to the TLS certificate PEM file.
    pub certificate: PathBuf,
    /// Path to the TLS private key PEM file.
    pub key: PathBuf,
}

/// Health endpoint configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    /// Whether the health endpoint is enabled.
    pub enabled: bool,
    /// The path for the health endpoint.
    pub path: Cow<'static, str>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            enabled: true,
            path: Cow::Borrowed("/health"),
        }
    }
}
