//! Listener configuration types

use std::net::{SocketAddr, ToSocketAddrs};

use crate::{env_or, parse_env, ConfigError, ConfigResult};

/// Default bind address (all interfaces)
pub const DEFAULT_HOSTNAME: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Network listener configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address to bind
    pub hostname: String,

    /// TCP port to listen on
    pub port: u16,
}

impl ServerConfig {
    /// Load listener configuration from `{prefix}_HOSTNAME` and `{prefix}_PORT`
    pub fn from_env(prefix: &str) -> ConfigResult<Self> {
        let hostname = env_or(&format!("{prefix}_HOSTNAME"), DEFAULT_HOSTNAME);
        if hostname.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("{prefix}_HOSTNAME"),
                "must not be empty",
            ));
        }

        Ok(Self {
            hostname,
            port: parse_env(&format!("{prefix}_PORT"), DEFAULT_PORT)?,
        })
    }

    /// Create a configuration for the given address
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// `hostname:port` as a display string
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// Resolve the configured address to the first matching socket address
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ConfigError::invalid("hostname", e))?
            .next()
            .ok_or_else(|| {
                ConfigError::invalid(
                    "hostname",
                    format!("{} did not resolve to any address", self.hostname),
                )
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOSTNAME, DEFAULT_PORT)
    }
}
