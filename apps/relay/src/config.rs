//! Relay configuration

use std::net::SocketAddr;
use std::time::Duration;

use resonance_shared_config::{parse_env, ConfigError, ConfigResult, Environment, ServerConfig};

use crate::broadcaster::DEFAULT_DEBOUNCE;
use crate::state::{clamp_volume, MAX_VOLUME};
use crate::websocket::DEFAULT_COMMAND_TIMEOUT;

/// Environment variable prefix for relay settings
const ENV_PREFIX: &str = "RELAY";

/// Relay configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Listener address
    pub server: ServerConfig,

    /// Volume the state store starts with (0-100)
    pub volume: u8,

    /// Debounce window for event-driven broadcasts
    pub debounce_ms: u64,

    /// Upper bound on a single player control call
    pub command_timeout_ms: u64,

    /// Environment mode (development, staging, production)
    pub environment: Environment,
}

impl RelayConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `RELAY_HOSTNAME`, `RELAY_PORT`, `RELAY_VOLUME`,
    /// `RELAY_DEBOUNCE_MS`, `RELAY_COMMAND_TIMEOUT_MS` and `ENVIRONMENT`.
    /// Out-of-range volumes are clamped; zero durations are rejected.
    pub fn from_env() -> ConfigResult<Self> {
        let config = Self {
            server: ServerConfig::from_env(ENV_PREFIX)?,
            volume: clamp_volume(parse_env("RELAY_VOLUME", MAX_VOLUME as i64)?),
            debounce_ms: parse_env("RELAY_DEBOUNCE_MS", DEFAULT_DEBOUNCE.as_millis() as u64)?,
            command_timeout_ms: parse_env(
                "RELAY_COMMAND_TIMEOUT_MS",
                DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
            )?,
            environment: Environment::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants `from_env` enforces
    pub fn validate(&self) -> ConfigResult<()> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::invalid("RELAY_DEBOUNCE_MS", "must be greater than zero"));
        }
        if self.command_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "RELAY_COMMAND_TIMEOUT_MS",
                "must be greater than zero",
            ));
        }
        if self.volume > MAX_VOLUME {
            return Err(ConfigError::invalid(
                "RELAY_VOLUME",
                format!("{} exceeds {}", self.volume, MAX_VOLUME),
            ));
        }
        Ok(())
    }

    /// Configuration listening on `hostname:port` with default tuning
    pub fn with_address(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            server: ServerConfig::new(hostname, port),
            ..Self::default()
        }
    }

    /// Whether switching to `other` needs the listener to be restarted
    ///
    /// Only the host name and port are bound by the listener; the
    /// remaining settings take effect on the next start.
    pub fn requires_rebind(&self, other: &RelayConfig) -> bool {
        self.server != other.server
    }

    /// Resolve the listener address
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.server.socket_addr()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            volume: MAX_VOLUME,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT.as_millis() as u64,
            environment: Environment::default(),
        }
    }
}
