//! Environment-driven settings shared by Resonance services
//!
//! Every setting is read from a process environment variable. Unset
//! variables fall back to a default; set but unparsable ones are errors.

mod error;
mod server;

pub use error::{ConfigError, ConfigResult};
pub use server::{ServerConfig, DEFAULT_HOSTNAME, DEFAULT_PORT};

use std::env;
use std::fmt;
use std::str::FromStr;

/// Variable naming the deployment environment
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Deployment environment a service runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Read [`ENVIRONMENT_VAR`]; unset or unrecognised values mean development
    pub fn from_env() -> Self {
        env_or(ENVIRONMENT_VAR, "development")
            .parse()
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let environment = match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        };
        Ok(environment)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of `name`, or `default` when unset
pub fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parse `name` into `T`, or return `default` when unset
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::invalid(name, e)),
        Err(_) => Ok(default),
    }
}
