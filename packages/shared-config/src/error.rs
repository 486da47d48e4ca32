//! Errors raised while reading configuration

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A single setting could not be parsed or is out of range
    #[error("{name} is invalid: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ConfigError {
    pub fn invalid(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
