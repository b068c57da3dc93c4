//! @acp:module "Errors"
//! @acp:summary "Error taxonomy for dispatch, configuration and driver calls"
//! @acp:domain cli
//! @acp:layer model
//!
//! A declined confirmation is a [`crate::operation::Completion`], not an error.

use thiserror::Error;

use crate::driver::DriverError;

/// Errors surfaced by lhbin operations
#[derive(Debug, Error)]
pub enum LhError {
    /// Missing or invalid operator flag. Fatal to a batch before any driver call.
    #[error("invalid arguments: {0}")]
    Validation(String),

    /// No account matched the requested driver/account pair
    #[error("no account configured for driver '{driver}'{}", account_suffix(.account))]
    AccountNotFound { driver: String, account: String },

    /// The account names a driver this binary does not know
    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    /// A driver call failed outside of a batch
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

fn account_suffix(account: &str) -> String {
    if account.is_empty() {
        String::new()
    } else {
        format!(" named '{}'", account)
    }
}

impl LhError {
    /// Shorthand for a validation failure
    pub fn invalid(message: impl Into<String>) -> Self {
        LhError::Validation(message.into())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, LhError>;
