//! Custom error types for SSA Vault
//!
//! Every fallible operation in the crate returns [`VaultResult`]. The variants
//! map onto the failure kinds a caller has to tell apart: a wrong passphrase,
//! an envelope whose authentication tag does not verify, a missing record,
//! a failing storage medium and a repeated setup.

use thiserror::Error;

/// The main error type for SSA Vault operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The supplied passphrase did not reproduce the stored verification value
    #[error("Invalid passphrase")]
    InvalidPassphrase,

    /// Authentication tag failed to verify (corrupted record or wrong key)
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Underlying persistence medium failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Passphrase setup attempted when a setup record already exists
    #[error("Setup error: {0}")]
    Setup(String),

    /// An operation needed the session key while the vault was locked
    #[error("Vault is locked")]
    Locked,

    /// A lifecycle operation was invoked from the wrong state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Encryption-side primitive failure
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for user input
    #[error("Validation error: {0}")]
    Validation(String),
}

impl VaultError {
    /// Create a "not found" error for reports
    pub fn report_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Report",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for the provider configuration
    pub fn config_not_found() -> Self {
        Self::NotFound {
            entity_type: "Config",
            identifier: "provider settings".into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a decryption (tag verification) error
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption(_))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for SSA Vault operations
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::Storage("disk full".into());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_not_found_error() {
        let err = VaultError::report_not_found("3f2a");
        assert_eq!(err.to_string(), "Report not found: 3f2a");
        assert!(err.is_not_found());
        assert!(!err.is_decryption());
    }

    #[test]
    fn test_passphrase_error_does_not_leak_input() {
        let err = VaultError::InvalidPassphrase;
        assert_eq!(err.to_string(), "Invalid passphrase");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let vault_err: VaultError = io_err.into();
        assert!(matches!(vault_err, VaultError::Io(_)));
    }
}
