//! Error types for signature verification.
//!
//! Policy violations are never errors: they are reported as issues on a
//! provider result. This enum covers malformed input, collaborator failures
//! and cancellation.

use thiserror::Error;

/// Result type for verification operations
pub type VerifierResult<T> = Result<T, VerifierError>;

/// Error types raised while parsing or verifying signatures
#[derive(Error, Debug, miette::Diagnostic)]
pub enum VerifierError {
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1(String),

    #[error("Cryptographic error: {0}")]
    Cryptographic(String),

    #[error("Revocation check error: {0}")]
    Revocation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Verification cancelled")]
    #[diagnostic(help("the operation was cancelled by the caller; no verdict was reached"))]
    Cancelled,
}

impl VerifierError {
    /// True when the error represents caller cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, VerifierError::Cancelled)
    }
}

impl From<der::Error> for VerifierError {
    fn from(error: der::Error) -> Self {
        VerifierError::Asn1(error.to_string())
    }
}

impl From<reqwest::Error> for VerifierError {
    fn from(error: reqwest::Error) -> Self {
        VerifierError::Network(error.to_string())
    }
}

impl From<std::io::Error> for VerifierError {
    fn from(error: std::io::Error) -> Self {
        VerifierError::Io(error.to_string())
    }
}

impl From<toml::de::Error> for VerifierError {
    fn from(error: toml::de::Error) -> Self {
        VerifierError::Configuration(error.to_string())
    }
}

impl From<serde_json::Error> for VerifierError {
    fn from(error: serde_json::Error) -> Self {
        VerifierError::Configuration(error.to_string())
    }
}
