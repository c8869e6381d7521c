//! SHA-256 certificate fingerprint new-type.

use crate::infra::error::{VerifierError, VerifierResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// SHA-256 over a certificate's DER encoding.
///
/// Parsed from hex, case-insensitive, with optional `:` or space separators,
/// so values copied from common certificate viewers are accepted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertFingerprint([u8; 32]);

impl CertFingerprint {
    /// Fingerprint of the given certificate DER.
    #[must_use]
    pub fn of_der(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    /// Parse a hex fingerprint after validation
    pub fn new(hex_str: impl AsRef<str>) -> VerifierResult<Self> {
        let cleaned: String = hex_str
            .as_ref()
            .chars()
            .filter(|c| !matches!(c, ':' | ' '))
            .collect();
        if cleaned.len() != 64 {
            return Err(VerifierError::InvalidInput(format!(
                "SHA-256 fingerprint must be 64 hex characters, got {}",
                cleaned.len()
            )));
        }
        let bytes = hex::decode(&cleaned).map_err(|e| {
            VerifierError::InvalidInput(format!("Invalid fingerprint hex '{cleaned}': {e}"))
        })?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl FromStr for CertFingerprint {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CertFingerprint {
    type Error = VerifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CertFingerprint> for String {
    fn from(value: CertFingerprint) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for CertFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CertFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertFingerprint({})", self.to_hex())
    }
}
