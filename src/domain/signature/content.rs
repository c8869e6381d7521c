//! Signed content document.
//!
//! The encapsulated content of a package signature is a small text document:
//!
//! ```text
//! Version:1
//!
//! 2.16.840.1.101.3.4.2.1-Hash:<base64 digest>
//!
//! ```
//!
//! Lines end with CRLF or LF. Unknown `key:value` lines in the hash section are
//! ignored so later versions can add properties.

use crate::domain::constants::{SIGNATURE_CONTENT_HASH_SUFFIX, SIGNATURE_CONTENT_VERSION_LINE};
use crate::domain::crypto::HashAlgorithm;
use crate::infra::error::{VerifierError, VerifierResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use const_oid::ObjectIdentifier;
use std::str::FromStr;

/// Package digest recorded inside a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureContent {
    hash_algorithm: HashAlgorithm,
    hash_value: Vec<u8>,
}

impl SignatureContent {
    pub fn new(hash_algorithm: HashAlgorithm, hash_value: Vec<u8>) -> VerifierResult<Self> {
        if hash_value.len() != hash_algorithm.digest_size() {
            return Err(VerifierError::MalformedSignature(format!(
                "{} digest must be {} bytes, got {}",
                hash_algorithm,
                hash_algorithm.digest_size(),
                hash_value.len()
            )));
        }
        Ok(Self {
            hash_algorithm,
            hash_value,
        })
    }

    /// Build the content for the given package bytes.
    #[must_use]
    pub fn for_package(hash_algorithm: HashAlgorithm, package: &[u8]) -> Self {
        Self {
            hash_algorithm,
            hash_value: hash_algorithm.digest(package),
        }
    }

    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    #[must_use]
    pub fn hash_value(&self) -> &[u8] {
        &self.hash_value
    }

    /// Parse the text document.
    pub fn from_bytes(bytes: &[u8]) -> VerifierResult<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| {
            VerifierError::MalformedSignature("Signature content is not UTF-8".into())
        })?;
        let mut lines = text.split('\n').map(|l| l.trim_end_matches('\r'));

        if lines.next() != Some(SIGNATURE_CONTENT_VERSION_LINE) {
            return Err(VerifierError::MalformedSignature(
                "Signature content has an unsupported version".into(),
            ));
        }
        if lines.next() != Some("") {
            return Err(VerifierError::MalformedSignature(
                "Signature content header is not terminated".into(),
            ));
        }

        let mut found: Option<Self> = None;
        for line in lines.take_while(|l| !l.is_empty()) {
            let (key, value) = line.split_once(':').ok_or_else(|| {
                VerifierError::MalformedSignature(format!("Invalid content property: {line}"))
            })?;
            let Some(oid) = key.strip_suffix(SIGNATURE_CONTENT_HASH_SUFFIX) else {
                continue;
            };
            if found.is_some() {
                return Err(VerifierError::MalformedSignature(
                    "Signature content declares more than one hash".into(),
                ));
            }
            let oid = ObjectIdentifier::from_str(oid).map_err(|e| {
                VerifierError::MalformedSignature(format!("Invalid hash OID '{oid}': {e}"))
            })?;
            let algorithm = HashAlgorithm::from_oid(&oid)?;
            let digest = STANDARD.decode(value.trim()).map_err(|e| {
                VerifierError::MalformedSignature(format!("Invalid content hash encoding: {e}"))
            })?;
            found = Some(Self::new(algorithm, digest)?);
        }

        found.ok_or_else(|| {
            VerifierError::MalformedSignature("Signature content has no package hash".into())
        })
    }

    /// Serialize to the canonical text document.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "{SIGNATURE_CONTENT_VERSION_LINE}\r\n\r\n{}{SIGNATURE_CONTENT_HASH_SUFFIX}:{}\r\n\r\n",
            self.hash_algorithm.oid(),
            STANDARD.encode(&self.hash_value)
        )
        .into_bytes()
    }
}
