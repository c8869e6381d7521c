//! Package signature domain model.
//!
//! A `Signature` is the parsed, read-only form of a CMS signature block. It
//! owns its certificates and timestamps; nothing in it is shared across
//! verification calls.

pub mod content;
pub mod timestamp;

use crate::domain::crypto::{Cert, SignatureScheme};
use crate::infra::error::VerifierResult;
use serde::Serialize;
use std::fmt;

pub use content::SignatureContent;
pub use timestamp::{MessageImprint, Timestamp};

/// Who produced the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    Author,
    Repository,
    Unknown,
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignatureKind::Author => "author",
            SignatureKind::Repository => "repository",
            SignatureKind::Unknown => "unknown",
        })
    }
}

/// Signed attributes and the signer's signature over them.
#[derive(Clone, PartialEq, Eq)]
pub struct SignerProof {
    signed_attributes: Vec<u8>,
    signature_value: Vec<u8>,
    scheme: SignatureScheme,
}

impl SignerProof {
    /// `signed_attributes` is the DER `SET OF Attribute` exactly as signed.
    #[must_use]
    pub fn new(signed_attributes: Vec<u8>, signature_value: Vec<u8>, scheme: SignatureScheme) -> Self {
        Self {
            signed_attributes,
            signature_value,
            scheme,
        }
    }

    #[must_use]
    pub fn signed_attributes(&self) -> &[u8] {
        &self.signed_attributes
    }

    #[must_use]
    pub fn signature_value(&self) -> &[u8] {
        &self.signature_value
    }

    #[must_use]
    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// Verify the signature value with `signer`'s public key.
    pub fn verify(&self, signer: &Cert) -> VerifierResult<()> {
        self.scheme.verify(
            &signer.certificate().tbs_certificate.subject_public_key_info,
            &self.signed_attributes,
            &self.signature_value,
        )
    }
}

impl fmt::Debug for SignerProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignerProof(scheme={:?}, attrs_len={}, sig_len={})",
            self.scheme,
            self.signed_attributes.len(),
            self.signature_value.len()
        )
    }
}

/// Parsed package signature.
#[derive(Debug, Clone)]
pub struct Signature {
    kind: SignatureKind,
    signer_certificate: Cert,
    certificates: Vec<Cert>,
    content: SignatureContent,
    proof: SignerProof,
    timestamps: Vec<Timestamp>,
}

impl Signature {
    #[must_use]
    pub fn new(
        kind: SignatureKind,
        signer_certificate: Cert,
        content: SignatureContent,
        proof: SignerProof,
    ) -> Self {
        Self {
            kind,
            signer_certificate,
            certificates: Vec::new(),
            content,
            proof,
            timestamps: Vec::new(),
        }
    }

    /// Certificates bundled in the signature envelope (unordered, untrusted).
    #[must_use]
    pub fn with_certificates(mut self, certificates: Vec<Cert>) -> Self {
        self.certificates = certificates;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamps.push(timestamp);
        self
    }

    #[must_use]
    pub fn kind(&self) -> SignatureKind {
        self.kind
    }

    #[must_use]
    pub fn signer_certificate(&self) -> &Cert {
        &self.signer_certificate
    }

    #[must_use]
    pub fn certificates(&self) -> &[Cert] {
        &self.certificates
    }

    #[must_use]
    pub fn content(&self) -> &SignatureContent {
        &self.content
    }

    #[must_use]
    pub fn proof(&self) -> &SignerProof {
        &self.proof
    }

    /// Raw signature value; the data a timestamp's imprint covers.
    #[must_use]
    pub fn signature_value(&self) -> &[u8] {
        self.proof.signature_value()
    }

    #[must_use]
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Only the first timestamp is evaluated when several are present.
    #[must_use]
    pub fn primary_timestamp(&self) -> Option<&Timestamp> {
        self.timestamps.first()
    }
}
