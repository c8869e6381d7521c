//! RFC3161 timestamp domain type.
//!
//! A timestamp is an unsigned attribute of the signer info: the timestamp
//! authority (TSA) countersigns a hash of the signature value together with
//! the time it observed.

use super::SignerProof;
use crate::domain::crypto::{Cert, HashAlgorithm};
use std::time::{Duration, SystemTime};

/// Hash algorithm and digest of the data the TSA timestamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageImprint {
    pub hash_algorithm: HashAlgorithm,
    pub hashed_message: Vec<u8>,
}

impl MessageImprint {
    /// Imprint of `data` under `hash_algorithm`.
    #[must_use]
    pub fn compute(hash_algorithm: HashAlgorithm, data: &[u8]) -> Self {
        Self {
            hash_algorithm,
            hashed_message: hash_algorithm.digest(data),
        }
    }

    /// Whether this imprint was computed over `data`.
    #[must_use]
    pub fn matches(&self, data: &[u8]) -> bool {
        self.hash_algorithm.digest(data) == self.hashed_message
    }
}

/// Parsed RFC3161 timestamp.
#[derive(Debug, Clone)]
pub struct Timestamp {
    generation_time: SystemTime,
    accuracy: Duration,
    message_imprint: MessageImprint,
    signer_certificate: Cert,
    certificates: Vec<Cert>,
    proof: Option<SignerProof>,
}

impl Timestamp {
    #[must_use]
    pub fn new(
        generation_time: SystemTime,
        message_imprint: MessageImprint,
        signer_certificate: Cert,
    ) -> Self {
        Self {
            generation_time,
            accuracy: Duration::ZERO,
            message_imprint,
            signer_certificate,
            certificates: Vec::new(),
            proof: None,
        }
    }

    #[must_use]
    pub fn with_accuracy(mut self, accuracy: Duration) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Certificates embedded in the timestamp token.
    #[must_use]
    pub fn with_certificates(mut self, certificates: Vec<Cert>) -> Self {
        self.certificates = certificates;
        self
    }

    /// The TSA signer's signature over the token's signed attributes.
    #[must_use]
    pub fn with_proof(mut self, proof: SignerProof) -> Self {
        self.proof = Some(proof);
        self
    }

    #[must_use]
    pub fn generation_time(&self) -> SystemTime {
        self.generation_time
    }

    #[must_use]
    pub fn accuracy(&self) -> Duration {
        self.accuracy
    }

    /// Earliest instant the timestamp may denote.
    #[must_use]
    pub fn lower_limit(&self) -> SystemTime {
        self.generation_time
            .checked_sub(self.accuracy)
            .unwrap_or(self.generation_time)
    }

    /// Latest instant the timestamp may denote.
    #[must_use]
    pub fn upper_limit(&self) -> SystemTime {
        self.generation_time
            .checked_add(self.accuracy)
            .unwrap_or(self.generation_time)
    }

    #[must_use]
    pub fn message_imprint(&self) -> &MessageImprint {
        &self.message_imprint
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
    pub fn proof(&self) -> Option<&SignerProof> {
        self.proof.as_ref()
    }

    /// Whether the whole accuracy window lies inside the certificate's validity.
    #[must_use]
    pub fn falls_within(&self, certificate: &Cert) -> bool {
        certificate.is_time_valid_at(self.lower_limit())
            && certificate.is_time_valid_at(self.upper_limit())
    }
}
