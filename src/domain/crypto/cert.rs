//! X.509 certificate wrapper.

use super::fingerprint::CertFingerprint;
use super::signature::SignatureScheme;
use crate::infra::error::{VerifierError, VerifierResult};
use const_oid::{AssociatedOid, ObjectIdentifier};
use der::{Decode, DecodePem, Encode};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, CrlDistributionPoints, ExtendedKeyUsage, KeyUsage,
    KeyUsages, SubjectKeyIdentifier,
};
use x509_cert::Certificate;

/// Parsed certificate together with its DER encoding and fingerprint.
///
/// Cheap accessors for the extensions the chain builder and trust provider
/// care about. Unknown or undecodable extensions read as absent.
#[derive(Clone)]
pub struct Cert {
    certificate: Certificate,
    der: Box<[u8]>,
    fingerprint: CertFingerprint,
}

impl Cert {
    pub fn from_der(der: &[u8]) -> VerifierResult<Self> {
        let certificate = Certificate::from_der(der)
            .map_err(|e| VerifierError::Certificate(format!("Invalid certificate DER: {e}")))?;
        Ok(Self {
            certificate,
            der: der.to_vec().into_boxed_slice(),
            fingerprint: CertFingerprint::of_der(der),
        })
    }

    pub fn from_pem(pem: &str) -> VerifierResult<Self> {
        let certificate = Certificate::from_pem(pem)
            .map_err(|e| VerifierError::Certificate(format!("Invalid certificate PEM: {e}")))?;
        Self::from_certificate(certificate)
    }

    /// Parse every `CERTIFICATE` block of a PEM bundle.
    pub fn from_pem_bundle(pem: &str) -> VerifierResult<Vec<Self>> {
        if pem.trim().is_empty() {
            return Ok(Vec::new());
        }
        Certificate::load_pem_chain(pem.as_bytes())
            .map_err(|e| VerifierError::Certificate(format!("Invalid certificate PEM bundle: {e}")))?
            .into_iter()
            .map(Self::from_certificate)
            .collect()
    }

    pub fn from_certificate(certificate: Certificate) -> VerifierResult<Self> {
        let der = certificate.to_der()?;
        let fingerprint = CertFingerprint::of_der(&der);
        Ok(Self {
            certificate,
            der: der.into_boxed_slice(),
            fingerprint,
        })
    }

    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn fingerprint(&self) -> CertFingerprint {
        self.fingerprint
    }

    #[must_use]
    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    #[must_use]
    pub fn issuer(&self) -> String {
        self.certificate.tbs_certificate.issuer.to_string()
    }

    #[must_use]
    pub fn serial_hex(&self) -> String {
        hex::encode(self.certificate.tbs_certificate.serial_number.as_bytes())
    }

    #[must_use]
    pub fn not_before(&self) -> SystemTime {
        UNIX_EPOCH
            + self
                .certificate
                .tbs_certificate
                .validity
                .not_before
                .to_unix_duration()
    }

    #[must_use]
    pub fn not_after(&self) -> SystemTime {
        UNIX_EPOCH
            + self
                .certificate
                .tbs_certificate
                .validity
                .not_after
                .to_unix_duration()
    }

    /// Whether `at` falls inside the validity window (inclusive bounds).
    #[must_use]
    pub fn is_time_valid_at(&self, at: SystemTime) -> bool {
        at >= self.not_before() && at <= self.not_after()
    }

    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.certificate.tbs_certificate.subject == self.certificate.tbs_certificate.issuer
    }

    /// Self-issued and verifiable with its own key.
    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.is_self_issued() && self.verify_issued_by(self).is_ok()
    }

    /// Check that `issuer` signed this certificate.
    pub fn verify_issued_by(&self, issuer: &Cert) -> VerifierResult<()> {
        let tbs = self.certificate.tbs_certificate.to_der()?;
        let scheme = SignatureScheme::from_oids(&self.certificate.signature_algorithm.oid, None)?;
        let signature = self.certificate.signature.as_bytes().ok_or_else(|| {
            VerifierError::Certificate("Certificate signature has unused bits".into())
        })?;
        scheme.verify(
            &issuer.certificate.tbs_certificate.subject_public_key_info,
            &tbs,
            signature,
        )
    }

    /// Name-chaining test: subject/issuer match, plus key identifiers when both present.
    #[must_use]
    pub fn could_be_issued_by(&self, issuer: &Cert) -> bool {
        if self.certificate.tbs_certificate.issuer != issuer.certificate.tbs_certificate.subject {
            return false;
        }
        match (self.authority_key_id(), issuer.subject_key_id()) {
            (Some(aki), Some(ski)) => aki == ski,
            _ => true,
        }
    }

    fn extension<T>(&self) -> Option<T>
    where
        T: AssociatedOid + for<'a> Decode<'a>,
    {
        self.raw_extension(&T::OID)
            .and_then(|bytes| T::from_der(bytes).ok())
    }

    fn raw_extension(&self, oid: &ObjectIdentifier) -> Option<&[u8]> {
        self.certificate
            .tbs_certificate
            .extensions
            .as_ref()?
            .iter()
            .find(|ext| ext.extn_id == *oid)
            .map(|ext| ext.extn_value.as_bytes())
    }

    #[must_use]
    pub fn basic_constraints(&self) -> Option<BasicConstraints> {
        self.extension::<BasicConstraints>()
    }

    /// `None` when the certificate carries no key usage extension.
    #[must_use]
    pub fn allows_cert_sign(&self) -> Option<bool> {
        self.extension::<KeyUsage>()
            .map(|ku| ku.0.contains(KeyUsages::KeyCertSign))
    }

    /// `None` when the certificate carries no extended key usage extension.
    #[must_use]
    pub fn extended_key_usages(&self) -> Option<Vec<ObjectIdentifier>> {
        self.extension::<ExtendedKeyUsage>().map(|eku| eku.0)
    }

    #[must_use]
    pub fn subject_key_id(&self) -> Option<Vec<u8>> {
        self.extension::<SubjectKeyIdentifier>()
            .map(|ski| ski.0.as_bytes().to_vec())
    }

    #[must_use]
    pub fn authority_key_id(&self) -> Option<Vec<u8>> {
        self.extension::<AuthorityKeyIdentifier>()
            .and_then(|aki| aki.key_identifier)
            .map(|id| id.as_bytes().to_vec())
    }

    /// HTTP(S) URIs listed in the CRL distribution points extension.
    #[must_use]
    pub fn crl_distribution_urls(&self) -> Vec<String> {
        let Some(points) = self.extension::<CrlDistributionPoints>() else {
            return Vec::new();
        };
        points
            .0
            .iter()
            .filter_map(|dp| match &dp.distribution_point {
                Some(DistributionPointName::FullName(names)) => Some(names),
                _ => None,
            })
            .flatten()
            .filter_map(|name| match name {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
            .filter(|uri| uri.starts_with("http://") || uri.starts_with("https://"))
            .collect()
    }
}

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for Cert {}

impl fmt::Debug for Cert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cert")
            .field("subject", &self.subject())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
