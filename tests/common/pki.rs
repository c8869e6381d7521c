//! Throwaway P-256 PKI for tests: roots, intermediates, code-signing and
//! time-stamping leaves, signatures, timestamps and CRLs.

use der::asn1::{BitString, GeneralizedTime, Ia5String};
use der::Encode;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{DerSignature, SigningKey};
use package_signature_verifier::domain::constants::{ID_KP_CODE_SIGNING, ID_KP_TIME_STAMPING};
use package_signature_verifier::domain::crypto::SignatureScheme;
use package_signature_verifier::domain::signature::{
    MessageImprint, SignatureContent, SignerProof,
};
use package_signature_verifier::{Cert, HashAlgorithm, Signature, SignatureKind, Timestamp};
use rand::rngs::OsRng;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{CrlDistributionPoints, ExtendedKeyUsage};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::Version;

pub const DAY: Duration = Duration::from_secs(86_400);

/// Current time truncated to whole seconds, as certificates encode it.
pub fn now() -> SystemTime {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs();
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn time(at: SystemTime) -> Time {
    Time::GeneralTime(GeneralizedTime::from_system_time(at).expect("representable time"))
}

/// A certificate together with its private key.
#[derive(Clone)]
pub struct Identity {
    pub cert: Cert,
    pub key: SigningKey,
}

impl Identity {
    pub fn name(&self) -> Name {
        self.cert.certificate().tbs_certificate.subject.clone()
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: DerSignature = self.key.sign(message);
        signature.as_bytes().to_vec()
    }
}

/// Parameters of a certificate to issue.
pub struct CertSpec<'a> {
    pub common_name: &'a str,
    pub serial: u8,
    pub not_before: SystemTime,
    pub not_after: SystemTime,
    pub ekus: Vec<const_oid::ObjectIdentifier>,
    pub crl_url: Option<&'a str>,
}

impl<'a> CertSpec<'a> {
    /// Valid from yesterday for a year.
    pub fn new(common_name: &'a str, serial: u8) -> Self {
        let now = now();
        Self {
            common_name,
            serial,
            not_before: now - DAY,
            not_after: now + 365 * DAY,
            ekus: Vec::new(),
            crl_url: None,
        }
    }

    pub fn valid(mut self, not_before: SystemTime, not_after: SystemTime) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn eku(mut self, oid: const_oid::ObjectIdentifier) -> Self {
        self.ekus.push(oid);
        self
    }

    pub fn crl_url(mut self, url: &'a str) -> Self {
        self.crl_url = Some(url);
        self
    }
}

enum Kind<'a> {
    Root,
    SubCa(&'a Identity, Option<u8>),
    Leaf(&'a Identity),
}

fn issue(spec: CertSpec<'_>, kind: Kind<'_>) -> Identity {
    let key = SigningKey::random(&mut OsRng);
    let subject = Name::from_str(&format!("CN={},O=Test PKI", spec.common_name)).expect("name");
    let public_key = SubjectPublicKeyInfoOwned::from_key(*key.verifying_key()).expect("spki");
    let validity = Validity {
        not_before: time(spec.not_before),
        not_after: time(spec.not_after),
    };
    let serial = SerialNumber::new(&[spec.serial]).expect("serial");

    let (profile, signer) = match &kind {
        Kind::Root => (Profile::Root, &key),
        Kind::SubCa(issuer, path_len) => (
            Profile::SubCA {
                issuer: issuer.name(),
                path_len_constraint: *path_len,
            },
            &issuer.key,
        ),
        Kind::Leaf(issuer) => (
            Profile::Leaf {
                issuer: issuer.name(),
                enable_key_agreement: false,
                enable_key_encipherment: false,
            },
            &issuer.key,
        ),
    };

    let mut builder = CertificateBuilder::new(profile, serial, validity, subject, public_key, signer)
        .expect("certificate builder");
    if !spec.ekus.is_empty() {
        builder
            .add_extension(&ExtendedKeyUsage(spec.ekus.clone()))
            .expect("eku extension");
    }
    if let Some(url) = spec.crl_url {
        let point = DistributionPoint {
            distribution_point: Some(DistributionPointName::FullName(vec![
                GeneralName::UniformResourceIdentifier(Ia5String::new(url).expect("ia5 url")),
            ])),
            reasons: None,
            crl_issuer: None,
        };
        builder
            .add_extension(&CrlDistributionPoints(vec![point]))
            .expect("cdp extension");
    }
    let certificate = builder.build::<DerSignature>().expect("signed certificate");
    Identity {
        cert: Cert::from_certificate(certificate).expect("cert wrapper"),
        key,
    }
}

pub fn root(spec: CertSpec<'_>) -> Identity {
    issue(spec, Kind::Root)
}

pub fn intermediate(spec: CertSpec<'_>, issuer: &Identity) -> Identity {
    sub_ca(spec, issuer, Some(0))
}

/// Subordinate CA with an explicit `pathLenConstraint`.
pub fn sub_ca(spec: CertSpec<'_>, issuer: &Identity, path_len: Option<u8>) -> Identity {
    issue(spec, Kind::SubCa(issuer, path_len))
}

pub fn leaf(spec: CertSpec<'_>, issuer: &Identity) -> Identity {
    issue(spec, Kind::Leaf(issuer))
}

/// Root -> intermediate -> code-signing leaf, plus a time-stamping authority
/// issued directly by the root.
pub struct TestPki {
    pub root: Identity,
    pub intermediate: Identity,
    pub signer: Identity,
    pub tsa: Identity,
}

impl TestPki {
    pub fn new() -> Self {
        let root = root(CertSpec::new("Test Root", 1).valid(now() - 30 * DAY, now() + 3650 * DAY));
        let intermediate = intermediate(
            CertSpec::new("Test Intermediate", 2).valid(now() - 30 * DAY, now() + 1825 * DAY),
            &root,
        );
        let signer = leaf(
            CertSpec::new("Test Signer", 3).eku(ID_KP_CODE_SIGNING),
            &intermediate,
        );
        let tsa = leaf(
            CertSpec::new("Test TSA", 4)
                .valid(now() - 30 * DAY, now() + 1825 * DAY)
                .eku(ID_KP_TIME_STAMPING),
            &root,
        );
        Self {
            root,
            intermediate,
            signer,
            tsa,
        }
    }

    /// A code-signing leaf under the intermediate with its own validity.
    pub fn signer_valid(&self, not_before: SystemTime, not_after: SystemTime) -> Identity {
        leaf(
            CertSpec::new("Test Signer", 5)
                .valid(not_before, not_after)
                .eku(ID_KP_CODE_SIGNING),
            &self.intermediate,
        )
    }

    /// Certificates a signature from `signer` would bundle.
    pub fn bundle(&self) -> Vec<Cert> {
        vec![self.intermediate.cert.clone()]
    }
}

/// Sign `package` as `signer` of the given kind, bundling `certificates`.
pub fn sign_package(
    package: &[u8],
    signer: &Identity,
    kind: SignatureKind,
    certificates: Vec<Cert>,
) -> Signature {
    let content = SignatureContent::for_package(HashAlgorithm::Sha256, package);
    let attributes = content.to_bytes();
    let proof = SignerProof::new(
        attributes.clone(),
        signer.sign(&attributes),
        SignatureScheme::Ecdsa(HashAlgorithm::Sha256),
    );
    Signature::new(kind, signer.cert.clone(), content, proof).with_certificates(certificates)
}

/// A timestamp over `signature`'s value issued by `tsa` at `at`.
pub fn timestamp(signature: &Signature, tsa: &Identity, at: SystemTime) -> Timestamp {
    timestamp_over(signature.signature_value(), tsa, at)
}

pub fn timestamp_over(value: &[u8], tsa: &Identity, at: SystemTime) -> Timestamp {
    let imprint = MessageImprint::compute(HashAlgorithm::Sha256, value);
    let attributes = [imprint.hashed_message.as_slice(), b"tst"].concat();
    let proof = SignerProof::new(
        attributes.clone(),
        tsa.sign(&attributes),
        SignatureScheme::Ecdsa(HashAlgorithm::Sha256),
    );
    Timestamp::new(at, imprint, tsa.cert.clone()).with_proof(proof)
}

/// DER CRL issued by `issuer` listing `revoked`.
pub fn crl(issuer: &Identity, revoked: &[&Cert], next_update: SystemTime) -> Vec<u8> {
    crl_issued(issuer, revoked, now() - DAY, next_update)
}

/// DER CRL with an explicit `thisUpdate`.
pub fn crl_issued(
    issuer: &Identity,
    revoked: &[&Cert],
    this_update: SystemTime,
    next_update: SystemTime,
) -> Vec<u8> {
    let entries: Vec<RevokedCert> = revoked
        .iter()
        .map(|cert| RevokedCert {
            serial_number: cert.certificate().tbs_certificate.serial_number.clone(),
            revocation_date: time(this_update),
            crl_entry_extensions: None,
        })
        .collect();
    let algorithm = AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
        parameters: None,
    };
    let tbs = TbsCertList {
        version: Version::V2,
        signature: algorithm.clone(),
        issuer: issuer.name(),
        this_update: time(this_update),
        next_update: Some(time(next_update)),
        revoked_certificates: if entries.is_empty() { None } else { Some(entries) },
        crl_extensions: None,
    };
    let signature = issuer.sign(&tbs.to_der().expect("tbs der"));
    CertificateList {
        tbs_cert_list: tbs,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&signature).expect("bit string"),
    }
    .to_der()
    .expect("crl der")
}
