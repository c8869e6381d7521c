//! Hand-assembled CMS `SignedData` blobs and RFC3161 tokens.

use super::pki::Identity;
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
};
use const_oid::ObjectIdentifier;
use der::asn1::{GeneralizedTime, Int, OctetString, SetOfVec};
use der::{Any, Decode, Encode, Sequence};
use package_signature_verifier::domain::constants::{
    ID_AA_COMMITMENT_TYPE, ID_AA_TIMESTAMP_TOKEN, ID_CTI_PROOF_OF_ORIGIN, ID_CTI_PROOF_OF_RECEIPT,
    ID_CT_TST_INFO, ID_DATA, ID_MESSAGE_DIGEST, ID_SIGNED_DATA,
};
use package_signature_verifier::domain::signature::SignatureContent;
use package_signature_verifier::{Cert, HashAlgorithm, SignatureKind};
use spki::AlgorithmIdentifierOwned;
use std::time::SystemTime;
use x509_cert::attr::Attribute;

#[derive(Sequence)]
struct CommitmentType {
    id: ObjectIdentifier,
}

#[derive(Sequence)]
struct Imprint {
    hash_algorithm: AlgorithmIdentifierOwned,
    hashed_message: OctetString,
}

#[derive(Sequence)]
struct TstInfo {
    version: u8,
    policy: ObjectIdentifier,
    message_imprint: Imprint,
    serial_number: Int,
    gen_time: GeneralizedTime,
}

fn sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: HashAlgorithm::Sha256.oid(),
        parameters: None,
    }
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Attribute {
    Attribute {
        oid,
        values: SetOfVec::try_from(vec![value]).expect("attribute values"),
    }
}

fn octets(bytes: &[u8]) -> Any {
    Any::encode_from(&OctetString::new(bytes).expect("octets")).expect("any")
}

/// Signer info over `econtent`, signed by `signer`.
fn signer_info(econtent: &[u8], signer: &Identity, extra: Vec<Attribute>) -> SignerInfo {
    let mut attributes = vec![attribute(
        ID_MESSAGE_DIGEST,
        octets(&HashAlgorithm::Sha256.digest(econtent)),
    )];
    attributes.extend(extra);
    let signed_attrs = SetOfVec::try_from(attributes).expect("signed attributes");
    let signature = signer.sign(&signed_attrs.to_der().expect("attributes der"));

    let tbs = &signer.cert.certificate().tbs_certificate;
    SignerInfo {
        version: CmsVersion::V1,
        sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: tbs.issuer.clone(),
            serial_number: tbs.serial_number.clone(),
        }),
        digest_alg: sha256(),
        signed_attrs: Some(signed_attrs),
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            parameters: None,
        },
        signature: OctetString::new(signature).expect("signature"),
        unsigned_attrs: None,
    }
}

fn content_info(
    econtent_type: ObjectIdentifier,
    econtent: &[u8],
    certificates: &[&Cert],
    info: SignerInfo,
) -> Vec<u8> {
    let certs = certificates
        .iter()
        .map(|c| CertificateChoices::Certificate(c.certificate().clone()))
        .collect::<Vec<_>>();
    let signed_data = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::try_from(vec![sha256()]).expect("digest algorithms"),
        encap_content_info: EncapsulatedContentInfo {
            econtent_type,
            econtent: Some(octets(econtent)),
        },
        certificates: Some(CertificateSet(SetOfVec::try_from(certs).expect("certificates"))),
        crls: None,
        signer_infos: SignerInfos(SetOfVec::try_from(vec![info]).expect("signer infos")),
    };
    ContentInfo {
        content_type: ID_SIGNED_DATA,
        content: Any::encode_from(&signed_data).expect("signed data"),
    }
    .to_der()
    .expect("content info")
}

/// RFC3161 token over `value` from `tsa` at `at`.
pub fn timestamp_token(value: &[u8], tsa: &Identity, at: SystemTime) -> Vec<u8> {
    let tst = TstInfo {
        version: 1,
        policy: ObjectIdentifier::new_unwrap("1.2.3.4.1"),
        message_imprint: Imprint {
            hash_algorithm: sha256(),
            hashed_message: OctetString::new(HashAlgorithm::Sha256.digest(value)).expect("imprint"),
        },
        serial_number: Int::new(&[0x2a]).expect("serial"),
        gen_time: GeneralizedTime::from_system_time(at).expect("gen time"),
    }
    .to_der()
    .expect("tst info");
    let info = signer_info(&tst, tsa, Vec::new());
    content_info(ID_CT_TST_INFO, &tst, &[&tsa.cert], info)
}

/// Options for a package signature blob.
pub struct BlobOptions<'a> {
    pub kind: SignatureKind,
    pub certificates: Vec<&'a Cert>,
    pub timestamp: Option<(&'a Identity, SystemTime)>,
}

/// DER `ContentInfo` signing `package` as `signer`.
pub fn package_signature(package: &[u8], signer: &Identity, options: BlobOptions<'_>) -> Vec<u8> {
    let econtent = SignatureContent::for_package(HashAlgorithm::Sha256, package).to_bytes();

    let commitment = match options.kind {
        SignatureKind::Author => Some(ID_CTI_PROOF_OF_ORIGIN),
        SignatureKind::Repository => Some(ID_CTI_PROOF_OF_RECEIPT),
        SignatureKind::Unknown => None,
    };
    let extra = commitment
        .map(|id| {
            attribute(
                ID_AA_COMMITMENT_TYPE,
                Any::encode_from(&CommitmentType { id }).expect("commitment"),
            )
        })
        .into_iter()
        .collect();

    let mut info = signer_info(&econtent, signer, extra);
    if let Some((tsa, at)) = options.timestamp {
        let token = timestamp_token(info.signature.as_bytes(), tsa, at);
        let value = Any::from_der(&token).expect("token any");
        info.unsigned_attrs = Some(
            SetOfVec::try_from(vec![attribute(ID_AA_TIMESTAMP_TOKEN, value)])
                .expect("unsigned attributes"),
        );
    }

    let mut certificates = vec![&signer.cert];
    certificates.extend(options.certificates);
    content_info(ID_DATA, &econtent, &certificates, info)
}
