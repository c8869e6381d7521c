//! CMS signature parser service.
//!
//! Decodes a DER `ContentInfo`/`SignedData` package signature into the
//! `Signature` domain model, including any RFC3161 timestamp tokens carried as
//! unsigned attributes. Every structural problem surfaces as
//! `VerifierError::MalformedSignature`.

use crate::domain::constants::{
    ID_AA_COMMITMENT_TYPE, ID_AA_TIMESTAMP_TOKEN, ID_CTI_PROOF_OF_ORIGIN, ID_CTI_PROOF_OF_RECEIPT,
    ID_CT_TST_INFO, ID_MESSAGE_DIGEST, ID_SIGNED_DATA,
};
use crate::domain::crypto::{Cert, HashAlgorithm, SignatureScheme};
use crate::domain::signature::{
    MessageImprint, Signature, SignatureContent, SignatureKind, SignerProof, Timestamp,
};
use crate::infra::error::{VerifierError, VerifierResult};
use cms::cert::CertificateChoices;
use cms::content_info::ContentInfo;
use cms::signed_data::{SignedData, SignerIdentifier, SignerInfo};
use const_oid::ObjectIdentifier;
use der::asn1::{GeneralizedTime, Int, OctetString};
use der::{Any, Decode, Encode, Sequence};
use spki::AlgorithmIdentifierOwned;
use std::time::{Duration, SystemTime};
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;

/// RFC3161 `MessageImprint`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct MessageImprintAsn1 {
    hash_algorithm: AlgorithmIdentifierOwned,
    hashed_message: OctetString,
}

/// RFC3161 `Accuracy`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct AccuracyAsn1 {
    #[asn1(optional = "true")]
    seconds: Option<u64>,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    millis: Option<u16>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    micros: Option<u16>,
}

impl AccuracyAsn1 {
    fn to_duration(&self) -> Duration {
        Duration::from_secs(self.seconds.unwrap_or(0))
            + Duration::from_millis(u64::from(self.millis.unwrap_or(0)))
            + Duration::from_micros(u64::from(self.micros.unwrap_or(0)))
    }
}

/// RFC3161 `TSTInfo`. `gen_time` stays raw because TSAs commonly emit
/// fractional seconds, which `GeneralizedTime` rejects.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct TstInfo {
    version: u8,
    policy: ObjectIdentifier,
    message_imprint: MessageImprintAsn1,
    serial_number: Int,
    gen_time: Any,
    #[asn1(optional = "true")]
    accuracy: Option<AccuracyAsn1>,
    #[asn1(default = "Default::default")]
    ordering: bool,
    #[asn1(optional = "true")]
    nonce: Option<Int>,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    tsa: Option<Any>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    extensions: Option<Vec<Extension>>,
}

/// ETSI `CommitmentTypeIndication`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct CommitmentTypeIndication {
    commitment_type_id: ObjectIdentifier,
    #[asn1(optional = "true")]
    qualifiers: Option<Any>,
}

/// Signer info of a `SignedData` resolved against its certificates.
struct ResolvedSigner {
    signer: Cert,
    certificates: Vec<Cert>,
    proof: SignerProof,
    econtent: Vec<u8>,
    info: SignerInfo,
}

fn malformed(msg: impl Into<String>) -> VerifierError {
    VerifierError::MalformedSignature(msg.into())
}

/// Stateless CMS decoder.
pub struct SignatureParser;

impl SignatureParser {
    /// Parse a DER encoded package signature.
    pub fn parse(der: &[u8]) -> VerifierResult<Signature> {
        let resolved = Self::resolve_signed_data(der, None)?;
        let content = SignatureContent::from_bytes(&resolved.econtent)?;

        let signed_attrs = resolved.info.signed_attrs.as_ref().map(|a| a.iter());
        let kind = signed_attrs
            .and_then(|mut attrs| attrs.find(|a| a.oid == ID_AA_COMMITMENT_TYPE))
            .map(Self::signature_kind)
            .transpose()?
            .unwrap_or(SignatureKind::Unknown);

        let mut signature = Signature::new(kind, resolved.signer, content, resolved.proof)
            .with_certificates(resolved.certificates);

        if let Some(unsigned) = &resolved.info.unsigned_attrs {
            for attr in unsigned.iter().filter(|a| a.oid == ID_AA_TIMESTAMP_TOKEN) {
                for value in attr.values.iter() {
                    let token = value.to_der().map_err(|e| malformed(e.to_string()))?;
                    signature = signature.with_timestamp(Self::parse_timestamp_token(&token)?);
                }
            }
        }

        log::debug!(
            "Parsed {} signature from {} ({} timestamp(s))",
            signature.kind(),
            signature.signer_certificate().subject(),
            signature.timestamps().len()
        );
        Ok(signature)
    }

    /// Parse an RFC3161 `TimeStampToken` (a `ContentInfo` wrapping `SignedData`).
    pub fn parse_timestamp_token(der: &[u8]) -> VerifierResult<Timestamp> {
        let resolved = Self::resolve_signed_data(der, Some(ID_CT_TST_INFO))?;
        let tst = TstInfo::from_der(&resolved.econtent)
            .map_err(|e| malformed(format!("Invalid TSTInfo: {e}")))?;
        if tst.version != 1 {
            return Err(malformed(format!("Unsupported TSTInfo version {}", tst.version)));
        }

        let hash_algorithm = HashAlgorithm::from_oid(&tst.message_imprint.hash_algorithm.oid)
            .map_err(|e| malformed(format!("Timestamp imprint: {e}")))?;
        let imprint = MessageImprint {
            hash_algorithm,
            hashed_message: tst.message_imprint.hashed_message.as_bytes().to_vec(),
        };
        let accuracy = tst
            .accuracy
            .as_ref()
            .map(AccuracyAsn1::to_duration)
            .unwrap_or_default();

        Ok(
            Timestamp::new(parse_generalized_time(&tst.gen_time)?, imprint, resolved.signer)
                .with_accuracy(accuracy)
                .with_certificates(resolved.certificates)
                .with_proof(resolved.proof),
        )
    }

    fn resolve_signed_data(
        der: &[u8],
        expected_econtent: Option<ObjectIdentifier>,
    ) -> VerifierResult<ResolvedSigner> {
        let content_info = ContentInfo::from_der(der)
            .map_err(|e| malformed(format!("Invalid ContentInfo: {e}")))?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(malformed(format!(
                "Expected SignedData content, found {}",
                content_info.content_type
            )));
        }
        let signed_data: SignedData = content_info
            .content
            .decode_as()
            .map_err(|e| malformed(format!("Invalid SignedData: {e}")))?;

        let encap = &signed_data.encap_content_info;
        if let Some(expected) = expected_econtent {
            if encap.econtent_type != expected {
                return Err(malformed(format!(
                    "Unexpected encapsulated content type {}",
                    encap.econtent_type
                )));
            }
        }
        let econtent = encap
            .econtent
            .as_ref()
            .ok_or_else(|| malformed("SignedData has no encapsulated content"))?
            .decode_as::<OctetString>()
            .map_err(|e| malformed(format!("Encapsulated content is not an OCTET STRING: {e}")))?
            .as_bytes()
            .to_vec();

        let certificates = signed_data
            .certificates
            .as_ref()
            .map(|set| {
                set.0
                    .iter()
                    .filter_map(|choice| match choice {
                        CertificateChoices::Certificate(c) => Some(Cert::from_certificate(c.clone())),
                        _ => None,
                    })
                    .collect::<VerifierResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let mut signer_infos = signed_data.signer_infos.0.iter();
        let info = match (signer_infos.next(), signer_infos.next()) {
            (Some(info), None) => info.clone(),
            (None, _) => return Err(malformed("SignedData has no signer info")),
            (Some(_), Some(_)) => return Err(malformed("SignedData has more than one signer info")),
        };

        let signer = Self::find_signer(&info.sid, &certificates)?;
        let digest = HashAlgorithm::from_oid(&info.digest_alg.oid)
            .map_err(|e| malformed(format!("Signer digest algorithm: {e}")))?;

        let signed_attrs = info
            .signed_attrs
            .as_ref()
            .ok_or_else(|| malformed("Signer info has no signed attributes"))?;
        let message_digest = Self::message_digest(signed_attrs.iter())?;
        if message_digest != digest.digest(&econtent) {
            return Err(malformed(
                "messageDigest attribute does not match the encapsulated content",
            ));
        }

        let scheme = SignatureScheme::from_oids(&info.signature_algorithm.oid, Some(digest))
            .map_err(|e| malformed(e.to_string()))?;
        let proof = SignerProof::new(
            signed_attrs.to_der().map_err(|e| malformed(e.to_string()))?,
            info.signature.as_bytes().to_vec(),
            scheme,
        );

        Ok(ResolvedSigner {
            signer,
            certificates,
            proof,
            econtent,
            info,
        })
    }

    fn find_signer(sid: &SignerIdentifier, certificates: &[Cert]) -> VerifierResult<Cert> {
        let found = certificates.iter().find(|cert| {
            let tbs = &cert.certificate().tbs_certificate;
            match sid {
                SignerIdentifier::IssuerAndSerialNumber(isn) => {
                    tbs.issuer == isn.issuer && tbs.serial_number == isn.serial_number
                }
                SignerIdentifier::SubjectKeyIdentifier(ski) => {
                    cert.subject_key_id().as_deref() == Some(ski.0.as_bytes())
                }
            }
        });
        found
            .cloned()
            .ok_or_else(|| malformed("Signer certificate is not included in the signature"))
    }

    fn message_digest<'a>(mut attrs: impl Iterator<Item = &'a Attribute>) -> VerifierResult<Vec<u8>> {
        let attr = attrs
            .find(|a| a.oid == ID_MESSAGE_DIGEST)
            .ok_or_else(|| malformed("Signed attributes lack messageDigest"))?;
        let value = single_value(attr)?;
        Ok(value
            .decode_as::<OctetString>()
            .map_err(|e| malformed(format!("Invalid messageDigest: {e}")))?
            .as_bytes()
            .to_vec())
    }

    fn signature_kind(attr: &Attribute) -> VerifierResult<SignatureKind> {
        let cti: CommitmentTypeIndication = single_value(attr)?
            .decode_as()
            .map_err(|e| malformed(format!("Invalid commitment type indication: {e}")))?;
        Ok(match cti.commitment_type_id {
            ID_CTI_PROOF_OF_ORIGIN => SignatureKind::Author,
            ID_CTI_PROOF_OF_RECEIPT => SignatureKind::Repository,
            _ => SignatureKind::Unknown,
        })
    }
}

fn single_value(attr: &Attribute) -> VerifierResult<&Any> {
    let mut values = attr.values.iter();
    match (values.next(), values.next()) {
        (Some(v), None) => Ok(v),
        _ => Err(malformed(format!(
            "Attribute {} must have exactly one value",
            attr.oid
        ))),
    }
}

/// Decode a GeneralizedTime, tolerating a fractional seconds suffix.
fn parse_generalized_time(any: &Any) -> VerifierResult<SystemTime> {
    if let Ok(time) = any.decode_as::<GeneralizedTime>() {
        return Ok(time.to_system_time());
    }
    let text = std::str::from_utf8(any.value())
        .map_err(|_| malformed("Timestamp genTime is not ASCII"))?;
    let body = text
        .strip_suffix('Z')
        .ok_or_else(|| malformed(format!("Timestamp genTime '{text}' is not UTC")))?;
    let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
    if whole.len() != 14 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(format!("Invalid timestamp genTime '{text}'")));
    }
    let base = GeneralizedTime::from_der(&encode_generalized(whole))
        .map_err(|e| malformed(format!("Invalid timestamp genTime '{text}': {e}")))?;
    let nanos = format!("{fraction:0<9}")
        .get(..9)
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(0);
    Ok(base.to_system_time() + Duration::from_nanos(u64::from(nanos)))
}

fn encode_generalized(whole: &str) -> Vec<u8> {
    let mut der = vec![0x18, 15];
    der.extend_from_slice(whole.as_bytes());
    der.push(b'Z');
    der
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn rejects_non_cms_input() {
        assert!(matches!(
            SignatureParser::parse(&[0x30, 0x03, 0x02, 0x01, 0x01]),
            Err(VerifierError::MalformedSignature(_))
        ));
        assert!(SignatureParser::parse(b"").is_err());
        assert!(SignatureParser::parse_timestamp_token(&[0x04, 0x00]).is_err());
    }

    #[test]
    fn accuracy_sums_components() {
        let acc = AccuracyAsn1 {
            seconds: Some(1),
            millis: Some(500),
            micros: None,
        };
        assert_eq!(acc.to_duration(), Duration::from_millis(1500));
    }

    #[test]
    fn generalized_time_accepts_fractions() {
        let plain = Any::new(der::Tag::GeneralizedTime, b"20240102030405Z".to_vec()).unwrap();
        let fractional = Any::new(der::Tag::GeneralizedTime, b"20240102030405.25Z".to_vec()).unwrap();

        let t0 = parse_generalized_time(&plain).unwrap();
        let t1 = parse_generalized_time(&fractional).unwrap();
        assert_eq!(t0.duration_since(UNIX_EPOCH).unwrap().as_secs(), 1_704_164_645);
        assert_eq!(t1.duration_since(t0).unwrap(), Duration::from_millis(250));

        let local = Any::new(der::Tag::GeneralizedTime, b"20240102030405".to_vec()).unwrap();
        assert!(parse_generalized_time(&local).is_err());
    }
}
