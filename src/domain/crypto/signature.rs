//! Signature schemes and public-key verification.
//!
//! Used for certificate signatures, CRL signatures, and the CMS signer
//! signature over signed attributes.

use super::hash::HashAlgorithm;
use crate::infra::error::{VerifierError, VerifierResult};
use const_oid::db::rfc5912::{
    ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384, ECDSA_WITH_SHA_512, ID_EC_PUBLIC_KEY, RSA_ENCRYPTION,
    SECP_256_R_1, SECP_384_R_1, SHA_256_WITH_RSA_ENCRYPTION, SHA_384_WITH_RSA_ENCRYPTION,
    SHA_512_WITH_RSA_ENCRYPTION,
};
use const_oid::ObjectIdentifier;
use der::Encode;
use rsa::pkcs8::DecodePublicKey;
use spki::SubjectPublicKeyInfoOwned;

/// Public-key signature scheme paired with its message digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ecdsa(HashAlgorithm),
    RsaPkcs1v15(HashAlgorithm),
}

impl SignatureScheme {
    /// Resolve a scheme from a signature algorithm OID.
    ///
    /// CMS signer infos may carry a bare key algorithm (`rsaEncryption`,
    /// `id-ecPublicKey`); the digest then comes from `digest`.
    pub fn from_oids(
        signature_algorithm: &ObjectIdentifier,
        digest: Option<HashAlgorithm>,
    ) -> VerifierResult<Self> {
        let scheme = match *signature_algorithm {
            ECDSA_WITH_SHA_256 => SignatureScheme::Ecdsa(HashAlgorithm::Sha256),
            ECDSA_WITH_SHA_384 => SignatureScheme::Ecdsa(HashAlgorithm::Sha384),
            ECDSA_WITH_SHA_512 => SignatureScheme::Ecdsa(HashAlgorithm::Sha512),
            SHA_256_WITH_RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha256),
            SHA_384_WITH_RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha384),
            SHA_512_WITH_RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha512),
            RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(Self::require_digest(digest)?),
            ID_EC_PUBLIC_KEY => SignatureScheme::Ecdsa(Self::require_digest(digest)?),
            other => {
                return Err(VerifierError::Cryptographic(format!(
                    "Unsupported signature algorithm: {other}"
                )))
            }
        };
        Ok(scheme)
    }

    fn require_digest(digest: Option<HashAlgorithm>) -> VerifierResult<HashAlgorithm> {
        digest.ok_or_else(|| {
            VerifierError::Cryptographic("Key algorithm given without a digest algorithm".into())
        })
    }

    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            SignatureScheme::Ecdsa(h) | SignatureScheme::RsaPkcs1v15(h) => *h,
        }
    }

    /// Verify `signature` over `message` with the given subject public key.
    pub fn verify(
        &self,
        public_key: &SubjectPublicKeyInfoOwned,
        message: &[u8],
        signature: &[u8],
    ) -> VerifierResult<()> {
        let prehash = self.hash_algorithm().digest(message);
        match self {
            SignatureScheme::Ecdsa(_) => verify_ecdsa(public_key, &prehash, signature),
            SignatureScheme::RsaPkcs1v15(hash) => {
                verify_rsa(public_key, *hash, &prehash, signature)
            }
        }
    }
}

fn verify_ecdsa(
    public_key: &SubjectPublicKeyInfoOwned,
    prehash: &[u8],
    signature: &[u8],
) -> VerifierResult<()> {
    use p256::ecdsa::signature::hazmat::PrehashVerifier;

    if public_key.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(VerifierError::Cryptographic(format!(
            "ECDSA signature but key algorithm is {}",
            public_key.algorithm.oid
        )));
    }
    let curve: ObjectIdentifier = public_key
        .algorithm
        .parameters
        .as_ref()
        .ok_or_else(|| VerifierError::Cryptographic("EC key without curve parameters".into()))?
        .decode_as()?;
    let point = public_key.subject_public_key.raw_bytes();
    let failed = |e: p256::ecdsa::Error| VerifierError::Cryptographic(format!("ECDSA: {e}"));

    match curve {
        SECP_256_R_1 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(failed)?;
            let sig = p256::ecdsa::Signature::from_der(signature).map_err(failed)?;
            key.verify_prehash(prehash, &sig).map_err(failed)
        }
        SECP_384_R_1 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(failed)?;
            let sig = p384::ecdsa::Signature::from_der(signature).map_err(failed)?;
            key.verify_prehash(prehash, &sig).map_err(failed)
        }
        other => Err(VerifierError::Cryptographic(format!(
            "Unsupported elliptic curve: {other}"
        ))),
    }
}

fn verify_rsa(
    public_key: &SubjectPublicKeyInfoOwned,
    hash: HashAlgorithm,
    prehash: &[u8],
    signature: &[u8],
) -> VerifierResult<()> {
    use rsa::{Pkcs1v15Sign, RsaPublicKey};

    let spki_der = public_key.to_der()?;
    let key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| VerifierError::Cryptographic(format!("RSA public key: {e}")))?;
    let padding = match hash {
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
    };
    key.verify(padding, prehash, signature)
        .map_err(|e| VerifierError::Cryptographic(format!("RSA: {e}")))
}
