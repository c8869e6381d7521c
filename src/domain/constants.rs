//! Centralized OIDs and format literals used by signature parsing and validation.
//! Keep this intentionally small; only broadly reused literals should live here.

use const_oid::ObjectIdentifier;

// === CMS / PKCS#9 ===

/// CMS `SignedData` content type (1.2.840.113549.1.7.2).
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/// PKCS#7 `data` content type (1.2.840.113549.1.7.1).
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

/// PKCS#9 messageDigest signed attribute (1.2.840.113549.1.9.4).
pub const ID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// RFC 3161 `id-aa-timeStampToken` unsigned attribute (1.2.840.113549.1.9.16.2.14).
pub const ID_AA_TIMESTAMP_TOKEN: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.14");

/// RFC 3161 `id-ct-TSTInfo` content type (1.2.840.113549.1.9.16.1.4).
pub const ID_CT_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

// === Commitment type indication (RFC 5126) ===

/// `id-aa-ets-commitmentType` signed attribute (1.2.840.113549.1.9.16.2.16).
pub const ID_AA_COMMITMENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.16");

/// Proof of origin: the author signed the package (1.2.840.113549.1.9.16.6.1).
pub const ID_CTI_PROOF_OF_ORIGIN: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.6.1");

/// Proof of receipt: a repository signed the package (1.2.840.113549.1.9.16.6.2).
pub const ID_CTI_PROOF_OF_RECEIPT: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.6.2");

// === Extended key usage ===

/// id-kp-codeSigning (1.3.6.1.5.5.7.3.3).
pub const ID_KP_CODE_SIGNING: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.3");

/// id-kp-timeStamping (1.3.6.1.5.5.7.3.8).
pub const ID_KP_TIME_STAMPING: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.8");

/// anyExtendedKeyUsage (2.5.29.37.0).
pub const ANY_EXTENDED_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37.0");

// === Signature content ===

/// Header line of the signed content document.
pub const SIGNATURE_CONTENT_VERSION_LINE: &str = "Version:1";

/// Suffix appended to the hash algorithm OID in the content hash line.
pub const SIGNATURE_CONTENT_HASH_SUFFIX: &str = "-Hash";

// === Chain building ===

/// Upper bound on chain length; deeper paths are treated as unbuildable.
pub const MAX_CHAIN_DEPTH: usize = 10;
