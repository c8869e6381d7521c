//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for cryptographic artifacts including:
//! - Hash algorithms with OID mapping
//! - Certificate representations with extension accessors
//! - SHA-256 certificate fingerprints
//! - Signature schemes and public-key verification

mod cert;
mod fingerprint;
mod hash;
mod signature;

pub use cert::Cert;
pub use fingerprint::CertFingerprint;
pub use hash::HashAlgorithm;
pub use signature::SignatureScheme;
