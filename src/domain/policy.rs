//! Trust policy applied to a verification run.
//!
//! A `TrustPolicy` is built once (usually from `VerifierConfiguration`) and is
//! read-only while providers execute.

use crate::domain::crypto::CertFingerprint;
use crate::infra::error::VerifierError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How certificate revocation is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationMode {
    /// Live CRL retrieval is allowed.
    Online,
    /// Only cached or embedded revocation data is consulted.
    Offline,
    /// No checks; every certificate is reported as revocation-unknown.
    None,
}

impl FromStr for RevocationMode {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(RevocationMode::Online),
            "offline" => Ok(RevocationMode::Offline),
            "none" => Ok(RevocationMode::None),
            other => Err(VerifierError::Configuration(format!(
                "Unknown revocation mode '{other}' (expected online, offline or none)"
            ))),
        }
    }
}

impl fmt::Display for RevocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RevocationMode::Online => "online",
            RevocationMode::Offline => "offline",
            RevocationMode::None => "none",
        })
    }
}

/// Which signature kinds a package must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureRequirement {
    /// Any signature kind is accepted.
    #[serde(alias = "none")]
    Any,
    /// The primary signature must be an author signature.
    Author,
    /// A repository signature must be present.
    Repository,
    /// The primary signature must be an author or repository signature.
    #[serde(alias = "either")]
    AuthorOrRepository,
}

impl FromStr for SignatureRequirement {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" | "none" => Ok(SignatureRequirement::Any),
            "author" => Ok(SignatureRequirement::Author),
            "repository" => Ok(SignatureRequirement::Repository),
            "author-or-repository" | "either" => Ok(SignatureRequirement::AuthorOrRepository),
            other => Err(VerifierError::Configuration(format!(
                "Unknown signature requirement '{other}'"
            ))),
        }
    }
}

/// Verifier settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Unsigned packages pass.
    pub allow_unsigned: bool,
    /// Malformed signatures are reported as warnings.
    pub allow_illegal: bool,
    /// A trust result with only warnings (Suspect) counts as valid.
    pub allow_untrusted: bool,
    /// A chain ending in a root outside the trusted store is a warning.
    pub allow_untrusted_root: bool,
    /// A missing timestamp is a warning.
    pub allow_no_timestamp: bool,
    /// An invalid timestamp is downgraded to warnings and ignored.
    pub allow_ignore_timestamp: bool,
    /// More than one timestamp is accepted; only the first is evaluated.
    pub allow_multiple_timestamps: bool,
    /// Revocation-unknown is a warning rather than an error.
    pub allow_unknown_revocation: bool,
    /// Emit the revocation-unknown warning at all.
    pub report_unknown_revocation: bool,
    pub revocation_mode: RevocationMode,
    pub revocation_timeout: Duration,
    pub required_signature: SignatureRequirement,
    /// Certificates treated as trust anchors wherever they appear in a chain.
    pub trusted_certificates: BTreeSet<CertFingerprint>,
    /// Certificates rejected wherever they appear in a chain.
    pub untrusted_certificates: BTreeSet<CertFingerprint>,
}

impl TrustPolicy {
    /// Policy for explicit verification requests.
    #[must_use]
    pub fn verify_default() -> Self {
        Self {
            allow_unsigned: false,
            allow_illegal: false,
            allow_untrusted: true,
            allow_untrusted_root: false,
            allow_no_timestamp: true,
            allow_ignore_timestamp: false,
            allow_multiple_timestamps: true,
            allow_unknown_revocation: true,
            report_unknown_revocation: true,
            revocation_mode: RevocationMode::Online,
            revocation_timeout: Duration::from_secs(15),
            required_signature: SignatureRequirement::Any,
            trusted_certificates: BTreeSet::new(),
            untrusted_certificates: BTreeSet::new(),
        }
    }

    /// Lenient policy for consuming packages: only hard failures block.
    #[must_use]
    pub fn accept_mode() -> Self {
        Self {
            allow_unsigned: true,
            allow_illegal: true,
            allow_untrusted: true,
            allow_untrusted_root: true,
            allow_ignore_timestamp: true,
            report_unknown_revocation: false,
            ..Self::verify_default()
        }
    }

    /// Strict policy: every signature must be fully trusted.
    #[must_use]
    pub fn require_mode() -> Self {
        Self {
            allow_untrusted: false,
            allow_multiple_timestamps: false,
            ..Self::verify_default()
        }
    }

    #[must_use]
    pub fn with_revocation_mode(mut self, mode: RevocationMode) -> Self {
        self.revocation_mode = mode;
        self
    }

    #[must_use]
    pub fn with_trusted_certificate(mut self, fingerprint: CertFingerprint) -> Self {
        self.trusted_certificates.insert(fingerprint);
        self
    }

    #[must_use]
    pub fn with_untrusted_certificate(mut self, fingerprint: CertFingerprint) -> Self {
        self.untrusted_certificates.insert(fingerprint);
        self
    }

    /// Revocation-unknown escalates to an error.
    #[must_use]
    pub fn strict_revocation(&self) -> bool {
        !self.allow_unknown_revocation
    }
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::verify_default()
    }
}
