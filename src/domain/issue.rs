//! Findings reported by verification providers.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// Failure category. The string form is stable; tooling filters on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueCode {
    UnsignedPackage,
    MalformedSignature,
    RequiredSignatureMissing,
    ContentDigestMismatch,
    SignatureInvalid,
    TimestampMissing,
    TimestampMismatch,
    TimestampChainInvalid,
    TimestampInvalid,
    MultipleTimestamps,
    UntrustedRoot,
    ChainBuildFailed,
    CertificateRevoked,
    RevocationUnknown,
    CertificateNotTimeValid,
    CertificateNotValidForUsage,
    CertificateExplicitlyDistrusted,
    InvalidCertificateExtensions,
    ProviderFailure,
}

impl IssueCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::UnsignedPackage => "unsigned_package",
            IssueCode::MalformedSignature => "malformed_signature",
            IssueCode::RequiredSignatureMissing => "required_signature_missing",
            IssueCode::ContentDigestMismatch => "content_digest_mismatch",
            IssueCode::SignatureInvalid => "signature_invalid",
            IssueCode::TimestampMissing => "timestamp_missing",
            IssueCode::TimestampMismatch => "timestamp_mismatch",
            IssueCode::TimestampChainInvalid => "timestamp_chain_invalid",
            IssueCode::TimestampInvalid => "timestamp_invalid",
            IssueCode::MultipleTimestamps => "multiple_timestamps",
            IssueCode::UntrustedRoot => "untrusted_root",
            IssueCode::ChainBuildFailed => "chain_build_failed",
            IssueCode::CertificateRevoked => "certificate_revoked",
            IssueCode::RevocationUnknown => "revocation_unknown",
            IssueCode::CertificateNotTimeValid => "certificate_not_time_valid",
            IssueCode::CertificateNotValidForUsage => "certificate_not_valid_for_usage",
            IssueCode::CertificateExplicitlyDistrusted => "certificate_explicitly_distrusted",
            IssueCode::InvalidCertificateExtensions => "invalid_certificate_extensions",
            IssueCode::ProviderFailure => "provider_failure",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IssueCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single error or warning. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    severity: Severity,
    code: IssueCode,
    message: String,
}

impl Issue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    /// Error when `fatal`, warning otherwise.
    pub fn with_severity(fatal: bool, code: IssueCode, message: impl Into<String>) -> Self {
        if fatal {
            Self::error(code, message)
        } else {
            Self::warning(code, message)
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn code(&self) -> IssueCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_stable_code() {
        let issue = Issue::error(IssueCode::UntrustedRoot, "root not trusted");
        assert_eq!(issue.to_string(), "[error] untrusted_root: root not trusted");
        assert!(issue.is_error());
        assert!(!Issue::with_severity(false, IssueCode::RevocationUnknown, "x").is_error());
    }

    #[test]
    fn serializes_code_as_string() {
        let issue = Issue::warning(IssueCode::TimestampMissing, "none");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["code"], "timestamp_missing");
        assert_eq!(json["severity"], "warning");
    }
}
