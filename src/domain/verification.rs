//! Verification result types.
//!
//! Each provider produces a `ProviderResult` per signature it evaluates; the
//! orchestrator collects them into a `VerificationResult`, the terminal
//! artifact of one `verify` call. Nothing here is persisted.

use crate::domain::issue::{Issue, IssueCode, Severity};
use serde::Serialize;
use std::fmt;

/// Trust verdict of one provider for one signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    Valid,
    /// Only warnings were raised.
    Suspect,
    Invalid,
    /// The provider did not evaluate anything.
    Unknown,
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrustStatus::Valid => "valid",
            TrustStatus::Suspect => "suspect",
            TrustStatus::Invalid => "invalid",
            TrustStatus::Unknown => "unknown",
        })
    }
}

/// Which provider produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Integrity,
    Trust,
    /// Package-level checks owned by the orchestrator (presence, kind).
    SignaturePolicy,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderKind::Integrity => "integrity",
            ProviderKind::Trust => "trust",
            ProviderKind::SignaturePolicy => "signature-policy",
        })
    }
}

/// What a result is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureTarget {
    Primary,
    Repository,
    Package,
}

impl fmt::Display for SignatureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignatureTarget::Primary => "primary signature",
            SignatureTarget::Repository => "repository signature",
            SignatureTarget::Package => "package",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderResult {
    provider: ProviderKind,
    target: SignatureTarget,
    status: TrustStatus,
    issues: Vec<Issue>,
}

impl ProviderResult {
    /// Status derived from the issues: any error is Invalid, warnings only is
    /// Suspect, none is Valid.
    #[must_use]
    pub fn from_issues(provider: ProviderKind, target: SignatureTarget, issues: Vec<Issue>) -> Self {
        let status = if issues.iter().any(Issue::is_error) {
            TrustStatus::Invalid
        } else if issues.is_empty() {
            TrustStatus::Valid
        } else {
            TrustStatus::Suspect
        };
        Self {
            provider,
            target,
            status,
            issues,
        }
    }

    /// Result for a provider that failed unexpectedly.
    pub fn failure(provider: ProviderKind, target: SignatureTarget, message: impl Into<String>) -> Self {
        Self {
            provider,
            target,
            status: TrustStatus::Invalid,
            issues: vec![Issue::error(IssueCode::ProviderFailure, message)],
        }
    }

    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    #[must_use]
    pub fn target(&self) -> SignatureTarget {
        self.target
    }

    #[must_use]
    pub fn status(&self) -> TrustStatus {
        self.status
    }

    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    #[must_use]
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code() == code)
    }

    /// Whether this result passes; Suspect passes only with warning tolerance.
    #[must_use]
    pub fn passes(&self, tolerate_warnings: bool) -> bool {
        match self.status {
            TrustStatus::Valid => true,
            TrustStatus::Suspect => tolerate_warnings,
            TrustStatus::Invalid | TrustStatus::Unknown => false,
        }
    }
}

/// Aggregated verdict of one verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    valid: bool,
    results: Vec<ProviderResult>,
}

impl VerificationResult {
    #[must_use]
    pub fn new(valid: bool, results: Vec<ProviderResult>) -> Self {
        Self { valid, results }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn results(&self) -> &[ProviderResult] {
        &self.results
    }

    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.results.iter().flat_map(|r| r.issues.iter())
    }

    #[must_use]
    pub fn errors(&self) -> Vec<&Issue> {
        self.issues()
            .filter(|i| i.severity() == Severity::Error)
            .collect()
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<&Issue> {
        self.issues()
            .filter(|i| i.severity() == Severity::Warning)
            .collect()
    }

    /// Codes in report order.
    #[must_use]
    pub fn issue_codes(&self) -> Vec<IssueCode> {
        self.issues().map(Issue::code).collect()
    }

    #[must_use]
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues().any(|i| i.code() == code)
    }

    /// Result for `provider`/`target`, if it ran.
    #[must_use]
    pub fn result_for(&self, provider: ProviderKind, target: SignatureTarget) -> Option<&ProviderResult> {
        self.results
            .iter()
            .find(|r| r.provider == provider && r.target == target)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Signature verification {} ({} error(s), {} warning(s))",
            if self.valid { "PASSED" } else { "FAILED" },
            self.errors().len(),
            self.warnings().len()
        )?;
        for result in &self.results {
            writeln!(f)?;
            writeln!(f, "{} / {}: {}", result.provider, result.target, result.status)?;
            for issue in &result.issues {
                writeln!(f, "  {issue}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_issue_severity() {
        let valid = ProviderResult::from_issues(ProviderKind::Trust, SignatureTarget::Primary, vec![]);
        let suspect = ProviderResult::from_issues(
            ProviderKind::Trust,
            SignatureTarget::Primary,
            vec![Issue::warning(IssueCode::RevocationUnknown, "offline")],
        );
        let invalid = ProviderResult::from_issues(
            ProviderKind::Trust,
            SignatureTarget::Primary,
            vec![
                Issue::warning(IssueCode::RevocationUnknown, "offline"),
                Issue::error(IssueCode::CertificateRevoked, "revoked"),
            ],
        );

        assert_eq!(valid.status(), TrustStatus::Valid);
        assert_eq!(suspect.status(), TrustStatus::Suspect);
        assert_eq!(invalid.status(), TrustStatus::Invalid);
        assert!(suspect.passes(true));
        assert!(!suspect.passes(false));
    }

    #[test]
    fn report_lists_every_issue() {
        let result = VerificationResult::new(
            false,
            vec![ProviderResult::from_issues(
                ProviderKind::Integrity,
                SignatureTarget::Primary,
                vec![Issue::error(IssueCode::ContentDigestMismatch, "digest differs")],
            )],
        );
        let report = result.to_string();
        assert!(report.starts_with("Signature verification FAILED"));
        assert!(report.contains("integrity / primary signature: invalid"));
        assert!(report.contains("[error] content_digest_mismatch: digest differs"));
        assert_eq!(result.issue_codes(), vec![IssueCode::ContentDigestMismatch]);
    }

    #[test]
    fn failure_result_is_invalid() {
        let failed = ProviderResult::failure(ProviderKind::Trust, SignatureTarget::Repository, "boom");
        assert_eq!(failed.status(), TrustStatus::Invalid);
        assert!(failed.has_code(IssueCode::ProviderFailure));
    }
}
