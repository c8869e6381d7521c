//! Signature trust and validity provider.
//!
//! Runs the timestamp validator, builds the signer's chain at the instant it
//! establishes, and maps chain status flags to issues per policy.

use super::{SignatureContext, VerificationProvider};
use crate::domain::chain::{ApplicationPolicy, ChainBuildResult, ChainStatus};
use crate::domain::issue::{Issue, IssueCode};
use crate::domain::policy::TrustPolicy;
use crate::domain::verification::{ProviderKind, ProviderResult};
use crate::infra::error::VerifierResult;
use crate::services::chain_builder::{CertificateChainBuilder, ChainBuildOptions};
use crate::services::timestamp_validator::TimestampValidator;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct TrustProvider {
    builder: Arc<CertificateChainBuilder>,
    timestamps: TimestampValidator,
}

impl TrustProvider {
    #[must_use]
    pub fn new(builder: Arc<CertificateChainBuilder>) -> Self {
        Self {
            timestamps: TimestampValidator::new(Arc::clone(&builder)),
            builder,
        }
    }
}

#[async_trait]
impl VerificationProvider for TrustProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Trust
    }

    async fn verify(
        &self,
        ctx: &SignatureContext<'_>,
        cancel: &CancellationToken,
    ) -> VerifierResult<ProviderResult> {
        let policy = ctx.policy;
        let signature = ctx.signature;
        let signer = signature.signer_certificate();

        let outcome = self.timestamps.validate(signature, policy, cancel).await?;
        let mut issues = outcome.issues;

        let mut options = ChainBuildOptions::new(ApplicationPolicy::CodeSigning, outcome.as_of)
            .ignoring_time_validity(outcome.trusted)
            .with_revocation(policy.revocation_mode, policy.revocation_timeout);
        options.trusted_certificates = policy.trusted_certificates.clone();
        options.untrusted_certificates = policy.untrusted_certificates.clone();

        let chain = self
            .builder
            .build(signer, signature.certificates(), &options, cancel)
            .await?;

        // Time validity was deferred to the timestamp: it must lie inside the
        // signer's own validity period.
        if outcome.trusted {
            if let Some(timestamp) = signature.primary_timestamp() {
                if !timestamp.falls_within(signer) {
                    issues.push(Issue::error(
                        IssueCode::CertificateNotTimeValid,
                        format!(
                            "Signing certificate {} was not valid when the signature was timestamped",
                            signer.subject()
                        ),
                    ));
                }
            }
        }

        issues.extend(chain_status_issues(&chain, policy));
        let result = ProviderResult::from_issues(ProviderKind::Trust, ctx.target, issues);
        log::debug!("Trust for {}: {}", ctx.target, result.status());
        Ok(result)
    }
}

fn subjects(chain: &ChainBuildResult, status: ChainStatus) -> String {
    chain
        .elements_with(status)
        .map(|e| e.certificate().subject())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map effective chain statuses to issues.
///
/// Revoked, not-time-valid, usage, distrust and extension problems are always
/// errors. Untrusted roots and unknown revocation follow the policy flags.
pub(crate) fn chain_status_issues(chain: &ChainBuildResult, policy: &TrustPolicy) -> Vec<Issue> {
    let mut issues = Vec::new();

    if !chain.success() && chain.has_status(ChainStatus::PartialChain) {
        issues.push(Issue::error(
            IssueCode::ChainBuildFailed,
            format!(
                "No certificate chain to a root could be built beyond {}",
                subjects(chain, ChainStatus::PartialChain)
            ),
        ));
    }

    for status in chain.all_statuses() {
        let who = subjects(chain, status);
        let issue = match status {
            ChainStatus::Revoked => Issue::error(
                IssueCode::CertificateRevoked,
                format!("Certificate revoked: {who}"),
            ),
            ChainStatus::ExplicitDistrust => Issue::error(
                IssueCode::CertificateExplicitlyDistrusted,
                format!("Certificate explicitly distrusted: {who}"),
            ),
            ChainStatus::InvalidBasicConstraints => Issue::error(
                IssueCode::InvalidCertificateExtensions,
                format!("Certificate may not issue certificates: {who}"),
            ),
            ChainStatus::NotValidForUsage => Issue::error(
                IssueCode::CertificateNotValidForUsage,
                format!("Certificate not valid for the requested usage: {who}"),
            ),
            ChainStatus::Expired | ChainStatus::NotYetValid => Issue::error(
                IssueCode::CertificateNotTimeValid,
                format!("Certificate {status}: {who}"),
            ),
            ChainStatus::UntrustedRoot => Issue::with_severity(
                !policy.allow_untrusted_root,
                IssueCode::UntrustedRoot,
                format!("Chain terminates in a root that is not trusted: {who}"),
            ),
            ChainStatus::RevocationUnknown => {
                if !policy.strict_revocation() && !policy.report_unknown_revocation {
                    continue;
                }
                Issue::with_severity(
                    policy.strict_revocation(),
                    IssueCode::RevocationUnknown,
                    format!("Revocation status could not be determined: {who}"),
                )
            }
            ChainStatus::PartialChain => continue,
        };
        issues.push(issue);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_successful_chain_has_no_issues() {
        let chain = ChainBuildResult::new(Vec::new(), true);
        assert!(chain_status_issues(&chain, &TrustPolicy::default()).is_empty());
    }
}
