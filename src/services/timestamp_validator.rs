//! Timestamp validation service.
//!
//! Confirms the primary timestamp is bound to its signature and issued by a
//! valid time-stamping authority, and decides the instant the signer's chain
//! is evaluated at.

use crate::domain::chain::ApplicationPolicy;
use crate::domain::issue::{Issue, IssueCode};
use crate::domain::policy::TrustPolicy;
use crate::domain::signature::{Signature, Timestamp};
use crate::infra::error::VerifierResult;
use crate::services::chain_builder::{CertificateChainBuilder, ChainBuildOptions};
use crate::services::providers::trust::chain_status_issues;
use std::sync::Arc;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

/// What timestamp validation established.
#[derive(Debug, Clone)]
pub struct TimestampOutcome {
    /// Findings, already mapped to severities by policy.
    pub issues: Vec<Issue>,
    /// Instant the signing certificate's chain should be evaluated at.
    pub as_of: SystemTime,
    /// True when a timestamp passed every check and extends trust past expiry.
    pub trusted: bool,
}

impl TimestampOutcome {
    fn untrusted(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            as_of: SystemTime::now(),
            trusted: false,
        }
    }
}

pub struct TimestampValidator {
    builder: Arc<CertificateChainBuilder>,
}

impl TimestampValidator {
    #[must_use]
    pub fn new(builder: Arc<CertificateChainBuilder>) -> Self {
        Self { builder }
    }

    /// Validate the signature's primary timestamp against `policy`.
    ///
    /// Only the first timestamp is evaluated; later ones are at most counted.
    pub async fn validate(
        &self,
        signature: &Signature,
        policy: &TrustPolicy,
        cancel: &CancellationToken,
    ) -> VerifierResult<TimestampOutcome> {
        let mut preamble = Vec::new();
        if signature.timestamps().len() > 1 && !policy.allow_multiple_timestamps {
            preamble.push(Issue::error(
                IssueCode::MultipleTimestamps,
                format!(
                    "Signature carries {} timestamps; only one is allowed",
                    signature.timestamps().len()
                ),
            ));
        }

        let Some(timestamp) = signature.primary_timestamp() else {
            log::debug!("Signature has no timestamp");
            preamble.push(Issue::with_severity(
                !policy.allow_no_timestamp,
                IssueCode::TimestampMissing,
                "Signature has no timestamp",
            ));
            return Ok(TimestampOutcome::untrusted(preamble));
        };

        let findings = self.check(signature, timestamp, policy, cancel).await?;
        let failed = findings.iter().any(Issue::is_error);

        if !failed {
            log::debug!(
                "Timestamp from {} accepted at {:?}",
                timestamp.signer_certificate().subject(),
                timestamp.generation_time()
            );
            preamble.extend(findings);
            return Ok(TimestampOutcome {
                issues: preamble,
                as_of: timestamp.generation_time(),
                trusted: true,
            });
        }

        if policy.allow_ignore_timestamp {
            log::warn!("Ignoring invalid timestamp as permitted by policy");
            preamble.extend(
                findings
                    .into_iter()
                    .map(|i| Issue::warning(i.code(), i.message().to_string())),
            );
        } else {
            preamble.extend(findings);
        }
        Ok(TimestampOutcome::untrusted(preamble))
    }

    async fn check(
        &self,
        signature: &Signature,
        timestamp: &Timestamp,
        policy: &TrustPolicy,
        cancel: &CancellationToken,
    ) -> VerifierResult<Vec<Issue>> {
        let tsa = timestamp.signer_certificate();

        // (a) binding to the signature
        if !timestamp.message_imprint().matches(signature.signature_value()) {
            return Ok(vec![Issue::error(
                IssueCode::TimestampMismatch,
                "Timestamp does not match the signature",
            )]);
        }
        if let Some(proof) = timestamp.proof() {
            if let Err(e) = proof.verify(tsa) {
                return Ok(vec![Issue::error(
                    IssueCode::TimestampMismatch,
                    format!("Timestamp authority signature is invalid: {e}"),
                )]);
            }
        }

        // (b) TSA chain, evaluated at signing time without ignoring validity
        let mut extra = timestamp.certificates().to_vec();
        extra.extend_from_slice(signature.certificates());
        let mut options =
            ChainBuildOptions::new(ApplicationPolicy::TimeStamping, timestamp.generation_time())
                .with_revocation(policy.revocation_mode, policy.revocation_timeout);
        options.trusted_certificates = policy.trusted_certificates.clone();
        options.untrusted_certificates = policy.untrusted_certificates.clone();

        let chain = self.builder.build(tsa, &extra, &options, cancel).await?;
        let chain_issues = chain_status_issues(&chain, policy);
        let chain_errors: Vec<&str> = chain_issues
            .iter()
            .filter(|i| i.is_error())
            .map(Issue::message)
            .collect();
        if !chain.success() || !chain_errors.is_empty() {
            let detail = if chain_errors.is_empty() {
                "no valid path to a root".to_string()
            } else {
                chain_errors.join("; ")
            };
            return Ok(vec![Issue::error(
                IssueCode::TimestampChainInvalid,
                format!("Timestamp authority chain is invalid: {detail}"),
            )]);
        }
        let mut issues: Vec<Issue> = chain_issues;

        // (c) signing time inside the TSA certificate's validity
        if !timestamp.falls_within(tsa) {
            issues.push(Issue::error(
                IssueCode::TimestampInvalid,
                format!(
                    "Timestamp time falls outside the validity of timestamp authority certificate {}",
                    tsa.subject()
                ),
            ));
        }
        Ok(issues)
    }
}
