//! Verification service: orchestrates the provider pipeline over a package.
//!
//! Per call the verifier checks that the package is signed, enforces the
//! required signature kind, then runs every provider (integrity first) over
//! the primary and repository signatures. Results are aggregated into one
//! `VerificationResult`. The verifier holds no per-call state.

use crate::adapters::package::PackageReader;
use crate::domain::issue::{Issue, IssueCode};
use crate::domain::policy::{SignatureRequirement, TrustPolicy};
use crate::domain::signature::{Signature, SignatureKind};
use crate::domain::verification::{
    ProviderKind, ProviderResult, SignatureTarget, VerificationResult,
};
use crate::infra::error::{VerifierError, VerifierResult};
use crate::infra::telemetry::{NullTelemetry, TelemetrySink};
use crate::services::chain_builder::CertificateChainBuilder;
use crate::services::providers::{
    IntegrityProvider, SignatureContext, TrustProvider, VerificationProvider,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Entry point for package signature verification.
pub struct PackageSignatureVerifier {
    providers: Vec<Arc<dyn VerificationProvider>>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl PackageSignatureVerifier {
    /// Verifier running `providers` in order.
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn VerificationProvider>>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            providers,
            telemetry,
        }
    }

    /// Integrity then trust, both backed by `builder`.
    #[must_use]
    pub fn with_default_providers(builder: Arc<CertificateChainBuilder>) -> Self {
        Self::new(
            vec![
                Arc::new(IntegrityProvider),
                Arc::new(TrustProvider::new(builder)),
            ],
            Arc::new(NullTelemetry),
        )
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Verify `package` against `policy`.
    ///
    /// Returns `Err(Cancelled)` if `cancel` fires; every other failure is
    /// reported inside the result.
    pub async fn verify(
        &self,
        package: &dyn PackageReader,
        policy: &TrustPolicy,
        cancel: &CancellationToken,
    ) -> VerifierResult<VerificationResult> {
        self.telemetry.verification_started();
        let mut results = Vec::new();

        let primary = self.read_signature(
            package.primary_signature(),
            SignatureTarget::Primary,
            policy,
            &mut results,
        );
        let repository = self.read_signature(
            package.repository_signature(),
            SignatureTarget::Repository,
            policy,
            &mut results,
        );

        if primary.is_none() && repository.is_none() && results.is_empty() {
            let result = Self::unsigned_result(policy);
            self.telemetry.verification_finished(&result);
            return Ok(result);
        }

        if let Some(result) = Self::check_requirement(primary.as_ref(), repository.as_ref(), policy) {
            self.telemetry.provider_finished(&result);
            results.push(result);
        }

        let signatures = [
            (SignatureTarget::Primary, primary.as_ref()),
            (SignatureTarget::Repository, repository.as_ref()),
        ];
        for (target, signature) in signatures {
            let Some(signature) = signature else {
                continue;
            };
            let ctx = SignatureContext {
                signature,
                target,
                package,
                policy,
            };
            for provider in &self.providers {
                let result = self.run_provider(provider.as_ref(), &ctx, cancel).await?;
                self.telemetry.provider_finished(&result);
                results.push(result);
            }
        }

        let valid = results.iter().all(|r| {
            let tolerate = r.provider() != ProviderKind::Trust || policy.allow_untrusted;
            r.passes(tolerate)
        });
        let result = VerificationResult::new(valid, results);
        log::info!(
            "Package signature verification {}",
            if valid { "passed" } else { "failed" }
        );
        self.telemetry.verification_finished(&result);
        Ok(result)
    }

    fn unsigned_result(policy: &TrustPolicy) -> VerificationResult {
        if policy.allow_unsigned {
            log::info!("Package is unsigned; allowed by policy");
            return VerificationResult::new(true, Vec::new());
        }
        log::info!("Package is unsigned");
        VerificationResult::new(
            false,
            vec![ProviderResult::from_issues(
                ProviderKind::SignaturePolicy,
                SignatureTarget::Package,
                vec![Issue::error(IssueCode::UnsignedPackage, "Package is not signed")],
            )],
        )
    }

    /// Turn a reader failure into a policy result; a parsed signature passes through.
    fn read_signature(
        &self,
        read: VerifierResult<Option<Signature>>,
        target: SignatureTarget,
        policy: &TrustPolicy,
        results: &mut Vec<ProviderResult>,
    ) -> Option<Signature> {
        let issue = match read {
            Ok(signature) => return signature,
            Err(VerifierError::MalformedSignature(msg)) => Issue::with_severity(
                !policy.allow_illegal,
                IssueCode::MalformedSignature,
                format!("The {target} could not be read: {msg}"),
            ),
            Err(e) => Issue::error(
                IssueCode::ProviderFailure,
                format!("The {target} could not be read: {e}"),
            ),
        };
        log::warn!("{}", issue.message());
        let result = ProviderResult::from_issues(ProviderKind::SignaturePolicy, target, vec![issue]);
        self.telemetry.provider_finished(&result);
        results.push(result);
        None
    }

    fn check_requirement(
        primary: Option<&Signature>,
        repository: Option<&Signature>,
        policy: &TrustPolicy,
    ) -> Option<ProviderResult> {
        let primary_kind = primary.map(Signature::kind);
        let satisfied = match policy.required_signature {
            SignatureRequirement::Any => true,
            SignatureRequirement::Author => primary_kind == Some(SignatureKind::Author),
            SignatureRequirement::Repository => {
                primary_kind == Some(SignatureKind::Repository) || repository.is_some()
            }
            SignatureRequirement::AuthorOrRepository => {
                primary_kind.is_some_and(|k| k != SignatureKind::Unknown) || repository.is_some()
            }
        };
        if satisfied {
            return None;
        }
        Some(ProviderResult::from_issues(
            ProviderKind::SignaturePolicy,
            SignatureTarget::Package,
            vec![Issue::error(
                IssueCode::RequiredSignatureMissing,
                format!(
                    "Policy requires a {:?} signature; found {}",
                    policy.required_signature,
                    primary_kind.map_or_else(|| "none".to_string(), |k| k.to_string())
                ),
            )],
        ))
    }

    /// Run one provider, converting errors and panics into an Invalid result.
    async fn run_provider(
        &self,
        provider: &dyn VerificationProvider,
        ctx: &SignatureContext<'_>,
        cancel: &CancellationToken,
    ) -> VerifierResult<ProviderResult> {
        if cancel.is_cancelled() {
            return Err(VerifierError::Cancelled);
        }
        let kind = provider.kind();
        match AssertUnwindSafe(provider.verify(ctx, cancel)).catch_unwind().await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(VerifierError::Cancelled)) => Err(VerifierError::Cancelled),
            Ok(Err(e)) => {
                log::warn!("{kind} provider failed for {}: {e}", ctx.target);
                Ok(ProviderResult::failure(
                    kind,
                    ctx.target,
                    format!("The {kind} provider failed: {e}"),
                ))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("{kind} provider panicked for {}: {message}", ctx.target);
                Ok(ProviderResult::failure(
                    kind,
                    ctx.target,
                    format!("The {kind} provider failed unexpectedly: {message}"),
                ))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
