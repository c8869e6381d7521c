//! Content integrity provider.

use super::{SignatureContext, VerificationProvider};
use crate::domain::issue::{Issue, IssueCode};
use crate::domain::verification::{ProviderKind, ProviderResult};
use crate::infra::error::VerifierResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Compares the package digest with the one recorded in the signature and
/// checks the signer's signature over the signed attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegrityProvider;

#[async_trait]
impl VerificationProvider for IntegrityProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Integrity
    }

    async fn verify(
        &self,
        ctx: &SignatureContext<'_>,
        _cancel: &CancellationToken,
    ) -> VerifierResult<ProviderResult> {
        let content = ctx.signature.content();
        let algorithm = content.hash_algorithm();
        let actual = ctx.package.content_digest(algorithm)?;

        let mut issues = Vec::new();
        if actual.as_slice() != content.hash_value() {
            log::warn!("{} content digest does not match the package", ctx.target);
            issues.push(Issue::error(
                IssueCode::ContentDigestMismatch,
                format!(
                    "Package content {} digest {} does not match signed digest {}",
                    algorithm,
                    hex::encode(&actual),
                    hex::encode(content.hash_value())
                ),
            ));
        }

        if let Err(e) = ctx.signature.proof().verify(ctx.signature.signer_certificate()) {
            issues.push(Issue::error(
                IssueCode::SignatureInvalid,
                format!("Signer signature does not verify: {e}"),
            ));
        }

        Ok(ProviderResult::from_issues(ProviderKind::Integrity, ctx.target, issues))
    }
}
