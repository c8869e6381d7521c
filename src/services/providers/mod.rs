//! Verification providers.
//!
//! Each provider checks one independent trust dimension of a signature and
//! reports a `ProviderResult`. The orchestrator runs a fixed list built at
//! startup; callers may register their own implementations.

pub mod integrity;
pub mod trust;

use crate::adapters::package::PackageReader;
use crate::domain::policy::TrustPolicy;
use crate::domain::signature::Signature;
use crate::domain::verification::{ProviderKind, ProviderResult, SignatureTarget};
use crate::infra::error::VerifierResult;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use integrity::IntegrityProvider;
pub use trust::TrustProvider;

/// Everything a provider may look at for one signature.
pub struct SignatureContext<'a> {
    pub signature: &'a Signature,
    pub target: SignatureTarget,
    pub package: &'a dyn PackageReader,
    pub policy: &'a TrustPolicy,
}

#[async_trait]
pub trait VerificationProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Evaluate one signature.
    ///
    /// Policy violations belong in the result; `Err` is reserved for
    /// cancellation and unexpected failures.
    async fn verify(
        &self,
        ctx: &SignatureContext<'_>,
        cancel: &CancellationToken,
    ) -> VerifierResult<ProviderResult>;
}
