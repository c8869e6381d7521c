//! `VerifyWorkflow`: high-level facade for verifying signed packages.
//!
//! Wires configuration into a ready verifier: trusted roots, a revocation
//! client matching the configured mode, the chain builder and the default
//! providers.

use crate::adapters::crl_http_client::HttpCrlFetcher;
use crate::adapters::package::PackageReader;
use crate::adapters::revocation::{CrlRevocationClient, RevocationClient};
use crate::adapters::trust_store::{StaticTrustStore, TrustedRootStore};
use crate::domain::policy::{RevocationMode, TrustPolicy};
use crate::domain::verification::VerificationResult;
use crate::infra::config::VerifierConfiguration;
use crate::infra::error::VerifierResult;
use crate::infra::telemetry::{LogTelemetry, TelemetrySink};
use crate::services::chain_builder::CertificateChainBuilder;
use crate::services::verification::PackageSignatureVerifier;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Orchestrates verification of packages under one policy.
pub struct VerifyWorkflow {
    policy: TrustPolicy,
    verifier: PackageSignatureVerifier,
}

impl VerifyWorkflow {
    /// Assemble a workflow from explicit collaborators.
    #[must_use]
    pub fn from_parts(
        policy: TrustPolicy,
        trust_store: Arc<dyn TrustedRootStore>,
        revocation: Arc<dyn RevocationClient>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let builder = Arc::new(CertificateChainBuilder::new(trust_store, revocation));
        let verifier = PackageSignatureVerifier::with_default_providers(builder).with_telemetry(telemetry);
        Self { policy, verifier }
    }

    /// Build everything from configuration: roots directory, CRL cache and
    /// online CRL retrieval when the revocation mode is `online`.
    pub async fn from_config(config: &VerifierConfiguration) -> VerifierResult<Self> {
        let policy = config.to_policy()?;

        let trust_store = match &config.trusted_roots_dir {
            Some(dir) => StaticTrustStore::from_directory(dir)?,
            None => {
                log::warn!("No trusted roots configured; every chain will end in an untrusted root");
                StaticTrustStore::default()
            }
        };

        let mut crl_client = CrlRevocationClient::new();
        if policy.revocation_mode == RevocationMode::Online {
            crl_client = crl_client.with_fetcher(Box::new(HttpCrlFetcher::new(&config.user_agent)?));
        }
        if let Some(dir) = &config.revocation.crl_cache_dir {
            crl_client.load_directory(dir).await?;
        }

        Ok(Self::from_parts(
            policy,
            Arc::new(trust_store),
            Arc::new(crl_client),
            Arc::new(LogTelemetry::new()),
        ))
    }

    #[must_use]
    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Run verification over `package`.
    pub async fn run(
        &self,
        package: &dyn PackageReader,
        cancel: &CancellationToken,
    ) -> VerifierResult<VerificationResult> {
        self.verifier.verify(package, &self.policy, cancel).await
    }
}
