//! Package Signature Verifier Library
//!
//! Verifies CMS-signed packages: content integrity, certificate chain trust,
//! RFC 3161 timestamps and revocation, evaluated against a configurable
//! trust policy.
//!
//! Layout:
//! - `domain`: certificates, signatures, chains, policy and results
//! - `services`: signature parsing, chain building, timestamp validation,
//!   verification providers and the orchestrating verifier
//! - `adapters`: package readers, trust stores and revocation sources
//! - `pipelines`: the configuration-driven `VerifyWorkflow`
//! - `infra`: errors, configuration and telemetry

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use adapters::package::{DetachedSignaturePackage, InMemoryPackage, PackageReader};
pub use adapters::revocation::{
    CrlRevocationClient, RevocationClient, RevocationStatus, StaticRevocationClient, UnknownReason,
};
pub use adapters::trust_store::{StaticTrustStore, TrustedRootStore};
pub use domain::chain::{ApplicationPolicy, ChainBuildResult, ChainElement, ChainStatus};
pub use domain::crypto::{Cert, CertFingerprint, HashAlgorithm};
pub use domain::issue::{Issue, IssueCode, Severity};
pub use domain::policy::{RevocationMode, SignatureRequirement, TrustPolicy};
pub use domain::signature::{Signature, SignatureKind, Timestamp};
pub use domain::verification::{
    ProviderKind, ProviderResult, SignatureTarget, TrustStatus, VerificationResult,
};
pub use infra::config::{ConfigManager, ExportFormat, VerifierConfiguration};
pub use infra::error::{VerifierError, VerifierResult};
pub use pipelines::verify::VerifyWorkflow;
pub use services::{
    CertificateChainBuilder, ChainBuildOptions, PackageSignatureVerifier, SignatureParser,
    TimestampValidator,
};
pub use tokio_util::sync::CancellationToken;
