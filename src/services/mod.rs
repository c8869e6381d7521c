//! Service layer module root.
//! Contains signature parsing, chain building and the verification pipeline.

pub mod chain_builder;
pub mod providers;
pub mod signature_parser;
pub mod timestamp_validator;
pub mod verification;

pub use chain_builder::{CertificateChainBuilder, ChainBuildOptions};
pub use providers::{IntegrityProvider, SignatureContext, TrustProvider, VerificationProvider};
pub use signature_parser::SignatureParser;
pub use timestamp_validator::{TimestampOutcome, TimestampValidator};
pub use verification::PackageSignatureVerifier;
