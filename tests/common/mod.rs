//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod cms;
pub mod pki;

use package_signature_verifier::adapters::revocation::RevocationClient;
use package_signature_verifier::{CertificateChainBuilder, StaticRevocationClient, StaticTrustStore};
use std::sync::Arc;

/// Chain builder trusting `pki`'s root and answering revocation from `revocation`.
pub fn builder_with(
    pki: &pki::TestPki,
    revocation: Arc<dyn RevocationClient>,
) -> Arc<CertificateChainBuilder> {
    let store = StaticTrustStore::new(vec![pki.root.cert.clone()]);
    Arc::new(CertificateChainBuilder::new(Arc::new(store), revocation))
}

/// Chain builder trusting `pki`'s root with every certificate reported good.
pub fn builder(pki: &pki::TestPki) -> Arc<CertificateChainBuilder> {
    builder_with(pki, Arc::new(StaticRevocationClient::default()))
}

/// Chain builder with an empty trust store.
pub fn untrusting_builder() -> Arc<CertificateChainBuilder> {
    Arc::new(CertificateChainBuilder::new(
        Arc::new(StaticTrustStore::default()),
        Arc::new(StaticRevocationClient::default()),
    ))
}
