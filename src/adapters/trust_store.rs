//! Trusted root certificate stores.

use crate::domain::crypto::Cert;
use crate::infra::error::{VerifierError, VerifierResult};
use std::path::Path;

/// Supplies the set of root certificates chains may terminate in.
pub trait TrustedRootStore: Send + Sync {
    fn trusted_roots(&self) -> &[Cert];

    fn is_trusted(&self, certificate: &Cert) -> bool {
        self.trusted_roots().iter().any(|root| root == certificate)
    }
}

/// Explicitly configured trust list.
#[derive(Debug, Clone, Default)]
pub struct StaticTrustStore {
    roots: Vec<Cert>,
}

impl StaticTrustStore {
    #[must_use]
    pub fn new(roots: Vec<Cert>) -> Self {
        let mut store = Self::default();
        for root in roots {
            store.add(root);
        }
        store
    }

    /// Add a root; duplicates are ignored.
    pub fn add(&mut self, root: Cert) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn from_pem_bundle(pem: &str) -> VerifierResult<Self> {
        Ok(Self::new(Cert::from_pem_bundle(pem)?))
    }

    /// Load `.pem`, `.crt`, `.cer` and `.der` files from a directory.
    ///
    /// PEM files may hold several certificates. Unreadable files are skipped
    /// with a warning; an unreadable directory is an error.
    pub fn from_directory(dir: &Path) -> VerifierResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            VerifierError::Configuration(format!(
                "Cannot read trusted roots directory {}: {e}",
                dir.display()
            ))
        })?;

        let mut store = Self::default();
        for entry in entries {
            let path = entry?.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            if !matches!(ext.as_deref(), Some("pem" | "crt" | "cer" | "der")) {
                continue;
            }
            let bytes = std::fs::read(&path)?;
            match Self::parse_file(&bytes) {
                Ok(certs) => certs.into_iter().for_each(|c| store.add(c)),
                Err(e) => log::warn!("Skipping {}: {e}", path.display()),
            }
        }
        log::debug!(
            "Loaded {} trusted root(s) from {}",
            store.roots.len(),
            dir.display()
        );
        Ok(store)
    }

    fn parse_file(bytes: &[u8]) -> VerifierResult<Vec<Cert>> {
        match std::str::from_utf8(bytes) {
            Ok(text) if text.contains("-----BEGIN CERTIFICATE-----") => Cert::from_pem_bundle(text),
            _ => Ok(vec![Cert::from_der(bytes)?]),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl TrustedRootStore for StaticTrustStore {
    fn trusted_roots(&self) -> &[Cert] {
        &self.roots
    }
}
