//! Package reader collaborators.
//!
//! The archive format is not interpreted here. A reader hands out parsed
//! signatures and computes content digests over whatever bytes the signature
//! covers.

use crate::domain::crypto::HashAlgorithm;
use crate::domain::signature::Signature;
use crate::infra::error::VerifierResult;
use crate::services::signature_parser::SignatureParser;
use std::path::Path;

pub trait PackageReader: Send + Sync {
    /// The package's primary (author or repository) signature, if signed.
    ///
    /// An `Err` means signature bytes exist but could not be parsed.
    fn primary_signature(&self) -> VerifierResult<Option<Signature>>;

    /// A repository countersignature, if present.
    fn repository_signature(&self) -> VerifierResult<Option<Signature>>;

    /// Digest of the signed content under `algorithm`.
    fn content_digest(&self, algorithm: HashAlgorithm) -> VerifierResult<Vec<u8>>;
}

/// Pre-parsed signatures over in-memory content.
#[derive(Debug, Clone)]
pub struct InMemoryPackage {
    content: Vec<u8>,
    primary: Option<Signature>,
    repository: Option<Signature>,
}

impl InMemoryPackage {
    #[must_use]
    pub fn unsigned(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            primary: None,
            repository: None,
        }
    }

    #[must_use]
    pub fn signed(content: impl Into<Vec<u8>>, primary: Signature) -> Self {
        Self {
            primary: Some(primary),
            ..Self::unsigned(content)
        }
    }

    #[must_use]
    pub fn with_repository_signature(mut self, signature: Signature) -> Self {
        self.repository = Some(signature);
        self
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl PackageReader for InMemoryPackage {
    fn primary_signature(&self) -> VerifierResult<Option<Signature>> {
        Ok(self.primary.clone())
    }

    fn repository_signature(&self) -> VerifierResult<Option<Signature>> {
        Ok(self.repository.clone())
    }

    fn content_digest(&self, algorithm: HashAlgorithm) -> VerifierResult<Vec<u8>> {
        Ok(algorithm.digest(&self.content))
    }
}

/// Content plus detached CMS signature blobs, parsed on demand.
#[derive(Debug, Clone)]
pub struct DetachedSignaturePackage {
    content: Vec<u8>,
    primary: Option<Vec<u8>>,
    repository: Option<Vec<u8>>,
}

impl DetachedSignaturePackage {
    #[must_use]
    pub fn new(content: Vec<u8>, primary: Option<Vec<u8>>) -> Self {
        Self {
            content,
            primary,
            repository: None,
        }
    }

    #[must_use]
    pub fn with_repository_signature(mut self, der: Vec<u8>) -> Self {
        self.repository = Some(der);
        self
    }

    /// Read the content and signature files from disk.
    pub fn from_files(
        content: &Path,
        primary: Option<&Path>,
        repository: Option<&Path>,
    ) -> VerifierResult<Self> {
        let content = std::fs::read(content)?;
        let primary = primary.map(std::fs::read).transpose()?;
        let repository = repository.map(std::fs::read).transpose()?;
        Ok(Self {
            content,
            primary,
            repository,
        })
    }
}

impl PackageReader for DetachedSignaturePackage {
    fn primary_signature(&self) -> VerifierResult<Option<Signature>> {
        self.primary
            .as_deref()
            .map(SignatureParser::parse)
            .transpose()
    }

    fn repository_signature(&self) -> VerifierResult<Option<Signature>> {
        self.repository
            .as_deref()
            .map(SignatureParser::parse)
            .transpose()
    }

    fn content_digest(&self, algorithm: HashAlgorithm) -> VerifierResult<Vec<u8>> {
        Ok(algorithm.digest(&self.content))
    }
}
