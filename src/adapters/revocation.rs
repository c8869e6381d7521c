//! Revocation responder clients.
//!
//! The chain builder owns timeouts and cancellation; clients only answer the
//! question for one certificate. A client never retries: anything it cannot
//! decide is `Unknown`.

use crate::adapters::crl_http_client::CrlFetcher;
use crate::domain::crypto::{Cert, CertFingerprint, SignatureScheme};
use crate::domain::policy::RevocationMode;
use crate::infra::error::{VerifierError, VerifierResult};
use async_trait::async_trait;
use der::{Decode, Encode};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use x509_cert::crl::CertificateList;

/// Why a revocation status could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    /// The responder did not answer within the policy timeout.
    Timeout,
    /// The responder could not be reached or returned unusable data.
    Unreachable,
    /// No revocation data exists for this certificate.
    NoData,
    /// Revocation checking is disabled.
    NotChecked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    Good,
    Revoked,
    Unknown(UnknownReason),
}

/// Answers revocation queries for a certificate issued by `issuer`.
#[async_trait]
pub trait RevocationClient: Send + Sync {
    async fn check_revocation(
        &self,
        certificate: &Cert,
        issuer: &Cert,
        mode: RevocationMode,
        timeout: Duration,
    ) -> VerifierResult<RevocationStatus>;
}

/// Fixed answers keyed by certificate fingerprint.
#[derive(Debug, Clone)]
pub struct StaticRevocationClient {
    statuses: HashMap<CertFingerprint, RevocationStatus>,
    default_status: RevocationStatus,
}

impl Default for StaticRevocationClient {
    fn default() -> Self {
        Self::new(RevocationStatus::Good)
    }
}

impl StaticRevocationClient {
    /// Client answering `default_status` for certificates it has no entry for.
    #[must_use]
    pub fn new(default_status: RevocationStatus) -> Self {
        Self {
            statuses: HashMap::new(),
            default_status,
        }
    }

    #[must_use]
    pub fn with_status(mut self, fingerprint: CertFingerprint, status: RevocationStatus) -> Self {
        self.statuses.insert(fingerprint, status);
        self
    }

    #[must_use]
    pub fn revoke(self, certificate: &Cert) -> Self {
        self.with_status(certificate.fingerprint(), RevocationStatus::Revoked)
    }
}

#[async_trait]
impl RevocationClient for StaticRevocationClient {
    async fn check_revocation(
        &self,
        certificate: &Cert,
        _issuer: &Cert,
        mode: RevocationMode,
        _timeout: Duration,
    ) -> VerifierResult<RevocationStatus> {
        if mode == RevocationMode::None {
            return Ok(RevocationStatus::Unknown(UnknownReason::NotChecked));
        }
        Ok(self
            .statuses
            .get(&certificate.fingerprint())
            .copied()
            .unwrap_or(self.default_status))
    }
}

/// CRL-backed client with an in-memory cache.
///
/// `Offline` consults only cached CRLs. `Online` additionally downloads the
/// CRLs named in the certificate's distribution points when the cache has no
/// fresh CRL for the issuer.
pub struct CrlRevocationClient {
    cache: RwLock<Vec<CertificateList>>,
    fetcher: Option<Box<dyn CrlFetcher>>,
}

impl Default for CrlRevocationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CrlRevocationClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(Vec::new()),
            fetcher: None,
        }
    }

    /// Enable online retrieval through `fetcher`.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Box<dyn CrlFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Add a DER (or PEM `X509 CRL`) encoded CRL to the cache.
    pub async fn add_crl(&self, bytes: &[u8]) -> VerifierResult<()> {
        let crl = decode_crl(bytes)?;
        self.insert(crl).await;
        Ok(())
    }

    /// Keep one CRL per issuer, the one with the latest `thisUpdate`, and
    /// drop CRLs past their next update.
    async fn insert(&self, crl: CertificateList) {
        let now = SystemTime::now();
        let mut cache = self.cache.write().await;
        cache.retain(|cached| !is_stale(cached, now));
        if is_stale(&crl, now) {
            log::debug!("Not caching stale CRL from {}", crl.tbs_cert_list.issuer);
            return;
        }

        let issuer = &crl.tbs_cert_list.issuer;
        if let Some(existing) = cache
            .iter_mut()
            .find(|cached| &cached.tbs_cert_list.issuer == issuer)
        {
            if this_update(existing) <= this_update(&crl) {
                *existing = crl;
            } else {
                log::debug!("Cached CRL from {issuer} is newer; ignoring older one");
            }
            return;
        }
        cache.push(crl);
    }

    /// Load every `.crl` file from `dir` into the cache.
    pub async fn load_directory(&self, dir: &Path) -> VerifierResult<usize> {
        let mut loaded = 0;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("crl") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match self.add_crl(&bytes).await {
                Ok(()) => loaded += 1,
                Err(e) => log::warn!("Skipping unreadable CRL {}: {e}", path.display()),
            }
        }
        log::debug!("Loaded {loaded} CRL(s) from {}", dir.display());
        Ok(loaded)
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn lookup_cached(&self, certificate: &Cert, issuer: &Cert) -> Option<RevocationStatus> {
        let now = SystemTime::now();
        let cache = self.cache.read().await;
        cache
            .iter()
            .filter(|crl| crl_applies(crl, issuer, now))
            .max_by_key(|crl| this_update(crl))
            .map(|crl| status_in(crl, certificate))
    }

    async fn fetch_and_cache(
        &self,
        fetcher: &dyn CrlFetcher,
        certificate: &Cert,
        issuer: &Cert,
        timeout: Duration,
    ) -> RevocationStatus {
        let urls = certificate.crl_distribution_urls();
        if urls.is_empty() {
            return RevocationStatus::Unknown(UnknownReason::NoData);
        }
        let now = SystemTime::now();
        for url in urls {
            let crl = match fetcher.fetch(&url, timeout).await.and_then(|b| decode_crl(&b)) {
                Ok(crl) => crl,
                Err(e) => {
                    log::warn!("CRL download from {url} failed: {e}");
                    continue;
                }
            };
            if !crl_applies(&crl, issuer, now) {
                log::warn!("CRL from {url} is stale or not signed by {}", issuer.subject());
                continue;
            }
            let status = status_in(&crl, certificate);
            self.insert(crl).await;
            return status;
        }
        RevocationStatus::Unknown(UnknownReason::Unreachable)
    }
}

#[async_trait]
impl RevocationClient for CrlRevocationClient {
    async fn check_revocation(
        &self,
        certificate: &Cert,
        issuer: &Cert,
        mode: RevocationMode,
        timeout: Duration,
    ) -> VerifierResult<RevocationStatus> {
        if mode == RevocationMode::None {
            return Ok(RevocationStatus::Unknown(UnknownReason::NotChecked));
        }
        if let Some(status) = self.lookup_cached(certificate, issuer).await {
            return Ok(status);
        }
        match (mode, self.fetcher.as_deref()) {
            (RevocationMode::Online, Some(fetcher)) => {
                Ok(self.fetch_and_cache(fetcher, certificate, issuer, timeout).await)
            }
            _ => Ok(RevocationStatus::Unknown(UnknownReason::NoData)),
        }
    }
}

fn decode_crl(bytes: &[u8]) -> VerifierResult<CertificateList> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        if text.contains("-----BEGIN X509 CRL-----") {
            let (label, der) = der::pem::decode_vec(text.trim().as_bytes())
                .map_err(|e| VerifierError::Revocation(format!("Invalid CRL PEM: {e}")))?;
            if label != "X509 CRL" {
                return Err(VerifierError::Revocation(format!("Unexpected PEM label {label}")));
            }
            return CertificateList::from_der(&der)
                .map_err(|e| VerifierError::Revocation(format!("Invalid CRL: {e}")));
        }
    }
    CertificateList::from_der(bytes).map_err(|e| VerifierError::Revocation(format!("Invalid CRL: {e}")))
}

fn to_system_time(time: &x509_cert::time::Time) -> SystemTime {
    UNIX_EPOCH + time.to_unix_duration()
}

fn this_update(crl: &CertificateList) -> SystemTime {
    to_system_time(&crl.tbs_cert_list.this_update)
}

fn is_stale(crl: &CertificateList, now: SystemTime) -> bool {
    crl.tbs_cert_list
        .next_update
        .as_ref()
        .is_some_and(|next| to_system_time(next) < now)
}

/// Issued by `issuer`, correctly signed, and not past its next update.
fn crl_applies(crl: &CertificateList, issuer: &Cert, now: SystemTime) -> bool {
    if crl.tbs_cert_list.issuer != issuer.certificate().tbs_certificate.subject {
        return false;
    }
    !is_stale(crl, now) && verify_crl_signature(crl, issuer).is_ok()
}

fn verify_crl_signature(crl: &CertificateList, issuer: &Cert) -> VerifierResult<()> {
    let tbs = crl.tbs_cert_list.to_der()?;
    let scheme = SignatureScheme::from_oids(&crl.signature_algorithm.oid, None)?;
    let signature = crl
        .signature
        .as_bytes()
        .ok_or_else(|| VerifierError::Revocation("CRL signature has unused bits".into()))?;
    scheme.verify(
        &issuer.certificate().tbs_certificate.subject_public_key_info,
        &tbs,
        signature,
    )
}

fn status_in(crl: &CertificateList, certificate: &Cert) -> RevocationStatus {
    let serial = &certificate.certificate().tbs_certificate.serial_number;
    let revoked = crl
        .tbs_cert_list
        .revoked_certificates
        .as_ref()
        .is_some_and(|list| list.iter().any(|entry| &entry.serial_number == serial));
    if revoked {
        RevocationStatus::Revoked
    } else {
        RevocationStatus::Good
    }
}
