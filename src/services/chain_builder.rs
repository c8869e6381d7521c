//! Certificate chain building service.
//!
//! Builds a path from an end-entity certificate to a root using the
//! certificates bundled in a signature plus the trusted root store, then
//! classifies every problem found along the way as a `ChainStatus` flag.
//! Interpreting those flags against policy is the trust provider's job.

use crate::adapters::revocation::{RevocationClient, RevocationStatus, UnknownReason};
use crate::adapters::trust_store::TrustedRootStore;
use crate::domain::chain::{ApplicationPolicy, ChainBuildResult, ChainElement, ChainStatus};
use crate::domain::constants::MAX_CHAIN_DEPTH;
use crate::domain::crypto::{Cert, CertFingerprint};
use crate::domain::policy::RevocationMode;
use crate::infra::error::{VerifierError, VerifierResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

/// Per-build inputs.
#[derive(Debug, Clone)]
pub struct ChainBuildOptions {
    /// Instant certificate validity is evaluated at.
    pub verification_time: SystemTime,
    /// Record the end-entity certificate's time-validity flags but leave them
    /// out of its effective statuses. Issuing certificates are unaffected.
    pub ignore_not_time_valid: bool,
    pub application_policy: ApplicationPolicy,
    pub revocation_mode: RevocationMode,
    pub revocation_timeout: Duration,
    pub exclude_root_from_revocation: bool,
    /// Extra trust anchors, matched by fingerprint.
    pub trusted_certificates: BTreeSet<CertFingerprint>,
    /// Certificates flagged as explicitly distrusted wherever they appear.
    pub untrusted_certificates: BTreeSet<CertFingerprint>,
}

impl ChainBuildOptions {
    #[must_use]
    pub fn new(application_policy: ApplicationPolicy, verification_time: SystemTime) -> Self {
        Self {
            verification_time,
            ignore_not_time_valid: false,
            application_policy,
            revocation_mode: RevocationMode::Online,
            revocation_timeout: Duration::from_secs(15),
            exclude_root_from_revocation: true,
            trusted_certificates: BTreeSet::new(),
            untrusted_certificates: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn ignoring_time_validity(mut self, ignore: bool) -> Self {
        self.ignore_not_time_valid = ignore;
        self
    }

    #[must_use]
    pub fn with_revocation(mut self, mode: RevocationMode, timeout: Duration) -> Self {
        self.revocation_mode = mode;
        self.revocation_timeout = timeout;
        self
    }
}

/// How a candidate path ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PathEnd {
    Partial,
    UntrustedRoot,
    TrustAnchor,
}

pub struct CertificateChainBuilder {
    trust_store: Arc<dyn TrustedRootStore>,
    revocation: Arc<dyn RevocationClient>,
}

impl CertificateChainBuilder {
    #[must_use]
    pub fn new(trust_store: Arc<dyn TrustedRootStore>, revocation: Arc<dyn RevocationClient>) -> Self {
        Self {
            trust_store,
            revocation,
        }
    }

    /// Build and classify the chain for `leaf`.
    ///
    /// Only cancellation is an `Err`; every other problem is a status flag on
    /// the result.
    pub async fn build(
        &self,
        leaf: &Cert,
        extra_certificates: &[Cert],
        options: &ChainBuildOptions,
        cancel: &CancellationToken,
    ) -> VerifierResult<ChainBuildResult> {
        if cancel.is_cancelled() {
            return Err(VerifierError::Cancelled);
        }
        log::debug!("Building chain for {}", leaf.subject());

        let mut pool: Vec<&Cert> = Vec::new();
        for cert in self.trust_store.trusted_roots().iter().chain(extra_certificates) {
            if !pool.contains(&cert) {
                pool.push(cert);
            }
        }

        let (path, end) = self.find_path(leaf, &pool, options);
        log::debug!("Chain path of {} certificate(s) ends at {:?}", path.len(), end);

        let mut elements: Vec<ChainElement> =
            path.iter().map(|&c| ChainElement::new(c.clone())).collect();
        if let Some(leaf_element) = elements.first_mut() {
            leaf_element.set_ignore_time_validity(options.ignore_not_time_valid);
        }

        check_time_and_usage(&mut elements, options);
        let extensions_ok = check_constraints(&mut elements);

        if let Some(last) = elements.last_mut() {
            match end {
                PathEnd::TrustAnchor => {}
                PathEnd::UntrustedRoot => last.add_status(ChainStatus::UntrustedRoot),
                PathEnd::Partial => last.add_status(ChainStatus::PartialChain),
            }
        }

        self.check_revocation(&mut elements, end, options, cancel).await?;

        let success = end != PathEnd::Partial && extensions_ok;
        let chain = ChainBuildResult::new(elements, success);
        if let (Some(first), Some(last)) = (chain.leaf(), chain.root()) {
            log::debug!(
                "Chain {} -> {} built (success: {success})",
                first.certificate().subject(),
                last.certificate().subject()
            );
        }
        Ok(chain)
    }

    fn is_anchor(&self, cert: &Cert, options: &ChainBuildOptions) -> bool {
        options.trusted_certificates.contains(&cert.fingerprint()) || self.trust_store.is_trusted(cert)
    }

    /// Depth-first search preferring paths that end in a trust anchor, then
    /// paths ending in any self-signed root, then the longest partial path.
    fn find_path<'a>(
        &self,
        leaf: &'a Cert,
        pool: &[&'a Cert],
        options: &ChainBuildOptions,
    ) -> (Vec<&'a Cert>, PathEnd) {
        let mut best = (vec![leaf], PathEnd::Partial);
        let mut path = vec![leaf];
        self.search(&mut path, pool, options, &mut best);
        best
    }

    fn search<'a>(
        &self,
        path: &mut Vec<&'a Cert>,
        pool: &[&'a Cert],
        options: &ChainBuildOptions,
        best: &mut (Vec<&'a Cert>, PathEnd),
    ) -> bool {
        let Some(&current) = path.last() else {
            return false;
        };

        let end = if self.is_anchor(current, options) {
            Some(PathEnd::TrustAnchor)
        } else if current.is_self_signed() {
            Some(PathEnd::UntrustedRoot)
        } else {
            None
        };

        if let Some(end) = end {
            if end > best.1 {
                *best = (path.clone(), end);
            }
            return end == PathEnd::TrustAnchor;
        }
        if best.1 == PathEnd::Partial && path.len() > best.0.len() {
            *best = (path.clone(), PathEnd::Partial);
        }
        if path.len() >= MAX_CHAIN_DEPTH {
            return false;
        }

        let mut issuers: Vec<&'a Cert> = pool
            .iter()
            .copied()
            .filter(|candidate| !path.contains(candidate))
            .filter(|candidate| current.could_be_issued_by(candidate))
            .filter(|candidate| current.verify_issued_by(candidate).is_ok())
            .collect();
        issuers.sort_by_key(|c| !self.is_anchor(c, options));

        for issuer in issuers {
            path.push(issuer);
            let found = self.search(path, pool, options, best);
            path.pop();
            if found {
                return true;
            }
        }
        false
    }

    async fn check_revocation(
        &self,
        elements: &mut [ChainElement],
        end: PathEnd,
        options: &ChainBuildOptions,
        cancel: &CancellationToken,
    ) -> VerifierResult<()> {
        let len = elements.len();
        let has_root = end != PathEnd::Partial;
        for idx in 0..len {
            let is_root = has_root && idx == len - 1 && len > 1;
            if is_root && options.exclude_root_from_revocation {
                continue;
            }
            if options.revocation_mode == RevocationMode::None {
                elements[idx].add_status(ChainStatus::RevocationUnknown);
                continue;
            }
            let issuer = if idx + 1 < len {
                elements[idx + 1].certificate().clone()
            } else if has_root {
                elements[idx].certificate().clone()
            } else {
                // No issuer: nothing to ask a responder about.
                elements[idx].add_status(ChainStatus::RevocationUnknown);
                continue;
            };

            let cert = elements[idx].certificate().clone();
            match self.query(&cert, &issuer, options, cancel).await? {
                RevocationStatus::Good => {}
                RevocationStatus::Revoked => {
                    log::warn!(
                        "Certificate {} (serial {}) is revoked",
                        cert.subject(),
                        cert.serial_hex()
                    );
                    elements[idx].add_status(ChainStatus::Revoked);
                }
                RevocationStatus::Unknown(reason) => {
                    log::debug!("Revocation status of {} unknown: {reason:?}", cert.subject());
                    elements[idx].add_status(ChainStatus::RevocationUnknown);
                }
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        cert: &Cert,
        issuer: &Cert,
        options: &ChainBuildOptions,
        cancel: &CancellationToken,
    ) -> VerifierResult<RevocationStatus> {
        let timeout = options.revocation_timeout;
        let call = self
            .revocation
            .check_revocation(cert, issuer, options.revocation_mode, timeout);
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(VerifierError::Cancelled),
            outcome = tokio::time::timeout(timeout, call) => Ok(match outcome {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    log::warn!("Revocation check for {} failed: {e}", cert.subject());
                    RevocationStatus::Unknown(UnknownReason::Unreachable)
                }
                Err(_) => {
                    log::warn!(
                        "Revocation check for {} timed out after {:?}",
                        cert.subject(),
                        timeout
                    );
                    RevocationStatus::Unknown(UnknownReason::Timeout)
                }
            }),
        }
    }
}

/// Validity period at the verification time, explicit distrust and EKU.
fn check_time_and_usage(elements: &mut [ChainElement], options: &ChainBuildOptions) {
    let last = elements.len().saturating_sub(1);
    for (idx, element) in elements.iter_mut().enumerate() {
        let cert = element.certificate().clone();
        let at = options.verification_time;
        if at < cert.not_before() {
            element.add_status(ChainStatus::NotYetValid);
        } else if at > cert.not_after() {
            element.add_status(ChainStatus::Expired);
        }

        if options.untrusted_certificates.contains(&cert.fingerprint()) {
            element.add_status(ChainStatus::ExplicitDistrust);
        }

        // Roots are not constrained by EKU.
        let is_root = idx == last && idx > 0;
        if !is_root {
            let ekus = cert.extended_key_usages();
            if !options.application_policy.permits(ekus.as_deref()) {
                element.add_status(ChainStatus::NotValidForUsage);
            }
        }
    }
}

/// Basic constraints, key usage and path length for every issuing certificate.
/// Returns false when any of them forbids chaining.
fn check_constraints(elements: &mut [ChainElement]) -> bool {
    let mut ok = true;
    for idx in 1..elements.len() {
        let cert = elements[idx].certificate().clone();
        let below = idx - 1;
        let valid = match cert.basic_constraints() {
            Some(bc) => {
                bc.ca
                    && bc
                        .path_len_constraint
                        .map_or(true, |max| below <= usize::from(max))
            }
            // Legacy v1 roots carry no extensions at all.
            None => cert.certificate().tbs_certificate.extensions.is_none() && cert.is_self_signed(),
        } && cert.allows_cert_sign() != Some(false);

        if !valid {
            log::debug!("{} may not issue certificates", cert.subject());
            elements[idx].add_status(ChainStatus::InvalidBasicConstraints);
            ok = false;
        }
    }
    ok
}
