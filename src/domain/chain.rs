//! Certificate chain build results.
//!
//! A `ChainBuildResult` is produced by the chain builder and interpreted by the
//! trust provider. Status flags are recorded per certificate; mapping them to
//! errors or warnings is a policy decision made by the caller.

use crate::domain::constants::{ANY_EXTENDED_KEY_USAGE, ID_KP_CODE_SIGNING, ID_KP_TIME_STAMPING};
use crate::domain::crypto::Cert;
use const_oid::ObjectIdentifier;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Extended key usage the leaf certificate must permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationPolicy {
    CodeSigning,
    TimeStamping,
    /// No usage constraint.
    Any,
}

impl ApplicationPolicy {
    #[must_use]
    pub fn oid(&self) -> Option<ObjectIdentifier> {
        match self {
            ApplicationPolicy::CodeSigning => Some(ID_KP_CODE_SIGNING),
            ApplicationPolicy::TimeStamping => Some(ID_KP_TIME_STAMPING),
            ApplicationPolicy::Any => None,
        }
    }

    /// Whether a certificate's EKU list satisfies this policy.
    ///
    /// A certificate without the extension is unconstrained.
    #[must_use]
    pub fn permits(&self, ekus: Option<&[ObjectIdentifier]>) -> bool {
        match (self.oid(), ekus) {
            (None, _) | (_, None) => true,
            (Some(required), Some(list)) => {
                list.contains(&required) || list.contains(&ANY_EXTENDED_KEY_USAGE)
            }
        }
    }
}

/// Per-certificate chain status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Revoked,
    RevocationUnknown,
    UntrustedRoot,
    Expired,
    NotYetValid,
    NotValidForUsage,
    InvalidBasicConstraints,
    PartialChain,
    ExplicitDistrust,
}

/// The five buckets trust evaluation reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Revoked,
    RevocationUnknown,
    UntrustedRoot,
    NotTimeValid,
    Other,
}

impl ChainStatus {
    #[must_use]
    pub fn category(&self) -> StatusCategory {
        match self {
            ChainStatus::Revoked => StatusCategory::Revoked,
            ChainStatus::RevocationUnknown => StatusCategory::RevocationUnknown,
            ChainStatus::UntrustedRoot => StatusCategory::UntrustedRoot,
            ChainStatus::Expired | ChainStatus::NotYetValid => StatusCategory::NotTimeValid,
            ChainStatus::NotValidForUsage
            | ChainStatus::InvalidBasicConstraints
            | ChainStatus::PartialChain
            | ChainStatus::ExplicitDistrust => StatusCategory::Other,
        }
    }

    #[must_use]
    pub fn is_time_status(&self) -> bool {
        self.category() == StatusCategory::NotTimeValid
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChainStatus::Revoked => "revoked",
            ChainStatus::RevocationUnknown => "revocation status unknown",
            ChainStatus::UntrustedRoot => "untrusted root",
            ChainStatus::Expired => "expired",
            ChainStatus::NotYetValid => "not yet valid",
            ChainStatus::NotValidForUsage => "not valid for the requested usage",
            ChainStatus::InvalidBasicConstraints => "invalid basic constraints",
            ChainStatus::PartialChain => "partial chain",
            ChainStatus::ExplicitDistrust => "explicitly distrusted",
        };
        f.write_str(text)
    }
}

/// One certificate of a built chain with its flags.
#[derive(Debug, Clone)]
pub struct ChainElement {
    certificate: Cert,
    statuses: BTreeSet<ChainStatus>,
    ignore_time_validity: bool,
}

impl ChainElement {
    #[must_use]
    pub fn new(certificate: Cert) -> Self {
        Self {
            certificate,
            statuses: BTreeSet::new(),
            ignore_time_validity: false,
        }
    }

    pub(crate) fn set_ignore_time_validity(&mut self, ignore: bool) {
        self.ignore_time_validity = ignore;
    }

    pub fn add_status(&mut self, status: ChainStatus) {
        self.statuses.insert(status);
    }

    #[must_use]
    pub fn certificate(&self) -> &Cert {
        &self.certificate
    }

    /// Every flag recorded, including suppressed time flags.
    #[must_use]
    pub fn statuses(&self) -> &BTreeSet<ChainStatus> {
        &self.statuses
    }

    /// Flags the caller must interpret. Time flags are dropped when the build
    /// was asked to ignore time validity.
    pub fn effective_statuses(&self) -> impl Iterator<Item = ChainStatus> + '_ {
        self.statuses
            .iter()
            .copied()
            .filter(move |s| !(self.ignore_time_validity && s.is_time_status()))
    }

    #[must_use]
    pub fn has_status(&self, status: ChainStatus) -> bool {
        self.effective_statuses().any(|s| s == status)
    }
}

/// Chain from leaf towards root.
#[derive(Debug, Clone)]
pub struct ChainBuildResult {
    elements: Vec<ChainElement>,
    success: bool,
}

impl ChainBuildResult {
    #[must_use]
    pub fn new(elements: Vec<ChainElement>, success: bool) -> Self {
        Self { elements, success }
    }

    /// True when a path from the leaf to a root certificate was constructed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn elements(&self) -> &[ChainElement] {
        &self.elements
    }

    #[must_use]
    pub fn leaf(&self) -> Option<&ChainElement> {
        self.elements.first()
    }

    #[must_use]
    pub fn root(&self) -> Option<&ChainElement> {
        self.elements.last()
    }

    #[must_use]
    pub fn has_status(&self, status: ChainStatus) -> bool {
        self.elements.iter().any(|e| e.has_status(status))
    }

    /// Distinct effective flags across the chain, in a stable order.
    #[must_use]
    pub fn all_statuses(&self) -> BTreeSet<ChainStatus> {
        self.elements
            .iter()
            .flat_map(ChainElement::effective_statuses)
            .collect()
    }

    /// Elements carrying `status`, leaf first.
    pub fn elements_with(&self, status: ChainStatus) -> impl Iterator<Item = &ChainElement> {
        self.elements.iter().filter(move |e| e.has_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_cover_time_flags() {
        assert_eq!(ChainStatus::Expired.category(), StatusCategory::NotTimeValid);
        assert_eq!(ChainStatus::NotYetValid.category(), StatusCategory::NotTimeValid);
        assert_eq!(ChainStatus::PartialChain.category(), StatusCategory::Other);
        assert!(!ChainStatus::Revoked.is_time_status());
    }

    #[test]
    fn application_policy_respects_any_usage() {
        let code = [ID_KP_CODE_SIGNING];
        let any = [ANY_EXTENDED_KEY_USAGE];
        let ts = [ID_KP_TIME_STAMPING];

        assert!(ApplicationPolicy::CodeSigning.permits(Some(&code)));
        assert!(ApplicationPolicy::CodeSigning.permits(Some(&any)));
        assert!(ApplicationPolicy::CodeSigning.permits(None));
        assert!(!ApplicationPolicy::CodeSigning.permits(Some(&ts)));
        assert!(ApplicationPolicy::Any.permits(Some(&ts)));
    }
}
