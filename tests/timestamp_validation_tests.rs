//! Timestamp validation: binding, authority chain and validity window.

mod common;

use common::pki::{self, now, CertSpec, TestPki, DAY};
use package_signature_verifier::domain::constants::ID_KP_TIME_STAMPING;
use package_signature_verifier::domain::crypto::SignatureScheme;
use package_signature_verifier::domain::signature::{MessageImprint, SignerProof};
use package_signature_verifier::{
    CancellationToken, HashAlgorithm, Issue, IssueCode, Severity, Signature, SignatureKind,
    Timestamp, TimestampValidator, TrustPolicy,
};
use std::time::{Duration, SystemTime};

fn signed(pki: &TestPki) -> Signature {
    pki::sign_package(b"package", &pki.signer, SignatureKind::Author, pki.bundle())
}

fn timestamped(pki: &TestPki, at: SystemTime) -> Signature {
    let signature = signed(pki);
    let timestamp = pki::timestamp(&signature, &pki.tsa, at);
    signature.with_timestamp(timestamp)
}

fn codes(issues: &[Issue]) -> Vec<IssueCode> {
    issues.iter().map(Issue::code).collect()
}

#[tokio::test]
async fn valid_timestamp_moves_evaluation_time() {
    let pki = TestPki::new();
    let at = now() - 2 * DAY;
    let signature = timestamped(&pki, at);

    let outcome = TimestampValidator::new(common::builder(&pki))
        .validate(&signature, &TrustPolicy::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.trusted);
    assert_eq!(outcome.as_of, at);
    assert!(outcome.issues.is_empty());
}

#[tokio::test]
async fn missing_timestamp_severity_follows_policy() {
    let pki = TestPki::new();
    let validator = TimestampValidator::new(common::builder(&pki));
    let cancel = CancellationToken::new();
    let signature = signed(&pki);

    let outcome = validator
        .validate(&signature, &TrustPolicy::default(), &cancel)
        .await
        .unwrap();
    assert!(!outcome.trusted);
    assert_eq!(codes(&outcome.issues), vec![IssueCode::TimestampMissing]);
    assert_eq!(outcome.issues[0].severity(), Severity::Warning);

    let policy = TrustPolicy {
        allow_no_timestamp: false,
        ..TrustPolicy::default()
    };
    let outcome = validator.validate(&signature, &policy, &cancel).await.unwrap();
    assert!(outcome.issues[0].is_error());
}

#[tokio::test]
async fn timestamp_over_other_data_is_a_mismatch() {
    let pki = TestPki::new();
    let signature = signed(&pki).with_timestamp(pki::timestamp_over(b"other", &pki.tsa, now()));

    let outcome = TimestampValidator::new(common::builder(&pki))
        .validate(&signature, &TrustPolicy::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.trusted);
    assert_eq!(codes(&outcome.issues), vec![IssueCode::TimestampMismatch]);
    assert!(outcome.issues[0].is_error());
}

#[tokio::test]
async fn forged_authority_signature_is_a_mismatch() {
    let pki = TestPki::new();
    let signature = signed(&pki);
    let attributes = b"forged".to_vec();
    let proof = SignerProof::new(
        attributes.clone(),
        pki.signer.sign(&attributes),
        SignatureScheme::Ecdsa(HashAlgorithm::Sha256),
    );
    let forged = Timestamp::new(
        now(),
        MessageImprint::compute(HashAlgorithm::Sha256, signature.signature_value()),
        pki.tsa.cert.clone(),
    )
    .with_proof(proof);
    let signature = signature.with_timestamp(forged);

    let outcome = TimestampValidator::new(common::builder(&pki))
        .validate(&signature, &TrustPolicy::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(codes(&outcome.issues), vec![IssueCode::TimestampMismatch]);
}

#[tokio::test]
async fn invalid_timestamp_can_be_ignored_by_policy() {
    let pki = TestPki::new();
    let signature = signed(&pki).with_timestamp(pki::timestamp_over(b"other", &pki.tsa, now()));
    let policy = TrustPolicy {
        allow_ignore_timestamp: true,
        ..TrustPolicy::default()
    };

    let outcome = TimestampValidator::new(common::builder(&pki))
        .validate(&signature, &policy, &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.trusted);
    assert_eq!(outcome.issues[0].severity(), Severity::Warning);
    assert!(outcome.as_of > now() - DAY);
}

#[tokio::test]
async fn authority_without_trusted_chain_is_rejected() {
    let pki = TestPki::new();
    let signature = timestamped(&pki, now() - DAY);

    let outcome = TimestampValidator::new(common::untrusting_builder())
        .validate(&signature, &TrustPolicy::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.trusted);
    assert_eq!(codes(&outcome.issues), vec![IssueCode::TimestampChainInvalid]);
}

#[tokio::test]
async fn authority_not_yet_valid_at_generation_time() {
    let pki = TestPki::new();
    let signature = timestamped(&pki, now() - 40 * DAY);

    let outcome = TimestampValidator::new(common::builder(&pki))
        .validate(&signature, &TrustPolicy::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(codes(&outcome.issues), vec![IssueCode::TimestampChainInvalid]);
}

#[tokio::test]
async fn accuracy_window_must_fit_authority_validity() {
    let pki = TestPki::new();
    let short_lived = pki::leaf(
        CertSpec::new("Short TSA", 11)
            .valid(now() - 10 * DAY, now() - DAY)
            .eku(ID_KP_TIME_STAMPING),
        &pki.root,
    );
    let signature = signed(&pki);
    let at = short_lived.cert.not_after() - Duration::from_secs(1);
    let timestamp =
        pki::timestamp(&signature, &short_lived, at).with_accuracy(Duration::from_secs(3600));
    let signature = signature.with_timestamp(timestamp);

    let outcome = TimestampValidator::new(common::builder(&pki))
        .validate(&signature, &TrustPolicy::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.trusted);
    assert_eq!(codes(&outcome.issues), vec![IssueCode::TimestampInvalid]);
}

#[tokio::test]
async fn multiple_timestamps_follow_policy() {
    let pki = TestPki::new();
    let signature = timestamped(&pki, now() - DAY);
    let second = pki::timestamp(&signature, &pki.tsa, now());
    let signature = signature.with_timestamp(second);
    let validator = TimestampValidator::new(common::builder(&pki));
    let cancel = CancellationToken::new();

    let outcome = validator
        .validate(&signature, &TrustPolicy::default(), &cancel)
        .await
        .unwrap();
    assert!(outcome.trusted);
    assert!(outcome.issues.is_empty());

    let outcome = validator
        .validate(&signature, &TrustPolicy::require_mode(), &cancel)
        .await
        .unwrap();
    assert_eq!(codes(&outcome.issues), vec![IssueCode::MultipleTimestamps]);
    assert!(outcome.issues[0].is_error());
}
