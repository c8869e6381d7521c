//! Telemetry sinks for verification runs.
//!
//! A sink is built once by the entry point and handed to the verifier; there is
//! no global telemetry state.

use crate::domain::verification::{ProviderResult, VerificationResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Receives verification lifecycle events.
pub trait TelemetrySink: Send + Sync {
    fn verification_started(&self);

    fn provider_finished(&self, result: &ProviderResult);

    fn verification_finished(&self, result: &VerificationResult);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn verification_started(&self) {}

    fn provider_finished(&self, _result: &ProviderResult) {}

    fn verification_finished(&self, _result: &VerificationResult) {}
}

/// Writes structured lines through the `log` facade.
#[derive(Debug, Default)]
pub struct LogTelemetry {
    started: Mutex<Option<Instant>>,
    providers_run: AtomicUsize,
}

impl LogTelemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider results seen since the last `verification_started`.
    #[must_use]
    pub fn providers_run(&self) -> usize {
        self.providers_run.load(Ordering::Relaxed)
    }
}

impl TelemetrySink for LogTelemetry {
    fn verification_started(&self) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.providers_run.store(0, Ordering::Relaxed);
        log::debug!("verification started");
    }

    fn provider_finished(&self, result: &ProviderResult) {
        self.providers_run.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "provider={} target={} status={} issues={}",
            result.provider(),
            result.target(),
            result.status(),
            result.issues().len()
        );
    }

    fn verification_finished(&self, result: &VerificationResult) {
        let elapsed = self
            .started
            .lock()
            .ok()
            .and_then(|s| *s)
            .map(|s| s.elapsed().as_millis())
            .unwrap_or_default();
        log::info!(
            "verification finished valid={} errors={} warnings={} elapsed_ms={}",
            result.is_valid(),
            result.errors().len(),
            result.warnings().len(),
            elapsed
        );
    }
}
