//! CRL HTTP client adapter.
//! Downloads certificate revocation lists from distribution point URLs.
//! One attempt per URL; the caller decides what a failure means.

use crate::infra::error::{VerifierError, VerifierResult};
use async_trait::async_trait;
use std::time::Duration;

/// Source of raw CRL bytes for a distribution point URL.
#[async_trait]
pub trait CrlFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> VerifierResult<Vec<u8>>;
}

/// HTTP adapter performing plain GET requests.
pub struct HttpCrlFetcher {
    http: reqwest::Client,
}

impl HttpCrlFetcher {
    pub fn new(user_agent: &str) -> VerifierResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CrlFetcher for HttpCrlFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> VerifierResult<Vec<u8>> {
        log::debug!("fetching CRL -> {url}");
        let resp = self
            .http
            .get(url)
            .header("Accept", "application/pkix-crl")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| VerifierError::Network(format!("HTTP error: {e}")))?;
        if !resp.status().is_success() {
            return Err(VerifierError::Network(format!(
                "HTTP {} from {url}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| VerifierError::Network(format!("Read body failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let fetcher = HttpCrlFetcher::new("package-sig-verify-test").unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/ca.crl", Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, VerifierError::Network(_)));
    }
}
