//! Network probe seam and its HTTP implementation

use async_trait::async_trait;
use reelfeed_model::SourceLocator;
use reqwest::{Client, header};
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Probe timed out")]
    Timeout,

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Unsupported locator scheme: {0}")]
    UnsupportedScheme(String),
}

impl ProbeError {
    /// Timeouts are expected under poor connectivity and are not anomalies.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
}

impl ProbeResponse {
    /// Valid on any 2xx, which includes 206 Partial Content.
    pub fn is_valid(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal existence check against a video source.
#[async_trait]
pub trait NetworkProbe: Send + Sync + Debug {
    /// Issue a partial-content request carrying `range` as its `Range`
    /// header value.
    async fn probe(
        &self,
        locator: &SourceLocator,
        range: &str,
    ) -> Result<ProbeResponse, ProbeError>;
}

/// Probe issuing ranged GET requests with reqwest.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Build a probe with a pooled client whose request timeout matches the
    /// prefetch budget.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|err| ProbeError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NetworkProbe for HttpProbe {
    async fn probe(
        &self,
        locator: &SourceLocator,
        range: &str,
    ) -> Result<ProbeResponse, ProbeError> {
        if !locator.is_remote() {
            return Err(ProbeError::UnsupportedScheme(
                locator.as_url().scheme().to_string(),
            ));
        }

        let response = self
            .client
            .get(locator.as_url().clone())
            .header(header::RANGE, range)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProbeError::Timeout
                } else {
                    ProbeError::Transport(err.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let probe = ProbeResponse { status };
        if probe.is_valid() {
            Ok(probe)
        } else {
            Err(ProbeError::Status(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_content_is_valid() {
        assert!(ProbeResponse { status: 206 }.is_valid());
        assert!(ProbeResponse { status: 200 }.is_valid());
        assert!(!ProbeResponse { status: 304 }.is_valid());
        assert!(!ProbeResponse { status: 404 }.is_valid());
    }

    #[tokio::test]
    async fn non_http_locators_are_rejected() {
        let probe = HttpProbe::new(Duration::from_secs(1)).unwrap();
        let locator = SourceLocator::parse("file:///videos/clip.mp4").unwrap();
        let err = probe.probe(&locator, "bytes=0-1023").await.unwrap_err();
        assert_eq!(err, ProbeError::UnsupportedScheme("file".to_string()));
    }
}
