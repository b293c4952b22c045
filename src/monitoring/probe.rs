//! Outbound health probes.
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::debug;

use super::models::{ProbeResult, ProbeStatus};
use crate::version::probe_user_agent;

/// Performs a single health check. Transport failures are reported through
/// [`ProbeResult::status`], never as errors.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Hard bound for one probe, connect included.
    pub timeout: Duration,
    /// Reachable responses slower than this are reported as [`ProbeStatus::Slow`].
    pub slow_threshold: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            slow_threshold: Duration::from_millis(300),
        }
    }
}

/// A probe that issues an HTTP `GET` against the service URL.
pub struct HttpProbeClient {
    client: Client,
    settings: ProbeSettings,
}

impl HttpProbeClient {
    pub fn new(settings: ProbeSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(probe_user_agent())
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> ProbeSettings {
        self.settings
    }

    /// Decided on whole milliseconds, the same resolution as `responseTimeMs`.
    fn is_slow(&self, elapsed: Duration) -> bool {
        elapsed.as_millis() > self.settings.slow_threshold.as_millis()
    }

    fn classify_error(&self, error: &reqwest::Error, elapsed: Duration) -> ProbeResult {
        if error.is_timeout() {
            ProbeResult::new(ProbeStatus::Timeout)
                .with_response_time(elapsed)
                .with_error(format!(
                    "Request timed out after {} ms",
                    self.settings.timeout.as_millis()
                ))
        } else if error.is_connect() {
            ProbeResult::new(ProbeStatus::Offline).with_error(format!("Unreachable: {error}"))
        } else {
            ProbeResult::new(ProbeStatus::Error).with_error(error.to_string())
        }
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn probe(&self, url: &str) -> ProbeResult {
        let target = match Url::parse(url) {
            Ok(target) => target,
            Err(e) => {
                return ProbeResult::new(ProbeStatus::Error).with_error(format!("Invalid URL: {e}"));
            }
        };

        let start_time = Instant::now();
        let response = self.client.get(target).send().await;
        let elapsed = start_time.elapsed();

        let result = match response {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    ProbeResult::new(ProbeStatus::Offline)
                        .with_status_code(status.as_u16())
                        .with_response_time(elapsed)
                        .with_error(format!("Unexpected HTTP status {status}"))
                } else if self.is_slow(elapsed) {
                    ProbeResult::new(ProbeStatus::Slow)
                        .with_status_code(status.as_u16())
                        .with_response_time(elapsed)
                } else {
                    ProbeResult::new(ProbeStatus::Online)
                        .with_status_code(status.as_u16())
                        .with_response_time(elapsed)
                }
            }
            Err(e) => self.classify_error(&e, elapsed),
        };

        debug!(url = %url, status = ?result.status, elapsed_ms = elapsed.as_millis() as u64, "Probe finished.");
        result
    }
}
