//! HTTP readiness probe.
//!
//! # Responsibilities
//! - GET the configured URL with a per-attempt timeout
//! - Treat any 2xx as ready

use std::time::Duration;

use crate::probe::Readiness;

#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .no_proxy()
            .user_agent(concat!("readiness-launcher/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn check(&self) -> Readiness {
        match self.client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => Readiness::Ready,
            Ok(response) => {
                tracing::debug!(url = %self.url, status = %response.status(), "HTTP probe failed: non-success status");
                Readiness::NotReady(format!("GET {} returned {}", self.url, response.status()))
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!(url = %self.url, "HTTP probe failed: timeout");
                Readiness::NotReady(format!("GET {} timed out", self.url))
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "HTTP probe failed: connection error");
                Readiness::NotReady(format!("GET {} failed: {}", self.url, e))
            }
        }
    }
}
