//! TCP connect probe.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time;

use crate::probe::Readiness;
use crate::service::Endpoint;

#[derive(Debug, Clone)]
pub struct TcpProbe {
    endpoint: Endpoint,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn check(&self) -> Readiness {
        let connect = TcpStream::connect((self.endpoint.host.as_str(), self.endpoint.port));
        match time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => Readiness::Ready,
            Ok(Err(e)) => {
                tracing::debug!(endpoint = %self.endpoint, error = %e, "TCP probe failed: connection error");
                Readiness::NotReady(format!("connect to {} failed: {}", self.endpoint, e))
            }
            Err(_) => {
                tracing::debug!(endpoint = %self.endpoint, "TCP probe failed: timeout");
                Readiness::NotReady(format!(
                    "connect to {} timed out after {} ms",
                    self.endpoint,
                    self.timeout.as_millis()
                ))
            }
        }
    }
}
