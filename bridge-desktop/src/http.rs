//! `HttpClient` over `reqwest` (rustls), retrying throttled and unavailable
//! responses.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Client-wide timeout; video uploads can be large.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(30);

pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .user_agent(concat!("asset-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }

    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder
    }

    /// 429 and 5xx are worth another attempt; everything else goes back to
    /// the caller as a response.
    fn is_transient(status: u16) -> bool {
        status == 429 || status >= 500
    }

    /// Exponential backoff after the given (1-based) failed attempt.
    fn backoff(attempt: u32) -> Duration {
        BASE_DELAY
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_DELAY)
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self.build_request(request).send().await.map_err(|e| {
            if e.is_timeout() {
                BridgeError::OperationFailed("Request timed out".to_string())
            } else if e.is_connect() {
                BridgeError::OperationFailed(format!("Connection failed: {}", e))
            } else {
                BridgeError::OperationFailed(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(attempt, url = %request.url, "Executing HTTP request");

            let outcome = self.attempt(&request).await;
            let retry = match &outcome {
                Ok(response) => Self::is_transient(response.status),
                Err(_) => true,
            };
            if !retry || attempt >= MAX_ATTEMPTS {
                return outcome;
            }

            match &outcome {
                Ok(response) => warn!(status = response.status, attempt, "Retryable HTTP status"),
                Err(e) => warn!(error = %e, attempt, "HTTP request failed"),
            }
            tokio::time::sleep(Self::backoff(attempt)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(ReqwestHttpClient::new().is_ok());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::method(HttpMethod::Post),
            reqwest::Method::POST
        );
    }

    #[test]
    fn test_transient_statuses() {
        assert!(ReqwestHttpClient::is_transient(429));
        assert!(ReqwestHttpClient::is_transient(503));
        assert!(!ReqwestHttpClient::is_transient(401));
        assert!(!ReqwestHttpClient::is_transient(200));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(ReqwestHttpClient::backoff(1), Duration::from_millis(100));
        assert_eq!(ReqwestHttpClient::backoff(2), Duration::from_millis(200));
        assert_eq!(ReqwestHttpClient::backoff(3), Duration::from_millis(400));
        assert_eq!(ReqwestHttpClient::backoff(20), MAX_DELAY);
    }
}
