//! HTTP transport abstraction.
//!
//! The dispatcher never touches `reqwest` directly; it hands a fully built
//! request to an [`HttpTransport`]. [`ReqwestTransport`] is the production
//! implementation, and callers may inject their own (proxies, recording,
//! synthetic responses).

use std::fmt;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::config::GatewayConfig;
use crate::error::LlmError;
use crate::types::ProviderId;

/// Per-attempt context used for logging.
#[derive(Debug, Clone)]
pub struct HttpRequestContext {
    pub request_id: String,
    pub provider_id: ProviderId,
    /// Request URL without query string (safe to log).
    pub url: String,
}

/// Generate a fresh request id.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Transport-level request data for JSON POST requests.
#[derive(Clone)]
pub struct HttpTransportRequest {
    pub ctx: HttpRequestContext,
    pub url: String,
    pub headers: HeaderMap,
    /// Query parameters; may carry credentials, never logged.
    pub query: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl fmt::Debug for HttpTransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query_keys: Vec<&str> = self.query.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HttpTransportRequest")
            .field("ctx", &self.ctx)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query_keys", &query_keys)
            .field("body", &self.body)
            .finish()
    }
}

/// Transport-level response data.
#[derive(Debug, Clone)]
pub struct HttpTransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpTransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Outbound HTTP for provider calls.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a JSON body and return the raw response, whatever its status.
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError>;

    /// GET a URL and return the raw response (used to download hosted images).
    async fn fetch_bytes(&self, url: &str) -> Result<HttpTransportResponse, LlmError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LlmError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn into_transport_response(
        resp: reqwest::Response,
    ) -> Result<HttpTransportResponse, LlmError> {
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| LlmError::HttpError(format!("read body: {e}")))?;
        Ok(HttpTransportResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError> {
        let resp = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .query(&request.query)
            .json(&request.body)
            .send()
            .await?;
        Self::into_transport_response(resp).await
    }

    async fn fetch_bytes(&self, url: &str) -> Result<HttpTransportResponse, LlmError> {
        let resp = self.client.get(url).send().await?;
        Self::into_transport_response(resp).await
    }
}
