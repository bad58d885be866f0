use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

use crate::domain::{OutboundRequest, ProxyMethod, TransportError, UpstreamResponse};
use crate::ports::HttpClientPort;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Upstream client backed by one pooled `reqwest::Client`
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttpClient {
    async fn execute(
        &self,
        request: &OutboundRequest,
        timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError> {
        let method = match request.method {
            ProxyMethod::Get => reqwest::Method::GET,
            ProxyMethod::Post => reqwest::Method::POST,
            ProxyMethod::Delete => reqwest::Method::DELETE,
            ProxyMethod::Other(ref other) => {
                return Err(TransportError::InvalidRequest(format!("unsupported method {}", other)))
            }
        };

        let mut builder = self
            .client
            .request(method, request.target_url.as_str())
            .headers(build_headers(request.credential.expose())?)
            .timeout(timeout);

        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let http_response = builder.send().await.map_err(map_send_error)?;
        let status = http_response.status();

        // The body read shares the request timeout.
        let body = http_response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(describe(&e))
            } else {
                TransportError::Body(describe(&e))
            }
        })?;

        Ok(UpstreamResponse::new(status).with_body(body.to_vec()))
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(describe(&e))
    } else if e.is_builder() {
        TransportError::InvalidRequest(describe(&e))
    } else {
        TransportError::Connection(describe(&e))
    }
}

/// reqwest hides the interesting part ("connection refused", DNS failure) in the source chain.
fn describe(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn build_headers(api_key: &str) -> Result<HeaderMap, TransportError> {
    let mut header_map = HeaderMap::new();
    header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut key = HeaderValue::from_str(api_key)
        .map_err(|_| TransportError::InvalidRequest("API key is not a valid header value".to_string()))?;
    key.set_sensitive(true);
    header_map.insert(HeaderName::from_static(API_KEY_HEADER), key);

    Ok(header_map)
}
