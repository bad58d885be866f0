use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::{
    OutboundRequest, ProxyError, ProxyMethod, Result, StatusCode, UpstreamResponse, DEFAULT_UPSTREAM_ERROR,
    UNKNOWN_REMOTE_ERROR,
};
use crate::ports::{CredentialsPort, HttpClientPort};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Forwards one call to the upstream and normalizes whatever comes back.
#[derive(Clone)]
pub struct ProxyService {
    credentials: Arc<dyn CredentialsPort>,
    http_client: Arc<dyn HttpClientPort>,
    timeout: Duration,
}

impl ProxyService {
    pub fn new(credentials: Arc<dyn CredentialsPort>, http_client: Arc<dyn HttpClientPort>) -> Self {
        Self {
            credentials,
            http_client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Perform exactly one upstream call.
    ///
    /// `url` must come from the route table, never straight from a client.
    /// `payload` is only sent for POST.
    pub async fn forward(&self, method: ProxyMethod, url: Url, payload: Option<Value>) -> Result<Value> {
        let credential = self.credentials.get_credential().await?;

        if !method.is_supported() {
            return Err(ProxyError::unsupported_method(method.as_str()));
        }

        let request = OutboundRequest::new(method, url, credential).with_payload(payload);
        debug!("{} {}", request.method, request.target_url);

        let response = self
            .http_client
            .execute(&request, self.timeout)
            .await
            .map_err(|e| {
                error!("Request error: {}", e);
                ProxyError::transport(&e)
            })?;

        classify_response(response)
    }
}

fn classify_response(response: UpstreamResponse) -> Result<Value> {
    let status = response.status;

    let body = if response.body.is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) => value,
            Err(e) => {
                warn!("Upstream returned {} with a non-JSON body: {}", status, e);
                let text = String::from_utf8_lossy(&response.body);
                let message = if text.is_empty() {
                    UNKNOWN_REMOTE_ERROR.to_string()
                } else {
                    text.into_owned()
                };
                return Err(ProxyError::upstream(status, message));
            }
        }
    };

    if status == StatusCode::OK {
        return Ok(body);
    }

    let message = match body.get("detail") {
        Some(Value::String(detail)) => detail.clone(),
        Some(Value::Null) | None => DEFAULT_UPSTREAM_ERROR.to_string(),
        Some(other) => other.to_string(),
    };
    warn!("Upstream returned {}: {}", status, message);
    Err(ProxyError::upstream(status, message))
}
