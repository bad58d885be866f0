pub use hyper::StatusCode;
use serde_json::Value;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
    Delete,
    Other(String),
}

impl ProxyMethod {
    pub fn as_str(&self) -> &str {
        match self {
            ProxyMethod::Get => "GET",
            ProxyMethod::Post => "POST",
            ProxyMethod::Delete => "DELETE",
            ProxyMethod::Other(s) => s.as_str(),
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => ProxyMethod::Get,
            "POST" => ProxyMethod::Post,
            "DELETE" => ProxyMethod::Delete,
            other => ProxyMethod::Other(other.to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ProxyMethod::Other(_))
    }
}

impl fmt::Display for ProxyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&hyper::Method> for ProxyMethod {
    fn from(method: &hyper::Method) -> Self {
        match *method {
            hyper::Method::GET => ProxyMethod::Get,
            hyper::Method::POST => ProxyMethod::Post,
            hyper::Method::DELETE => ProxyMethod::Delete,
            ref other => ProxyMethod::Other(other.to_string()),
        }
    }
}

/// Server-held upstream API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// A fully built call to the upstream. Only ever constructed by the forwarding proxy.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: ProxyMethod,
    pub target_url: Url,
    pub credential: Credential,
    pub payload: Option<Value>,
}

impl OutboundRequest {
    pub fn new(method: ProxyMethod, target_url: Url, credential: Credential) -> Self {
        Self {
            method,
            target_url,
            credential,
            payload: None,
        }
    }

    /// Attach a JSON body. Ignored unless the method is POST.
    pub fn with_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = match self.method {
            ProxyMethod::Post => payload,
            _ => None,
        };
        self
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}
