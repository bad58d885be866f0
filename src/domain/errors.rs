use hyper::StatusCode;
use std::fmt;

pub const UNKNOWN_REMOTE_ERROR: &str = "Unknown error from remote server";
pub const DEFAULT_UPSTREAM_ERROR: &str = "Something went wrong";

/// Where a [`ProxyError`] originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    UnsupportedMethod,
    Transport,
    Upstream,
    InvalidRequest,
    Routing,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::UnsupportedMethod => "unsupported_method",
            ErrorKind::Transport => "transport",
            ErrorKind::Upstream => "upstream",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Routing => "routing",
        }
    }
}

/// The single error value callers of the gateway ever see: a status and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
}

impl ProxyError {
    pub fn new(kind: ErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn missing_credential(var: &str) -> Self {
        Self::new(
            ErrorKind::Configuration,
            StatusCode::BAD_REQUEST,
            format!("Setup {} in .env to be able to use Workflow", var),
        )
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedMethod,
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method {} not supported in proxy", method),
        )
    }

    pub fn transport(err: &TransportError) -> Self {
        Self::new(
            ErrorKind::Transport,
            StatusCode::BAD_GATEWAY,
            format!("Error contacting remote server: {}", err),
        )
    }

    pub fn upstream(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, status, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, StatusCode::BAD_REQUEST, message)
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            ErrorKind::InvalidRequest,
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body exceeds {} bytes", limit),
        )
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::Routing, StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            ErrorKind::Routing,
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed",
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.as_str(), self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ProxyError {}

/// Failure to get any response out of the upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout(String),
    Connection(String),
    Body(String),
    InvalidRequest(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout(msg) => write!(f, "Operation timed out: {}", msg),
            TransportError::Connection(msg) => write!(f, "{}", msg),
            TransportError::Body(msg) => write!(f, "Failed to read response body: {}", msg),
            TransportError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

pub type Result<T> = std::result::Result<T, ProxyError>;
