use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use hyper::{Method, StatusCode};

const ALLOWED_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";
const PREFLIGHT_MAX_AGE: &str = "600";

/// Single-origin CORS policy for the browser front end
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origin: Option<HeaderValue>,
}

pub enum Preflight {
    Allowed(HeaderMap),
    Rejected,
}

impl CorsPolicy {
    pub fn new(allowed_origin: Option<&str>) -> Self {
        Self {
            allowed_origin: allowed_origin
                .filter(|origin| !origin.is_empty())
                .and_then(|origin| HeaderValue::from_str(origin).ok()),
        }
    }

    fn allows(&self, origin: &HeaderValue) -> bool {
        self.allowed_origin.as_ref() == Some(origin)
    }

    pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
        *method == Method::OPTIONS
            && headers.contains_key(ORIGIN)
            && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
    }

    /// Answer an `OPTIONS` preflight
    pub fn preflight(&self, headers: &HeaderMap) -> Preflight {
        let Some(origin) = headers.get(ORIGIN) else {
            return Preflight::Rejected;
        };
        if !self.allows(origin) {
            return Preflight::Rejected;
        }

        let mut out = HeaderMap::new();
        out.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        out.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        out.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        out.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE));
        out.insert(VARY, HeaderValue::from_static("Origin"));
        if let Some(requested) = headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
            out.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        Preflight::Allowed(out)
    }

    /// Decorate a regular response for an allowed origin
    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        let Some(origin) = origin.filter(|origin| self.allows(origin)) else {
            return;
        };
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }

    pub fn rejected_status() -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_headers(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers.insert(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"));
        headers.insert(ACCESS_CONTROL_REQUEST_HEADERS, HeaderValue::from_static("content-type"));
        headers
    }

    #[test]
    fn test_preflight_for_allowed_origin() {
        let policy = CorsPolicy::new(Some("http://localhost:3000"));
        let headers = request_headers("http://localhost:3000");

        assert!(CorsPolicy::is_preflight(&Method::OPTIONS, &headers));
        match policy.preflight(&headers) {
            Preflight::Allowed(out) => {
                assert_eq!(out.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "http://localhost:3000");
                assert_eq!(out.get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(), "content-type");
            }
            Preflight::Rejected => panic!("preflight should be allowed"),
        }
    }

    #[test]
    fn test_preflight_for_other_origin_is_rejected() {
        let policy = CorsPolicy::new(Some("http://localhost:3000"));
        assert!(matches!(
            policy.preflight(&request_headers("http://evil.test")),
            Preflight::Rejected
        ));
    }

    #[test]
    fn test_apply_only_decorates_allowed_origin() {
        let policy = CorsPolicy::new(Some("http://localhost:3000"));

        let mut headers = HeaderMap::new();
        policy.apply(Some(&HeaderValue::from_static("http://evil.test")), &mut headers);
        assert!(headers.is_empty());

        policy.apply(Some(&HeaderValue::from_static("http://localhost:3000")), &mut headers);
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
    }

    #[test]
    fn test_disabled_policy_allows_nothing() {
        let policy = CorsPolicy::new(None);
        assert!(matches!(
            policy.preflight(&request_headers("http://localhost:3000")),
            Preflight::Rejected
        ));
    }
}
