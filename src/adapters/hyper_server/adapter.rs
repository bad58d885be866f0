use http_body_util::{combinators::BoxBody, BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE, ORIGIN};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::cors::{CorsPolicy, Preflight};
use crate::domain::{ProxyError, ProxyMethod, ProxyService, RouteTable};

pub type Body = BoxBody<Bytes, hyper::Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Turns inbound HTTP requests into forwarded upstream calls
pub struct HyperGatewayAdapter {
    service: Arc<ProxyService>,
    routes: RouteTable,
    cors: CorsPolicy,
    body_limit: usize,
}

impl HyperGatewayAdapter {
    pub fn new(service: Arc<ProxyService>, routes: RouteTable) -> Self {
        Self {
            service,
            routes,
            cors: CorsPolicy::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Largest inbound JSON body accepted, larger ones get a 413
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<Body>
    where
        B: hyper::body::Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let span = info_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %req.method(),
            path = %req.uri().path(),
        );

        async move {
            let started = Instant::now();
            let origin = req.headers().get(ORIGIN).cloned();

            let mut response = self.handle_internal(req).await.unwrap_or_else(|e| {
                warn!("{}", e);
                error_response(&e)
            });

            self.cors.apply(origin.as_ref(), response.headers_mut());
            info!(
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request completed"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn handle_internal<B>(&self, req: Request<B>) -> Result<Response<Body>, ProxyError>
    where
        B: hyper::body::Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        if CorsPolicy::is_preflight(req.method(), req.headers()) {
            return Ok(self.handle_preflight(&req));
        }

        match (req.method(), req.uri().path()) {
            (&Method::GET, "/") => {
                return Ok(json_response(StatusCode::OK, &json!({"message": "Welcome to Workflow API"})));
            }
            (&Method::GET, "/api/health") => {
                return Ok(json_response(StatusCode::OK, &json!({"status": "healthy"})));
            }
            _ => {}
        }

        let method = ProxyMethod::from(req.method());
        let route = self.routes.resolve(&method, req.uri().path(), req.uri().query())?;

        let payload = if route.endpoint.expects_body() {
            Some(read_json_body(req, self.body_limit).await?)
        } else {
            None
        };

        let value = self.service.forward(route.method, route.url, payload).await?;
        Ok(json_response(StatusCode::OK, &value))
    }

    fn handle_preflight<B>(&self, req: &Request<B>) -> Response<Body> {
        match self.cors.preflight(req.headers()) {
            Preflight::Allowed(headers) => {
                let mut response = text_response(StatusCode::OK, "OK");
                response.headers_mut().extend(headers);
                response
            }
            Preflight::Rejected => text_response(CorsPolicy::rejected_status(), "Disallowed CORS origin"),
        }
    }
}

async fn read_json_body<B>(req: Request<B>, limit: usize) -> Result<Value, ProxyError>
where
    B: hyper::body::Body<Data = Bytes> + Send,
    B::Error: Into<BoxError>,
{
    let bytes = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ProxyError::payload_too_large(limit)
            } else {
                ProxyError::invalid_request(format!("Failed to read request body: {}", e))
            }
        })?
        .to_bytes();

    serde_json::from_slice(&bytes).map_err(|e| ProxyError::invalid_request(e.to_string()))
}

fn full(bytes: impl Into<Bytes>) -> Body {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

pub fn json_response(status: StatusCode, value: &Value) -> Response<Body> {
    let bytes = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(full(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn text_response(status: StatusCode, text: &'static str) -> Response<Body> {
    let mut response = Response::new(full(text));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// Outward error format: `{"detail": "<message>"}` with the error's status
pub fn error_response(err: &ProxyError) -> Response<Body> {
    json_response(err.status(), &json!({ "detail": err.message() }))
}
