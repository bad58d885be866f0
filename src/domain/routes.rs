//! Fixed mapping from the local REST surface onto upstream URLs.
//!
//! Every inbound route maps to exactly one upstream path. Path parameters are
//! percent-decoded and re-encoded as single upstream path segments, so an
//! inbound request can never choose an arbitrary upstream URL.

use url::Url;

use super::{ErrorKind, ProxyError, ProxyMethod, Result, StatusCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    CreateWorkflow,
    ListWorkflowDefs,
    GetWorkflowDef,
    NodeSchemas,
    DeleteWorkflowDef,
    UpdateWorkflowName,
    ApiNodeSchemas,
    RunWorkflow,
    RunStatus,
    RunNode,
    PublishWorkflow,
    TemplateWorkflow,
    CloudfrontSignedUrl,
    GenerateThumbnail,
    WorkflowLastRun,
    ArchitectWorkflow,
    PollArchitectResult,
    FileUploadUrl,
}

struct RouteDef {
    endpoint: Endpoint,
    method: ProxyMethod,
    inbound: &'static str,
    upstream: &'static str,
}

impl RouteDef {
    const fn new(endpoint: Endpoint, method: ProxyMethod, inbound: &'static str, upstream: &'static str) -> Self {
        Self {
            endpoint,
            method,
            inbound,
            upstream,
        }
    }
}

// Matched in order, first hit wins.
static ROUTES: &[RouteDef] = &[
    RouteDef::new(Endpoint::CreateWorkflow, ProxyMethod::Post, "/api/workflow/create", "/workflow/create"),
    RouteDef::new(
        Endpoint::ListWorkflowDefs,
        ProxyMethod::Get,
        "/api/workflow/get-workflow-defs",
        "/workflow/get-workflow-defs",
    ),
    RouteDef::new(
        Endpoint::GetWorkflowDef,
        ProxyMethod::Get,
        "/api/workflow/get-workflow-def/{workflow_id}",
        "/workflow/get-workflow-def/{workflow_id}",
    ),
    RouteDef::new(
        Endpoint::NodeSchemas,
        ProxyMethod::Get,
        "/api/workflow/{workflow_id}/node-schemas",
        "/workflow/{workflow_id}/node-schemas",
    ),
    RouteDef::new(
        Endpoint::DeleteWorkflowDef,
        ProxyMethod::Delete,
        "/api/workflow/delete-workflow-def/{workflow_id}",
        "/workflow/delete-workflow-def/{workflow_id}",
    ),
    RouteDef::new(
        Endpoint::UpdateWorkflowName,
        ProxyMethod::Post,
        "/api/workflow/update-name/{workflow_id}",
        "/workflow/update-name/{workflow_id}",
    ),
    RouteDef::new(
        Endpoint::ApiNodeSchemas,
        ProxyMethod::Get,
        "/api/workflow/{workflow_id}/api-node-schemas",
        "/workflow/{workflow_id}/api-node-schemas",
    ),
    RouteDef::new(
        Endpoint::RunWorkflow,
        ProxyMethod::Post,
        "/api/workflow/{workflow_id}/run",
        "/workflow/{workflow_id}/run",
    ),
    RouteDef::new(
        Endpoint::RunStatus,
        ProxyMethod::Get,
        "/api/workflow/run/{run_id}/status",
        "/workflow/run/{run_id}/status",
    ),
    RouteDef::new(
        Endpoint::RunNode,
        ProxyMethod::Post,
        "/api/workflow/{workflow_id}/node/{node_id}/run",
        "/workflow/{workflow_id}/node/{node_id}/run",
    ),
    RouteDef::new(
        Endpoint::PublishWorkflow,
        ProxyMethod::Post,
        "/api/workflow/workflow/{workflow_id}/publish",
        "/workflow/workflow/{workflow_id}/publish",
    ),
    RouteDef::new(
        Endpoint::TemplateWorkflow,
        ProxyMethod::Post,
        "/api/workflow/workflow/{workflow_id}/template",
        "/workflow/workflow/{workflow_id}/template",
    ),
    RouteDef::new(
        Endpoint::CloudfrontSignedUrl,
        ProxyMethod::Post,
        "/api/workflow/cloudfront-signed-url",
        "/workflow/cloudfront-signed-url",
    ),
    RouteDef::new(
        Endpoint::GenerateThumbnail,
        ProxyMethod::Post,
        "/api/workflow/{workflow_id}/thumbnail",
        "/workflow/{workflow_id}/thumbnail",
    ),
    RouteDef::new(
        Endpoint::WorkflowLastRun,
        ProxyMethod::Get,
        "/api/workflow/get-workflow-last-run/{workflow_id}",
        "/workflow/get-workflow-last-run/{workflow_id}",
    ),
    RouteDef::new(
        Endpoint::ArchitectWorkflow,
        ProxyMethod::Post,
        "/api/workflow/architect",
        "/workflow/architect",
    ),
    RouteDef::new(
        Endpoint::PollArchitectResult,
        ProxyMethod::Get,
        "/api/workflow/poll-architect/{id}/result",
        "/workflow/poll-architect/{id}/result",
    ),
    RouteDef::new(
        Endpoint::FileUploadUrl,
        ProxyMethod::Get,
        "/api/app/get_file_upload_url",
        "/app/get_file_upload_url",
    ),
];

impl Endpoint {
    /// POST routes take the inbound JSON body as the upstream payload.
    pub fn expects_body(&self) -> bool {
        self.method() == ProxyMethod::Post
    }

    pub fn method(&self) -> ProxyMethod {
        ROUTES
            .iter()
            .find(|route| route.endpoint == *self)
            .map(|route| route.method.clone())
            .unwrap_or(ProxyMethod::Get)
    }

    fn forwards_query(&self) -> bool {
        matches!(self, Endpoint::FileUploadUrl)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub endpoint: Endpoint,
    pub method: ProxyMethod,
    pub url: Url,
}

/// Dispatch table bound to one upstream base URL
#[derive(Debug, Clone)]
pub struct RouteTable {
    base: Url,
}

impl RouteTable {
    pub fn new(base: Url) -> Result<Self> {
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ProxyError::new(
                ErrorKind::Configuration,
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid upstream base URL: {}", base),
            ));
        }
        Ok(Self { base })
    }

    /// Resolve an inbound request line to its upstream target.
    ///
    /// Unknown paths are a 404, known paths with the wrong verb a 405.
    pub fn resolve(&self, method: &ProxyMethod, path: &str, query: Option<&str>) -> Result<ResolvedRoute> {
        let segments: Vec<&str> = split_path(path);
        let mut path_matched = false;

        for route in ROUTES {
            let Some(params) = match_template(route.inbound, &segments)? else {
                continue;
            };
            if route.method != *method {
                path_matched = true;
                continue;
            }

            let mut url = self.build_url(route.upstream, &params);
            if route.endpoint.forwards_query() {
                append_query(&mut url, query);
            }

            return Ok(ResolvedRoute {
                endpoint: route.endpoint,
                method: route.method.clone(),
                url,
            });
        }

        if path_matched {
            Err(ProxyError::method_not_allowed())
        } else {
            Err(ProxyError::not_found())
        }
    }

    fn build_url(&self, template: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);

        // RouteTable::new rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for part in split_path(template) {
                match param_name(part) {
                    Some(name) => {
                        let value = params
                            .iter()
                            .find(|(key, _)| *key == name)
                            .map(|(_, value)| value.as_str())
                            .unwrap_or_default();
                        path.push(value);
                    }
                    None => {
                        path.push(part);
                    }
                }
            }
        }

        url
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.trim_start_matches('/').split('/').collect()
}

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
}

fn match_template<'a>(template: &'a str, segments: &[&str]) -> Result<Option<Vec<(&'a str, String)>>> {
    let parts = split_path(template);
    if parts.len() != segments.len() {
        return Ok(None);
    }

    let mut params = Vec::new();
    for (part, segment) in parts.into_iter().zip(segments) {
        match param_name(part) {
            Some(name) => {
                if segment.is_empty() {
                    return Ok(None);
                }
                let decoded = urlencoding::decode(segment)
                    .map_err(|e| ProxyError::invalid_request(format!("Invalid path parameter {}: {}", name, e)))?;
                if decoded == "." || decoded == ".." {
                    return Ok(None);
                }
                params.push((name, decoded.into_owned()));
            }
            None if part == *segment => {}
            None => return Ok(None),
        }
    }

    Ok(Some(params))
}

fn append_query(url: &mut Url, query: Option<&str>) {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value.into_owned(),
            None => pairs.push((key.into_owned(), value.into_owned())),
        }
    }

    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new("https://api.muapi.ai".parse().unwrap()).unwrap()
    }

    fn resolve(method: ProxyMethod, path: &str) -> ResolvedRoute {
        table().resolve(&method, path, None).unwrap()
    }

    #[test]
    fn test_static_routes() {
        let route = resolve(ProxyMethod::Post, "/api/workflow/create");
        assert_eq!(route.endpoint, Endpoint::CreateWorkflow);
        assert_eq!(route.url.as_str(), "https://api.muapi.ai/workflow/create");

        let route = resolve(ProxyMethod::Get, "/api/workflow/get-workflow-defs");
        assert_eq!(route.url.as_str(), "https://api.muapi.ai/workflow/get-workflow-defs");
    }

    #[test]
    fn test_path_params_are_substituted() {
        let route = resolve(ProxyMethod::Post, "/api/workflow/wf_1/node/n_2/run");
        assert_eq!(route.endpoint, Endpoint::RunNode);
        assert_eq!(route.url.as_str(), "https://api.muapi.ai/workflow/wf_1/node/n_2/run");

        let route = resolve(ProxyMethod::Get, "/api/workflow/run/r_9/status");
        assert_eq!(route.endpoint, Endpoint::RunStatus);
        assert_eq!(route.url.as_str(), "https://api.muapi.ai/workflow/run/r_9/status");

        let route = resolve(ProxyMethod::Post, "/api/workflow/workflow/wf_1/publish");
        assert_eq!(route.endpoint, Endpoint::PublishWorkflow);
        assert_eq!(route.url.as_str(), "https://api.muapi.ai/workflow/workflow/wf_1/publish");

        let route = resolve(ProxyMethod::Delete, "/api/workflow/delete-workflow-def/wf_1");
        assert_eq!(route.method, ProxyMethod::Delete);
    }

    #[test]
    fn test_literal_routes_win_over_params() {
        let route = resolve(ProxyMethod::Get, "/api/workflow/get-workflow-def/wf_1");
        assert_eq!(route.endpoint, Endpoint::GetWorkflowDef);

        let route = resolve(ProxyMethod::Post, "/api/workflow/architect");
        assert_eq!(route.endpoint, Endpoint::ArchitectWorkflow);
    }

    #[test]
    fn test_params_cannot_escape_their_segment() {
        let route = resolve(ProxyMethod::Get, "/api/workflow/get-workflow-def/a%2F..%2Fb");
        assert_eq!(route.url.as_str(), "https://api.muapi.ai/workflow/get-workflow-def/a%2F..%2Fb");

        let err = table()
            .resolve(&ProxyMethod::Get, "/api/workflow/get-workflow-def/..", None)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_encoded_params_are_not_double_encoded() {
        let route = resolve(ProxyMethod::Get, "/api/workflow/get-workflow-def/my%20flow");
        assert_eq!(route.url.as_str(), "https://api.muapi.ai/workflow/get-workflow-def/my%20flow");
    }

    #[test]
    fn test_file_upload_url_forwards_query() {
        let route = table()
            .resolve(
                &ProxyMethod::Get,
                "/api/app/get_file_upload_url",
                Some("filename=a.png&type=image&filename=b.png"),
            )
            .unwrap();

        assert_eq!(route.endpoint, Endpoint::FileUploadUrl);
        assert_eq!(
            route.url.as_str(),
            "https://api.muapi.ai/app/get_file_upload_url?filename=b.png&type=image"
        );
    }

    #[test]
    fn test_query_is_dropped_elsewhere() {
        let route = table()
            .resolve(&ProxyMethod::Get, "/api/workflow/get-workflow-defs", Some("x=1"))
            .unwrap();
        assert_eq!(route.url.query(), None);
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let err = table().resolve(&ProxyMethod::Get, "/api/workflow/nope/nope/nope/nope", None).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), ErrorKind::Routing);
    }

    #[test]
    fn test_wrong_verb_is_method_not_allowed() {
        let err = table().resolve(&ProxyMethod::Get, "/api/workflow/create", None).unwrap_err();
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_base_with_path_prefix() {
        let table = RouteTable::new("http://127.0.0.1:9000/v1/".parse().unwrap()).unwrap();
        let route = table.resolve(&ProxyMethod::Post, "/api/workflow/wf/run", None).unwrap();
        assert_eq!(route.url.as_str(), "http://127.0.0.1:9000/v1/workflow/wf/run");
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(RouteTable::new("mailto:ops@example.com".parse().unwrap()).is_err());
    }

    #[test]
    fn test_body_expectations() {
        assert!(Endpoint::RunWorkflow.expects_body());
        assert!(!Endpoint::RunStatus.expects_body());
    }
}
