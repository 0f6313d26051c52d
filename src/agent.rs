//! Mock server agent.
//!
//! Glues route dispatch, rule evaluation and body templating together
//! behind a transport-agnostic request/response pair.

use crate::config::{HttpMethods, MockServerConfig, MockedRoute, MockedRouteResponse};
use crate::rules::RuleInput;
use crate::store::RouteStore;
use crate::template::compile_template;
use crate::template::resolvers::{RequestParamsResolver, RequestView};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path of the endpoint listing the loaded environments.
pub const SYSTEM_ENVIRONMENTS_PATH: &str = "/$$$SYSTEM$$$/environments";

/// An incoming HTTP request as seen by the agent.
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub query_string: Option<String>,
    pub headers: HashMap<String, String>,
    pub remote_addr: Option<String>,
}

impl MockRequest {
    /// Build a request from a method and a target such as `/users/1?expand=true`.
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method: method.into(),
            path,
            query_string,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Parse `METHOD /path?query [Name: value ...]`.
    ///
    /// A token ending in `:` starts a header; the tokens after it up to the
    /// next header name form its value.
    pub fn parse_line(line: &str) -> anyhow::Result<Self> {
        let mut tokens = line.split_whitespace();
        let method = tokens
            .next()
            .ok_or_else(|| anyhow::anyhow!("Empty request line"))?;
        let target = tokens
            .next()
            .ok_or_else(|| anyhow::anyhow!("Missing request path in '{}'", line))?;

        let mut request = Self::new(method.to_ascii_uppercase(), target);
        let mut current: Option<(String, Vec<&str>)> = None;
        for token in tokens {
            if let Some(name) = token.strip_suffix(':').filter(|n| !n.is_empty()) {
                if let Some((name, words)) = current.take() {
                    request.headers.insert(name, words.join(" "));
                }
                current = Some((name.to_string(), Vec::new()));
            } else if let Some((_, words)) = current.as_mut() {
                words.push(token);
            } else {
                anyhow::bail!("Expected a header name before '{}'", token);
            }
        }
        if let Some((name, words)) = current {
            request.headers.insert(name, words.join(" "));
        }
        Ok(request)
    }

    fn view(&self, route_params: HashMap<String, String>) -> RequestView {
        let mut view = RequestView::new(self.method.clone(), self.path.clone())
            .with_route_params(route_params);
        if let Some(query) = &self.query_string {
            view = view.with_query_string(query);
        }
        for (name, value) in &self.headers {
            view = view.with_header(name, value.clone());
        }
        if let Some(addr) = &self.remote_addr {
            view = view.with_remote_addr(addr.clone());
        }
        view
    }
}

/// The agent's answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub tags: Vec<&'static str>,
    /// Hosts may cache the body: caching is allowed for the response and
    /// rendering read nothing from the request.
    pub cacheable: bool,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
            tags: Vec::new(),
            cacheable: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tag(mut self, tag: &'static str) -> Self {
        self.tags.push(tag);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }
}

/// Host-facing request handler.
#[async_trait]
pub trait MockHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, request: &MockRequest) -> MockResponse;

    /// Replace the whole configuration.
    async fn configure(&self, config: MockServerConfig) -> anyhow::Result<()>;
}

/// Mock server agent.
///
/// Dispatches requests against the active environment and renders the
/// selected response.
pub struct MockServerAgent {
    state: ArcSwap<AgentState>,
    store: RouteStore,
    /// Total requests processed.
    requests_total: AtomicU64,
    /// Total requests answered by a route.
    requests_matched: AtomicU64,
    /// Total requests without a route or response.
    requests_unmatched: AtomicU64,
}

/// Configuration and the routes built from it, swapped together.
struct AgentState {
    config: Arc<MockServerConfig>,
    routes: Arc<Vec<Arc<MockedRoute>>>,
}

/// Outcome of rendering a response body.
struct RenderedBody {
    body: String,
    used_request_data: bool,
}

impl MockServerAgent {
    /// Create an agent serving the active environment of `config`.
    pub fn new(config: MockServerConfig) -> Self {
        let store = RouteStore::new(config.active_routes().to_vec());

        info!(
            environment = config.active_environment().map(|e| e.name.as_str()).unwrap_or("<none>"),
            routes = store.len(),
            "Mock server agent initialized"
        );

        Self {
            state: ArcSwap::from_pointee(AgentState {
                config: Arc::new(config),
                routes: store.routes(),
            }),
            store,
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
        }
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(Self::new(MockServerConfig::from_yaml(yaml)?))
    }

    /// Create from a JSON configuration string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(Self::new(MockServerConfig::from_json(json)?))
    }

    /// Get total requests processed.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests matched.
    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    /// Get total requests unmatched.
    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }

    /// Number of routes in the active environment.
    pub fn route_count(&self) -> usize {
        self.state.load().routes.len()
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<MockServerConfig> {
        Arc::clone(&self.state.load().config)
    }

    /// Validate `config` and swap it in. On error the current
    /// configuration stays in place.
    pub fn update_configuration(&self, config: MockServerConfig) -> anyhow::Result<()> {
        config.validate()?;
        let routes = self.store.replace_routes(config.active_routes().to_vec());

        info!(
            environment = config.active_environment().map(|e| e.name.as_str()).unwrap_or("<none>"),
            routes = routes.len(),
            "Configuration replaced"
        );
        self.state.store(Arc::new(AgentState {
            config: Arc::new(config),
            routes,
        }));
        Ok(())
    }

    /// Dispatch one request.
    pub async fn handle_request(&self, request: &MockRequest) -> MockResponse {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let state = self.state.load_full();
        let config = &state.config;
        let settings = &config.settings;

        if request.method.eq_ignore_ascii_case("GET")
            && request.path.eq_ignore_ascii_case(SYSTEM_ENVIRONMENTS_PATH)
        {
            return self.environments_response(config);
        }

        let method = HttpMethods::from_request_method(&request.method);
        let Some(found) = self.store.find_route(&state.routes, &request.path, method) else {
            return self.unmatched(request, settings.log_unmatched, "No matching route found");
        };

        let view = request.view(found.params);
        let input = RuleInput::from(&view);
        let Some(response) = self.store.select_response(&found.route, &input) else {
            return self.unmatched(request, settings.log_unmatched, "No response rules matched");
        };

        self.requests_matched.fetch_add(1, Ordering::Relaxed);
        if settings.log_matches {
            info!(
                route = %found.route.url_template,
                method = %request.method,
                path = %request.path,
                status = response.status_code,
                "Request matched route"
            );
        }

        if response.delay > 0 {
            debug!(route = %found.route.url_template, delay_ms = response.delay, "Applying delay");
            tokio::time::sleep(tokio::time::Duration::from_millis(response.delay)).await;
        }

        match render_body(response, &view) {
            Ok(rendered) => {
                build_response(response, rendered, &settings.default_content_type)
            }
            Err(message) => {
                warn!(route = %found.route.url_template, error = %message, "Template error");
                MockResponse::json(
                    500,
                    serde_json::json!({ "error": "template_error", "message": message }),
                )
                .with_tag("mocked")
                .with_tag("template_error")
            }
        }
    }

    fn unmatched(&self, request: &MockRequest, log: bool, message: &str) -> MockResponse {
        self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
        if log {
            warn!(method = %request.method, path = %request.path, "{}", message);
        }
        MockResponse::json(
            404,
            serde_json::json!({ "error": "not_found", "message": message }),
        )
        .with_tag("mocked")
        .with_tag("not_found")
    }

    fn environments_response(&self, config: &MockServerConfig) -> MockResponse {
        match serde_json::to_value(&config.environments) {
            Ok(environments) => MockResponse::json(200, environments).with_tag("system"),
            Err(e) => MockResponse::json(
                500,
                serde_json::json!({ "error": "serialization", "message": e.to_string() }),
            )
            .with_tag("system"),
        }
    }
}

/// Render the body of `response`. `Err` carries the message of a strict
/// template failure; lenient failures fall back to the raw body.
fn render_body(response: &MockedRouteResponse, view: &RequestView) -> Result<RenderedBody, String> {
    let raw = || RenderedBody {
        body: response.body.clone(),
        used_request_data: false,
    };

    if response.body.is_empty() || response.disable_templating {
        return Ok(raw());
    }

    let strict = response.strict_template_errors;
    let template = compile_template(&response.body, strict).map_err(|e| e.to_string())?;
    if template.is_static() {
        return Ok(raw());
    }

    let used = AtomicBool::new(false);
    let resolver = RequestParamsResolver::new(view).on_access(|| used.store(true, Ordering::Relaxed));
    let rendered = template.render(&[&resolver]);
    drop(resolver);

    match rendered {
        Ok(body) => Ok(RenderedBody {
            body,
            used_request_data: used.load(Ordering::Relaxed),
        }),
        Err(e) if strict => Err(e.to_string()),
        Err(e) => {
            warn!(error = %e, "Template rendering failed, serving the raw body");
            Ok(raw())
        }
    }
}

fn build_response(
    response: &MockedRouteResponse,
    rendered: RenderedBody,
    default_content_type: &str,
) -> MockResponse {
    let mut out = MockResponse::new(response.status_code)
        .with_body(rendered.body)
        .with_tag("mocked");

    for header in &response.headers {
        out = out.with_header(header.key.clone(), header.value.clone());
    }
    if out.header("content-type").is_none() {
        out = out.with_header("Content-Type", default_content_type);
    }

    out.cacheable = response.allow_response_caching && !rendered.used_request_data;
    out
}

#[async_trait]
impl MockHandler for MockServerAgent {
    fn name(&self) -> &str {
        "mock-server"
    }

    async fn handle(&self, request: &MockRequest) -> MockResponse {
        self.handle_request(request).await
    }

    async fn configure(&self, config: MockServerConfig) -> anyhow::Result<()> {
        self.update_configuration(config)
    }
}
