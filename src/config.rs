//! Configuration for the mock server.
//!
//! A configuration holds named environments; the active one supplies the
//! routes, and each route lists candidate responses guarded by rules.

use crate::matcher::UrlMatcher;
use crate::rules::Rule;
use bitflags::bitflags;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Main configuration for the mock server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MockServerConfig {
    /// Named route sets
    #[serde(default)]
    pub environments: Vec<Environment>,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl MockServerConfig {
    /// Load configuration from a JSON or YAML file, picked by extension.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let config = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| anyhow::anyhow!("Invalid JSON configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Invalid YAML configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let active = self.environments.iter().filter(|env| env.is_active).count();
        if active > 1 {
            anyhow::bail!("At most one environment can be active, found {}", active);
        }

        for env in &self.environments {
            for (i, route) in env.routes.iter().enumerate() {
                route
                    .validate()
                    .map_err(|e| anyhow::anyhow!("Environment '{}', route {}: {}", env.name, i, e))?;
            }
        }
        Ok(())
    }

    /// The environment flagged active, else the first one.
    pub fn active_environment(&self) -> Option<&Environment> {
        self.environments
            .iter()
            .find(|env| env.is_active)
            .or_else(|| self.environments.first())
    }

    /// Routes of the active environment.
    pub fn active_routes(&self) -> &[MockedRoute] {
        self.active_environment()
            .map(|env| env.routes.as_slice())
            .unwrap_or_default()
    }
}

/// A named set of routes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, alias = "active")]
    pub is_active: bool,

    #[serde(default)]
    pub routes: Vec<MockedRoute>,
}

/// A URL template plus the responses it can produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockedRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Template such as `/users/{id:int}`
    pub url_template: String,

    /// Methods served by this route
    #[serde(default)]
    pub http_method: HttpMethods,

    /// Candidate responses in priority order
    #[serde(default)]
    pub responses: Vec<MockedRouteResponse>,

    #[serde(default)]
    pub response_selection_strategy: ResponseSelectionStrategy,

    /// Whether this route is served
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl MockedRoute {
    pub fn new(url_template: impl Into<String>, http_method: HttpMethods) -> Self {
        Self {
            id: None,
            url_template: url_template.into(),
            http_method,
            responses: Vec::new(),
            response_selection_strategy: ResponseSelectionStrategy::Default,
            enabled: true,
        }
    }

    pub fn with_response(mut self, response: MockedRouteResponse) -> Self {
        self.responses.push(response);
        self
    }

    pub fn with_strategy(mut self, strategy: ResponseSelectionStrategy) -> Self {
        self.response_selection_strategy = strategy;
        self
    }

    /// Stable identity used for per-route state such as sequence counters.
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{} {}", self.http_method, self.url_template),
        }
    }

    /// Validate the route definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url_template.trim().is_empty() {
            anyhow::bail!("URL template cannot be empty");
        }
        UrlMatcher::new(&self.url_template)
            .map_err(|e| anyhow::anyhow!("Invalid URL template '{}': {}", self.url_template, e))?;
        if self.http_method.is_empty() {
            anyhow::bail!("Route '{}' has no HTTP method", self.url_template);
        }
        for (i, response) in self.responses.iter().enumerate() {
            response
                .validate()
                .map_err(|e| anyhow::anyhow!("Response {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// One candidate response of a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockedRouteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_status")]
    pub status_code: u16,

    /// Body template source
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,

    #[serde(default)]
    pub headers: Vec<ResponseHeader>,

    /// All rules must pass for this response to be picked
    #[serde(default)]
    pub rules: Vec<Rule>,

    /// Delay before responding, in milliseconds
    #[serde(default)]
    pub delay: u64,

    /// Serve the body verbatim
    #[serde(default)]
    pub disable_templating: bool,

    /// Turn template errors into a 500 instead of serving the raw body
    #[serde(default)]
    pub strict_template_errors: bool,

    /// Allow hosts to cache the rendered body when it doesn't depend on the request
    #[serde(default)]
    pub allow_response_caching: bool,
}

fn default_status() -> u16 {
    200
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for MockedRouteResponse {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: None,
            status_code: default_status(),
            body: String::new(),
            headers: Vec::new(),
            rules: Vec::new(),
            delay: 0,
            disable_templating: false,
            strict_template_errors: false,
            allow_response_caching: false,
        }
    }
}

impl MockedRouteResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(ResponseHeader {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Validate the response definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(100..=599).contains(&self.status_code) {
            anyhow::bail!("Invalid status code: {}", self.status_code);
        }
        if self.headers.iter().any(|h| h.key.trim().is_empty()) {
            anyhow::bail!("Response header key cannot be empty");
        }
        Ok(())
    }
}

/// A response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// How a route picks among responses whose rules pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseSelectionStrategy {
    /// First passing response in declared order
    #[default]
    #[serde(alias = "default", alias = "DEFAULT")]
    Default,
    /// Uniformly random passing response
    #[serde(alias = "random", alias = "RANDOM")]
    Random,
    /// Round-robin over passing responses
    #[serde(alias = "sequence", alias = "SEQUENCE")]
    Sequence,
}

bitflags! {
    /// Set of HTTP methods a route serves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HttpMethods: u8 {
        const GET = 1;
        const POST = 2;
        const PUT = 4;
        const DELETE = 8;
        const PATCH = 16;
    }
}

impl HttpMethods {
    pub const NONE: Self = Self::empty();

    /// Parse a comma-joined, case-insensitive list such as `"get, Post"`.
    /// An empty string is `NONE`.
    pub fn parse_list(raw: &str) -> Result<Self, String> {
        raw.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .try_fold(Self::NONE, |acc, name| {
                Self::from_name(&name.to_ascii_uppercase())
                    .map(|method| acc | method)
                    .ok_or_else(|| format!("Invalid HTTP method: {}", name))
            })
    }

    /// Flag for an incoming request method. `HEAD` is served by `GET`
    /// routes; anything else unknown matches no route.
    pub fn from_request_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "HEAD" => Self::GET,
            upper => Self::from_name(upper).unwrap_or(Self::NONE),
        }
    }
}

impl fmt::Display for HttpMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}

impl Serialize for HttpMethods {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_empty() {
            serializer.serialize_str("")
        } else {
            serializer.collect_str(self)
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethods {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Joined(String),
            List(Vec<String>),
        }

        let joined = match Raw::deserialize(deserializer)? {
            Raw::Joined(joined) => joined,
            Raw::List(list) => list.join(","),
        };
        HttpMethods::parse_list(&joined).map_err(de::Error::custom)
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Log matched requests
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Content type used when a response sets none
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            default_content_type: default_content_type(),
        }
    }
}

fn default_content_type() -> String {
    "application/json".to_string()
}
