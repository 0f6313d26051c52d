//! Request-derived template functions.
//!
//! `queryParam`, `urlParam`, `cookieParam` and `headerParam` take a name and
//! an optional default. `hostname`, `ip`, `method` and `path` take nothing.
//! Every call fires the access callback so callers can tell whether a
//! rendered body depends on the request.

use super::{opt_str, str_arg, FunctionResolver, FunctionScope};
use crate::error::EvalError;
use crate::template::value::Value;
use std::collections::HashMap;

/// Snapshot of the parts of an HTTP request templates and rules can see.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    pub method: String,
    pub path: String,
    /// Decoded query parameters. The last occurrence of a key wins.
    pub query: HashMap<String, String>,
    /// Header values keyed by lowercase name.
    pub headers: HashMap<String, String>,
    /// Values captured by the route's URL template.
    pub route_params: HashMap<String, String>,
    pub remote_addr: Option<String>,
}

impl RequestView {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query.extend(parse_query_string(query));
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_route_params(mut self, params: HashMap<String, String>) -> Self {
        self.route_params = params;
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    /// Cookie value from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// `Host` header without the port.
    pub fn hostname(&self) -> &str {
        let host = self.header("host").unwrap_or_default();
        if host.starts_with('[') {
            // [::1]:8080
            return host.split_once(']').map_or(host, |(h, _)| &host[..h.len() + 1]);
        }
        host.split(':').next().unwrap_or(host)
    }

    pub fn ip(&self) -> &str {
        self.remote_addr.as_deref().unwrap_or_default()
    }
}

/// Parse a query string into key-value pairs.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for part in query.trim_start_matches('?').split('&') {
        if part.is_empty() {
            continue;
        }
        if let Some((key, value)) = part.split_once('=') {
            params.insert(url_decode(key), url_decode(value));
        } else {
            params.insert(url_decode(part), String::new());
        }
    }

    params
}

/// Percent-decoding with `+` as space. Invalid escapes are kept verbatim.
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

type AccessCallback<'r> = Box<dyn Fn() + Send + Sync + 'r>;

/// Resolver exposing a [`RequestView`] to templates.
pub struct RequestParamsResolver<'r> {
    request: &'r RequestView,
    on_access: Option<AccessCallback<'r>>,
}

impl<'r> RequestParamsResolver<'r> {
    pub fn new(request: &'r RequestView) -> Self {
        Self {
            request,
            on_access: None,
        }
    }

    /// Invoke `callback` whenever a template reads request data.
    pub fn on_access(mut self, callback: impl Fn() + Send + Sync + 'r) -> Self {
        self.on_access = Some(Box::new(callback));
        self
    }

    fn touched(&self) {
        if let Some(callback) = &self.on_access {
            callback();
        }
    }

    fn lookup(
        &self,
        args: &[Value],
        function: &str,
        fetch: impl Fn(&'r RequestView, &str) -> Option<&'r str>,
    ) -> Result<Value, EvalError> {
        let name = str_arg(args, 0, function)?;
        let default = opt_str(args, 1, "");
        self.touched();
        Ok(Value::from(fetch(self.request, name).unwrap_or(default)))
    }

    fn simple(&self, value: &str) -> Result<Value, EvalError> {
        self.touched();
        Ok(Value::from(value))
    }
}

impl FunctionResolver for RequestParamsResolver<'_> {
    fn try_resolve(
        &self,
        name: &str,
        args: &[Value],
        _scope: &mut FunctionScope<'_>,
    ) -> Option<Result<Value, EvalError>> {
        let result = match name.to_ascii_lowercase().as_str() {
            "queryparam" => self.lookup(args, "queryParam", RequestView::query_param),
            "urlparam" => self.lookup(args, "urlParam", RequestView::route_param),
            "cookieparam" => self.lookup(args, "cookieParam", RequestView::cookie),
            "headerparam" => self.lookup(args, "headerParam", RequestView::header),
            "hostname" => self.simple(self.request.hostname()),
            "ip" => self.simple(self.request.ip()),
            "method" => self.simple(&self.request.method),
            "path" => self.simple(&self.request.path),
            _ => return None,
        };
        Some(result)
    }
}
