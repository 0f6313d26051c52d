//! Route store and response selection.
//!
//! The store keeps the active routes as an immutable snapshot. Lookups load
//! the current snapshot without locking; a configuration update swaps the
//! whole snapshot at once, so in-flight lookups finish against the old one.

use crate::config::{HttpMethods, MockedRoute, MockedRouteResponse, ResponseSelectionStrategy};
use crate::matcher::UrlMatcher;
use crate::rules::RuleInput;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// A route matched against a request path.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<MockedRoute>,
    /// Values captured by the URL template
    pub params: HashMap<String, String>,
}

/// Concurrent store of the active routes.
pub struct RouteStore {
    routes: ArcSwap<Vec<Arc<MockedRoute>>>,
    /// Compiled matchers keyed by template. `None` marks a template that
    /// failed to compile so it is only reported once.
    matchers: DashMap<String, Option<Arc<UrlMatcher>>>,
    selectors: ResponseSelectors,
}

impl RouteStore {
    pub fn new(routes: Vec<MockedRoute>) -> Self {
        Self {
            routes: ArcSwap::from_pointee(routes.into_iter().map(Arc::new).collect()),
            matchers: DashMap::new(),
            selectors: ResponseSelectors::default(),
        }
    }

    /// Replace every route at once and return the new snapshot.
    ///
    /// Cached matchers for templates that are no longer used are dropped,
    /// as are sequence positions.
    pub fn replace_routes(&self, routes: Vec<MockedRoute>) -> Arc<Vec<Arc<MockedRoute>>> {
        let templates: HashSet<&str> = routes.iter().map(|r| r.url_template.as_str()).collect();
        self.matchers
            .retain(|template, _| templates.contains(template.as_str()));

        let snapshot: Arc<Vec<Arc<MockedRoute>>> =
            Arc::new(routes.into_iter().map(Arc::new).collect());
        self.routes.store(Arc::clone(&snapshot));
        self.selectors.sequence.reset();
        snapshot
    }

    /// Current snapshot.
    pub fn routes(&self) -> Arc<Vec<Arc<MockedRoute>>> {
        self.routes.load_full()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compiled matcher for `template`, cached.
    pub fn matcher(&self, template: &str) -> Option<Arc<UrlMatcher>> {
        if let Some(cached) = self.matchers.get(template) {
            return cached.clone();
        }

        let compiled = match UrlMatcher::new(template) {
            Ok(matcher) => Some(Arc::new(matcher)),
            Err(e) => {
                warn!(route = %template, error = %e, "Invalid URL template, route will never match");
                None
            }
        };
        self.matchers.insert(template.to_string(), compiled.clone());
        compiled
    }

    /// First enabled route, in stored order, serving `method` whose template
    /// matches `path`.
    pub fn get_route(&self, path: &str, method: HttpMethods) -> Option<RouteMatch> {
        self.find_route(&self.routes.load(), path, method)
    }

    /// Same as [`get_route`](Self::get_route) over a snapshot the caller
    /// already holds.
    pub fn find_route(
        &self,
        routes: &[Arc<MockedRoute>],
        path: &str,
        method: HttpMethods,
    ) -> Option<RouteMatch> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        routes
            .iter()
            .filter(|route| route.enabled && route.http_method.intersects(method))
            .find_map(|route| {
                let params = self.matcher(&route.url_template)?.match_path(&path)?;
                Some(RouteMatch {
                    route: Arc::clone(route),
                    params,
                })
            })
    }

    /// Pick a response of `route` using its selection strategy.
    pub fn select_response<'r>(
        &self,
        route: &'r MockedRoute,
        input: &RuleInput,
    ) -> Option<&'r MockedRouteResponse> {
        let strategy = route.response_selection_strategy;
        let selected = self.selectors.get(strategy).select(route, input);
        debug!(
            route = %route.url_template,
            strategy = ?strategy,
            selected = selected.map(|r| r.name.as_str()).unwrap_or("<none>"),
            "Response selection"
        );
        selected
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Responses with no rules, or whose rules all pass.
fn passes(response: &MockedRouteResponse, input: &RuleInput) -> bool {
    response.rules.iter().all(|rule| rule.matches(input))
}

fn passing<'r>(route: &'r MockedRoute, input: &RuleInput) -> Vec<&'r MockedRouteResponse> {
    route
        .responses
        .iter()
        .filter(|response| passes(response, input))
        .collect()
}

/// Strategy for picking one response of a matched route.
pub trait ResponseSelector: Send + Sync {
    fn select<'r>(&self, route: &'r MockedRoute, input: &RuleInput) -> Option<&'r MockedRouteResponse>;
}

/// First passing response in declared order.
#[derive(Debug, Default)]
pub struct FirstMatchSelector;

impl ResponseSelector for FirstMatchSelector {
    fn select<'r>(&self, route: &'r MockedRoute, input: &RuleInput) -> Option<&'r MockedRouteResponse> {
        route.responses.iter().find(|response| passes(response, input))
    }
}

/// Uniformly random passing response.
#[derive(Debug, Default)]
pub struct RandomSelector;

impl ResponseSelector for RandomSelector {
    fn select<'r>(&self, route: &'r MockedRoute, input: &RuleInput) -> Option<&'r MockedRouteResponse> {
        let candidates = passing(route, input);
        if candidates.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..candidates.len());
        Some(candidates[index])
    }
}

/// Round-robin over passing responses, one position per route.
#[derive(Debug, Default)]
pub struct SequenceSelector {
    positions: DashMap<String, usize>,
}

impl SequenceSelector {
    pub fn reset(&self) {
        self.positions.clear();
    }
}

impl ResponseSelector for SequenceSelector {
    fn select<'r>(&self, route: &'r MockedRoute, input: &RuleInput) -> Option<&'r MockedRouteResponse> {
        let candidates = passing(route, input);
        if candidates.is_empty() {
            return None;
        }
        let mut position = self.positions.entry(route.key()).or_insert(0);
        let index = *position % candidates.len();
        *position = position.wrapping_add(1);
        Some(candidates[index])
    }
}

/// One selector per strategy.
#[derive(Debug, Default)]
pub struct ResponseSelectors {
    first: FirstMatchSelector,
    random: RandomSelector,
    sequence: SequenceSelector,
}

impl ResponseSelectors {
    pub fn get(&self, strategy: ResponseSelectionStrategy) -> &dyn ResponseSelector {
        match strategy {
            ResponseSelectionStrategy::Default => &self.first,
            ResponseSelectionStrategy::Random => &self.random,
            ResponseSelectionStrategy::Sequence => &self.sequence,
        }
    }
}
