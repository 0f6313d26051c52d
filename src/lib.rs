//! Maboroshi Mock Server
//!
//! The core of an HTTP mock server: routes are matched by URL template and
//! method, responses are picked by composable rules, and response bodies
//! are rendered by a small templating language with fake-data generators.
//!
//! # Features
//!
//! - **Route Templates**: `{id:int}`, `{page?}`, `{section=overview}`, `{**path}` and more
//! - **Matching Rules**: header, query and route parameter predicates with AND/OR groups
//! - **Response Strategies**: first match, random or round-robin selection
//! - **Templated Bodies**: functions, variables, `#repeat`, `#each` and `#if` blocks
//! - **Fake Data**: names, addresses, dates, finance, internet and lorem generators
//! - **Hot Reload**: replace the whole configuration without blocking readers
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "environments": [{
//!     "name": "local",
//!     "isActive": true,
//!     "routes": [{
//!       "urlTemplate": "/users/{id:int}",
//!       "httpMethod": "GET",
//!       "responses": [{
//!         "statusCode": 200,
//!         "body": "{ \"id\": {{ urlParam 'id' }}, \"name\": \"{{ faker 'name.fullname' }}\" }"
//!       }]
//!     }]
//!   }]
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod matcher;
pub mod rules;
pub mod store;
pub mod template;

pub use agent::{MockHandler, MockRequest, MockResponse, MockServerAgent};
pub use config::{HttpMethods, MockServerConfig};
pub use matcher::UrlMatcher;
pub use rules::{Rule, RuleInput};
pub use store::RouteStore;
pub use template::{compile_template, Template};
