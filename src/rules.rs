//! Response matching rules.
//!
//! A rule is either a single field test (header, query parameter or route
//! parameter compared against a value) or an AND/OR aggregate of rules.
//! Rules are built, and their regexes compiled, when the configuration is
//! deserialized, so evaluation never fails on a malformed rule.

use crate::error::{RuleConstructionError, RuleEvaluationError};
use crate::template::resolvers::RequestView;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

/// The request map a single rule reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Header,
    Query,
    Route,
}

impl RuleField {
    fn as_str(self) -> &'static str {
        match self {
            RuleField::Header => "Header",
            RuleField::Query => "Query",
            RuleField::Route => "Route",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        [RuleField::Header, RuleField::Query, RuleField::Route]
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
    }
}

/// Comparison applied to the fetched field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleOperation {
    #[default]
    Equals,
    Contains,
    Regex,
    NullOrEmpty,
}

impl RuleOperation {
    fn as_str(self) -> &'static str {
        match self {
            RuleOperation::Equals => "Equals",
            RuleOperation::Contains => "Contains",
            RuleOperation::Regex => "Regex",
            RuleOperation::NullOrEmpty => "NullOrEmpty",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        [
            RuleOperation::Equals,
            RuleOperation::Contains,
            RuleOperation::Regex,
            RuleOperation::NullOrEmpty,
        ]
        .into_iter()
        .find(|op| op.as_str().eq_ignore_ascii_case(s))
    }
}

/// Boolean combinator of an aggregate rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOperation {
    And,
    Or,
}

impl AggregateOperation {
    fn as_str(self) -> &'static str {
        match self {
            AggregateOperation::And => "AND",
            AggregateOperation::Or => "OR",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("and") {
            Some(AggregateOperation::And)
        } else if s.eq_ignore_ascii_case("or") {
            Some(AggregateOperation::Or)
        } else {
            None
        }
    }
}

/// Anything a rule can be evaluated against.
///
/// Sources that lack a field report it through `Error`; a complete source
/// such as [`RuleInput`] uses [`Infallible`].
pub trait RuleSource {
    type Error;

    fn values(&self, field: RuleField) -> Result<&HashMap<String, String>, Self::Error>;
}

/// Per-request header, query and route parameter maps.
///
/// Header names are stored lowercase and looked up case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RuleInput {
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub route_params: HashMap<String, String>,
}

impl RuleInput {
    pub fn new(
        headers: HashMap<String, String>,
        query: HashMap<String, String>,
        route_params: HashMap<String, String>,
    ) -> Self {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            query,
            route_params,
        }
    }
}

impl From<&RequestView> for RuleInput {
    fn from(request: &RequestView) -> Self {
        Self::new(
            request.headers.clone(),
            request.query.clone(),
            request.route_params.clone(),
        )
    }
}

impl RuleSource for RuleInput {
    type Error = Infallible;

    fn values(&self, field: RuleField) -> Result<&HashMap<String, String>, Infallible> {
        Ok(match field {
            RuleField::Header => &self.headers,
            RuleField::Query => &self.query,
            RuleField::Route => &self.route_params,
        })
    }
}

/// An input carrying only some of the request maps.
#[derive(Debug, Clone, Default)]
pub struct PartialRuleInput {
    pub headers: Option<HashMap<String, String>>,
    pub query: Option<HashMap<String, String>>,
    pub route_params: Option<HashMap<String, String>>,
}

impl RuleSource for PartialRuleInput {
    type Error = RuleEvaluationError;

    fn values(&self, field: RuleField) -> Result<&HashMap<String, String>, RuleEvaluationError> {
        let values = match field {
            RuleField::Header => self.headers.as_ref(),
            RuleField::Query => self.query.as_ref(),
            RuleField::Route => self.route_params.as_ref(),
        };
        values.ok_or(RuleEvaluationError::MissingCapability(match field {
            RuleField::Header => "header",
            RuleField::Query => "query",
            RuleField::Route => "route parameter",
        }))
    }
}

/// A test of one request field.
#[derive(Clone)]
pub struct SingleRule {
    field: RuleField,
    key: String,
    value: String,
    operation: RuleOperation,
    negate: bool,
    regex: Option<Regex>,
}

impl SingleRule {
    pub fn new(
        field: RuleField,
        key: impl Into<String>,
        value: impl Into<String>,
        operation: RuleOperation,
        negate: bool,
    ) -> Result<Self, RuleConstructionError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(RuleConstructionError::EmptyKey);
        }
        let value = value.into();
        let regex = match operation {
            RuleOperation::Regex => Some(Regex::new(&value).map_err(|e| {
                RuleConstructionError::InvalidRegex {
                    pattern: value.clone(),
                    message: e.to_string(),
                }
            })?),
            _ => None,
        };

        Ok(Self {
            field,
            key,
            value,
            operation,
            negate,
            regex,
        })
    }

    pub fn field(&self) -> RuleField {
        self.field
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn evaluate<S: RuleSource + ?Sized>(&self, input: &S) -> Result<bool, S::Error> {
        let values = input.values(self.field)?;
        let fetched = match self.field {
            RuleField::Header => values.get(&self.key.to_ascii_lowercase()),
            RuleField::Query | RuleField::Route => values.get(&self.key),
        };

        let fetched = match (self.field, fetched) {
            // a missing route parameter never matches, negated or not
            (RuleField::Route, None) => return Ok(false),
            (_, Some(v)) => v.as_str(),
            (_, None) => "",
        };

        Ok(self.negate ^ self.apply(fetched))
    }

    fn apply(&self, fetched: &str) -> bool {
        match self.operation {
            RuleOperation::Equals => fetched == self.value,
            RuleOperation::Contains => fetched.contains(self.value.as_str()),
            RuleOperation::Regex => self.regex.as_ref().is_some_and(|re| re.is_match(fetched)),
            RuleOperation::NullOrEmpty => fetched.is_empty(),
        }
    }
}

impl fmt::Debug for SingleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleRule")
            .field("field", &self.field)
            .field("key", &self.key)
            .field("value", &self.value)
            .field("operation", &self.operation)
            .field("negate", &self.negate)
            .finish()
    }
}

/// A combination of child rules.
#[derive(Debug, Clone)]
pub struct AggregateRule {
    pub rules: Vec<Rule>,
    pub operation: AggregateOperation,
}

impl AggregateRule {
    pub fn new(rules: Vec<Rule>, operation: AggregateOperation) -> Self {
        Self { rules, operation }
    }

    /// An empty aggregate is never satisfied, for AND as well as OR.
    pub fn evaluate<S: RuleSource + ?Sized>(&self, input: &S) -> Result<bool, S::Error> {
        if self.rules.is_empty() {
            return Ok(false);
        }
        for rule in &self.rules {
            let result = rule.evaluate(input)?;
            match self.operation {
                AggregateOperation::And if !result => return Ok(false),
                AggregateOperation::Or if result => return Ok(true),
                _ => {}
            }
        }
        Ok(self.operation == AggregateOperation::And)
    }
}

/// A response matching rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum Rule {
    Single(SingleRule),
    Aggregate(AggregateRule),
}

impl Rule {
    pub fn evaluate<S: RuleSource + ?Sized>(&self, input: &S) -> Result<bool, S::Error> {
        match self {
            Rule::Single(rule) => rule.evaluate(input),
            Rule::Aggregate(rule) => rule.evaluate(input),
        }
    }

    /// Evaluate against a complete [`RuleInput`].
    pub fn matches(&self, input: &RuleInput) -> bool {
        match self.evaluate(input) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }
}

/// Wire shape shared by single and aggregate rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRule {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, alias = "op", skip_serializing_if = "Option::is_none")]
    operation: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    negate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rules: Option<Vec<Rule>>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TryFrom<RawRule> for Rule {
    type Error = RuleConstructionError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        if let Some(op) = raw.operation.as_deref().and_then(AggregateOperation::parse) {
            let rules = raw
                .rules
                .ok_or_else(|| RuleConstructionError::MissingRules(op.as_str().to_string()))?;
            return Ok(Rule::Aggregate(AggregateRule::new(rules, op)));
        }

        let kind = raw.kind.ok_or(RuleConstructionError::MissingDiscriminator)?;
        let field =
            RuleField::parse(&kind).ok_or(RuleConstructionError::UnknownRuleType(kind))?;
        let operation = match raw.operation {
            Some(op) => {
                RuleOperation::parse(&op).ok_or(RuleConstructionError::UnknownOperation(op))?
            }
            None => RuleOperation::default(),
        };

        SingleRule::new(
            field,
            raw.key.unwrap_or_default(),
            raw.value.unwrap_or_default(),
            operation,
            raw.negate,
        )
        .map(Rule::Single)
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::Single(rule) => RawRule {
                kind: Some(rule.field.as_str().to_string()),
                key: Some(rule.key),
                value: Some(rule.value),
                operation: Some(rule.operation.as_str().to_string()),
                negate: rule.negate,
                rules: None,
            },
            Rule::Aggregate(rule) => RawRule {
                operation: Some(rule.operation.as_str().to_string()),
                rules: Some(rule.rules),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn single(field: RuleField, key: &str, value: &str, op: RuleOperation, negate: bool) -> Rule {
        Rule::Single(SingleRule::new(field, key, value, op, negate).unwrap())
    }

    fn always(result: bool) -> Rule {
        // a route rule on a key that is always present
        single(
            RuleField::Route,
            "k",
            "v",
            RuleOperation::Equals,
            !result,
        )
    }

    fn input() -> RuleInput {
        RuleInput::new(
            map(&[("Authorization", "Bearer token123")]),
            map(&[("query", "search"), ("empty", "")]),
            map(&[("id", "42"), ("k", "v")]),
        )
    }

    #[test]
    fn test_header_equals_with_negate() {
        let cases = [
            ("Bearer token123", false, true),
            ("Invalid", false, false),
            ("Bearer token123", true, false),
            ("Invalid", true, true),
        ];
        for (value, negate, expected) in cases {
            let rule = single(RuleField::Header, "Authorization", value, RuleOperation::Equals, negate);
            assert_eq!(rule.matches(&input()), expected, "value={value} negate={negate}");
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let rule = single(RuleField::Header, "authorization", "Bearer", RuleOperation::Contains, false);
        assert!(rule.matches(&input()));
    }

    #[test]
    fn test_query_and_route() {
        assert!(single(RuleField::Query, "query", "search", RuleOperation::Equals, false).matches(&input()));
        assert!(!single(RuleField::Query, "query", "other", RuleOperation::Equals, false).matches(&input()));
        assert!(single(RuleField::Route, "id", "42", RuleOperation::Equals, false).matches(&input()));
        assert!(single(RuleField::Route, "id", "43", RuleOperation::Equals, true).matches(&input()));
    }

    #[test]
    fn test_missing_values() {
        // absent header/query read as empty
        assert!(single(RuleField::Query, "nope", "", RuleOperation::NullOrEmpty, false).matches(&input()));
        assert!(single(RuleField::Query, "empty", "", RuleOperation::NullOrEmpty, false).matches(&input()));
        assert!(single(RuleField::Header, "x-missing", "abc", RuleOperation::Equals, true).matches(&input()));
        // absent route parameter is false regardless of negate
        assert!(!single(RuleField::Route, "nope", "42", RuleOperation::Equals, false).matches(&input()));
        assert!(!single(RuleField::Route, "nope", "42", RuleOperation::Equals, true).matches(&input()));
    }

    #[test]
    fn test_regex_is_unanchored() {
        let rule = single(RuleField::Header, "Authorization", r"token\d+", RuleOperation::Regex, false);
        assert!(rule.matches(&input()));
        let rule = single(RuleField::Header, "Authorization", r"^token", RuleOperation::Regex, false);
        assert!(!rule.matches(&input()));
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            SingleRule::new(RuleField::Header, "  ", "x", RuleOperation::Equals, false).err(),
            Some(RuleConstructionError::EmptyKey)
        );
        assert!(matches!(
            SingleRule::new(RuleField::Query, "q", "(unclosed", RuleOperation::Regex, false),
            Err(RuleConstructionError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_aggregates() {
        let input = input();
        let and = |rules| Rule::Aggregate(AggregateRule::new(rules, AggregateOperation::And));
        let or = |rules| Rule::Aggregate(AggregateRule::new(rules, AggregateOperation::Or));

        assert!(and(vec![always(true), always(true)]).matches(&input));
        assert!(!and(vec![always(true), always(false)]).matches(&input));
        assert!(or(vec![always(false), always(true)]).matches(&input));
        assert!(!or(vec![always(false), always(false)]).matches(&input));
        assert!(!and(vec![]).matches(&input));
        assert!(!or(vec![]).matches(&input));

        let nested = or(vec![and(vec![always(true), always(false)]), and(vec![always(true)])]);
        assert!(nested.matches(&input));
    }

    #[test]
    fn test_missing_capability() {
        let partial = PartialRuleInput {
            query: Some(map(&[("q", "1")])),
            ..Default::default()
        };
        let header = single(RuleField::Header, "x", "1", RuleOperation::Equals, false);
        assert_eq!(
            header.evaluate(&partial),
            Err(RuleEvaluationError::MissingCapability("header"))
        );
        let query = single(RuleField::Query, "q", "1", RuleOperation::Equals, false);
        assert_eq!(query.evaluate(&partial), Ok(true));
    }

    #[test]
    fn test_deserialize_single_and_aggregate() {
        let json = r#"{
            "operation": "and",
            "rules": [
                { "type": "Header", "key": "X-Env", "value": "prod", "operation": "Equals" },
                { "operation": "OR", "rules": [
                    { "type": "Query", "key": "q", "value": "^a", "operation": "Regex" },
                    { "type": "Route", "key": "id", "operation": "NullOrEmpty", "negate": true }
                ]}
            ]
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        let Rule::Aggregate(aggregate) = &rule else {
            panic!("expected aggregate");
        };
        assert_eq!(aggregate.operation, AggregateOperation::And);
        assert_eq!(aggregate.rules.len(), 2);

        let input = RuleInput::new(
            map(&[("x-env", "prod")]),
            map(&[("q", "zzz")]),
            map(&[("id", "7")]),
        );
        assert!(rule.matches(&input));
    }

    #[test]
    fn test_deserialize_errors() {
        let err = serde_json::from_str::<Rule>(r#"{ "key": "a" }"#).unwrap_err();
        assert!(err.to_string().contains("'type'"));

        let err = serde_json::from_str::<Rule>(r#"{ "type": "Body", "key": "a" }"#).unwrap_err();
        assert!(err.to_string().contains("unknown rule type"));

        let err = serde_json::from_str::<Rule>(
            r#"{ "type": "Header", "key": "a", "operation": "StartsWith" }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("StartsWith"));

        let err = serde_json::from_str::<Rule>(r#"{ "type": "Header", "key": "" }"#).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = serde_json::from_str::<Rule>(r#"{ "operation": "OR" }"#).unwrap_err();
        assert!(err.to_string().contains("no 'rules'"));
    }

    #[test]
    fn test_serialize_round_trips() {
        let rule = Rule::Aggregate(AggregateRule::new(
            vec![single(RuleField::Query, "q", "x", RuleOperation::Contains, true)],
            AggregateOperation::Or,
        ));
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["operation"], "OR");
        assert_eq!(json["rules"][0]["type"], "Query");
        assert_eq!(json["rules"][0]["negate"], true);

        let back: Rule = serde_json::from_value(json).unwrap();
        assert!(matches!(back, Rule::Aggregate(_)));
    }

    #[test]
    fn test_deserialize_grouped_rule_shape() {
        let json = r#"{ "id": "g1", "type": "Aggregate", "op": "or", "rules": [
            { "id": "r1", "type": "Query", "key": "debug", "operation": "Equals", "value": "1" }
        ] }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert!(matches!(&rule, Rule::Aggregate(agg) if agg.operation == AggregateOperation::Or));

        let input = RuleInput::new(HashMap::new(), map(&[("debug", "1")]), HashMap::new());
        assert!(rule.matches(&input));
    }
}
