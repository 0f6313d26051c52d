//! URL template matching.
//!
//! Templates follow conventional web-framework routing:
//!
//! - `products` literal segment, compared case-insensitively
//! - `{id}` one non-empty segment
//! - `{id:int:min(1)}` constrained segment, every constraint must accept
//! - `{article?}` optional, `{section=overview}` defaulted
//! - `{*query}` / `{**path}` the rest of the path, possibly empty
//! - `{name}.{ext}` complex segment mixing literals and parameters
//!
//! Literal braces are written `{{` and `}}`.

use crate::error::UrlTemplateError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Compiled URL template.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    template: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    /// Stored lowercase.
    Literal(String),
    Parameter(Parameter),
    /// Parameters are captured positionally by the regex groups.
    Complex {
        regex: Regex,
        parameters: Vec<Parameter>,
    },
}

#[derive(Debug, Clone)]
struct Parameter {
    name: String,
    optional: bool,
    catch_all: bool,
    default: Option<String>,
    constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
enum Part {
    Literal(String),
    Parameter(Parameter),
}

#[derive(Debug, Clone)]
enum Constraint {
    Int,
    Long,
    Bool,
    /// `decimal`, `double` and `float`.
    Number,
    Guid,
    DateTime,
    Alpha,
    Required,
    MinLength(usize),
    MaxLength(usize),
    Length(usize, usize),
    Min(i64),
    Max(i64),
    Range(i64, i64),
    Regex(Regex),
}

impl UrlMatcher {
    /// Compile a template. A leading `/` or `~/` and a trailing `/` are ignored.
    pub fn new(template: &str) -> Result<Self, UrlTemplateError> {
        let trimmed = template.trim();
        let body = trimmed
            .strip_prefix("~/")
            .or_else(|| trimmed.strip_prefix('/'))
            .unwrap_or(trimmed);
        let body = body.strip_suffix('/').unwrap_or(body);

        let raw_segments = split_segments(body, template)?;
        let last = raw_segments.len().saturating_sub(1);
        let mut seen = HashSet::new();
        let mut segments = Vec::with_capacity(raw_segments.len());

        for (index, parts) in raw_segments.into_iter().enumerate() {
            for part in &parts {
                if let Part::Parameter(param) = part {
                    if !seen.insert(param.name.to_lowercase()) {
                        return Err(UrlTemplateError::DuplicateParameter(param.name.clone()));
                    }
                }
            }

            let segment = build_segment(parts)?;
            if let Segment::Parameter(param) = &segment {
                if param.catch_all && index != last {
                    return Err(UrlTemplateError::CatchAllNotLast(param.name.clone()));
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.match_path(path).is_some()
    }

    /// Parameter values for `path`, or an empty map when it doesn't match.
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        self.match_path(path).unwrap_or_default()
    }

    /// Match `path` and capture its parameters in one pass.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path = path.split('?').next().unwrap_or_default();
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);
        let request: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };

        let mut values = HashMap::new();

        for (index, segment) in self.segments.iter().enumerate() {
            if let Segment::Parameter(param) = segment {
                if param.catch_all {
                    let rest = request.get(index..).map(|r| r.join("/")).unwrap_or_default();
                    if !rest.is_empty() {
                        capture(param, rest, &mut values)?;
                    } else if let Some(default) = &param.default {
                        capture(param, default.clone(), &mut values)?;
                    }
                    return Some(values);
                }
            }

            match (segment, request.get(index)) {
                (Segment::Literal(literal), Some(part)) => {
                    if *literal != part.to_lowercase() {
                        return None;
                    }
                }
                (Segment::Parameter(param), Some(part)) => {
                    if part.is_empty() {
                        return None;
                    }
                    capture(param, part.to_string(), &mut values)?;
                }
                (Segment::Complex { regex, parameters }, Some(part)) => {
                    let captures = regex.captures(part)?;
                    for (group, param) in parameters.iter().enumerate() {
                        let value = captures.get(group + 1)?.as_str().to_string();
                        capture(param, value, &mut values)?;
                    }
                }
                (Segment::Parameter(param), None) if param.optional => {}
                (Segment::Parameter(param), None) => {
                    let default = param.default.clone()?;
                    capture(param, default, &mut values)?;
                }
                (_, None) => return None,
            }
        }

        if request.len() > self.segments.len() {
            return None;
        }
        Some(values)
    }
}

fn capture(param: &Parameter, value: String, values: &mut HashMap<String, String>) -> Option<()> {
    if !param.constraints.iter().all(|c| c.accepts(&value)) {
        return None;
    }
    values.insert(param.name.clone(), value);
    Some(())
}

/// Split into `/`-separated segments of literal and parameter parts.
fn split_segments(body: &str, template: &str) -> Result<Vec<Vec<Part>>, UrlTemplateError> {
    let unbalanced = || UrlTemplateError::UnbalancedBraces(template.to_string());
    let mut segments = Vec::new();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(unbalanced()),
            '{' => {
                let mut inner = String::new();
                loop {
                    match chars.next() {
                        None => return Err(unbalanced()),
                        Some('}') if chars.peek() == Some(&'}') => {
                            chars.next();
                            inner.push('}');
                        }
                        Some('}') => break,
                        Some('{') if chars.peek() == Some(&'{') => {
                            chars.next();
                            inner.push('{');
                        }
                        Some('{') => return Err(unbalanced()),
                        Some(c) => inner.push(c),
                    }
                }
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }
                parts.push(Part::Parameter(parse_parameter(&inner, template)?));
            }
            '/' => {
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }
                if !parts.is_empty() {
                    segments.push(std::mem::take(&mut parts));
                }
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        parts.push(Part::Literal(literal));
    }
    if !parts.is_empty() {
        segments.push(parts);
    }
    Ok(segments)
}

fn build_segment(mut parts: Vec<Part>) -> Result<Segment, UrlTemplateError> {
    if parts.len() == 1 {
        return Ok(match parts.remove(0) {
            Part::Literal(text) => Segment::Literal(text.to_lowercase()),
            Part::Parameter(param) => Segment::Parameter(param),
        });
    }

    let mut pattern = String::from("(?i)^");
    let mut parameters = Vec::new();
    for part in parts {
        match part {
            Part::Literal(text) => pattern.push_str(&regex::escape(&text)),
            Part::Parameter(param) => {
                if param.optional || param.catch_all || param.default.is_some() {
                    return Err(UrlTemplateError::ComplexSegmentParameter(param.name));
                }
                pattern.push_str("(.+)");
                parameters.push(param);
            }
        }
    }
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| UrlTemplateError::InvalidConstraint {
        constraint: pattern.clone(),
        message: e.to_string(),
    })?;
    Ok(Segment::Complex { regex, parameters })
}

/// Parse the text between braces: `[*|**]name[:constraint]*[?|=default]`.
fn parse_parameter(inner: &str, template: &str) -> Result<Parameter, UrlTemplateError> {
    let (catch_all, rest) = if let Some(rest) = inner.strip_prefix("**") {
        (true, rest)
    } else if let Some(rest) = inner.strip_prefix('*') {
        (true, rest)
    } else {
        (false, inner)
    };

    let name_end = rest.find([':', '=', '?']).unwrap_or(rest.len());
    let name = rest[..name_end].trim();
    if name.is_empty() {
        return Err(UrlTemplateError::EmptyParameterName(template.to_string()));
    }

    let mut tail = &rest[name_end..];
    let mut constraints = Vec::new();
    while let Some(after) = tail.strip_prefix(':') {
        let end = constraint_end(after);
        constraints.push(parse_constraint(&after[..end])?);
        tail = &after[end..];
    }

    let mut optional = false;
    let mut default = None;
    if let Some(value) = tail.strip_prefix('=') {
        if value.ends_with('?') {
            return Err(UrlTemplateError::OptionalWithDefault(name.to_string()));
        }
        default = Some(value.to_string());
    } else if let Some(after) = tail.strip_prefix('?') {
        if after.starts_with('=') {
            return Err(UrlTemplateError::OptionalWithDefault(name.to_string()));
        }
        if !after.is_empty() {
            return Err(UrlTemplateError::InvalidConstraint {
                constraint: tail.to_string(),
                message: "unexpected text after '?'".to_string(),
            });
        }
        optional = true;
    }

    Ok(Parameter {
        name: name.to_string(),
        optional,
        catch_all,
        default,
        constraints,
    })
}

/// End of a constraint: the first `:`, `=` or `?` outside parentheses.
fn constraint_end(text: &str) -> usize {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ':' | '=' | '?' if depth == 0 => return i,
            _ => {}
        }
    }
    text.len()
}

fn parse_constraint(text: &str) -> Result<Constraint, UrlTemplateError> {
    let invalid = |message: &str| UrlTemplateError::InvalidConstraint {
        constraint: text.to_string(),
        message: message.to_string(),
    };

    let (name, argument) = match text.find('(') {
        Some(open) => {
            let argument = text[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| invalid("missing closing parenthesis"))?;
            (&text[..open], Some(argument))
        }
        None => (text, None),
    };

    let integers = |count: usize| -> Result<Vec<i64>, UrlTemplateError> {
        let values = argument
            .unwrap_or_default()
            .split(',')
            .map(|v| v.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid("arguments must be integers"))?;
        if values.len() != count {
            return Err(invalid(&format!("expected {count} argument(s)")));
        }
        Ok(values)
    };
    let length = |value: i64| usize::try_from(value).map_err(|_| invalid("length can't be negative"));

    let constraint = match name.trim().to_ascii_lowercase().as_str() {
        "minlength" => Constraint::MinLength(length(integers(1)?[0])?),
        "maxlength" => Constraint::MaxLength(length(integers(1)?[0])?),
        "length" => {
            let bounds = integers(1).or_else(|_| integers(2))?;
            match bounds.as_slice() {
                [exact] => Constraint::Length(length(*exact)?, length(*exact)?),
                [min, max] => Constraint::Length(length(*min)?, length(*max)?),
                _ => return Err(invalid("expected 1 or 2 arguments")),
            }
        }
        "min" => Constraint::Min(integers(1)?[0]),
        "max" => Constraint::Max(integers(1)?[0]),
        "range" => {
            let bounds = integers(2)?;
            Constraint::Range(bounds[0], bounds[1])
        }
        "regex" => {
            let pattern = argument.ok_or_else(|| invalid("missing pattern"))?;
            let regex = Regex::new(&format!("(?i){pattern}")).map_err(|e| invalid(&e.to_string()))?;
            Constraint::Regex(regex)
        }
        simple => {
            if argument.is_some() {
                return Err(invalid("constraint takes no arguments"));
            }
            match simple {
                "int" => Constraint::Int,
                "long" => Constraint::Long,
                "bool" => Constraint::Bool,
                "decimal" | "double" | "float" => Constraint::Number,
                "guid" => Constraint::Guid,
                "datetime" => Constraint::DateTime,
                "alpha" => Constraint::Alpha,
                "required" => Constraint::Required,
                _ => return Err(UrlTemplateError::UnknownConstraint(name.trim().to_string())),
            }
        }
    };
    Ok(constraint)
}

impl Constraint {
    fn accepts(&self, value: &str) -> bool {
        let chars = value.chars().count();
        match self {
            Constraint::Int => value.parse::<i32>().is_ok(),
            Constraint::Long => value.parse::<i64>().is_ok(),
            Constraint::Bool => value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"),
            Constraint::Number => value.parse::<f64>().is_ok_and(f64::is_finite),
            Constraint::Guid => is_guid(value),
            Constraint::DateTime => is_datetime(value),
            Constraint::Alpha => !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()),
            Constraint::Required => !value.is_empty(),
            Constraint::MinLength(min) => chars >= *min,
            Constraint::MaxLength(max) => chars <= *max,
            Constraint::Length(min, max) => (*min..=*max).contains(&chars),
            Constraint::Min(min) => value.parse::<i64>().is_ok_and(|v| v >= *min),
            Constraint::Max(max) => value.parse::<i64>().is_ok_and(|v| v <= *max),
            Constraint::Range(min, max) => value.parse::<i64>().is_ok_and(|v| (*min..=*max).contains(&v)),
            Constraint::Regex(regex) => regex.is_match(value),
        }
    }
}

/// `8-4-4-4-12` hex groups, optionally wrapped in braces, or 32 bare hex digits.
fn is_guid(value: &str) -> bool {
    let inner = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .unwrap_or(value);
    if inner.len() == 32 {
        return inner.chars().all(|c| c.is_ascii_hexdigit());
    }
    let groups: Vec<&str> = inner.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
