//! Request predicates: does a scenario claim this request?
//!
//! All configured predicates must hold. Scenarios are tested in insertion
//! order and the first match wins; a scenario with no predicates matches
//! every request for its key.

use regex::Regex;

use crate::http::request::RequestContext;
use crate::scenario::spec::Scenario;

/// Test a scenario's predicates against a captured request.
pub fn matches_request(scenario: &Scenario, ctx: &RequestContext) -> bool {
    for (name, expected) in &scenario.matches.headers {
        if ctx.header(name) != Some(expected.as_str()) {
            return false;
        }
    }

    for (name, expected) in &scenario.matches.query {
        if ctx.query.get(name) != Some(expected) {
            return false;
        }
    }

    let pattern = scenario.matches.body.as_str();
    if !pattern.is_empty() {
        let body = ctx.body_string();
        match body_pattern(pattern) {
            BodyPattern::Regex(expr) => match Regex::new(expr) {
                Ok(re) => {
                    if !re.is_match(&body) {
                        return false;
                    }
                }
                Err(err) => {
                    tracing::warn!(pattern = %expr, error = %err, "invalid body match regex");
                    return false;
                }
            },
            BodyPattern::Substring(needle) => {
                if !body.contains(needle) {
                    return false;
                }
            }
        }
    }

    true
}

enum BodyPattern<'a> {
    Regex(&'a str),
    Substring(&'a str),
}

/// Classify a body pattern: `/…/` and `regex:…` select regex matching,
/// anything else is a substring.
fn body_pattern(pattern: &str) -> BodyPattern<'_> {
    if let Some(expr) = pattern.strip_prefix("regex:") {
        return BodyPattern::Regex(expr);
    }
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        return BodyPattern::Regex(&pattern[1..pattern.len() - 1]);
    }
    BodyPattern::Substring(pattern)
}
