//! Path resolution: from a raw request path to a registered template key.
//!
//! Two tiers: an exact-key lookup for the common case, then a walk of the
//! registry matching `{var}` templates segment by segment. The first
//! template that matches wins; registry iteration order is the tiebreak.

use std::collections::HashMap;

use crate::scenario::registry::{normalize_path, scenario_key, ScenarioList, ScenarioRegistry};

/// A successful path resolution.
pub struct ResolvedPath {
    /// The registered template path (placeholders intact).
    pub template: String,
    /// The scenario list registered under the resolved key.
    pub scenarios: ScenarioList,
    /// Extracted `{var}` values, empty for exact matches.
    pub vars: HashMap<String, String>,
}

/// Resolve a request path and method against the registry.
pub fn resolve(registry: &ScenarioRegistry, path: &str, method: &str) -> Option<ResolvedPath> {
    let path = normalize_path(path);

    // Fast path: the raw path is itself a registered key.
    if let Some(scenarios) = registry.lookup(&scenario_key(path, method)) {
        return Some(ResolvedPath {
            template: path.to_string(),
            scenarios,
            vars: HashMap::new(),
        });
    }

    // Slow path: walk templates registered for this method.
    let method = method.to_uppercase();
    let mut found = None;
    registry.iterate(|_, list| {
        let Some(first) = list.first() else {
            return true;
        };
        if !first.method.eq_ignore_ascii_case(&method) || !first.path.contains('{') {
            return true;
        }
        if let Some(vars) = match_template(&first.path, path) {
            found = Some(ResolvedPath {
                template: first.path.clone(),
                scenarios: list.clone(),
                vars,
            });
            return false;
        }
        true
    });
    found
}

/// Match a path against a `{var}` template, capturing variable segments.
/// Both sides are compared segment-wise; counts must agree exactly.
pub fn match_template(template: &str, path: &str) -> Option<HashMap<String, String>> {
    let template_segments: Vec<&str> = template.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if template_segments.len() != path_segments.len() {
        return None;
    }

    let mut vars = HashMap::new();
    for (tmpl, seg) in template_segments.iter().zip(&path_segments) {
        if let Some(name) = tmpl.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            vars.insert(name.to_string(), seg.to_string());
        } else if tmpl != seg {
            return None;
        }
    }
    Some(vars)
}
