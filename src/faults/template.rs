//! Body template engine.
//!
//! Response bodies containing `{{` are rendered with Handlebars against a
//! closed context: a fixed set of request and server fields, no free-form
//! access to server internals. Scenario files written with Go-template
//! accessor paths (`{{.Request.Query.q}}`, `{{index .Request.Headers "K"}}`)
//! are accepted; a normalization pass strips the leading dot from context
//! accessors before rendering.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError,
    RenderErrorReason,
};
use rand::Rng;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::http::request::RequestContext;

/// Fields exposed to templates. The shape is fixed: untrusted scenarios can
/// only reach what is serialized here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateData {
    pub request: RequestData,
    pub server: ServerData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestData {
    #[serde(rename = "ID")]
    pub id: String,
    pub method: String,
    pub path: String,
    /// First value per query parameter.
    pub query: HashMap<String, String>,
    /// First value per header, canonical names.
    pub headers: HashMap<String, String>,
    /// Variables extracted from the path template.
    pub path_vars: HashMap<String, String>,
    /// Parsed JSON when the Content-Type says so, raw string otherwise.
    pub body: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerData {
    pub hostname: String,
    pub timestamp: String,
    pub fault_type: String,
}

impl TemplateData {
    /// Flatten a captured request into the template context.
    pub fn from_request(ctx: &RequestContext, hostname: &str, fault_type: &str) -> Self {
        let body_str = ctx.body_string();
        let is_json = ctx
            .header("content-type")
            .is_some_and(|ct| ct.contains("application/json"));
        let body = if is_json && !body_str.is_empty() {
            serde_json::from_str(&body_str).unwrap_or(Value::String(body_str))
        } else {
            Value::String(body_str)
        };

        Self {
            request: RequestData {
                id: ctx.id.clone(),
                method: ctx.method.clone(),
                path: ctx.path.clone(),
                query: ctx.query.clone(),
                headers: ctx.headers_flat(),
                path_vars: ctx.path_vars.clone(),
                body,
            },
            server: ServerData {
                hostname: hostname.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                fault_type: fault_type.to_string(),
            },
        }
    }
}

/// True when a body needs rendering at all.
pub fn has_template_syntax(body: &str) -> bool {
    body.contains("{{")
}

/// Handlebars wrapper with the helper set scenarios may call.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // Bodies are not HTML; emit values verbatim.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("uuid", Box::new(uuid_helper));
        handlebars.register_helper("randomInt", Box::new(random_int_helper));
        handlebars.register_helper("add", Box::new(add_helper));
        handlebars.register_helper("subtract", Box::new(subtract_helper));
        handlebars.register_helper("index", Box::new(index_helper));
        Self { handlebars }
    }

    /// Render a body template. Parse and execution errors bubble up so the
    /// caller can answer 500.
    pub fn render(&self, body: &str, data: &TemplateData) -> Result<String, RenderError> {
        let normalized = normalize_accessors(body);
        self.handlebars.render_template(&normalized, data)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the leading dot from Go-template accessor paths inside `{{ … }}`
/// expressions: `{{.Request.Path}}` → `{{Request.Path}}`, including helper
/// arguments like `{{index .Request.Headers "K"}}`.
fn normalize_accessors(template: &str) -> String {
    static LEADING_DOT: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(^|[\s(])\.([A-Za-z_])").expect("static regex compiles"));

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let (before, tail) = rest.split_at(start);
        out.push_str(before);
        match tail.find("}}") {
            Some(end) => {
                let inner = &tail[2..end];
                out.push_str("{{");
                out.push_str(&LEADING_DOT.replace_all(inner, "$1$2"));
                out.push_str("}}");
                rest = &tail[end + 2..];
            }
            None => {
                // Unterminated expression; hand it to the parser as-is so
                // the error surfaces to the caller.
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn param_i64(h: &Helper, idx: usize, helper: &'static str) -> Result<i64, RenderError> {
    h.param(idx)
        .and_then(|p| p.value().as_i64())
        .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex(helper, idx).into())
}

/// An id-like string derived from the high-resolution clock.
fn uuid_helper(
    _: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = format!(
        "{}-{}-{}-{}-{}",
        nanos % 10_000,
        (nanos / 10_000) % 10_000,
        (nanos / 100_000_000) % 10_000,
        (nanos / 1_000_000_000_000) % 10_000,
        (nanos / 10_000_000_000_000_000) % 10_000,
    );
    out.write(&id)?;
    Ok(())
}

fn random_int_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let min = param_i64(h, 0, "randomInt")?;
    let max = param_i64(h, 1, "randomInt")?;
    let value = if max <= min {
        min
    } else {
        rand::thread_rng().gen_range(min..max)
    };
    out.write(&value.to_string())?;
    Ok(())
}

fn add_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let sum = param_i64(h, 0, "add")? + param_i64(h, 1, "add")?;
    out.write(&sum.to_string())?;
    Ok(())
}

fn subtract_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let diff = param_i64(h, 0, "subtract")? - param_i64(h, 1, "subtract")?;
    out.write(&diff.to_string())?;
    Ok(())
}

/// Accessor for keys that are not valid identifier paths
/// (`{{index Request.Headers "User-Agent"}}`) and for array positions.
fn index_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let target = h.param(0).map(|p| p.value()).unwrap_or(&Value::Null);
    let key = h.param(1).map(|p| p.value()).unwrap_or(&Value::Null);

    let resolved = match (target, key) {
        (Value::Object(map), Value::String(k)) => map.get(k).cloned().unwrap_or(Value::Null),
        (Value::Array(arr), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| arr.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    };

    match resolved {
        Value::Null => {}
        Value::String(s) => out.write(&s)?,
        other => out.write(&other.to_string())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    fn request_ctx(
        method: &str,
        path: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        body: &str,
    ) -> RequestContext {
        let mut header_map = HeaderMap::new();
        for (k, v) in headers {
            header_map.insert(
                k.parse::<axum::http::HeaderName>().unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        RequestContext {
            id: "42".to_string(),
            method: method.to_string(),
            path: path.to_string(),
            raw_query: String::new(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: header_map,
            remote_addr: String::new(),
            body: body.as_bytes().to_vec().into(),
            path_vars: HashMap::new(),
        }
    }

    fn render(body: &str, ctx: &RequestContext) -> Result<String, RenderError> {
        let engine = TemplateEngine::new();
        let data = TemplateData::from_request(ctx, "test-host", "none");
        engine.render(body, &data)
    }

    #[test]
    fn simple_substitution() {
        let ctx = request_ctx("GET", "/api/hello", &[("name", "World")], &[], "");
        assert_eq!(
            render("Hello {{.Request.Query.name}}", &ctx).unwrap(),
            "Hello World"
        );
    }

    #[test]
    fn method_and_path() {
        let ctx = request_ctx("POST", "/api/data", &[], &[], "");
        assert_eq!(
            render("{{.Request.Method}} request to {{.Request.Path}}", &ctx).unwrap(),
            "POST request to /api/data"
        );
    }

    #[test]
    fn header_via_index_helper() {
        let ctx = request_ctx("GET", "/", &[], &[("user-agent", "Rust-Test")], "");
        assert_eq!(
            render(r#"User-Agent: {{index .Request.Headers "User-Agent"}}"#, &ctx).unwrap(),
            "User-Agent: Rust-Test"
        );
    }

    #[test]
    fn missing_variable_renders_empty() {
        let ctx = request_ctx("GET", "/", &[], &[], "");
        assert_eq!(
            render("Hello {{.Request.Query.missing}}", &ctx).unwrap(),
            "Hello "
        );
    }

    #[test]
    fn invalid_template_errors() {
        let ctx = request_ctx("GET", "/", &[], &[], "");
        assert!(render("Hello {{.Request.Query.name", &ctx).is_err());
    }

    #[test]
    fn json_body_nested_field() {
        let ctx = request_ctx(
            "POST",
            "/api/greet",
            &[],
            &[("content-type", "application/json")],
            r#"{"name":{"firstName":"Ada","lastName":"Lovelace"}}"#,
        );
        assert_eq!(
            render(
                "Hello {{.Request.Body.name.firstName}} {{.Request.Body.name.lastName}}",
                &ctx
            )
            .unwrap(),
            "Hello Ada Lovelace"
        );
    }

    #[test]
    fn json_body_array_access() {
        let ctx = request_ctx(
            "POST",
            "/api/array",
            &[],
            &[("content-type", "application/json")],
            r#"{"items":["apple","banana","orange"]}"#,
        );
        assert_eq!(
            render("First item: {{index .Request.Body.items 0}}", &ctx).unwrap(),
            "First item: apple"
        );
    }

    #[test]
    fn non_json_body_is_raw_string() {
        let ctx = request_ctx(
            "POST",
            "/api/text",
            &[],
            &[("content-type", "text/plain")],
            "Hello World",
        );
        assert_eq!(
            render("Received: {{.Request.Body}}", &ctx).unwrap(),
            "Received: Hello World"
        );
    }

    #[test]
    fn path_vars_are_exposed() {
        let mut ctx = request_ctx("GET", "/api/users/7", &[], &[], "");
        ctx.path_vars.insert("id".to_string(), "7".to_string());
        assert_eq!(render("user={{.Request.PathVars.id}}", &ctx).unwrap(), "user=7");
    }

    #[test]
    fn arithmetic_helpers() {
        let ctx = request_ctx("GET", "/", &[], &[], "");
        assert_eq!(render("{{add 2 3}}", &ctx).unwrap(), "5");
        assert_eq!(render("{{subtract 10 4}}", &ctx).unwrap(), "6");
    }

    #[test]
    fn random_int_stays_in_range() {
        let ctx = request_ctx("GET", "/", &[], &[], "");
        let rendered = render("{{randomInt 5 10}}", &ctx).unwrap();
        let value: i64 = rendered.parse().unwrap();
        assert!((5..10).contains(&value));
        // Degenerate range collapses to min.
        assert_eq!(render("{{randomInt 7 7}}", &ctx).unwrap(), "7");
    }

    #[test]
    fn uuid_helper_emits_five_groups() {
        let ctx = request_ctx("GET", "/", &[], &[], "");
        let rendered = render("{{uuid}}", &ctx).unwrap();
        assert_eq!(rendered.split('-').count(), 5);
    }

    #[test]
    fn rendering_is_deterministic_for_fixed_context() {
        let engine = TemplateEngine::new();
        let ctx = request_ctx("GET", "/p", &[("q", "v")], &[], "");
        let data = TemplateData::from_request(&ctx, "host", "none");
        let body = r#"{"q":"{{.Request.Query.q}}","m":"{{.Request.Method}}"}"#;
        let first = engine.render(body, &data).unwrap();
        let second = engine.render(body, &data).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, r#"{"q":"v","m":"GET"}"#);
    }

    #[test]
    fn server_fields_render() {
        let ctx = request_ctx("GET", "/", &[], &[], "");
        assert_eq!(
            render("host={{.Server.Hostname}} fault={{.Server.FaultType}}", &ctx).unwrap(),
            "host=test-host fault=none"
        );
    }

    #[test]
    fn normalization_leaves_plain_handlebars_alone() {
        assert_eq!(
            normalize_accessors("{{Request.Path}} and {{.Request.Path}}"),
            "{{Request.Path}} and {{Request.Path}}"
        );
        assert_eq!(normalize_accessors("no templates at all"), "no templates at all");
        assert_eq!(
            normalize_accessors(r#"{{index .Request.Headers "K"}}"#),
            r#"{{index Request.Headers "K"}}"#
        );
    }
}
