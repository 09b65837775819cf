//! Declarative scenario types.
//!
//! These structs mirror the wire format accepted by the scenario YAML file
//! and `POST /scenario`. Runtime state (response cursor, breaker) rides on
//! the scenario behind `#[serde(skip)]` so a deserialized scenario is ready
//! to serve as soon as it is registered.

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::resilience::circuit_breaker::BreakerState;

/// A response body that may arrive as a plain string or as structured
/// YAML/JSON. Structured values are marshaled to JSON text on ingest so the
/// rest of the pipeline only ever sees raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JsonBody(pub String);

impl JsonBody {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for JsonBody {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for JsonBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::Null => Self::default(),
            serde_json::Value::String(s) => Self(s),
            other => Self(other.to_string()),
        })
    }
}

/// Predicates that must all hold for a scenario to claim a request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Header name → exact value (first value on multi-valued headers).
    pub headers: HashMap<String, String>,

    /// Query parameter → exact value.
    pub query: HashMap<String, String>,

    /// Body pattern: `/…/` or `regex:…` for a regex, anything else for a
    /// substring match.
    pub body: JsonBody,
}

impl MatchConfig {
    /// True when no predicate is configured, i.e. the scenario matches
    /// every request for its key.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.query.is_empty() && self.body.is_empty()
    }
}

/// Circuit breaker thresholds. The breaker is armed only when
/// `failure_threshold > 0`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakerConfig {
    /// Consecutive 5xx responses before the breaker opens.
    pub failure_threshold: u32,

    /// Consecutive successes in half-open before the breaker closes.
    pub success_threshold: u32,

    /// How long an open breaker refuses requests before probing.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// One entry in a scenario's rotating response list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseSpec {
    /// HTTP status code to answer with.
    pub status: u16,

    /// Fixed delay before the response is written.
    #[serde(with = "humantime_serde")]
    pub delay: Option<Duration>,

    /// Inclusive random delay range, e.g. `100ms-500ms`. Takes precedence
    /// over `delay`.
    pub delay_range: Option<String>,

    /// Response body; may contain `{{ … }}` template syntax.
    pub body: JsonBody,

    /// Extra response headers.
    pub headers: HashMap<String, String>,

    /// Gzip the body when the client accepts it.
    pub gzip: bool,

    /// Probability in (0, 1) that this response fires; 0 or ≥ 1 means
    /// always. A miss falls through to the echo handler.
    pub probability: f64,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self {
            status: 200,
            delay: None,
            delay_range: None,
            body: JsonBody::default(),
            headers: HashMap::new(),
            gzip: false,
            probability: 0.0,
        }
    }
}

impl ResponseSpec {
    /// Resolve the configured delay: a random draw from `delay_range` when
    /// set, the fixed `delay` otherwise.
    pub fn effective_delay(&self) -> Option<Duration> {
        if let Some(range) = self.delay_range.as_deref() {
            if let Some((min, max)) = parse_delay_range(range) {
                if max > min {
                    use rand::Rng;
                    let span = (max - min).as_nanos() as u64;
                    let jitter = rand::thread_rng().gen_range(0..=span);
                    return Some(min + Duration::from_nanos(jitter));
                }
                return Some(min);
            }
        }
        self.delay.filter(|d| !d.is_zero())
    }
}

/// Parse a `min-max` delay range with human-readable units.
pub fn parse_delay_range(raw: &str) -> Option<(Duration, Duration)> {
    let (min, max) = raw.split_once('-')?;
    let min = humantime::parse_duration(min.trim()).ok()?;
    let max = humantime::parse_duration(max.trim()).ok()?;
    Some((min, max))
}

/// A named binding from (path template, method) to programmed behavior.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Request path, possibly with `{var}` segments.
    pub path: String,

    /// HTTP method, matched case-insensitively.
    pub method: String,

    /// Optional request predicates.
    #[serde(default)]
    pub matches: MatchConfig,

    /// Ordered, non-empty response rotation.
    #[serde(default)]
    pub responses: Vec<ResponseSpec>,

    /// Optional circuit breaker configuration.
    #[serde(default)]
    pub circuit_breaker: BreakerConfig,

    /// Rotating cursor into `responses`. Advisory: concurrent requests may
    /// observe the same index.
    #[serde(skip)]
    pub cursor: AtomicU32,

    /// Breaker runtime state, owned exclusively by this scenario.
    #[serde(skip)]
    pub breaker: Mutex<BreakerState>,
}

impl Scenario {
    /// Shorthand constructor used by tests and the loader.
    pub fn new(path: &str, method: &str, responses: Vec<ResponseSpec>) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            matches: MatchConfig::default(),
            responses,
            circuit_breaker: BreakerConfig::default(),
            cursor: AtomicU32::new(0),
            breaker: Mutex::new(BreakerState::default()),
        }
    }

    /// True when the circuit breaker is configured for this scenario.
    pub fn breaker_armed(&self) -> bool {
        self.circuit_breaker.failure_threshold > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_accepts_string_and_structured() {
        #[derive(Deserialize)]
        struct Wrap {
            body: JsonBody,
        }

        let from_string: Wrap = serde_yaml::from_str(r#"body: '{"a":1}'"#).unwrap();
        assert_eq!(from_string.body.as_str(), r#"{"a":1}"#);

        let from_map: Wrap = serde_yaml::from_str("body:\n  a: 1").unwrap();
        assert_eq!(from_map.body.as_str(), r#"{"a":1}"#);

        let from_json: Wrap = serde_json::from_str(r#"{"body": {"a": 1}}"#).unwrap();
        assert_eq!(from_json.body.as_str(), r#"{"a":1}"#);
    }

    #[test]
    fn scenario_deserializes_from_yaml() {
        let yaml = r#"
path: /api/users/{id}
method: GET
matches:
  headers:
    X-Test: A
responses:
  - status: 200
    delay: 500ms
    body: '{"user": "found"}'
circuitBreaker:
  failureThreshold: 2
  successThreshold: 1
  timeout: 100ms
"#;
        let s: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s.path, "/api/users/{id}");
        assert_eq!(s.method, "GET");
        assert_eq!(s.matches.headers.get("X-Test").unwrap(), "A");
        assert_eq!(s.responses.len(), 1);
        assert_eq!(s.responses[0].status, 200);
        assert_eq!(s.responses[0].delay, Some(Duration::from_millis(500)));
        assert!(s.breaker_armed());
        assert_eq!(s.circuit_breaker.timeout, Duration::from_millis(100));
    }

    #[test]
    fn delay_range_parses_and_takes_precedence() {
        let spec = ResponseSpec {
            delay: Some(Duration::from_secs(10)),
            delay_range: Some("10ms-20ms".to_string()),
            ..Default::default()
        };
        let d = spec.effective_delay().unwrap();
        assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));

        assert_eq!(
            parse_delay_range("100ms-500ms"),
            Some((Duration::from_millis(100), Duration::from_millis(500)))
        );
        assert_eq!(parse_delay_range("garbage"), None);
    }

    #[test]
    fn response_defaults() {
        let r = ResponseSpec::default();
        assert_eq!(r.status, 200);
        assert_eq!(r.probability, 0.0);
        assert!(r.effective_delay().is_none());
    }
}
