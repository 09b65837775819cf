//! Semantic scenario validation.
//!
//! Serde handles shape; this module rejects scenarios that would be
//! meaningless at dispatch time. Invalid scenarios are refused at the
//! control-API boundary and at config load, never inside the registry.

use regex::Regex;

use crate::scenario::spec::{parse_delay_range, Scenario};

/// A single semantic problem with a scenario.
#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn error(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Check one scenario; all problems are reported at once.
pub fn validate_scenario(scenario: &Scenario) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if scenario.path.is_empty() {
        errors.push(error("path", "must not be empty"));
    }
    if scenario.method.is_empty() {
        errors.push(error("method", "must not be empty"));
    }
    if scenario.responses.is_empty() {
        errors.push(error("responses", "must contain at least one response"));
    }

    for (i, response) in scenario.responses.iter().enumerate() {
        if !(0.0..=1.0).contains(&response.probability) {
            errors.push(error(
                &format!("responses[{i}].probability"),
                "must be between 0.0 and 1.0",
            ));
        }
        if let Some(range) = response.delay_range.as_deref() {
            match parse_delay_range(range) {
                Some((min, max)) if max < min => {
                    errors.push(error(
                        &format!("responses[{i}].delayRange"),
                        "minimum exceeds maximum",
                    ));
                }
                None => {
                    errors.push(error(
                        &format!("responses[{i}].delayRange"),
                        "expected the form '100ms-500ms'",
                    ));
                }
                _ => {}
            }
        }
    }

    let body_pattern = scenario.matches.body.as_str();
    if !body_pattern.is_empty() {
        let regex = body_pattern
            .strip_prefix("regex:")
            .or_else(|| {
                (body_pattern.len() > 2
                    && body_pattern.starts_with('/')
                    && body_pattern.ends_with('/'))
                .then(|| &body_pattern[1..body_pattern.len() - 1])
            });
        if let Some(expr) = regex {
            if let Err(err) = Regex::new(expr) {
                errors.push(error("matches.body", format!("invalid regex: {err}")));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::spec::{JsonBody, ResponseSpec};

    #[test]
    fn valid_scenario_passes() {
        let s = Scenario::new("/a", "GET", vec![ResponseSpec::default()]);
        assert!(validate_scenario(&s).is_ok());
    }

    #[test]
    fn empty_fields_are_rejected() {
        let s = Scenario::new("", "", vec![]);
        let errors = validate_scenario(&s).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let s = Scenario::new(
            "/a",
            "GET",
            vec![ResponseSpec {
                probability: 1.5,
                ..Default::default()
            }],
        );
        assert!(validate_scenario(&s).is_err());
    }

    #[test]
    fn bad_delay_range_is_rejected() {
        let s = Scenario::new(
            "/a",
            "GET",
            vec![ResponseSpec {
                delay_range: Some("bogus".to_string()),
                ..Default::default()
            }],
        );
        assert!(validate_scenario(&s).is_err());

        let inverted = Scenario::new(
            "/a",
            "GET",
            vec![ResponseSpec {
                delay_range: Some("500ms-100ms".to_string()),
                ..Default::default()
            }],
        );
        assert!(validate_scenario(&inverted).is_err());
    }

    #[test]
    fn invalid_body_regex_is_rejected() {
        let mut s = Scenario::new("/a", "GET", vec![ResponseSpec::default()]);
        s.matches.body = JsonBody::from("/[unclosed/");
        assert!(validate_scenario(&s).is_err());

        s.matches.body = JsonBody::from("plain substring is fine [even this]");
        assert!(validate_scenario(&s).is_ok());
    }
}
