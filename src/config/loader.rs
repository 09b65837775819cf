//! Configuration loading: scenario file plus environment overrides.

use std::path::Path;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_scenario, ValidationError};
use crate::scenario::spec::Scenario;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load the scenario file and build the effective server configuration.
///
/// A missing scenario file is not fatal: the server starts with an empty
/// registry. A file that exists but fails to parse or validate is.
pub fn load_config(scenario_file: &Path) -> Result<(ServerConfig, Vec<Scenario>), ConfigError> {
    let scenarios = match std::fs::read_to_string(scenario_file) {
        Ok(raw) => {
            let scenarios: Vec<Scenario> = serde_yaml::from_str(&raw)?;
            for scenario in &scenarios {
                validate_scenario(scenario).map_err(ConfigError::Validation)?;
            }
            tracing::info!(
                file = %scenario_file.display(),
                count = scenarios.len(),
                "scenarios loaded"
            );
            scenarios
        }
        Err(err) => {
            tracing::warn!(
                file = %scenario_file.display(),
                error = %err,
                "failed to read scenario file, running without custom scenarios"
            );
            Vec::new()
        }
    };

    let mut config = ServerConfig::default();
    apply_env_overrides(&mut config);

    if let Ok(host) = hostname::get() {
        config.hostname = host.to_string_lossy().into_owned();
    }

    Ok((config, scenarios))
}

/// Apply the documented environment variables over the defaults. Values
/// that fail to parse are ignored.
fn apply_env_overrides(config: &mut ServerConfig) {
    if let Some(port) = env_parse::<u16>("PORT") {
        config.port = port;
    }
    if let Some(tls) = env_bool("ENABLE_TLS") {
        config.enable_tls = tls;
    }
    if let Ok(cert) = std::env::var("CERT_FILE") {
        if !cert.is_empty() {
            config.cert_file = cert;
        }
    }
    if let Ok(key) = std::env::var("KEY_FILE") {
        if !key.is_empty() {
            config.key_file = key;
        }
    }
    if let Some(cors) = env_bool("ENABLE_CORS") {
        config.enable_cors = cors;
    }
    if let Some(log) = env_bool("LOG_REQUESTS") {
        config.log_requests = log;
    }
    if let Some(log) = env_bool("LOG_HEADERS") {
        config.log_headers = log;
    }
    if let Some(log) = env_bool("LOG_BODY") {
        config.log_body = log;
    }
    if let Some(size) = env_parse::<usize>("MAX_BODY_SIZE") {
        config.max_body_size = size;
    }
    if let Some(rps) = env_parse::<f64>("RATE_LIMIT_RPS") {
        config.rate_limit_rps = rps;
    }
    if let Some(size) = env_parse::<usize>("HISTORY_SIZE") {
        config.history_size = size;
    }
    if let Some(delay) = std::env::var("ECHO_DELAY")
        .ok()
        .and_then(|raw| humantime::parse_duration(&raw).ok())
    {
        config.echo_delay = delay;
    }
    if let Some(chaos) = env_parse::<f64>("ECHO_CHAOS_PROBABILITY") {
        config.echo_chaos_probability = chaos;
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

fn env_bool(name: &str) -> Option<bool> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value == "true"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_empty_scenarios() {
        let (config, scenarios) =
            load_config(Path::new("definitely_not_here.yaml")).expect("missing file is non-fatal");
        assert!(scenarios.is_empty());
        assert_eq!(config.history_size, 100);
    }

    #[test]
    fn scenario_file_parses() {
        let dir = std::env::temp_dir();
        let path = dir.join("resilience-mock-loader-test.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
- path: /api/test
  method: GET
  responses:
    - status: 200
      delay: 500ms
      body: '{{}}'
"#
        )
        .unwrap();

        let (_, scenarios) = load_config(&path).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].path, "/api/test");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn invalid_scenario_in_file_is_fatal() {
        let dir = std::env::temp_dir();
        let path = dir.join("resilience-mock-loader-invalid.yaml");
        std::fs::write(&path, "- path: /broken\n  method: GET\n  responses: []\n").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
