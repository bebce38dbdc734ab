//! Environment-based configuration loading.
//!
//! Configuration is loaded once at process start and never mutated.
//! Missing credentials are fatal; everything else has a documented
//! default (see `slated_core::config`).
//!
//! Recognized variables:
//! - `OPENROUTER_API_KEY` (required): comma-separated credential pool
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REFRESH_TOKEN`
//!   (required): calendar OAuth credentials
//! - `SLATED_CALENDAR_ID` (required): calendar to operate on
//! - `SLATED_TIME_ZONE`: IANA zone, default `Asia/Kolkata`
//! - `OPENROUTER_MODEL`: reasoning model identifier
//! - `SLATED_TEMPERATURE`: sampling temperature, default 0.3
//! - `SLATED_MAX_ITERATIONS`: Reason/Act loop cap, default 6
//! - `SLATED_REQUEST_TIMEOUT_SECS`: external call timeout, default 30
//! - `SLATED_SESSION_TTL_SECS`: idle session eviction TTL, default 86400

use chrono_tz::Tz;
use slated_core::config::{
    AssistantConfig, GoogleCredentials, DEFAULT_MAX_ITERATIONS, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SESSION_TTL_SECS, DEFAULT_TEMPERATURE,
    DEFAULT_TIME_ZONE,
};
use slated_core::{Result, SlatedError};
use std::collections::HashMap;
use std::time::Duration;

/// Loads the process configuration from the environment.
///
/// # Errors
///
/// Returns a fatal `Config` error for missing credentials, an unknown
/// time zone, or unparseable numeric settings.
pub fn load_config() -> Result<AssistantConfig> {
    let vars: HashMap<String, String> = std::env::vars().collect();
    build_config(&vars)
}

fn build_config(vars: &HashMap<String, String>) -> Result<AssistantConfig> {
    let api_keys: Vec<String> = require(vars, "OPENROUTER_API_KEY")?
        .split(',')
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .collect();

    let zone_name = get_or(vars, "SLATED_TIME_ZONE", DEFAULT_TIME_ZONE);
    let time_zone: Tz = zone_name
        .parse()
        .map_err(|_| SlatedError::config(format!("unknown time zone '{zone_name}'")))?;

    let config = AssistantConfig {
        time_zone,
        calendar_id: require(vars, "SLATED_CALENDAR_ID")?,
        model: get_or(vars, "OPENROUTER_MODEL", DEFAULT_MODEL),
        temperature: parse_or(vars, "SLATED_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        max_iterations: parse_or(vars, "SLATED_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?,
        request_timeout: Duration::from_secs(parse_or(
            vars,
            "SLATED_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?),
        session_ttl: Duration::from_secs(parse_or(
            vars,
            "SLATED_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?),
        api_keys,
        google: GoogleCredentials {
            client_id: require(vars, "GOOGLE_CLIENT_ID")?,
            client_secret: require(vars, "GOOGLE_CLIENT_SECRET")?,
            refresh_token: require(vars, "GOOGLE_REFRESH_TOKEN")?,
        },
    };

    config.validate()?;
    Ok(config)
}

fn require(vars: &HashMap<String, String>, name: &str) -> Result<String> {
    match vars.get(name).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(SlatedError::config(format!(
            "required environment variable {name} is not set"
        ))),
    }
}

fn get_or(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    match vars.get(name).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T> {
    match vars.get(name).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| SlatedError::config(format!("could not parse {name}='{value}'"))),
        _ => Ok(default),
    }
}
