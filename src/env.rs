//! Configuration loading from environment variables.
//!
//! Recognized variables (a `.env` file in the working directory is honored):
//! - `CEP_RACE_DEADLINE_MS`
//! - `CEP_RACE_MAX_IN_FLIGHT`
//! - `CEP_RACE_REJECT_ERROR_STATUS`
//! - `CEP_RACE_PROVIDERS` as `id=template,id=template`
//! - `CEP_RACE_ADDR`

use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use crate::{
    config::{default_providers, ProviderConfig, RaceConfig},
    errors::ConfigError,
};

pub const DEADLINE_MS: &str = "CEP_RACE_DEADLINE_MS";
pub const MAX_IN_FLIGHT: &str = "CEP_RACE_MAX_IN_FLIGHT";
pub const REJECT_ERROR_STATUS: &str = "CEP_RACE_REJECT_ERROR_STATUS";
pub const PROVIDERS: &str = "CEP_RACE_PROVIDERS";
pub const ADDR: &str = "CEP_RACE_ADDR";

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Everything the binaries need to build a racer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub providers: Vec<ProviderConfig>,
    pub race: RaceConfig,
    pub addr: SocketAddr,
}

/// Loads settings from the process environment, after reading `.env` if present.
pub fn settings_from_env() -> Result<Settings, ConfigError> {
    let _ = dotenv::dotenv();
    settings_from_lookup(|key| env::var(key).ok())
}

/// Loads settings through `lookup`, falling back to defaults for unset keys.
pub fn settings_from_lookup<L>(lookup: L) -> Result<Settings, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let mut race = RaceConfig::default();

    if let Some(ms) = parse_var::<u64, _>(&lookup, DEADLINE_MS)? {
        race.deadline = Duration::from_millis(ms);
    }
    if let Some(max) = parse_var::<usize, _>(&lookup, MAX_IN_FLIGHT)? {
        race.max_in_flight = max;
    }
    if let Some(raw) = lookup(REJECT_ERROR_STATUS) {
        race.reject_error_status = parse_flag(REJECT_ERROR_STATUS, &raw)?;
    }
    race.validate()?;

    let providers = match lookup(PROVIDERS) {
        Some(raw) => parse_providers(&raw)?,
        None => default_providers(),
    };

    let addr = match parse_var::<SocketAddr, _>(&lookup, ADDR)? {
        Some(addr) => addr,
        None => DEFAULT_ADDR.parse().map_err(|_| ConfigError::InvalidEnv {
            key: ADDR,
            value: DEFAULT_ADDR.to_string(),
        })?,
    };

    Ok(Settings {
        providers,
        race,
        addr,
    })
}

/// Parses an ordered provider list written as `id=template,id=template`.
pub fn parse_providers(raw: &str) -> Result<Vec<ProviderConfig>, ConfigError> {
    let providers = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, template) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::ProviderEntry(entry.to_string()))?;
            ProviderConfig::new(id.trim(), template.trim())
        })
        .collect::<Result<Vec<_>, _>>()?;

    if providers.is_empty() {
        return Err(ConfigError::NoProviders);
    }
    Ok(providers)
}

fn parse_var<T, L>(lookup: &L, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key, value })
        })
        .transpose()
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key,
            value: raw.to_string(),
        }),
    }
}
