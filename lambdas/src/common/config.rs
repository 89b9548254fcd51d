use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const POLL_INTERVAL_SECS_DEFAULT: u64 = 2;
const POLL_MAX_ATTEMPTS_DEFAULT: u32 = 12;
const REQUEST_TIMEOUT_SECS_DEFAULT: u64 = 30;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Bad environment: endpoint name")]
    EndpointName,
    #[error("Bad environment: esper api creds")]
    ApiKey,
    #[error("Bad environment: enterprise id")]
    EnterpriseId,
    #[error("Bad environment: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(POLL_INTERVAL_SECS_DEFAULT),
            max_attempts: POLL_MAX_ATTEMPTS_DEFAULT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
    pub enterprise_id: String,
    pub request_timeout: Duration,
    pub poll: PollSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str, err: ConfigError| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(err)
        };

        let endpoint_name = required("EP_NAME", ConfigError::EndpointName)?;
        let api_key = required("API_KEY", ConfigError::ApiKey)?;
        let enterprise_id = required("ENT_ID", ConfigError::EnterpriseId)?;

        let base_url = lookup("ESPER_API_URL")
            .unwrap_or_else(|| format!("https://{}-api.esper.cloud/api", endpoint_name));

        let interval = parse_or(&lookup, "POLL_INTERVAL_SECS", POLL_INTERVAL_SECS_DEFAULT)?;
        let max_attempts: u32 =
            parse_or(&lookup, "POLL_MAX_ATTEMPTS", POLL_MAX_ATTEMPTS_DEFAULT)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid("POLL_MAX_ATTEMPTS"));
        }
        let timeout = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS_DEFAULT)?;

        Ok(Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            enterprise_id,
            request_timeout: Duration::from_secs(timeout),
            poll: PollSettings {
                interval: Duration::from_secs(interval),
                max_attempts,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
