use std::time::Duration;

use thiserror::Error;

use crate::api::predictor::PredictorClient;

const DEFAULT_CHART_WIDTH: u32 = 1024;
const DEFAULT_CHART_HEIGHT: u32 = 768;
const DEFAULT_PREDICT_TIMEOUT_SECS: u32 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set in environment or .env file")]
    Missing(&'static str),
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub predict_api_url: String,
    /// Upper bound on one prediction request, connect included
    pub predict_timeout: Duration,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Config {
    /// Read settings from the process environment (call `dotenv` first)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let predict_api_url = lookup("PREDICT_API_URL")
            .unwrap_or_else(|| PredictorClient::DEFAULT_BASE_URL.to_string());
        if let Err(e) = reqwest::Url::parse(&predict_api_url) {
            return Err(ConfigError::Invalid {
                key: "PREDICT_API_URL",
                value: predict_api_url,
                reason: e.to_string(),
            });
        }

        let timeout_secs =
            parse_positive(&lookup, "PREDICT_TIMEOUT_SECS", DEFAULT_PREDICT_TIMEOUT_SECS)?;
        let chart_width = parse_positive(&lookup, "CHART_WIDTH", DEFAULT_CHART_WIDTH)?;
        let chart_height = parse_positive(&lookup, "CHART_HEIGHT", DEFAULT_CHART_HEIGHT)?;

        Ok(Self {
            discord_token,
            predict_api_url,
            predict_timeout: Duration::from_secs(u64::from(timeout_secs)),
            chart_width,
            chart_height,
        })
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u32,
) -> Result<u32, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
