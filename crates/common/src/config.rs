use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_TRENDS_URL: &str = "https://trends24.in/united-states/";
pub const DEFAULT_LINKS_FILE: &str = "links.txt";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_POST_CHARS: usize = 280;

const REQUIRED_KEYS: [&str; 6] = [
    "GEMINI_API_KEY",
    "X_API_KEY",
    "X_API_SECRET",
    "X_ACCESS_TOKEN",
    "X_ACCESS_TOKEN_SECRET",
    "X_BEARER_TOKEN",
];

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SocialCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub bearer_token: String,
}

/// What to do when a composed post is over the platform limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    Truncate,
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(OverflowPolicy::Truncate),
            "reject" => Ok(OverflowPolicy::Reject),
            other => anyhow::bail!("expected 'truncate' or 'reject', got '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostLimits {
    pub max_chars: usize,
    pub overflow: OverflowPolicy,
}

impl Default for PostLimits {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_POST_CHARS,
            overflow: OverflowPolicy::Truncate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationConfig,
    pub social: SocialCredentials,
    pub trends_url: String,
    pub links_file: PathBuf,
    pub http_timeout: Duration,
    pub limits: PostLimits,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Every required key is checked
    /// before failing so the error names all of the missing ones.
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|&key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Configuration(anyhow::anyhow!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let require = |key: &str| get(key).unwrap_or_default();

        let http_timeout_secs: u64 = parse_or(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if http_timeout_secs == 0 {
            return Err(anyhow::anyhow!("HTTP_TIMEOUT_SECS must be greater than zero").into());
        }

        let max_chars: usize = parse_or(&get, "MAX_POST_CHARS", DEFAULT_MAX_POST_CHARS)?;
        let overflow = parse_or(&get, "POST_OVERFLOW", OverflowPolicy::Truncate)?;
        let dry_run = parse_or(&get, "DRY_RUN", false)?;

        Ok(Config {
            generation: GenerationConfig {
                api_key: require("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            },
            social: SocialCredentials {
                api_key: require("X_API_KEY"),
                api_secret: require("X_API_SECRET"),
                access_token: require("X_ACCESS_TOKEN"),
                access_token_secret: require("X_ACCESS_TOKEN_SECRET"),
                bearer_token: require("X_BEARER_TOKEN"),
            },
            trends_url: get("TRENDS_URL").unwrap_or_else(|| DEFAULT_TRENDS_URL.to_string()),
            links_file: get("LINKS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LINKS_FILE)),
            http_timeout: Duration::from_secs(http_timeout_secs),
            limits: PostLimits { max_chars, overflow },
            dry_run,
        })
    }
}

/// Reads `LOG_LEVEL` (default `info`). Separate from [`Config`] because the
/// subscriber has to exist before the rest of the config is loaded.
pub fn log_level_from_env() -> PipelineResult<Level> {
    log_level_from_lookup(|key| env::var(key).ok())
}

pub fn log_level_from_lookup<F>(lookup: F) -> PipelineResult<Level>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    parse_or(&get, "LOG_LEVEL", Level::INFO).map_err(PipelineError::Configuration)
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
