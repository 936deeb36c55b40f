use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_NAICS_CODES: &[&str] = &["332992"];
pub const DEFAULT_NOTICE_TYPES: &[&str] = &[
    "Sources Sought",
    "Request for Information",
    "RFI",
    "Sources Sought Synopsis",
];
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 90;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("{0} must name at least one value")]
    EmptySet(&'static str),
    #[error("reading criteria file {}", path.display())]
    CriteriaRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing criteria file {}", path.display())]
    CriteriaParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// What counts as an interesting opportunity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub category_codes: Vec<String>,
    pub notice_types: Vec<String>,
    pub lookback_days: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            category_codes: DEFAULT_NAICS_CODES.iter().map(|s| s.to_string()).collect(),
            notice_types: DEFAULT_NOTICE_TYPES.iter().map(|s| s.to_string()).collect(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Optional YAML file layered between the built-in defaults and the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriteriaFile {
    #[serde(default)]
    pub category_codes: Option<Vec<String>>,
    #[serde(default)]
    pub notice_types: Option<Vec<String>>,
    #[serde(default)]
    pub lookback_days: Option<u32>,
}

impl CriteriaFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::CriteriaRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::CriteriaParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sam_api_url: String,
    pub sam_api_key: String,
    pub linear_api_url: String,
    pub linear_api_key: String,
    pub linear_team_id: String,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub scan_interval: Duration,
    pub criteria: FilterCriteria,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let sam_api_key = require("API_KEY")?;
        let sam_api_url = require("API_URL")?;
        let linear_api_key = require("LINEAR_API_KEY")?;
        let linear_team_id = require("LINEAR_TEAM_ID")?;

        let mut criteria = FilterCriteria::default();
        if let Some(path) = get("SSM_CRITERIA_FILE") {
            let file = CriteriaFile::load(Path::new(&path))?;
            if let Some(codes) = file.category_codes {
                criteria.category_codes = codes;
            }
            if let Some(types) = file.notice_types {
                criteria.notice_types = types;
            }
            if let Some(days) = file.lookback_days {
                criteria.lookback_days = days;
            }
        }
        if let Some(codes) = get("SSM_NAICS_CODES") {
            criteria.category_codes = split_list(&codes);
        }
        if let Some(types) = get("SSM_NOTICE_TYPES") {
            criteria.notice_types = split_list(&types);
        }
        if let Some(days) = get("SSM_LOOKBACK_DAYS") {
            criteria.lookback_days = parse_number("SSM_LOOKBACK_DAYS", &days)?;
        }
        criteria.category_codes = clean_list(criteria.category_codes);
        criteria.notice_types = clean_list(criteria.notice_types);
        if criteria.category_codes.is_empty() {
            return Err(ConfigError::EmptySet("SSM_NAICS_CODES"));
        }
        if criteria.notice_types.is_empty() {
            return Err(ConfigError::EmptySet("SSM_NOTICE_TYPES"));
        }

        let interval_minutes = match get("SSM_INTERVAL_MINUTES") {
            Some(raw) => parse_number::<u64>("SSM_INTERVAL_MINUTES", &raw)?,
            None => DEFAULT_INTERVAL_MINUTES,
        };
        if interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                var: "SSM_INTERVAL_MINUTES",
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        let interval_secs = interval_minutes
            .checked_mul(60)
            .ok_or_else(|| ConfigError::Invalid {
                var: "SSM_INTERVAL_MINUTES",
                value: interval_minutes.to_string(),
                reason: "too large",
            })?;

        let http_timeout_secs = match get("SSM_HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_number("SSM_HTTP_TIMEOUT_SECS", &raw)?,
            None => 20,
        };

        Ok(Self {
            sam_api_url,
            sam_api_key,
            linear_api_url: get("LINEAR_API_URL")
                .unwrap_or_else(|| ssm_adapters::linear::DEFAULT_API_URL.to_string()),
            linear_api_key,
            linear_team_id,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL"),
            scan_interval: Duration::from_secs(interval_secs),
            criteria,
            http_timeout_secs,
            user_agent: get("SSM_USER_AGENT").unwrap_or_else(|| "ssm-bot/0.1".to_string()),
        })
    }

    pub fn title_generation_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(ToString::to_string).collect()
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: "expected a non-negative integer",
    })
}
