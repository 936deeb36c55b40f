//! Monitoring pipeline: configuration, matching, enrichment and the scan loop.

use std::time::Duration;

use anyhow::{Context, Result};
use ssm_adapters::{LinearTracker, OpenAiTextGenerator, SamGovSource};
use ssm_storage::{HttpClientConfig, HttpFetcher};

pub mod config;
pub mod contacts;
pub mod filter;
pub mod format;
pub mod monitor;
pub mod resources;
pub mod title;

pub use config::{ConfigError, FilterCriteria, MonitorConfig};
pub use contacts::extract_contacts;
pub use filter::{FilterVerdict, OpportunityFilter};
pub use format::IssueFormatter;
pub use monitor::{build_issue, CycleSummary, Monitor};
pub use resources::extract_resources;
pub use title::{FallbackReason, TitleGenerator, TitleOutcome};

fn http_fetcher(config: &MonitorConfig) -> Result<HttpFetcher> {
    HttpFetcher::new(HttpClientConfig {
        timeout: Duration::from_secs(config.http_timeout_secs),
        user_agent: Some(config.user_agent.clone()),
        ..Default::default()
    })
    .context("building HTTP client")
}

/// Title generator backed by OpenAI when a key is configured, fallback-only otherwise.
pub fn title_generator_from_config(config: &MonitorConfig) -> Result<TitleGenerator> {
    let Some(api_key) = config.openai_api_key.as_deref() else {
        return Ok(TitleGenerator::disabled());
    };
    let client = OpenAiTextGenerator::new(http_fetcher(config)?, api_key, config.openai_model.as_deref());
    Ok(TitleGenerator::new(Box::new(client)))
}

/// Wires the live SAM.gov source, Linear tracker and title generator into a monitor.
pub fn build_monitor(config: &MonitorConfig) -> Result<Monitor> {
    let http = http_fetcher(config)?;
    let source = SamGovSource::new(http.clone(), config.sam_api_url.clone(), config.sam_api_key.clone());
    let tracker = LinearTracker::new(http, config.linear_api_url.clone(), &config.linear_api_key);
    let monitor = Monitor::new(
        config.criteria.clone(),
        config.scan_interval,
        Box::new(source),
        Box::new(tracker),
        IssueFormatter::new(config.linear_team_id.clone()),
    )
    .with_titles(title_generator_from_config(config)?);
    Ok(monitor)
}
