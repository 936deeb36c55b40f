use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use ssm_adapters::{sam::decode_records, OpenAiTextGenerator};
use ssm_core::OpportunityRecord;
use ssm_storage::{HttpClientConfig, HttpFetcher};
use ssm_sync::{build_issue, build_monitor, IssueFormatter, MonitorConfig, TitleGenerator};
use tracing::info;

mod telemetry;

#[derive(Debug, Parser)]
#[command(name = "ssm")]
#[command(about = "Sources Sought Monitor: files new SAM.gov opportunities as Linear issues")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan on the configured interval until Ctrl-C.
    Run,
    /// Run a single scan and exit.
    ScanOnce,
    /// Render the issue for a saved record or search response without publishing it.
    Preview {
        path: PathBuf,
        /// Print the payload as JSON instead of markdown.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = std::env::var("SSM_LOG_LEVEL").unwrap_or_else(|_| telemetry::DEFAULT_LOG_LEVEL.to_string());
    telemetry::init(&log_level)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = MonitorConfig::from_env().context("loading configuration")?;
            log_banner(&config);
            let mut monitor = build_monitor(&config)?;
            monitor.run(shutdown_signal()).await;
        }
        Commands::ScanOnce => {
            let config = MonitorConfig::from_env().context("loading configuration")?;
            log_banner(&config);
            let mut monitor = build_monitor(&config)?;
            let summary = monitor.run_cycle(chrono::Utc::now()).await;
            println!(
                "scan complete: run_id={} fetched={} matched={} new={} published={} failed={} failed_fetches={}",
                summary.run_id,
                summary.fetched,
                summary.matched,
                summary.new,
                summary.published,
                summary.failed,
                summary.failed_fetches
            );
        }
        Commands::Preview { path, json } => preview(&path, json).await?,
    }

    Ok(())
}

fn log_banner(config: &MonitorConfig) {
    info!(
        naics = %config.criteria.category_codes.join(","),
        notice_types = %config.criteria.notice_types.join(","),
        interval_mins = config.scan_interval.as_secs() / 60,
        lookback_days = config.criteria.lookback_days,
        titles = if config.title_generation_enabled() { "openai" } else { "fallback" },
        "starting SAM.gov sources-sought monitor"
    );
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "listening for ctrl-c failed; running until killed");
        std::future::pending::<()>().await;
    }
}

/// Accepts a single record object, an array of records, or a search response.
fn load_records(path: &Path) -> Result<Vec<OpportunityRecord>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: JsonValue =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let records = match value {
        JsonValue::Array(items) => decode_records(items),
        JsonValue::Object(mut map) if map.contains_key("opportunitiesData") => {
            match map.remove("opportunitiesData") {
                Some(JsonValue::Array(items)) => decode_records(items),
                _ => Vec::new(),
            }
        }
        other => vec![serde_json::from_value(other)
            .with_context(|| format!("decoding record in {}", path.display()))?],
    };
    Ok(records)
}

async fn preview(path: &Path, json: bool) -> Result<()> {
    let records = load_records(path)?;
    let titles = match std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            let http = HttpFetcher::new(HttpClientConfig::default())?;
            let model = std::env::var("OPENAI_MODEL").ok();
            TitleGenerator::new(Box::new(OpenAiTextGenerator::new(http, key.trim(), model.as_deref())))
        }
        None => TitleGenerator::disabled(),
    };
    let team_id = std::env::var("LINEAR_TEAM_ID").unwrap_or_else(|_| "preview".to_string());
    let formatter = IssueFormatter::new(team_id);

    for record in &records {
        // Preview never calls SAM.gov, so only inline description text is used.
        let payload = build_issue(
            record,
            record.inline_description(),
            &titles,
            &formatter,
            chrono::Utc::now(),
        )
        .await;
        if json {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            println!("Title: {}\n\n{}\n", payload.title, payload.body);
        }
    }
    info!(count = records.len(), "preview rendered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../fixtures/sam")
            .join(name)
    }

    #[test]
    fn preview_loads_single_records_and_search_responses() {
        let single = load_records(&fixture("sample_opportunity.json")).expect("single");
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].uid(), Some("W91CRB25R0001-SS"));

        let search = load_records(&fixture("search_response.json")).expect("search");
        assert_eq!(search.len(), 2);
    }

    #[test]
    fn cli_defaults_to_run() {
        let cli = Cli::try_parse_from(["ssm"]).expect("parse");
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["ssm", "preview", "x.json", "--json"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::Preview { json: true, .. })));
    }
}
