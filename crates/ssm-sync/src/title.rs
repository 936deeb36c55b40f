use ssm_adapters::TextGenerator;
use ssm_core::{non_blank, OpportunityRecord};
use tracing::info;

pub const MAX_TITLE_CHARS: usize = 80;

/// Why a record ended up with the deterministic title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    NotConfigured,
    Failed(String),
}

/// Result of one title request. Callers pick the branch; nothing is swallowed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    Generated(String),
    Fallback { title: String, reason: FallbackReason },
}

impl TitleOutcome {
    pub fn title(&self) -> &str {
        match self {
            Self::Generated(title) | Self::Fallback { title, .. } => title,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Produces issue titles, optionally through a text-generation service.
///
/// Without a client every title is the fallback.
pub struct TitleGenerator {
    client: Option<Box<dyn TextGenerator>>,
}

impl TitleGenerator {
    pub fn new(client: Box<dyn TextGenerator>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn outcome(&self, record: &OpportunityRecord, description: Option<&str>) -> TitleOutcome {
        let Some(client) = self.client.as_ref() else {
            return TitleOutcome::Fallback {
                title: fallback_title(record),
                reason: FallbackReason::NotConfigured,
            };
        };

        let generated = match client.complete(&build_prompt(record, description)).await {
            Ok(raw) => clean_generated(&raw),
            Err(err) => Err(err.to_string()),
        };
        match generated {
            Ok(title) => TitleOutcome::Generated(title),
            Err(reason) => TitleOutcome::Fallback {
                title: fallback_title(record),
                reason: FallbackReason::Failed(format!("{}: {reason}", client.provider_name())),
            },
        }
    }

    /// Title to publish. Generation problems are logged and replaced by the fallback.
    pub async fn generate(&self, record: &OpportunityRecord, description: Option<&str>) -> String {
        match self.outcome(record, description).await {
            TitleOutcome::Generated(title) => {
                info!(title = %title, "generated issue title");
                title
            }
            TitleOutcome::Fallback {
                title,
                reason: FallbackReason::Failed(reason),
            } => {
                info!(title = %title, reason = %reason, "title generation failed; using fallback title");
                title
            }
            TitleOutcome::Fallback {
                title,
                reason: FallbackReason::NotConfigured,
            } => title,
        }
    }
}

/// `description` is the fetched full text; URLs are never sent to the model.
pub fn build_prompt(record: &OpportunityRecord, description: Option<&str>) -> String {
    let field = |value: Option<&str>, missing: &'static str| non_blank(value).unwrap_or(missing).to_string();
    let mut prompt = String::from(
        "You are helping create actionable issue titles for a defense contracting company's project management system.\n\n\
         Based on this SAM.gov opportunity, create a concise, actionable issue title that would be useful for a project manager:\n\n",
    );
    prompt.push_str(&format!("Original Title: {}\n", record.title_or_default()));
    if let Some(description) = non_blank(description) {
        prompt.push_str(&format!("Description: {}\n", truncate_chars(description, 1500)));
    }
    prompt.push_str(&format!(
        "Notice Type: {}\nNAICS Code: {}\nOrganization: {}\nSet-Aside: {}\nResponse Deadline: {}\n\n",
        field(record.notice_type.as_deref(), "Unknown type"),
        field(record.naics_code.as_deref(), "Unknown NAICS"),
        field(record.organization(), "Unknown organization"),
        field(record.set_aside.as_deref(), "No set-aside info"),
        field(record.response_deadline.as_deref(), "No deadline"),
    ));
    prompt.push_str(
        "The issue title should be:\n\
         - Clear and actionable (starts with a verb when possible)\n\
         - Specific to the technical subject and the requesting organization\n\
         - Under 80 characters\n\
         - Professional but direct\n\n\
         Examples of good titles:\n\
         - \"Evaluate Army 9mm Ammo RFP - 150k rounds - Due June 15\"\n\
         - \"Review USMC Rifle Team Equipment Sources Sought\"\n\n\
         Generate ONLY the title, no explanations or quotes:",
    );
    prompt
}

/// Trims whitespace and wrapping quotes; caps the length at 80 characters.
pub fn clean_generated(raw: &str) -> Result<String, String> {
    let title = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim();
    if title.is_empty() {
        return Err("empty title".to_string());
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Ok(format!("{}...", truncate_chars(title, MAX_TITLE_CHARS - 3)));
    }
    Ok(title.to_string())
}

pub fn fallback_title(record: &OpportunityRecord) -> String {
    let title = record.title_or_default();
    if title.chars().count() > MAX_TITLE_CHARS {
        format!("SAM.gov: {}...", truncate_chars(title, MAX_TITLE_CHARS))
    } else {
        format!("SAM.gov: {title}")
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
