//! Contracts for the remote collaborators plus their HTTP implementations:
//! SAM.gov (opportunity source), Linear (issue tracker), OpenAI (text generation).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ssm_core::{IssuePayload, OpportunityRecord};
use ssm_storage::FetchError;
use thiserror::Error;

pub mod linear;
pub mod openai;
pub mod sam;

pub use linear::LinearTracker;
pub use openai::OpenAiTextGenerator;
pub use sam::SamGovSource;

/// Inclusive posting-date window for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Issue as acknowledged by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub identifier: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("unexpected search response: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("creating issue for {opportunity_id}: {source}")]
    Transport {
        opportunity_id: String,
        #[source]
        source: FetchError,
    },
    #[error("tracker rejected issue for {opportunity_id}: {messages}")]
    GraphQl {
        opportunity_id: String,
        messages: String,
    },
    #[error("tracker reported no issue created for {opportunity_id}")]
    NotCreated { opportunity_id: String },
}

impl TrackerError {
    pub fn opportunity_id(&self) -> &str {
        match self {
            Self::Transport { opportunity_id, .. }
            | Self::GraphQl { opportunity_id, .. }
            | Self::NotCreated { opportunity_id } => opportunity_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("completion response had no usable text")]
    EmptyResponse,
}

#[async_trait]
pub trait OpportunitySource: Send + Sync {
    /// One logical search per category code. Zero results is not an error.
    async fn search(
        &self,
        category_code: &str,
        notice_types: &[String],
        range: DateRange,
    ) -> Result<Vec<OpportunityRecord>, SourceError>;

    /// Full description text for a search hit. Sources that inline the text
    /// need not override this.
    async fn fetch_description(&self, record: &OpportunityRecord) -> Result<Option<String>, SourceError> {
        Ok(record.inline_description().map(ToString::to_string))
    }
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, payload: &IssuePayload) -> Result<CreatedIssue, TrackerError>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;

    fn provider_name(&self) -> &'static str;
}
