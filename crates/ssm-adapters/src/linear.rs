use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use ssm_core::IssuePayload;
use ssm_storage::HttpFetcher;

use crate::{CreatedIssue, IssueTracker, TrackerError};

pub const DEFAULT_API_URL: &str = "https://api.linear.app/graphql";

const ISSUE_CREATE_MUTATION: &str = "mutation($input: IssueCreateInput!) {
  issueCreate(input: $input) {
    success
    issue { id identifier title url }
  }
}";

/// OAuth tokens go out as bearer credentials; personal API keys are sent bare.
pub fn authorization_header(api_key: &str) -> String {
    if api_key.starts_with("lin_oauth_") {
        format!("Bearer {api_key}")
    } else {
        api_key.to_string()
    }
}

pub fn issue_create_request(payload: &IssuePayload) -> JsonValue {
    json!({
        "query": ISSUE_CREATE_MUTATION,
        "variables": {
            "input": {
                "teamId": payload.team_id,
                "title": payload.title,
                "description": payload.body,
                "priority": payload.priority,
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<IssueCreateData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IssueCreateData {
    #[serde(rename = "issueCreate")]
    issue_create: Option<IssueCreateResult>,
}

#[derive(Debug, Deserialize)]
struct IssueCreateResult {
    success: bool,
    issue: Option<CreatedIssue>,
}

fn parse_issue_create(opportunity_id: &str, body: JsonValue) -> Result<CreatedIssue, TrackerError> {
    let response: GraphQlResponse =
        serde_json::from_value(body).map_err(|e| TrackerError::GraphQl {
            opportunity_id: opportunity_id.to_string(),
            messages: format!("malformed response: {e}"),
        })?;

    if !response.errors.is_empty() {
        let messages = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(TrackerError::GraphQl {
            opportunity_id: opportunity_id.to_string(),
            messages,
        });
    }

    match response.data.and_then(|d| d.issue_create) {
        Some(IssueCreateResult {
            success: true,
            issue: Some(issue),
        }) => Ok(issue),
        _ => Err(TrackerError::NotCreated {
            opportunity_id: opportunity_id.to_string(),
        }),
    }
}

pub struct LinearTracker {
    http: HttpFetcher,
    api_url: String,
    authorization: String,
}

impl LinearTracker {
    pub fn new(http: HttpFetcher, api_url: impl Into<String>, api_key: &str) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            authorization: authorization_header(api_key),
        }
    }
}

#[async_trait]
impl IssueTracker for LinearTracker {
    async fn create_issue(&self, payload: &IssuePayload) -> Result<CreatedIssue, TrackerError> {
        let request = issue_create_request(payload);
        let body: JsonValue = self
            .http
            .post_json("linear", &self.api_url, Some(&self.authorization), &request)
            .await
            .map_err(|source| TrackerError::Transport {
                opportunity_id: payload.opportunity_id.clone(),
                source,
            })?;
        parse_issue_create(&payload.opportunity_id, body)
    }
}
