use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use ssm_core::{json_str, OpportunityRecord};
use ssm_storage::HttpFetcher;
use tracing::{debug, warn};

use crate::{DateRange, OpportunitySource, SourceError};

const SEARCH_LIMIT: u32 = 1000;
const SAM_DATE_FORMAT: &str = "%m/%d/%Y";

/// SAM.gov `ptype` procurement-type code for a notice type name.
pub fn notice_type_code(notice_type: &str) -> Option<&'static str> {
    let code = match notice_type.trim().to_ascii_lowercase().as_str() {
        "sources sought" => "r",
        "presolicitation" => "p",
        "solicitation" => "o",
        "combined synopsis/solicitation" => "k",
        "special notice" => "s",
        "award notice" => "a",
        "justification" => "u",
        "sale of surplus property" => "g",
        "intent to bundle requirements (dod-funded)" => "i",
        _ => return None,
    };
    Some(code)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "totalRecords")]
    total_records: Option<u64>,
    #[serde(rename = "opportunitiesData")]
    opportunities_data: Option<Vec<JsonValue>>,
}

pub struct SamGovSource {
    http: HttpFetcher,
    api_url: String,
    api_key: String,
}

impl SamGovSource {
    pub fn new(http: HttpFetcher, api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    fn search_query(
        &self,
        category_code: &str,
        notice_types: &[String],
        range: DateRange,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("api_key", self.api_key.clone()),
            ("postedFrom", range.from.format(SAM_DATE_FORMAT).to_string()),
            ("postedTo", range.to.format(SAM_DATE_FORMAT).to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
            ("naics", category_code.to_string()),
        ];

        let mut codes: Vec<&str> = Vec::new();
        for code in notice_types.iter().filter_map(|t| notice_type_code(t)) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        if !codes.is_empty() {
            query.push(("ptype", codes.join(",")));
        }
        query
    }
}

/// Decodes each search hit on its own so one odd record cannot sink the batch.
pub fn decode_records(values: Vec<JsonValue>) -> Vec<OpportunityRecord> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(index, error = %err, "skipping undecodable opportunity record");
                None
            }
        })
        .collect()
}

fn description_from_response(body: &JsonValue) -> Option<String> {
    json_str(body, &["description"]).map(ToString::to_string)
}

fn records_from_response(body: JsonValue) -> Result<Vec<OpportunityRecord>, SourceError> {
    let response: SearchResponse =
        serde_json::from_value(body).map_err(|e| SourceError::Payload(e.to_string()))?;
    let values = response.opportunities_data.unwrap_or_default();
    debug!(
        total_records = response.total_records.unwrap_or(values.len() as u64),
        returned = values.len(),
        "search response received"
    );
    Ok(decode_records(values))
}

#[async_trait]
impl OpportunitySource for SamGovSource {
    async fn search(
        &self,
        category_code: &str,
        notice_types: &[String],
        range: DateRange,
    ) -> Result<Vec<OpportunityRecord>, SourceError> {
        let query = self.search_query(category_code, notice_types, range);
        let body: JsonValue = self.http.get_json("sam.gov", &self.api_url, &query).await?;
        records_from_response(body)
    }

    /// Inline text is returned as is; a description URL costs one more request.
    async fn fetch_description(&self, record: &OpportunityRecord) -> Result<Option<String>, SourceError> {
        if let Some(text) = record.inline_description() {
            return Ok(Some(text.to_string()));
        }
        let Some(url) = record.description_url() else {
            return Ok(None);
        };
        let body: JsonValue = self
            .http
            .get_json("sam.gov", url, &[("api_key", self.api_key.clone())])
            .await?;
        Ok(description_from_response(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use ssm_storage::{BackoffPolicy, HttpClientConfig};
    use std::time::Duration;

    fn source() -> SamGovSource {
        let http = HttpFetcher::new(HttpClientConfig::default()).expect("client");
        SamGovSource::new(http, "https://api.sam.gov/opportunities/v2/search", "key-123")
    }

    fn range() -> DateRange {
        DateRange {
            from: NaiveDate::from_ymd_opt(2026, 7, 20).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        }
    }

    fn param<'a>(query: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn query_uses_sam_date_format_and_naics() {
        let query = source().search_query("332992", &["Sources Sought".to_string()], range());
        assert_eq!(param(&query, "postedFrom"), Some("07/20/2026"));
        assert_eq!(param(&query, "postedTo"), Some("10/18/2026"));
        assert_eq!(param(&query, "naics"), Some("332992"));
        assert_eq!(param(&query, "limit"), Some("1000"));
        assert_eq!(param(&query, "ptype"), Some("r"));
    }

    #[test]
    fn ptype_skips_unmapped_types_and_repeats() {
        let types = vec![
            "Sources Sought".to_string(),
            "RFI".to_string(),
            "sources sought".to_string(),
            "Special Notice".to_string(),
        ];
        let query = source().search_query("332992", &types, range());
        assert_eq!(param(&query, "ptype"), Some("r,s"));

        let query = source().search_query("332992", &["RFI".to_string()], range());
        assert_eq!(param(&query, "ptype"), None);
    }

    #[test]
    fn bad_records_are_skipped_not_fatal() {
        let body = json!({
            "totalRecords": 3,
            "opportunitiesData": [
                {"noticeId": "a", "title": "First"},
                {"noticeId": 42, "title": "Wrong id type"},
                {"noticeId": "c", "title": "Third"}
            ]
        });
        let records = records_from_response(body).expect("records");
        let ids: Vec<_> = records.iter().filter_map(|r| r.uid()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn missing_data_array_is_empty_result() {
        let records = records_from_response(json!({"totalRecords": 0})).expect("records");
        assert!(records.is_empty());
        let records =
            records_from_response(json!({"opportunitiesData": null})).expect("records");
        assert!(records.is_empty());
    }

    #[test]
    fn description_endpoint_body_yields_text() {
        let body = json!({"description": "  Seeking 5.56mm production capacity.  "});
        assert_eq!(
            description_from_response(&body).as_deref(),
            Some("Seeking 5.56mm production capacity.")
        );
        assert_eq!(description_from_response(&json!({"description": "  "})), None);
        assert_eq!(description_from_response(&json!({})), None);
    }

    #[tokio::test]
    async fn inline_or_missing_descriptions_need_no_request() {
        let source = source();
        let mut record = OpportunityRecord {
            description: Some("Market research for 5.56mm ball.".into()),
            ..Default::default()
        };
        let text = source.fetch_description(&record).await.expect("inline");
        assert_eq!(text.as_deref(), Some("Market research for 5.56mm ball."));

        record.description = None;
        assert_eq!(source.fetch_description(&record).await.expect("missing"), None);
    }

    #[tokio::test]
    async fn unreachable_description_endpoint_is_fetch_error() {
        let http = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(2),
            user_agent: Some("ssm-test".into()),
            backoff: BackoffPolicy {
                max_retries: 0,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            },
        })
        .expect("client");
        let source = SamGovSource::new(http, "http://127.0.0.1:9/search", "key-123");
        let record = OpportunityRecord {
            description: Some("http://127.0.0.1:9/noticedesc?noticeid=1".into()),
            ..Default::default()
        };
        let err = source.fetch_description(&record).await.expect_err("closed port");
        assert!(matches!(err, SourceError::Fetch(_)));
    }

    #[test]
    fn non_object_response_is_payload_error() {
        let err = records_from_response(json!("maintenance window")).unwrap_err();
        assert!(matches!(err, SourceError::Payload(_)));
    }
}
