//! Core domain model for the Sources Sought Monitor.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Raw opportunity as returned by the SAM.gov search API.
///
/// Contact and resource blocks stay as raw JSON: their shapes vary between
/// notices and a malformed block must never prevent the rest of the record
/// from decoding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpportunityRecord {
    pub notice_id: Option<String>,
    pub solicitation_number: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub notice_type: Option<String>,
    pub naics_code: Option<String>,
    pub naics_codes: Option<Vec<String>>,
    pub posted_date: Option<String>,
    #[serde(rename = "responseDeadLine")]
    pub response_deadline: Option<String>,
    pub full_parent_path_name: Option<String>,
    #[serde(rename = "typeOfSetAsideDescription")]
    pub set_aside: Option<String>,
    pub ui_link: Option<String>,
    pub office_address: Option<JsonValue>,
    pub place_of_performance: Option<JsonValue>,
    pub point_of_contact: Option<JsonValue>,
    pub primary_contact: Option<JsonValue>,
    pub office_contact: Option<JsonValue>,
    pub attachments: Option<JsonValue>,
    pub resource_links: Option<JsonValue>,
    pub additional_info_link: Option<JsonValue>,
    pub links: Option<JsonValue>,
}

impl OpportunityRecord {
    /// Stable identifier: `noticeId`, falling back to `solicitationNumber`.
    pub fn uid(&self) -> Option<&str> {
        non_blank(self.notice_id.as_deref()).or_else(|| non_blank(self.solicitation_number.as_deref()))
    }

    pub fn title_or_default(&self) -> &str {
        non_blank(self.title.as_deref()).unwrap_or("No title")
    }

    /// All category codes carried by the record, primary code first, without repeats.
    pub fn category_codes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let extra = self.naics_codes.iter().flatten().map(String::as_str);
        for code in self.naics_code.as_deref().into_iter().chain(extra) {
            let code = code.trim();
            if !code.is_empty() && !out.contains(&code) {
                out.push(code);
            }
        }
        out
    }

    pub fn organization(&self) -> Option<&str> {
        non_blank(self.full_parent_path_name.as_deref())
    }

    /// Description text when the source inlined it. SAM.gov search results usually
    /// carry a URL to a separate description endpoint instead.
    pub fn inline_description(&self) -> Option<&str> {
        non_blank(self.description.as_deref()).filter(|d| !looks_like_url(d))
    }

    /// Endpoint holding the full description, when the source linked it.
    pub fn description_url(&self) -> Option<&str> {
        non_blank(self.description.as_deref()).filter(|d| looks_like_url(d))
    }

    pub fn office_location(&self) -> Option<String> {
        let address = self.office_address.as_ref()?;
        join_location(json_str(address, &["city"]), json_str(address, &["state"]))
    }

    pub fn performance_location(&self) -> Option<String> {
        let place = self.place_of_performance.as_ref()?;
        let city = json_str(place, &["city", "name"]).or_else(|| json_str(place, &["city"]));
        let state = json_str(place, &["state", "name"]).or_else(|| json_str(place, &["state"]));
        join_location(city, state)
    }
}

fn join_location(city: Option<&str>, state: Option<&str>) -> Option<String> {
    match (city, state) {
        (Some(city), Some(state)) => Some(format!("{city}, {state}")),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

fn looks_like_url(text: &str) -> bool {
    let lower = text.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Trimmed, non-empty view of an optional string.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Walks `path` through nested objects and returns a non-blank string leaf.
pub fn json_str<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a str> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(*segment)?;
    }
    non_blank(cur.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    Primary,
    Office,
    Technical,
}

impl ContactRole {
    pub fn heading(self) -> &'static str {
        match self {
            Self::Primary => "Primary Contact",
            Self::Office => "Office Contact",
            Self::Technical => "Technical Contact",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub role: ContactRole,
    pub name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    pub fn has_details(&self) -> bool {
        self.name.is_some() || self.title.is_some() || self.email.is_some() || self.phone.is_some()
    }
}

/// The three contact slots an issue can show. Empty slots mean the record had
/// nothing for that role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactSet {
    pub primary: Option<Contact>,
    pub office: Option<Contact>,
    pub technical: Option<Contact>,
}

impl ContactSet {
    /// Populated contacts in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        [&self.primary, &self.office, &self.technical]
            .into_iter()
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// First email in display order, the one a follow-up should go to.
    pub fn first_email(&self) -> Option<&str> {
        self.iter().find_map(|c| c.email.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Attachment,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub label: String,
    pub url: String,
    pub description: Option<String>,
}

/// Attachments and supplementary links, each in the order the posting lists them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    pub attachments: Vec<ResourceRef>,
    pub links: Vec<ResourceRef>,
}

impl ResourceSet {
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty() && self.links.is_empty()
    }
}

/// Issue handed to the tracker for one opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePayload {
    pub title: String,
    pub body: String,
    pub opportunity_id: String,
    pub team_id: String,
    pub priority: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_sam_record_and_tolerates_nulls() {
        let record: OpportunityRecord = serde_json::from_value(json!({
            "noticeId": "abc123",
            "title": "Ammunition Market Research",
            "type": "Sources Sought",
            "naicsCode": "332992",
            "naicsCodes": ["332992", "332993"],
            "postedDate": "2026-10-01",
            "responseDeadLine": null,
            "typeOfSetAsideDescription": null,
            "pointOfContact": [{"fullName": "Jane Doe"}],
            "someUnknownField": {"nested": true}
        }))
        .expect("decode");

        assert_eq!(record.uid(), Some("abc123"));
        assert_eq!(record.notice_type.as_deref(), Some("Sources Sought"));
        assert_eq!(record.category_codes(), vec!["332992", "332993"]);
        assert!(record.response_deadline.is_none());
        assert!(record.point_of_contact.is_some());
    }

    #[test]
    fn uid_falls_back_to_solicitation_number() {
        let record = OpportunityRecord {
            notice_id: Some("  ".into()),
            solicitation_number: Some("W91CRB-25-R-0001".into()),
            ..Default::default()
        };
        assert_eq!(record.uid(), Some("W91CRB-25-R-0001"));
        assert_eq!(OpportunityRecord::default().uid(), None);
    }

    #[test]
    fn locations_render_from_nested_objects() {
        let record = OpportunityRecord {
            office_address: Some(json!({"city": "Tampa", "state": "FL"})),
            place_of_performance: Some(json!({
                "city": {"code": "00000", "name": "Multiple Locations"},
                "state": {"code": "XX", "name": "CONUS"}
            })),
            ..Default::default()
        };
        assert_eq!(record.office_location().as_deref(), Some("Tampa, FL"));
        assert_eq!(
            record.performance_location().as_deref(),
            Some("Multiple Locations, CONUS")
        );
    }

    #[test]
    fn description_urls_are_not_inline_text() {
        let mut record = OpportunityRecord {
            description: Some("https://api.sam.gov/prod/opportunities/v1/noticedesc?noticeid=1".into()),
            ..Default::default()
        };
        assert_eq!(record.inline_description(), None);
        assert_eq!(
            record.description_url(),
            Some("https://api.sam.gov/prod/opportunities/v1/noticedesc?noticeid=1")
        );
        record.description = Some("Seeking 5.56mm production capacity.".into());
        assert_eq!(
            record.inline_description(),
            Some("Seeking 5.56mm production capacity.")
        );
        assert_eq!(record.description_url(), None);
    }

    #[test]
    fn contact_set_reports_first_email_in_display_order() {
        let set = ContactSet {
            primary: Some(Contact {
                role: ContactRole::Primary,
                name: Some("Jane Doe".into()),
                title: None,
                email: None,
                phone: None,
            }),
            office: Some(Contact {
                role: ContactRole::Office,
                name: None,
                title: None,
                email: Some("office@x.mil".into()),
                phone: None,
            }),
            technical: None,
        };
        assert_eq!(set.first_email(), Some("office@x.mil"));
        assert_eq!(set.iter().count(), 2);
        assert!(ContactSet::default().is_empty());
    }
}
