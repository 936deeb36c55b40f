use serde_json::Value as JsonValue;
use ssm_core::{json_str, non_blank, OpportunityRecord, ResourceKind, ResourceRef, ResourceSet};

fn first_str<'a>(value: &'a JsonValue, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| json_str(value, &[key]))
}

fn entries(block: Option<&JsonValue>) -> &[JsonValue] {
    match block {
        Some(JsonValue::Array(items)) => items,
        _ => &[],
    }
}

fn attachment(entry: &JsonValue, position: usize) -> Option<ResourceRef> {
    let fallback_label = || format!("Attachment {position}");
    match entry {
        JsonValue::String(url) => Some(ResourceRef {
            kind: ResourceKind::Attachment,
            label: fallback_label(),
            url: non_blank(Some(url))?.to_string(),
            description: None,
        }),
        JsonValue::Object(_) => Some(ResourceRef {
            kind: ResourceKind::Attachment,
            url: first_str(entry, &["url", "link", "href"])?.to_string(),
            label: first_str(entry, &["name", "filename", "title"])
                .map(ToString::to_string)
                .unwrap_or_else(fallback_label),
            description: json_str(entry, &["description"]).map(ToString::to_string),
        }),
        _ => None,
    }
}

fn link(entry: &JsonValue) -> Option<ResourceRef> {
    match entry {
        JsonValue::String(url) => {
            let url = non_blank(Some(url))?;
            Some(ResourceRef {
                kind: ResourceKind::Link,
                label: url.to_string(),
                url: url.to_string(),
                description: None,
            })
        }
        JsonValue::Object(_) => {
            // The search API lists a `self` link back to its own endpoint.
            if json_str(entry, &["rel"]).is_some_and(|rel| rel.eq_ignore_ascii_case("self")) {
                return None;
            }
            let url = first_str(entry, &["url", "href"])?;
            Some(ResourceRef {
                kind: ResourceKind::Link,
                label: first_str(entry, &["name", "title", "rel"])
                    .unwrap_or(url)
                    .to_string(),
                url: url.to_string(),
                description: json_str(entry, &["description"]).map(ToString::to_string),
            })
        }
        _ => None,
    }
}

/// Splits the record's documents into formal attachments and supplementary links.
///
/// Attachments come from `attachments` then `resourceLinks`; links from
/// `additionalInfoLink` then `links`. Order within each list follows the source.
/// Entries without a URL are dropped.
pub fn extract_resources(record: &OpportunityRecord) -> ResourceSet {
    let mut set = ResourceSet::default();

    let attachment_entries = entries(record.attachments.as_ref())
        .iter()
        .chain(entries(record.resource_links.as_ref()));
    for entry in attachment_entries {
        if let Some(resource) = attachment(entry, set.attachments.len() + 1) {
            set.attachments.push(resource);
        }
    }

    if let Some(url) = record
        .additional_info_link
        .as_ref()
        .and_then(|v| non_blank(v.as_str()))
    {
        set.links.push(ResourceRef {
            kind: ResourceKind::Link,
            label: "Additional Information".to_string(),
            url: url.to_string(),
            description: None,
        });
    }
    set.links
        .extend(entries(record.links.as_ref()).iter().filter_map(link));

    set
}
