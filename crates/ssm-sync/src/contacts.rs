use serde_json::Value as JsonValue;
use ssm_core::{json_str, Contact, ContactRole, ContactSet, OpportunityRecord};

const TECHNICAL_KEYWORDS: &[&str] = &["technical", "engineer", "scientist"];

/// Role implied by a point-of-contact's `type`/`role` label, if any.
fn labeled_role(value: &JsonValue) -> Option<ContactRole> {
    let label = json_str(value, &["type"])
        .or_else(|| json_str(value, &["role"]))?
        .to_ascii_lowercase();
    if label.contains("primary") || label == "first" {
        Some(ContactRole::Primary)
    } else if label.contains("secondary") || label.contains("administrative") || label == "office" {
        Some(ContactRole::Office)
    } else {
        None
    }
}

fn contact_from(value: &JsonValue, role: ContactRole) -> Option<Contact> {
    let field = |key: &str| json_str(value, &[key]).map(ToString::to_string);
    let contact = Contact {
        role,
        name: field("fullName").or_else(|| field("name")),
        title: field("title"),
        email: field("email"),
        phone: field("phone"),
    };
    contact.has_details().then_some(contact)
}

fn is_technical(value: &JsonValue) -> bool {
    json_str(value, &["title"])
        .map(|title| {
            let title = title.to_ascii_lowercase();
            TECHNICAL_KEYWORDS.iter().any(|k| title.contains(k))
        })
        .unwrap_or(false)
}

/// Fills the primary, office and technical slots from the record's contact block.
///
/// Dedicated `primaryContact`/`officeContact` objects come first, then each
/// `pointOfContact` entry in order; the first usable entry wins a slot. The
/// technical slot takes the first remaining entry whose title names a technical
/// role. Anything else is dropped, and odd shapes are skipped rather than rejected.
pub fn extract_contacts(record: &OpportunityRecord) -> ContactSet {
    let mut candidates: Vec<(Option<ContactRole>, &JsonValue)> = Vec::new();
    if let Some(value) = record.primary_contact.as_ref().filter(|v| v.is_object()) {
        candidates.push((Some(ContactRole::Primary), value));
    }
    if let Some(value) = record.office_contact.as_ref().filter(|v| v.is_object()) {
        candidates.push((Some(ContactRole::Office), value));
    }
    match record.point_of_contact.as_ref() {
        Some(JsonValue::Array(items)) => candidates.extend(
            items
                .iter()
                .filter(|v| v.is_object())
                .map(|v| (labeled_role(v), v)),
        ),
        Some(value @ JsonValue::Object(_)) => candidates.push((labeled_role(value), value)),
        _ => {}
    }

    let mut set = ContactSet::default();
    let mut unassigned = Vec::new();
    for (role, value) in candidates {
        let (slot, role) = match role {
            Some(ContactRole::Primary) => (&mut set.primary, ContactRole::Primary),
            Some(ContactRole::Office) => (&mut set.office, ContactRole::Office),
            _ => {
                unassigned.push(value);
                continue;
            }
        };
        if slot.is_none() {
            if let Some(contact) = contact_from(value, role) {
                *slot = Some(contact);
                continue;
            }
        }
        unassigned.push(value);
    }

    set.technical = unassigned
        .into_iter()
        .filter(|v| is_technical(v))
        .find_map(|v| contact_from(v, ContactRole::Technical));
    set
}
