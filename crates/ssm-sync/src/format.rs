use chrono::{DateTime, Utc};
use ssm_core::{non_blank, Contact, ContactSet, IssuePayload, OpportunityRecord, ResourceRef, ResourceSet};

/// Linear's "medium" priority; every opportunity is filed at the same level.
pub const DEFAULT_PRIORITY: u8 = 3;

/// Renders enriched opportunities into tracker payloads. Pure: no I/O, no state.
#[derive(Debug, Clone)]
pub struct IssueFormatter {
    team_id: String,
    priority: u8,
}

impl IssueFormatter {
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn format(
        &self,
        record: &OpportunityRecord,
        contacts: &ContactSet,
        resources: &ResourceSet,
        title: String,
        detected_at: DateTime<Utc>,
    ) -> IssuePayload {
        IssuePayload {
            title,
            body: render_body(record, contacts, resources, detected_at),
            opportunity_id: record.uid().unwrap_or_default().to_string(),
            team_id: self.team_id.clone(),
            priority: self.priority,
        }
    }
}

/// Markdown section under construction; dropped entirely if no line made it in.
struct Section {
    heading: &'static str,
    lines: Vec<String>,
}

impl Section {
    fn new(heading: &'static str) -> Self {
        Self {
            heading,
            lines: Vec::new(),
        }
    }

    fn field(&mut self, label: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = non_blank(value) {
            self.lines.push(format!("- **{label}**: {value}"));
        }
        self
    }

    fn line(&mut self, line: String) -> &mut Self {
        self.lines.push(line);
        self
    }

    fn write_to(&self, out: &mut String) {
        if self.lines.is_empty() {
            return;
        }
        out.push_str(&format!("\n\n{}\n{}", self.heading, self.lines.join("\n")));
    }
}

fn contact_lines(contact: &Contact) -> Vec<String> {
    [
        ("Name", contact.name.as_deref()),
        ("Title", contact.title.as_deref()),
        ("Email", contact.email.as_deref()),
        ("Phone", contact.phone.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| non_blank(value).map(|v| format!("- **{label}**: {v}")))
    .collect()
}

fn resource_lines(resources: &[ResourceRef]) -> Vec<String> {
    resources
        .iter()
        .map(|r| match non_blank(r.description.as_deref()) {
            Some(description) => format!("- [{}]({})\n  - {description}", r.label, r.url),
            None => format!("- [{}]({})", r.label, r.url),
        })
        .collect()
}

fn render_body(
    record: &OpportunityRecord,
    contacts: &ContactSet,
    resources: &ResourceSet,
    detected_at: DateTime<Utc>,
) -> String {
    let mut body = String::from("# New SAM.gov Opportunity Found");

    let codes = record.category_codes().join(", ");
    let mut basic = Section::new("## 📋 Basic Information");
    basic
        .field("Title", record.title.as_deref())
        .field("Solicitation Number", record.solicitation_number.as_deref())
        .field("Notice Type", record.notice_type.as_deref())
        .field("NAICS Code", Some(codes.as_str()))
        .field("Set-Aside", record.set_aside.as_deref())
        .field("UID", record.uid());
    basic.write_to(&mut body);

    let mut dates = Section::new("## 📅 Important Dates");
    dates
        .field("Posted Date", record.posted_date.as_deref())
        .field("Response Deadline", record.response_deadline.as_deref());
    dates.write_to(&mut body);

    let office = record.office_location();
    let performance = record.performance_location();
    let mut org = Section::new("## 🏢 Organization & Location");
    org.field("Organization", record.organization())
        .field("Office Location", office.as_deref())
        .field("Performance Location", performance.as_deref());
    org.write_to(&mut body);

    let mut people = Section::new("## 👥 Contacts");
    for contact in contacts.iter() {
        let lines = contact_lines(contact);
        if !lines.is_empty() {
            people.line(format!("### {}\n{}", contact.role.heading(), lines.join("\n")));
        }
    }
    people.write_to(&mut body);

    let mut docs = Section::new("## 📎 Attachments & Links");
    if !resources.attachments.is_empty() {
        docs.line(format!(
            "### Documents & Attachments\n{}",
            resource_lines(&resources.attachments).join("\n")
        ));
    }
    if !resources.links.is_empty() {
        docs.line(format!(
            "### Additional Links\n{}",
            resource_lines(&resources.links).join("\n")
        ));
    }
    docs.write_to(&mut body);

    let mut sam = Section::new("## 🔗 SAM.gov Links");
    if let Some(link) = non_blank(record.ui_link.as_deref()) {
        sam.line(format!("- **Opportunity Page**: {link}"));
    }
    sam.write_to(&mut body);

    let mut steps = Section::new("## 📝 Next Steps");
    steps
        .line("- [ ] Review opportunity details".to_string())
        .line("- [ ] Assess capability match".to_string());
    match contacts.first_email() {
        Some(email) => steps.line(format!("- [ ] Contact primary POC for clarification ({email})")),
        None => steps.line("- [ ] Identify a point of contact from the SAM.gov listing".to_string()),
    };
    if !resources.attachments.is_empty() {
        steps.line("- [ ] Download and review attachments".to_string());
    }
    steps
        .line("- [ ] Determine bid/no-bid decision".to_string())
        .line("- [ ] Prepare response if pursuing".to_string());
    steps.write_to(&mut body);

    body.push_str(&format!(
        "\n\n**Detected by SAM.gov Monitor at {} UTC**",
        detected_at.format("%Y-%m-%d %H:%M:%S")
    ));
    body
}
