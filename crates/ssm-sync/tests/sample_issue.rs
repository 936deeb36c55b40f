use std::path::Path;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use ssm_core::{ContactRole, OpportunityRecord};
use ssm_sync::{build_issue, extract_contacts, extract_resources, IssueFormatter, TitleGenerator};

fn sample() -> Result<OpportunityRecord> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/sam/sample_opportunity.json");
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[test]
fn sample_listing_yields_three_contacts_and_ordered_resources() -> Result<()> {
    let record = sample()?;

    let contacts = extract_contacts(&record);
    let roles: Vec<_> = contacts.iter().map(|c| c.role).collect();
    assert_eq!(
        roles,
        vec![ContactRole::Primary, ContactRole::Office, ContactRole::Technical]
    );
    assert_eq!(contacts.first_email(), Some("sarah.johnson@socom.mil"));

    let resources = extract_resources(&record);
    let attachments: Vec<_> = resources.attachments.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        attachments,
        vec!["Statement of Work (SOW)", "Industry Day Presentation"]
    );
    let links: Vec<_> = resources.links.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "Additional Information",
            "SOCOM Vendor Information",
            "Security Clearance Requirements"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn sample_listing_renders_complete_issue() -> Result<()> {
    let record = sample()?;
    let detected_at = Utc
        .with_ymd_and_hms(2026, 10, 18, 12, 0, 0)
        .single()
        .context("timestamp")?;

    let payload = build_issue(
        &record,
        None,
        &TitleGenerator::disabled(),
        &IssueFormatter::new("team-1"),
        detected_at,
    )
    .await;

    assert_eq!(payload.opportunity_id, "W91CRB25R0001-SS");
    assert!(payload.title.starts_with("SAM.gov: Market Research - 5.56mm NATO"));
    assert!(payload.title.ends_with("..."));

    let body = &payload.body;
    for expected in [
        "- **Solicitation Number**: W91CRB-25-R-0001",
        "- **Set-Aside**: Small Business Set-Aside",
        "- **Response Deadline**: 2026-10-20T17:00:00-04:00",
        "- **Office Location**: Tampa, FL",
        "- **Performance Location**: Multiple Locations, CONUS",
        "### Technical Contact\n- **Name**: Dr. Lisa Rodriguez",
        "- [Statement of Work (SOW)](https://sam.gov/documents/sow-5.56mm-nato.pdf)\n  - Detailed requirements for ammunition specifications",
        "- [Additional Information](https://sam.gov/additional-info/W91CRB25R0001)",
        "- **Opportunity Page**: https://sam.gov/opp/W91CRB25R0001-SS/view",
        "- [ ] Contact primary POC for clarification (sarah.johnson@socom.mil)",
        "**Detected by SAM.gov Monitor at 2026-10-18 12:00:00 UTC**",
    ] {
        assert!(body.contains(expected), "missing {expected:?} in\n{body}");
    }
    assert!(!body.contains("noticedesc"));
    Ok(())
}
