use chrono::{DateTime, Days, NaiveDate, Utc};
use ssm_adapters::DateRange;
use ssm_core::OpportunityRecord;

use crate::config::FilterCriteria;

/// Outcome of checking one record against the interest criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Match,
    CategoryMismatch,
    NoticeTypeMismatch,
    MissingPostedDate,
    OutsideWindow,
}

impl FilterVerdict {
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

#[derive(Debug, Clone)]
pub struct OpportunityFilter {
    category_codes: Vec<String>,
    notice_types: Vec<String>,
    lookback_days: u32,
}

impl OpportunityFilter {
    pub fn new(criteria: &FilterCriteria) -> Self {
        Self {
            category_codes: criteria
                .category_codes
                .iter()
                .map(|c| c.trim().to_string())
                .collect(),
            notice_types: criteria
                .notice_types
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            lookback_days: criteria.lookback_days,
        }
    }

    /// Posting-date window `[today - lookback_days, today]`, both ends inclusive.
    pub fn window(&self, today: NaiveDate) -> DateRange {
        let from = today
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        DateRange { from, to: today }
    }

    pub fn evaluate(&self, record: &OpportunityRecord, now: DateTime<Utc>) -> FilterVerdict {
        let category_match = record
            .category_codes()
            .iter()
            .any(|code| self.category_codes.iter().any(|c| c.as_str() == *code));
        if !category_match {
            return FilterVerdict::CategoryMismatch;
        }

        let notice_type = record
            .notice_type
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default();
        if notice_type.is_empty() || !self.notice_types.contains(&notice_type) {
            return FilterVerdict::NoticeTypeMismatch;
        }

        let Some(posted) = record.posted_date.as_deref().and_then(parse_posted_date) else {
            return FilterVerdict::MissingPostedDate;
        };
        let window = self.window(now.date_naive());
        if posted < window.from || posted > window.to {
            return FilterVerdict::OutsideWindow;
        }

        FilterVerdict::Match
    }

    pub fn matches(&self, record: &OpportunityRecord, now: DateTime<Utc>) -> bool {
        self.evaluate(record, now).is_match()
    }
}

/// Calendar date of a SAM.gov posting timestamp, as written by the source.
///
/// Accepts `YYYY-MM-DD`, anything starting with `YYYY-MM-DD` followed by `T` or
/// a space (RFC 3339 and SAM's `YYYY-MM-DD HH:MM:SS-04`), and `MM/DD/YYYY`.
pub fn parse_posted_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let (Some(head), Some(sep)) = (raw.get(..10), raw.get(10..11)) {
        if sep == "T" || sep == " " {
            if let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }
    NaiveDate::parse_from_str(raw, "%m/%d/%Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 14, 30, 0).single().unwrap()
    }

    fn criteria() -> FilterCriteria {
        FilterCriteria {
            category_codes: vec!["332992".into()],
            notice_types: vec!["Sources Sought".into(), "RFI".into()],
            lookback_days: 90,
        }
    }

    fn record(naics: &str, notice_type: &str, posted: &str) -> OpportunityRecord {
        OpportunityRecord {
            notice_id: Some("n-1".into()),
            naics_code: Some(naics.into()),
            notice_type: Some(notice_type.into()),
            posted_date: Some(posted.into()),
            ..Default::default()
        }
    }

    #[test]
    fn sources_sought_posted_today_matches() {
        let filter = OpportunityFilter::new(&criteria());
        assert!(filter.matches(&record("332992", "Sources Sought", "2026-10-18"), now()));
    }

    #[test]
    fn window_edge_is_inclusive_and_one_day_older_is_not() {
        let filter = OpportunityFilter::new(&criteria());
        // 2026-10-18 minus 90 days.
        assert_eq!(filter.window(now().date_naive()).from.to_string(), "2026-07-20");
        assert!(filter.matches(&record("332992", "RFI", "2026-07-20"), now()));
        assert_eq!(
            filter.evaluate(&record("332992", "RFI", "2026-07-19"), now()),
            FilterVerdict::OutsideWindow
        );
    }

    #[test]
    fn future_postings_are_outside_window() {
        let filter = OpportunityFilter::new(&criteria());
        assert_eq!(
            filter.evaluate(&record("332992", "RFI", "2026-10-19"), now()),
            FilterVerdict::OutsideWindow
        );
    }

    #[test]
    fn notice_type_match_ignores_case_but_not_substrings() {
        let filter = OpportunityFilter::new(&criteria());
        assert!(filter.matches(&record("332992", "  sources SOUGHT ", "2026-10-01"), now()));
        assert_eq!(
            filter.evaluate(&record("332992", "Sources Sought Synopsis", "2026-10-01"), now()),
            FilterVerdict::NoticeTypeMismatch
        );
        let mut no_type = record("332992", "", "2026-10-01");
        no_type.notice_type = None;
        assert_eq!(filter.evaluate(&no_type, now()), FilterVerdict::NoticeTypeMismatch);
    }

    #[test]
    fn category_match_is_exact_and_checks_secondary_codes() {
        let filter = OpportunityFilter::new(&criteria());
        assert_eq!(
            filter.evaluate(&record("3329921", "RFI", "2026-10-01"), now()),
            FilterVerdict::CategoryMismatch
        );
        let mut multi = record("336413", "RFI", "2026-10-01");
        multi.naics_codes = Some(vec!["336413".into(), "332992".into()]);
        assert!(filter.matches(&multi, now()));
    }

    #[test]
    fn unparseable_or_missing_dates_fail_closed() {
        let filter = OpportunityFilter::new(&criteria());
        assert_eq!(
            filter.evaluate(&record("332992", "RFI", "last tuesday"), now()),
            FilterVerdict::MissingPostedDate
        );
        let mut missing = record("332992", "RFI", "");
        missing.posted_date = None;
        assert!(!filter.matches(&missing, now()));
    }

    #[test]
    fn posted_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 1);
        assert_eq!(parse_posted_date("2026-10-01"), expected);
        assert_eq!(parse_posted_date("2026-10-01T09:15:00-04:00"), expected);
        assert_eq!(parse_posted_date("2026-10-01 09:15:00-04"), expected);
        assert_eq!(parse_posted_date("10/01/2026"), expected);
        assert_eq!(parse_posted_date("2026-13-01"), None);
        assert_eq!(parse_posted_date(""), None);
    }
}
