use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use ssm_adapters::{IssueTracker, OpportunitySource};
use ssm_core::{IssuePayload, OpportunityRecord};
use ssm_storage::{InMemoryLedger, SeenLedger};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::FilterCriteria;
use crate::contacts::extract_contacts;
use crate::filter::OpportunityFilter;
use crate::format::IssueFormatter;
use crate::resources::extract_resources;
use crate::title::TitleGenerator;

/// Counters for one scan pass.
///
/// `fetched` counts raw search hits. Every later counter is per identifier after
/// duplicates collapse to their first occurrence, so a duplicate whose first copy
/// fails the filter is not matched even if a later copy would be.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub run_id: Uuid,
    pub fetched: usize,
    pub matched: usize,
    pub new: usize,
    pub published: usize,
    pub failed: usize,
    pub failed_fetches: usize,
    pub tracked: usize,
}

/// Enriches one record into the payload the tracker receives.
///
/// `description` is the full text fetched from the source, if any.
pub async fn build_issue(
    record: &OpportunityRecord,
    description: Option<&str>,
    titles: &TitleGenerator,
    formatter: &IssueFormatter,
    detected_at: DateTime<Utc>,
) -> IssuePayload {
    let contacts = extract_contacts(record);
    let resources = extract_resources(record);
    let title = titles.generate(record, description).await;
    formatter.format(record, &contacts, &resources, title, detected_at)
}

/// Keeps the first record for each identifier. Records without one pass through
/// so the caller can report them.
fn collapse_duplicates(records: Vec<OpportunityRecord>) -> Vec<OpportunityRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| match record.uid() {
            Some(uid) => seen.insert(uid.to_string()),
            None => true,
        })
        .collect()
}

/// Fetch, filter, dedup and publish on a fixed interval.
///
/// Owns its seen-set; one pass always completes before the next begins.
pub struct Monitor {
    criteria: FilterCriteria,
    filter: OpportunityFilter,
    interval: Duration,
    source: Box<dyn OpportunitySource>,
    tracker: Box<dyn IssueTracker>,
    titles: TitleGenerator,
    formatter: IssueFormatter,
    ledger: Box<dyn SeenLedger>,
}

impl Monitor {
    pub fn new(
        criteria: FilterCriteria,
        interval: Duration,
        source: Box<dyn OpportunitySource>,
        tracker: Box<dyn IssueTracker>,
        formatter: IssueFormatter,
    ) -> Self {
        Self {
            filter: OpportunityFilter::new(&criteria),
            criteria,
            interval,
            source,
            tracker,
            titles: TitleGenerator::disabled(),
            formatter,
            ledger: Box::new(InMemoryLedger::new()),
        }
    }

    pub fn with_titles(mut self, titles: TitleGenerator) -> Self {
        self.titles = titles;
        self
    }

    pub fn with_ledger(mut self, ledger: Box<dyn SeenLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &dyn SeenLedger {
        self.ledger.as_ref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn fetch_all(&self, now: DateTime<Utc>, summary: &mut CycleSummary) -> Vec<OpportunityRecord> {
        let range = self.filter.window(now.date_naive());
        let mut batch = Vec::new();
        for code in &self.criteria.category_codes {
            match self
                .source
                .search(code, &self.criteria.notice_types, range)
                .await
            {
                Ok(records) => {
                    info!(naics = %code, count = records.len(), "fetched opportunities");
                    batch.extend(records);
                }
                Err(err) => {
                    error!(naics = %code, error = %err, "opportunity search failed");
                    summary.failed_fetches += 1;
                }
            }
        }
        batch
    }

    /// One scan pass. Per-code and per-item failures are counted, never raised.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleSummary {
        let run_id = Uuid::new_v4();
        let span = info_span!("scan", %run_id);
        self.scan(run_id, now).instrument(span).await
    }

    async fn scan(&mut self, run_id: Uuid, now: DateTime<Utc>) -> CycleSummary {
        let mut summary = CycleSummary {
            run_id,
            ..Default::default()
        };

        let batch = self.fetch_all(now, &mut summary).await;
        summary.fetched = batch.len();

        for record in collapse_duplicates(batch) {
            let verdict = self.filter.evaluate(&record, now);
            if !verdict.is_match() {
                debug!(notice_id = record.uid().unwrap_or("-"), ?verdict, "skipping opportunity");
                continue;
            }
            summary.matched += 1;

            let Some(uid) = record.uid().map(ToString::to_string) else {
                warn!(title = record.title_or_default(), "matching opportunity has no identifier; skipping");
                continue;
            };
            if self.ledger.has_seen(&uid) {
                debug!(notice_id = %uid, "already published");
                continue;
            }
            summary.new += 1;
            info!(
                notice_id = %uid,
                title = record.title_or_default(),
                notice_type = record.notice_type.as_deref().unwrap_or("-"),
                posted = record.posted_date.as_deref().unwrap_or("-"),
                "new matching opportunity"
            );

            let description = match self.source.fetch_description(&record).await {
                Ok(description) => description,
                Err(err) => {
                    summary.failed += 1;
                    error!(notice_id = %uid, error = %err, "fetching description failed; will retry next cycle");
                    continue;
                }
            };
            info!(
                notice_id = %uid,
                description = description.as_deref().unwrap_or("No detailed description available"),
                "opportunity description"
            );

            let payload = build_issue(&record, description.as_deref(), &self.titles, &self.formatter, now).await;
            match self.tracker.create_issue(&payload).await {
                Ok(issue) => {
                    self.ledger.mark_seen(&uid);
                    summary.published += 1;
                    info!(
                        notice_id = %uid,
                        issue = %issue.identifier,
                        url = %issue.url,
                        "published issue"
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(notice_id = %uid, error = %err, "publishing issue failed; will retry next cycle");
                }
            }
        }

        summary.tracked = self.ledger.len();
        summary
    }

    /// Scans until `shutdown` resolves. Shutdown is only observed between passes.
    ///
    /// `shutdown` is polled once before the first pass so signal handlers are
    /// installed before any scanning starts.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested before first scan; monitor stopping");
                return;
            }
            _ = std::future::ready(()) => {}
        }
        loop {
            let summary = self.run_cycle(Utc::now()).await;
            info!(
                run_id = %summary.run_id,
                fetched = summary.fetched,
                matched = summary.matched,
                new = summary.new,
                published = summary.published,
                failed = summary.failed,
                failed_fetches = summary.failed_fetches,
                tracked = summary.tracked,
                next_in_secs = self.interval.as_secs(),
                "scan complete"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("shutdown requested; monitor stopping");
                    return;
                }
            }
        }
    }
}
