//! Aggregation run: fetch every source, normalize dates, expand, consolidate.

pub mod consolidate;
pub mod dates;
pub mod expansion;
pub mod output;
pub mod resolver;

use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::apis::base::SourceAdapter;
use crate::common::error::{Result, ScraperError};
use crate::common::types::{EventRecord, RawEvent};
use crate::config::PipelineConfig;
use crate::metrics::{RunMetrics, SourceMetrics};

pub use consolidate::{consolidate, Consolidated, ListingWindow};
pub use dates::{DateNormalizer, DateParseOutcome, DateProfile};

/// An adapter paired with the date conventions of its source
#[derive(Clone)]
pub struct SourceJob {
    pub adapter: Arc<dyn SourceAdapter>,
    pub profile: DateProfile,
}

/// Per-source tally for the run summary
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_id: String,
    pub raw_events: usize,
    pub records: usize,
    pub unresolved: usize,
    pub error: Option<String>,
}

/// Result of a complete aggregation run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub run_date: NaiveDate,
    pub sources: Vec<SourceReport>,
    pub consolidated: Consolidated,
    pub output_file: Option<String>,
}

impl PipelineResult {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    normalizer: DateNormalizer,
    output_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, normalizer: DateNormalizer) -> Self {
        let output_dir = Some(config.output_dir.clone());
        Self {
            config,
            normalizer,
            output_dir,
        }
    }

    /// Keep results in memory only
    pub fn without_output(mut self) -> Self {
        self.output_dir = None;
        self
    }

    /// Run all jobs and consolidate. Jobs are given in priority order, which
    /// is the order their records enter consolidation regardless of which
    /// finishes first.
    #[instrument(skip(self, jobs), fields(sources = jobs.len()))]
    pub async fn run(&self, run_id: &str, jobs: Vec<SourceJob>, today: NaiveDate) -> Result<PipelineResult> {
        let started = Instant::now();
        let attempted = jobs.len();
        info!("Starting run {} over {} sources for {}", run_id, attempted, today);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_sources.max(1)));
        let timeout = Duration::from_secs(self.config.source_timeout_secs);
        let mut set = JoinSet::new();
        let source_ids: Vec<String> = jobs.iter().map(|job| job.adapter.source_id().to_string()).collect();

        for (index, job) in jobs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let normalizer = self.normalizer.clone();
            set.spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = run_source(&job, &normalizer, timeout, today).await;
                (index, job.adapter.source_id().to_string(), outcome)
            });
        }

        let mut finished: Vec<(usize, SourceReport, Vec<EventRecord>)> = Vec::with_capacity(attempted);
        while let Some(joined) = set.join_next().await {
            let (index, source_id, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!("Source task panicked or was cancelled: {}", e);
                    continue;
                }
            };

            match outcome {
                Ok((raw_count, records)) => {
                    let unresolved = records.iter().filter(|r| r.date.resolved().is_none()).count();
                    finished.push((
                        index,
                        SourceReport {
                            source_id,
                            raw_events: raw_count,
                            records: records.len(),
                            unresolved,
                            error: None,
                        },
                        records,
                    ));
                }
                Err(e) => {
                    warn!("Source '{}' contributed no events: {}", source_id, e);
                    SourceMetrics::record_error(&source_id);
                    finished.push((
                        index,
                        SourceReport {
                            source_id,
                            raw_events: 0,
                            records: 0,
                            unresolved: 0,
                            error: Some(e.to_string()),
                        },
                        Vec::new(),
                    ));
                }
            }
        }

        // Tasks that panicked or were cancelled never reported back
        for (index, source_id) in source_ids.into_iter().enumerate() {
            if finished.iter().all(|(done, _, _)| *done != index) {
                SourceMetrics::record_error(&source_id);
                finished.push((
                    index,
                    SourceReport {
                        source_id,
                        raw_events: 0,
                        records: 0,
                        unresolved: 0,
                        error: Some("source task aborted before reporting".to_string()),
                    },
                    Vec::new(),
                ));
            }
        }

        finished.sort_by_key(|(index, _, _)| *index);
        let succeeded = finished.iter().filter(|(_, report, _)| report.error.is_none()).count();
        if succeeded == 0 {
            return Err(ScraperError::NoSources(attempted));
        }

        let mut sources = Vec::with_capacity(finished.len());
        let mut records = Vec::new();
        for (_, report, source_records) in finished {
            sources.push(report);
            records.extend(source_records);
        }

        let window = ListingWindow::starting(today, self.config.window_months);
        let consolidated = consolidate(records, Some(window));

        let output_file = match &self.output_dir {
            Some(dir) => Some(output::persist_to_json(
                run_id,
                today,
                &consolidated.events,
                &consolidated.unresolved,
                dir,
            )?),
            None => None,
        };
        if let Some(path) = &output_file {
            info!("Saved {} events to {}", consolidated.events.len(), path);
        }

        RunMetrics::record_run_duration(started.elapsed().as_secs_f64());
        Ok(PipelineResult {
            run_id: run_id.to_string(),
            run_date: today,
            sources,
            consolidated,
            output_file,
        })
    }
}

/// Fetch one source under the timeout, then normalize and expand its events
async fn run_source(
    job: &SourceJob,
    normalizer: &DateNormalizer,
    timeout: Duration,
    today: NaiveDate,
) -> Result<(usize, Vec<EventRecord>)> {
    let source_id = job.adapter.source_id().to_string();
    let started = Instant::now();

    let raw_events = match tokio::time::timeout(timeout, job.adapter.fetch()).await {
        Ok(fetched) => fetched?,
        Err(_) => return Err(ScraperError::Timeout(source_id)),
    };
    SourceMetrics::record_success(&source_id, raw_events.len(), started.elapsed().as_secs_f64());
    info!("Fetched {} raw events from {}", raw_events.len(), source_id);

    let mut records = Vec::with_capacity(raw_events.len());
    for raw in &raw_events {
        records.extend(normalize_event(raw, &source_id, normalizer, &job.profile, today).await);
    }
    Ok((raw_events.len(), records))
}

async fn normalize_event(
    raw: &RawEvent,
    source_id: &str,
    normalizer: &DateNormalizer,
    profile: &DateProfile,
    today: NaiveDate,
) -> Vec<EventRecord> {
    let mut raw = raw.clone();
    if raw.source_id.is_empty() {
        raw.source_id = source_id.to_string();
    }
    let outcome = normalizer.normalize(source_id, &raw.raw_date, profile, today).await;
    expansion::expand(&raw, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::resolver::DisabledResolver;
    use async_trait::async_trait;

    struct StaticAdapter {
        id: &'static str,
        events: Vec<RawEvent>,
        delay: Option<Duration>,
        fail: bool,
        panic: bool,
    }

    #[async_trait]
    impl SourceAdapter for StaticAdapter {
        fn source_id(&self) -> &str {
            self.id
        }

        async fn fetch(&self) -> Result<Vec<RawEvent>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.panic {
                panic!("adapter bug");
            }
            if self.fail {
                return Err(ScraperError::Source {
                    source_id: self.id.to_string(),
                    message: "listing page 503".into(),
                });
            }
            Ok(self.events.clone())
        }
    }

    fn raw(source: &str, title: &str, raw_date: &str, link: &str) -> RawEvent {
        RawEvent {
            source_id: source.into(),
            title: title.into(),
            raw_date: raw_date.into(),
            venue: "Corner Hotel".into(),
            link: link.into(),
            image: None,
        }
    }

    fn job(adapter: StaticAdapter) -> SourceJob {
        SourceJob {
            adapter: Arc::new(adapter),
            profile: DateProfile::default(),
        }
    }

    fn pipeline(timeout_secs: u64) -> Pipeline {
        let config = PipelineConfig {
            source_timeout_secs: timeout_secs,
            ..PipelineConfig::default()
        };
        Pipeline::new(config, DateNormalizer::new(Arc::new(DisabledResolver))).without_output()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
    }

    #[tokio::test]
    async fn test_priority_order_wins_even_when_slower() {
        let slow_first = StaticAdapter {
            id: "moshtix",
            events: vec![raw("moshtix", "Gig", "Sat 1 Nov", "https://moshtix/gig")],
            delay: Some(Duration::from_millis(50)),
            fail: false,
            panic: false,
        };
        let fast_second = StaticAdapter {
            id: "oztix",
            events: vec![raw("oztix", "Gig", "1 Nov", "https://oztix/gig")],
            delay: None,
            fail: false,
            panic: false,
        };

        let result = pipeline(5)
            .run("t", vec![job(slow_first), job(fast_second)], today())
            .await
            .unwrap();
        assert_eq!(result.consolidated.events.len(), 1);
        assert_eq!(result.consolidated.events[0].link, "https://moshtix/gig");
        assert_eq!(result.sources[0].source_id, "moshtix");
    }

    #[tokio::test]
    async fn test_failed_and_timed_out_sources_are_tolerated() {
        let ok = StaticAdapter {
            id: "oztix",
            events: vec![raw("oztix", "Gig", "Sat 1 Nov", "https://oztix/gig")],
            delay: None,
            fail: false,
            panic: false,
        };
        let broken = StaticAdapter { id: "ticketek", events: vec![], delay: None, fail: true, panic: false };
        let hung = StaticAdapter {
            id: "eventbrite",
            events: vec![],
            delay: Some(Duration::from_secs(30)),
            fail: false,
            panic: false,
        };

        let result = pipeline(1)
            .run("t", vec![job(ok), job(broken), job(hung)], today())
            .await
            .unwrap();
        assert_eq!(result.consolidated.events.len(), 1);
        assert_eq!(result.failed_sources(), 2);
        assert!(result.sources[2].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_an_error() {
        let broken = StaticAdapter { id: "ticketek", events: vec![], delay: None, fail: true, panic: false };
        let err = pipeline(5).run("t", vec![job(broken)], today()).await.unwrap_err();
        assert!(matches!(err, ScraperError::NoSources(1)));
    }

    #[tokio::test]
    async fn test_unparseable_dates_land_in_audit_list() {
        let adapter = StaticAdapter {
            id: "humanitix",
            events: vec![
                raw("humanitix", "Mystery", "date TBC", "https://h/1"),
                raw("", "Known", "Fri 24 Oct", "https://h/2"),
            ],
            delay: None,
            fail: false,
            panic: false,
        };
        let result = pipeline(5).run("t", vec![job(adapter)], today()).await.unwrap();
        assert_eq!(result.consolidated.events.len(), 1);
        assert_eq!(result.consolidated.events[0].source_id, "humanitix");
        assert_eq!(result.consolidated.unresolved.len(), 1);
        assert_eq!(result.sources[0].unresolved, 1);
    }

    #[tokio::test]
    async fn test_panicking_source_still_reported() {
        let ok = StaticAdapter {
            id: "oztix",
            events: vec![raw("oztix", "Gig", "Sat 1 Nov", "https://oztix/gig")],
            delay: None,
            fail: false,
            panic: false,
        };
        let buggy = StaticAdapter { id: "moshtix", events: vec![], delay: None, fail: false, panic: true };

        let result = pipeline(5).run("t", vec![job(buggy), job(ok)], today()).await.unwrap();
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].source_id, "moshtix");
        assert!(result.sources[0].error.is_some());
        assert_eq!(result.failed_sources(), 1);
        assert_eq!(result.consolidated.events.len(), 1);
    }
}
