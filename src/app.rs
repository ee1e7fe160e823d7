use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::domain::{ClassName, ClassQuerySpec, MinSize, Region};
use crate::error::HarvestError;
use crate::fetch::Fetcher;
use crate::filter::SizeFilter;
use crate::runner::{QueryReport, QueryRunner};
use crate::search::{ProviderSession, SearchProvider};
use crate::store::DatasetStore;

pub const DEFAULT_MAX_PER_QUERY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOptions {
    pub max_per_query: usize,
    pub min_size: Option<MinSize>,
    pub region: Region,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            max_per_query: DEFAULT_MAX_PER_QUERY,
            min_size: None,
            region: Region::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestRequest {
    pub root: Utf8PathBuf,
    pub classes: ClassQuerySpec,
    pub options: HarvestOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarvestResult {
    pub root: String,
    pub started_at: String,
    pub finished_at: String,
    pub classes: Vec<ClassReport>,
    pub total_saved: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub directory: String,
    pub queries: Vec<QueryReport>,
    pub saved: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    ClassStarted { class: ClassName, queries: usize },
    QueryStarted { class: ClassName, query: String },
    QueryFinished(QueryReport),
    Finished { total_saved: usize },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Drives the whole job: one class at a time, one query at a time, against a
/// single provider session.
pub struct Harvester<P: SearchProvider, F: Fetcher> {
    provider: P,
    fetcher: F,
}

impl<P: SearchProvider, F: Fetcher> Harvester<P, F> {
    pub fn new(provider: P, fetcher: F) -> Self {
        Self { provider, fetcher }
    }

    pub fn run(
        &mut self,
        request: &HarvestRequest,
        sink: &dyn ProgressSink,
    ) -> Result<HarvestResult, HarvestError> {
        if request.options.max_per_query == 0 {
            return Err(HarvestError::InvalidMaxPerQuery);
        }
        let started_at = iso_timestamp();
        let store = DatasetStore::new(request.root.clone());
        store.ensure_root()?;

        let runner = QueryRunner::new(
            &store,
            &self.fetcher,
            SizeFilter::new(request.options.min_size),
            &request.options.region,
            request.options.max_per_query,
        );
        let mut session = ProviderSession::open(&mut self.provider)?;
        let mut classes = Vec::with_capacity(request.classes.len());

        for entry in request.classes.iter() {
            let directory = store.ensure_class_dir(&entry.class)?;
            info!(class = %entry.class, queries = entry.queries.len(), "class started");
            sink.event(ProgressEvent::ClassStarted {
                class: entry.class.clone(),
                queries: entry.queries.len(),
            });

            let mut reports = Vec::with_capacity(entry.queries.len());
            for query in &entry.queries {
                sink.event(ProgressEvent::QueryStarted {
                    class: entry.class.clone(),
                    query: query.clone(),
                });
                let report = runner.run(&mut session, &entry.class, query)?;
                sink.event(ProgressEvent::QueryFinished(report.clone()));
                reports.push(report);
            }

            classes.push(ClassReport {
                class: entry.class.to_string(),
                directory: directory.to_string(),
                saved: reports.iter().map(|report| report.saved).sum(),
                queries: reports,
            });
        }
        drop(session);

        let total_saved = classes.iter().map(|class| class.saved).sum();
        sink.event(ProgressEvent::Finished { total_saved });
        Ok(HarvestResult {
            root: store.root().to_string(),
            started_at,
            finished_at: iso_timestamp(),
            classes,
            total_saved,
        })
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SearchResult;
    use crate::error::FetchError;
    use crate::search::{ImageSearch, ImageStream};
    use camino::Utf8Path;
    use std::sync::Mutex;

    struct FailingProvider;

    impl SearchProvider for FailingProvider {
        fn open(&mut self) -> Result<(), HarvestError> {
            Ok(())
        }

        fn images(&mut self, _search: &ImageSearch) -> Result<ImageStream<'_>, HarvestError> {
            Ok(Box::new(
                vec![
                    Ok(SearchResult {
                        image: Some("https://x.com/1.jpg".to_string()),
                        ..Default::default()
                    }),
                    Err(HarvestError::SearchStatus {
                        status: 403,
                        message: "blocked".to_string(),
                    }),
                ]
                .into_iter(),
            ))
        }

        fn close(&mut self) {}
    }

    #[derive(Default)]
    struct CountingFetcher {
        calls: Mutex<usize>,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(&self, _url: &str, destination: &Utf8Path) -> Result<u64, FetchError> {
            *self.calls.lock().unwrap() += 1;
            std::fs::write(destination.as_std_path(), b"img").map_err(FetchError::from)?;
            Ok(3)
        }
    }

    struct Silent;

    impl ProgressSink for Silent {
        fn event(&self, _event: ProgressEvent) {}
    }

    #[test]
    fn provider_failure_ends_the_run() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("dataset")).unwrap();
        let mut classes = ClassQuerySpec::new();
        classes.push("cats".parse().unwrap(), ["kitten"]);
        let request = HarvestRequest {
            root,
            classes,
            options: HarvestOptions::default(),
        };

        let fetcher = CountingFetcher::default();
        let mut harvester = Harvester::new(FailingProvider, &fetcher);
        let err = harvester.run(&request, &Silent).unwrap_err();
        assert!(matches!(err, HarvestError::SearchStatus { status: 403, .. }));
        assert_eq!(*fetcher.calls.lock().unwrap(), 1);
    }

    #[test]
    fn zero_max_per_query_is_rejected() {
        let mut harvester = Harvester::new(FailingProvider, CountingFetcher::default());
        let request = HarvestRequest {
            root: Utf8PathBuf::from("unused"),
            classes: ClassQuerySpec::new(),
            options: HarvestOptions {
                max_per_query: 0,
                ..HarvestOptions::default()
            },
        };
        assert!(matches!(
            harvester.run(&request, &Silent),
            Err(HarvestError::InvalidMaxPerQuery)
        ));
    }
}
