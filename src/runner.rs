use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{ClassName, Region, SafeSearch};
use crate::error::HarvestError;
use crate::fetch::Fetcher;
use crate::filter::SizeFilter;
use crate::identity::FileIdentity;
use crate::search::{ImageSearch, ProviderSession, SearchProvider};
use crate::store::DatasetStore;

/// Outcome of one (class, query) pass. `saved` counts files written by this
/// pass; the other counters explain where the remaining candidates went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryReport {
    pub class: String,
    pub query: String,
    pub saved: usize,
    pub considered: usize,
    pub unresolved: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub failed: usize,
}

pub struct QueryRunner<'a, F: Fetcher> {
    store: &'a DatasetStore,
    fetcher: &'a F,
    filter: SizeFilter,
    region: &'a Region,
    max_per_query: usize,
}

impl<'a, F: Fetcher> QueryRunner<'a, F> {
    pub fn new(
        store: &'a DatasetStore,
        fetcher: &'a F,
        filter: SizeFilter,
        region: &'a Region,
        max_per_query: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            filter,
            region,
            max_per_query,
        }
    }

    /// Runs one query to completion. Only provider failures are returned as
    /// errors; per-candidate failures are counted and skipped.
    pub fn run<P: SearchProvider + ?Sized>(
        &self,
        session: &mut ProviderSession<'_, P>,
        class: &ClassName,
        query: &str,
    ) -> Result<QueryReport, HarvestError> {
        let search = ImageSearch {
            keywords: query.to_string(),
            region: self.region.clone(),
            safe_search: SafeSearch::Off,
            max_results: self.max_per_query,
        };
        let mut report = QueryReport {
            class: class.to_string(),
            query: query.to_string(),
            ..Default::default()
        };
        let mut seen: HashSet<FileIdentity> = HashSet::new();

        for result in session.images(&search)?.take(self.max_per_query) {
            let result = result?;
            report.considered += 1;

            let Some(url) = result.candidate_url() else {
                report.unresolved += 1;
                continue;
            };
            if !self.filter.accepts(&result) {
                debug!(url, width = ?result.width, height = ?result.height, "below minimum size");
                report.filtered += 1;
                continue;
            }

            let identity = FileIdentity::from_url(url);
            if seen.contains(&identity) || self.store.contains(class, &identity) {
                report.duplicates += 1;
                continue;
            }

            let destination = self.store.image_path(class, &identity);
            match self.fetcher.fetch(url, &destination) {
                Ok(bytes) => {
                    debug!(url, %destination, bytes, "saved");
                    seen.insert(identity);
                }
                Err(err) => {
                    debug!(url, error = %err, "download failed");
                    report.failed += 1;
                }
            }
        }

        report.saved = seen.len();
        info!(class = %class, query, saved = report.saved, "query finished");
        Ok(report)
    }
}
