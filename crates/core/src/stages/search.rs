use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::FailurePolicy;
use crate::metrics;
use crate::photo::{PhotoCatalog, SearchQuery, VariantSet};
use crate::pipeline::PipelineError;
use crate::queue::{QueueError, QueueSender};
use crate::resolver::MetadataResolver;

/// Counters reported by [`SearchStage::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    /// Records returned by the search.
    pub found: usize,
    /// Records that passed the visibility filter.
    pub public: usize,
    pub resolved: usize,
    pub failed: usize,
    /// Downstream hung up before every resolution was delivered.
    pub stopped_early: bool,
}

/// Runs the search and fans out one metadata resolution per public photo.
pub struct SearchStage {
    catalog: Arc<dyn PhotoCatalog>,
    resolver: MetadataResolver,
    policy: FailurePolicy,
}

impl SearchStage {
    pub fn new(catalog: Arc<dyn PhotoCatalog>, policy: FailurePolicy) -> Self {
        let resolver = MetadataResolver::new(Arc::clone(&catalog));
        Self {
            catalog,
            resolver,
            policy,
        }
    }

    /// Search, resolve concurrently and push each [`VariantSet`] as it completes.
    ///
    /// The terminal marker is sent only after every resolution has finished.
    /// On error the sender is dropped without a marker.
    pub async fn run(
        &self,
        query: &SearchQuery,
        locations: QueueSender<VariantSet>,
    ) -> Result<SearchSummary, PipelineError> {
        let start = Instant::now();
        let result = self.run_inner(query, locations).await;
        metrics::STAGE_DURATION
            .with_label_values(&["search"])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn run_inner(
        &self,
        query: &SearchQuery,
        locations: QueueSender<VariantSet>,
    ) -> Result<SearchSummary, PipelineError> {
        let records = self
            .catalog
            .search(query)
            .await
            .map_err(PipelineError::Search)?;

        let mut summary = SearchSummary {
            found: records.len(),
            ..Default::default()
        };

        let ids: Vec<String> = records
            .into_iter()
            .filter_map(|record| {
                if record.is_public {
                    metrics::SEARCH_RESULTS.with_label_values(&["public"]).inc();
                    Some(record.id)
                } else {
                    metrics::SEARCH_RESULTS.with_label_values(&["private"]).inc();
                    debug!(id = %record.id, "Dropping non-public photo");
                    None
                }
            })
            .collect();
        summary.public = ids.len();

        info!(
            provider = %self.catalog.name(),
            text = %query.text,
            found = summary.found,
            public = summary.public,
            "Search complete, resolving photos"
        );

        let resolver = &self.resolver;
        let mut pending: FuturesUnordered<_> = ids
            .into_iter()
            .map(move |id| async move {
                let result = resolver.resolve(&id).await;
                (id, result)
            })
            .collect();

        loop {
            let next = tokio::select! {
                biased;
                _ = locations.receiver_gone() => {
                    summary.stopped_early = true;
                    break;
                }
                next = pending.next() => next,
            };
            let Some((id, result)) = next else {
                break;
            };

            match result {
                Ok(set) => {
                    metrics::RESOLUTIONS.with_label_values(&["resolved"]).inc();
                    summary.resolved += 1;
                    match locations.push(set) {
                        Ok(()) => {}
                        Err(QueueError::ReceiverGone(_)) => {
                            summary.stopped_early = true;
                            break;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => {
                    metrics::RESOLUTIONS.with_label_values(&["failed"]).inc();
                    summary.failed += 1;
                    match self.policy {
                        FailurePolicy::Abort => {
                            warn!(id = %id, error = %e, "Resolution failed, aborting search stage");
                            return Err(e.into());
                        }
                        FailurePolicy::Skip => {
                            warn!(id = %id, error = %e, "Resolution failed, skipping photo");
                        }
                    }
                }
            }
        }

        if summary.stopped_early {
            info!(
                resolved = summary.resolved,
                abandoned = pending.len(),
                "Downstream stopped reading, search stage exiting"
            );
            return Ok(summary);
        }

        match locations.finish() {
            Ok(()) => {}
            Err(QueueError::ReceiverGone(_)) => summary.stopped_early = true,
            Err(e) => return Err(e.into()),
        }

        info!(
            resolved = summary.resolved,
            failed = summary.failed,
            "Search stage finished"
        );
        Ok(summary)
    }
}
