use std::sync::Arc;
use std::time::Instant;

use futures::stream::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::FailurePolicy;
use crate::metrics;
use crate::photo::{ContentFetcher, RawPayload, ServiceError, VariantSet};
use crate::pipeline::PipelineError;
use crate::queue::{QueueError, QueueReceiver, QueueSender};

/// A single content fetch failed.
#[derive(Debug, Clone, Error)]
#[error("Failed to download photo {id} from {location}: {source}")]
pub struct DownloadError {
    pub id: String,
    pub location: String,
    #[source]
    pub source: ServiceError,
}

/// Counters reported by [`DownloadStage::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub failed: usize,
    pub bytes: u64,
    /// Downstream hung up before the input was exhausted.
    pub stopped_early: bool,
}

/// Downloads the selected rendition of each [`VariantSet`].
pub struct DownloadStage {
    fetcher: Arc<dyn ContentFetcher>,
    max_concurrent: usize,
    policy: FailurePolicy,
}

impl DownloadStage {
    /// `max_concurrent` of 1 keeps one download in flight at a time; 0 is treated as 1.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        max_concurrent: usize,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            fetcher,
            max_concurrent: max_concurrent.max(1),
            policy,
        }
    }

    /// Consume `locations` until its terminal marker, forwarding payloads in
    /// download completion order, then send one marker on `payloads`.
    pub async fn run(
        &self,
        locations: QueueReceiver<VariantSet>,
        payloads: QueueSender<RawPayload>,
    ) -> Result<DownloadSummary, PipelineError> {
        let start = Instant::now();
        let result = self.run_inner(locations, payloads).await;
        metrics::STAGE_DURATION
            .with_label_values(&["download"])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn run_inner(
        &self,
        locations: QueueReceiver<VariantSet>,
        payloads: QueueSender<RawPayload>,
    ) -> Result<DownloadSummary, PipelineError> {
        let fetcher = self.fetcher.as_ref();
        let downloads = locations
            .into_stream()
            .map(move |item| async move {
                let set = item?;
                Ok::<_, QueueError>(download(fetcher, set).await)
            })
            .buffer_unordered(self.max_concurrent);
        tokio::pin!(downloads);

        let mut summary = DownloadSummary::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = payloads.receiver_gone() => {
                    summary.stopped_early = true;
                    break;
                }
                next = downloads.next() => next,
            };
            // End of stream: the terminal marker arrived and nothing is in flight.
            let Some(outcome) = next else {
                break;
            };

            match outcome? {
                Ok(payload) => {
                    summary.downloaded += 1;
                    summary.bytes += payload.bytes.len() as u64;
                    metrics::DOWNLOADS.with_label_values(&["completed"]).inc();
                    metrics::DOWNLOADED_BYTES.inc_by(payload.bytes.len() as u64);

                    match payloads.push(payload) {
                        Ok(()) => {}
                        Err(QueueError::ReceiverGone(_)) => {
                            summary.stopped_early = true;
                            break;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => {
                    metrics::DOWNLOADS.with_label_values(&["failed"]).inc();
                    summary.failed += 1;
                    match self.policy {
                        FailurePolicy::Abort => {
                            warn!(
                                id = %e.id,
                                error = %e.source,
                                "Download failed, aborting download stage"
                            );
                            return Err(e.into());
                        }
                        FailurePolicy::Skip => {
                            warn!(id = %e.id, error = %e.source, "Download failed, skipping photo");
                        }
                    }
                }
            }
        }

        if summary.stopped_early {
            info!(
                downloaded = summary.downloaded,
                "Assembly stopped reading, download stage exiting"
            );
            return Ok(summary);
        }

        match payloads.finish() {
            Ok(()) => {}
            Err(QueueError::ReceiverGone(_)) => summary.stopped_early = true,
            Err(e) => return Err(e.into()),
        }

        info!(
            downloaded = summary.downloaded,
            failed = summary.failed,
            bytes = summary.bytes,
            "Download stage finished"
        );
        Ok(summary)
    }
}

async fn download(
    fetcher: &dyn ContentFetcher,
    set: VariantSet,
) -> Result<RawPayload, DownloadError> {
    let location = set.selected().location.clone();
    debug!(id = %set.id(), location = %location, "Downloading photo");

    match fetcher.fetch(&location).await {
        Ok(bytes) => {
            debug!(id = %set.id(), bytes = bytes.len(), "Downloaded photo");
            Ok(RawPayload::new(Some(set.id().to_string()), bytes))
        }
        Err(source) => Err(DownloadError {
            id: set.id().to_string(),
            location,
            source,
        }),
    }
}
