use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::config::{CollageSettings, PipelineConfig};
use crate::imaging::{CollageGrid, ImageCodec};
use crate::photo::{ContentFetcher, PhotoCatalog, RawPayload, SearchQuery, VariantSet};
use crate::queue::hand_off;
use crate::stages::{AssemblyStage, DownloadStage, SearchStage, LOCATION_QUEUE, PAYLOAD_QUEUE};

use super::{PipelineError, PipelineReport};

/// One collage run: search, resolve, download and assemble.
///
/// Owns its collaborators; a pipeline value can be run more than once, each
/// run getting fresh queues and a fresh grid.
pub struct CollagePipeline {
    settings: CollageSettings,
    config: PipelineConfig,
    catalog: Arc<dyn PhotoCatalog>,
    fetcher: Arc<dyn ContentFetcher>,
    codec: Arc<dyn ImageCodec>,
    run_id: Uuid,
}

impl CollagePipeline {
    pub fn new(
        settings: CollageSettings,
        config: PipelineConfig,
        catalog: Arc<dyn PhotoCatalog>,
        fetcher: Arc<dyn ContentFetcher>,
        codec: Arc<dyn ImageCodec>,
    ) -> Self {
        Self {
            settings,
            config,
            catalog,
            fetcher,
            codec,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn settings(&self) -> &CollageSettings {
        &self.settings
    }

    /// Run to completion.
    ///
    /// When a stage fails, every later stage sees its queue disconnect; the
    /// error returned is the one from the earliest failing stage.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let span = info_span!(
            "collage_run",
            run_id = %self.run_id,
            title = %self.settings.title
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<PipelineReport, PipelineError> {
        let start = Instant::now();
        info!(
            text = %self.settings.text,
            quantity = self.settings.quantity,
            rows = self.settings.rows,
            columns = self.settings.columns,
            cell_width = self.settings.cell_width,
            cell_height = self.settings.cell_height,
            max_downloads = self.config.max_concurrent_downloads,
            policy = ?self.config.failure_policy,
            "Starting collage pipeline"
        );

        let (location_tx, location_rx) = hand_off::<VariantSet>(LOCATION_QUEUE);
        let (payload_tx, payload_rx) = hand_off::<RawPayload>(PAYLOAD_QUEUE);

        // Assembly half: blocking thread, fed across the payload queue.
        let grid = CollageGrid::new(&self.settings);
        let assembly = AssemblyStage::new(Arc::clone(&self.codec), grid);
        let span = Span::current();
        let assembly_task =
            tokio::task::spawn_blocking(move || span.in_scope(|| assembly.run(payload_rx)));

        // Fetch half: both stages on the runtime.
        let search = SearchStage::new(Arc::clone(&self.catalog), self.config.failure_policy);
        let download = DownloadStage::new(
            Arc::clone(&self.fetcher),
            self.config.max_concurrent_downloads,
            self.config.failure_policy,
        );
        let query = SearchQuery {
            text: self.settings.text.clone(),
            quantity: self.settings.quantity,
        };

        let (search_result, download_result) = tokio::join!(
            search.run(&query, location_tx),
            download.run(location_rx, payload_tx)
        );

        let assembly_result = match assembly_task.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::AssemblyPanicked(e.to_string())),
        };

        let (search, download, assembled) =
            match first_failure(search_result, download_result, assembly_result) {
                Ok(all) => all,
                Err(e) => {
                    error!(error = %e, "Collage pipeline failed");
                    return Err(e);
                }
            };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            placed = assembled.summary.placed,
            skipped = assembled.summary.skipped,
            rows = assembled.collage.rows(),
            duration_ms,
            "Collage pipeline complete"
        );

        Ok(PipelineReport {
            run_id: self.run_id,
            title: self.settings.title.clone(),
            collage: assembled.collage,
            search,
            download,
            assembly: assembled.summary,
            duration_ms,
        })
    }
}

/// Pick the root cause: search before download before assembly.
fn first_failure<S, D, A>(
    search: Result<S, PipelineError>,
    download: Result<D, PipelineError>,
    assembly: Result<A, PipelineError>,
) -> Result<(S, D, A), PipelineError> {
    Ok((search?, download?, assembly?))
}
