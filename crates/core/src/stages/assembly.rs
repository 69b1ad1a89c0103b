use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::CellSize;
use crate::imaging::{normalize, Collage, CollageGrid, DecodedImage, ImageCodec};
use crate::metrics;
use crate::photo::RawPayload;
use crate::pipeline::PipelineError;
use crate::queue::{Delivery, QueueReceiver};

/// Why the assembly loop stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every cell was filled; the rest of the stream was left unread.
    GridFull,
    /// The terminal marker arrived.
    EndOfStream,
}

/// Counters reported by [`AssemblyStage::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblySummary {
    pub received: usize,
    pub placed: usize,
    /// Payloads that could not be decoded or normalized.
    pub skipped: usize,
    pub stop: StopReason,
}

/// Output of a finished assembly.
#[derive(Debug)]
pub struct Assembled {
    pub collage: Collage,
    pub summary: AssemblySummary,
}

/// Decodes payloads and fills the grid, one at a time.
///
/// Runs synchronously; meant for a blocking thread.
pub struct AssemblyStage {
    codec: Arc<dyn ImageCodec>,
    grid: CollageGrid,
}

impl AssemblyStage {
    pub fn new(codec: Arc<dyn ImageCodec>, grid: CollageGrid) -> Self {
        Self { codec, grid }
    }

    /// Read payloads until the grid is full or the terminal marker arrives.
    ///
    /// The receiver is dropped on return, which tells upstream stages to stop.
    pub fn run(
        mut self,
        mut payloads: QueueReceiver<RawPayload>,
    ) -> Result<Assembled, PipelineError> {
        let start = Instant::now();
        let cell = self.grid.cell_size();
        let mut received = 0;
        let mut placed = 0;
        let mut skipped = 0;

        let stop = loop {
            if self.grid.is_full() {
                break StopReason::GridFull;
            }

            let payload = match payloads.blocking_recv()? {
                Delivery::Item(payload) => payload,
                Delivery::Finished => break StopReason::EndOfStream,
            };
            received += 1;

            match self.prepare(&payload, cell) {
                Some(image) => {
                    let position = self.grid.place(&image)?;
                    placed += 1;
                    metrics::CELLS_PLACED.inc();
                    debug!(
                        id = ?payload.id,
                        row = position.row,
                        column = position.column,
                        "Placed cell"
                    );
                }
                None => {
                    skipped += 1;
                    metrics::DECODE_SKIPS.inc();
                }
            }
        };
        drop(payloads);

        let collage = self.grid.finalize();
        metrics::STAGE_DURATION
            .with_label_values(&["assembly"])
            .observe(start.elapsed().as_secs_f64());

        info!(
            received,
            placed,
            skipped,
            ?stop,
            rows = collage.rows(),
            "Assembly finished"
        );

        Ok(Assembled {
            collage,
            summary: AssemblySummary {
                received,
                placed,
                skipped,
                stop,
            },
        })
    }

    /// Decode, normalize to three channels and resize to the cell size.
    fn prepare(&self, payload: &RawPayload, cell: CellSize) -> Option<DecodedImage> {
        let raw = match self.codec.decode(&payload.bytes) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(id = ?payload.id, error = %e, "Skipping undecodable payload");
                return None;
            }
        };

        let channels = raw.channels;
        let Some(image) = normalize(raw) else {
            debug!(id = ?payload.id, channels, "Skipping image with unusable pixel data");
            return None;
        };

        Some(self.codec.resize(&image, cell.width, cell.height))
    }
}
