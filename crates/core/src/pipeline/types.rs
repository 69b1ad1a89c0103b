use serde::Serialize;
use uuid::Uuid;

use crate::imaging::Collage;
use crate::stages::{AssemblySummary, DownloadSummary, SearchSummary};

/// Result of a successful run.
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    /// `"{text}_{timestamp}"`.
    pub title: String,
    pub collage: Collage,
    pub search: SearchSummary,
    pub download: DownloadSummary,
    pub assembly: AssemblySummary,
    pub duration_ms: u64,
}

/// Serializable view of a report, without the pixels.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary<'a> {
    pub run_id: Uuid,
    pub title: &'a str,
    /// `(height, width, channels)` of the collage.
    pub shape: (usize, usize, usize),
    pub rows: u32,
    pub search: &'a SearchSummary,
    pub download: &'a DownloadSummary,
    pub assembly: &'a AssemblySummary,
    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn summary(&self) -> ReportSummary<'_> {
        ReportSummary {
            run_id: self.run_id,
            title: &self.title,
            shape: self.collage.shape(),
            rows: self.collage.rows(),
            search: &self.search,
            download: &self.download,
            assembly: &self.assembly,
            duration_ms: self.duration_ms,
        }
    }
}
