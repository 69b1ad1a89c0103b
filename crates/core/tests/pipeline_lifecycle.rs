//! Pipeline lifecycle integration tests.
//!
//! These tests run the full collage pipeline against the mock photo service
//! and the real image codec:
//! - Row completion and partial-row dropping
//! - Early stop when the grid fills up
//! - Visibility filtering and variant selection
//! - Decode skips and channel normalization
//! - Failure policies and bounded parallel downloads

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use collage_core::{
    config::PipelineConfig,
    output_path,
    pipeline::PipelineReport,
    stages::StopReason,
    testing::{fixtures, MockPhotoService},
    validate_config, write_collage, CollagePipeline, CollageSettings, Config, ConfigError,
    FailurePolicy, ImageRsCodec, PipelineError, ResolutionError, ServiceError,
};

/// Test helper wiring a pipeline to the mock service.
struct TestHarness {
    service: MockPhotoService,
    settings: CollageSettings,
    config: PipelineConfig,
}

impl TestHarness {
    fn new(rows: u32, columns: u32, size: &str) -> Self {
        Self {
            service: MockPhotoService::new(),
            settings: fixtures::settings(rows, columns, size),
            config: PipelineConfig::default(),
        }
    }

    fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add `count` public photos named `{prefix}{i}` with valid content.
    async fn add_valid(&self, prefix: &str, count: usize) {
        for i in 0..count {
            let channels = (i % 4) as u8 + 1;
            let width = 40 + (i as u32 % 5) * 10;
            self.service
                .add_photo(
                    &format!("{}{}", prefix, i),
                    true,
                    fixtures::png_bytes(width, 30, channels),
                )
                .await;
        }
    }

    /// Add `count` public photos named `{prefix}{i}` whose content does not decode.
    async fn add_corrupt(&self, prefix: &str, count: usize) {
        for i in 0..count {
            self.service
                .add_photo(&format!("{}{}", prefix, i), true, fixtures::corrupt_bytes())
                .await;
        }
    }

    fn pipeline(&self) -> CollagePipeline {
        CollagePipeline::new(
            self.settings.clone(),
            self.config.clone(),
            Arc::new(self.service.clone()),
            Arc::new(self.service.clone()),
            Arc::new(ImageRsCodec::new()),
        )
    }

    async fn run(&self) -> Result<PipelineReport, PipelineError> {
        self.pipeline().run().await
    }
}

// =============================================================================
// Row completion
// =============================================================================

#[tokio::test]
async fn test_partial_rows_are_dropped() {
    let harness = TestHarness::new(5, 5, "240,180");
    harness.add_valid("good", 12).await;
    harness.add_corrupt("bad", 13).await;

    let report = harness.run().await.expect("pipeline should succeed");

    assert_eq!(report.assembly.received, 25);
    assert_eq!(report.assembly.placed, 12);
    assert_eq!(report.assembly.skipped, 13);
    assert_eq!(report.assembly.stop, StopReason::EndOfStream);
    assert_eq!(report.collage.rows(), 2);
    assert_eq!(report.collage.shape(), (360, 1200, 3));
}

#[tokio::test]
async fn test_fewer_than_one_row_yields_empty_collage() {
    let harness = TestHarness::new(2, 3, "16,12");
    harness.add_valid("p", 2).await;

    let report = harness.run().await.unwrap();

    assert_eq!(report.assembly.placed, 2);
    assert!(report.collage.is_empty());
    assert_eq!(report.collage.shape(), (0, 48, 3));
}

#[tokio::test]
async fn test_report_carries_title_and_run_id() {
    let harness = TestHarness::new(1, 1, "8,8");
    harness.add_valid("p", 1).await;

    let pipeline = harness.pipeline();
    let report = pipeline.run().await.unwrap();

    assert_eq!(report.run_id, pipeline.run_id());
    assert_eq!(report.title, "fixture_2024-06-15_10-30-05");
    assert_eq!(report.summary().shape, (8, 8, 3));
}

// =============================================================================
// Early stop
// =============================================================================

#[tokio::test]
async fn test_full_grid_stops_reading() {
    let harness = TestHarness::new(2, 2, "20,15");
    harness.add_valid("p", 10).await;

    let report = harness.run().await.unwrap();

    assert_eq!(report.assembly.placed, 4);
    assert_eq!(report.assembly.received, 4);
    assert_eq!(report.assembly.stop, StopReason::GridFull);
    assert_eq!(report.collage.shape(), (30, 40, 3));
    assert!(report.download.downloaded >= 4);
}

#[tokio::test]
async fn test_decode_skip_does_not_consume_a_cell() {
    let harness = TestHarness::new(1, 2, "10,10");
    harness.add_corrupt("bad", 1).await;
    harness.add_valid("good", 2).await;

    let report = harness.run().await.unwrap();

    assert_eq!(report.assembly.skipped, 1);
    assert_eq!(report.assembly.placed, 2);
    assert_eq!(report.collage.rows(), 1);
    assert_eq!(report.collage.shape(), (10, 20, 3));
}

// =============================================================================
// Search and selection
// =============================================================================

#[tokio::test]
async fn test_private_photos_never_reach_download() {
    let harness = TestHarness::new(2, 2, "10,10");
    harness.add_valid("pub", 4).await;
    for i in 0..3 {
        harness
            .service
            .add_photo(&format!("priv{}", i), false, fixtures::png_bytes(10, 10, 3))
            .await;
    }

    let report = harness.run().await.unwrap();

    assert_eq!(report.search.found, 7);
    assert_eq!(report.search.public, 4);
    for id in harness.service.variant_requests().await {
        assert!(id.starts_with("pub"), "resolved private photo {}", id);
    }
    for location in harness.service.fetched_locations().await {
        assert!(!location.contains("priv"), "downloaded {}", location);
    }
}

#[tokio::test]
async fn test_last_variant_is_downloaded() {
    let harness = TestHarness::new(1, 3, "10,10");
    harness.add_valid("p", 3).await;

    harness.run().await.unwrap();

    let fetched = harness.service.fetched_locations().await;
    assert_eq!(fetched.len(), 3);
    assert!(fetched.iter().all(|l| l.ends_with("/original")));
}

#[tokio::test]
async fn test_search_uses_query_text_and_quantity() {
    let harness = TestHarness::new(1, 1, "10,10");
    harness.add_valid("p", 1).await;

    harness.run().await.unwrap();

    let searches = harness.service.recorded_searches().await;
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].text, "fixture");
    assert_eq!(searches[0].quantity, 100);
}

#[tokio::test]
async fn test_search_failure_aborts_run() {
    let harness = TestHarness::new(1, 1, "10,10");
    harness.add_valid("p", 1).await;
    harness
        .service
        .set_next_search_error(ServiceError::Api {
            code: 100,
            message: "Invalid API Key".to_string(),
        })
        .await;

    let result = harness.run().await;
    assert!(matches!(
        result,
        Err(PipelineError::Search(ServiceError::Api { code: 100, .. }))
    ));
    assert!(harness.service.fetched_locations().await.is_empty());
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_bad_size_fails_before_any_network_activity() {
    let service = MockPhotoService::new();

    for bad in ["240", "240x180", ""] {
        let mut config = Config::default();
        config.search.text = "sunset".to_string();
        config.flickr.api_key = "key".to_string();
        config.grid.size = bad.to_string();

        let result = validate_config(&config, fixtures::started_at());
        assert!(matches!(result, Err(ConfigError::InvalidSize(_))), "{:?}", bad);
    }

    assert_eq!(service.search_count().await, 0);
}

// =============================================================================
// Failure policies
// =============================================================================

#[tokio::test]
async fn test_abort_policy_on_resolution_failure() {
    let harness = TestHarness::new(2, 2, "10,10");
    harness.add_valid("p", 4).await;
    harness.service.fail_variants("p2").await;

    let result = harness.run().await;
    match result {
        Err(PipelineError::Resolution(ResolutionError::Service { id, .. })) => {
            assert_eq!(id, "p2")
        }
        other => panic!("expected resolution failure, got {:?}", other.map(|r| r.summary().shape)),
    }
}

#[tokio::test]
async fn test_abort_policy_on_download_failure() {
    let harness = TestHarness::new(2, 2, "10,10");
    harness.add_valid("p", 4).await;
    harness.service.fail_fetch("p1").await;

    let result = harness.run().await;
    assert!(matches!(result, Err(PipelineError::Download(e)) if e.id == "p1"));
}

#[tokio::test]
async fn test_skip_policy_completes_with_fewer_cells() {
    let harness = TestHarness::new(2, 2, "10,10")
        .with_config(PipelineConfig::default().with_failure_policy(FailurePolicy::Skip));
    harness.add_valid("p", 5).await;
    harness.service.fail_variants("p0").await;
    harness.service.fail_fetch("p3").await;

    let report = harness.run().await.unwrap();

    assert_eq!(report.search.failed, 1);
    assert_eq!(report.download.failed, 1);
    assert_eq!(report.assembly.placed, 3);
    assert_eq!(report.collage.shape(), (10, 20, 3));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_sequential_downloads_by_default() {
    let harness = TestHarness::new(2, 3, "10,10");
    harness.add_valid("p", 6).await;
    harness
        .service
        .set_fetch_delay(Duration::from_millis(5))
        .await;

    harness.run().await.unwrap();

    assert_eq!(harness.service.max_concurrent_fetches().await, 1);
}

#[tokio::test]
async fn test_parallel_downloads_match_sequential_shape() {
    let sequential = TestHarness::new(3, 3, "12,9");
    sequential.add_valid("p", 8).await;
    let baseline = sequential.run().await.unwrap();

    let parallel = TestHarness::new(3, 3, "12,9")
        .with_config(PipelineConfig::default().with_max_downloads(4));
    parallel.add_valid("p", 8).await;
    parallel
        .service
        .set_fetch_delay(Duration::from_millis(20))
        .await;
    let report = parallel.run().await.unwrap();

    assert_eq!(report.assembly.placed, baseline.assembly.placed);
    assert_eq!(report.collage.shape(), baseline.collage.shape());
    assert_eq!(report.collage.shape(), (18, 36, 3));

    let peak = parallel.service.max_concurrent_fetches().await;
    assert!(peak > 1 && peak <= 4, "peak concurrency was {}", peak);
}

// =============================================================================
// Output
// =============================================================================

#[tokio::test]
async fn test_written_collage_matches_shape() {
    let harness = TestHarness::new(2, 2, "16,12");
    harness.add_valid("p", 4).await;
    let report = harness.run().await.unwrap();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = output_path(dir.path(), &report.title);
    write_collage(&report.collage, &path).unwrap();

    assert!(path.ends_with("fixture_2024-06-15_10-30-05.png"));
    let written = image::open(&path).unwrap().into_rgb8();
    assert_eq!((written.height(), written.width()), (24, 32));
}
