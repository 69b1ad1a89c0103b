pub mod config;
pub mod imaging;
pub mod metrics;
pub mod output;
pub mod photo;
pub mod pipeline;
pub mod queue;
pub mod resolver;
pub mod stages;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, parse_cell_size, validate_config, CellSize,
    CollageSettings, Config, ConfigError, FailurePolicy, SanitizedConfig,
};
pub use imaging::{Collage, CollageGrid, ImageCodec, ImageRsCodec};
pub use output::{output_path, write_collage, OutputError};
pub use photo::{ContentFetcher, FlickrClient, PhotoCatalog, ServiceError};
pub use pipeline::{CollagePipeline, PipelineError, PipelineReport};
pub use resolver::{MetadataResolver, ResolutionError};
