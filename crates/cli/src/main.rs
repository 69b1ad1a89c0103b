mod metrics;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use collage_core::{
    load_config, output_path, validate_config, write_collage, CollagePipeline, Config,
    FailurePolicy, FlickrClient, ImageRsCodec, SanitizedConfig,
};

/// Search Flickr and assemble the results into a grid collage.
#[derive(Debug, Parser)]
#[command(name = "collage", version)]
struct Args {
    /// Search text
    #[arg(short = 't', long)]
    text: Option<String>,

    /// Number of photos to request [default: 100]
    #[arg(short = 'q', long)]
    quantity: Option<u32>,

    /// Grid rows [default: 5]
    #[arg(short = 'r', long)]
    rows: Option<u32>,

    /// Grid columns [default: 5]
    #[arg(short = 'c', long)]
    columns: Option<u32>,

    /// Cell size as "width,height" [default: 240,180]
    #[arg(short = 's', long)]
    size: Option<String>,

    /// TOML configuration file
    #[arg(long, env = "COLLAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the collage is written to [default: .]
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Downloads in flight at once [default: 1]
    #[arg(long)]
    max_downloads: Option<usize>,

    /// What to do when one photo fails to resolve or download [default: abort]
    #[arg(long, value_enum)]
    failure_policy: Option<PolicyArg>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Abort,
    Skip,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Abort => FailurePolicy::Abort,
            PolicyArg::Skip => FailurePolicy::Skip,
        }
    }
}

impl Args {
    /// Command-line flags win over every other configuration layer.
    fn apply(&self, config: &mut Config) {
        if let Some(text) = &self.text {
            config.search.text = text.clone();
        }
        if let Some(quantity) = self.quantity {
            config.search.quantity = quantity;
        }
        if let Some(rows) = self.rows {
            config.grid.rows = rows;
        }
        if let Some(columns) = self.columns {
            config.grid.columns = columns;
        }
        if let Some(size) = &self.size {
            config.grid.size = size.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(max) = self.max_downloads {
            config.pipeline.max_concurrent_downloads = max;
        }
        if let Some(policy) = self.failure_policy {
            config.pipeline.failure_policy = policy.into();
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.json_logs);

    let show_metrics = args.metrics;
    let result = run(args).await;
    let code = finish(result, show_metrics, &mut std::io::stdout());
    if code != 0 {
        std::process::exit(code);
    }
}

/// Dump metrics if requested, on failure as well as success, and pick the exit code.
fn finish(result: Result<()>, show_metrics: bool, out: &mut impl Write) -> i32 {
    if show_metrics {
        match metrics::encode_metrics() {
            Ok(text) => {
                if let Err(e) = out.write_all(text.as_bytes()) {
                    warn!(error = %e, "Failed to print metrics");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
    }

    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            1
        }
    }
}

/// Export `KEY=value` lines from a `.env` file in the working directory or a
/// parent. Variables already set in the environment keep their value.
fn load_env_file() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "Loaded environment file");
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable .env file");
            None
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn run(args: Args) -> Result<()> {
    // Fixed once so the title does not drift during the run
    let started_at = Local::now().naive_local();

    load_env_file();
    let mut config = load_config(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load config".to_string(),
    })?;
    args.apply(&mut config);

    let settings =
        validate_config(&config, started_at).context("Configuration validation failed")?;

    info!(
        config = %serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default(),
        "Configuration loaded"
    );

    let client = Arc::new(
        FlickrClient::new(config.flickr.clone()).context("Failed to create Flickr client")?,
    );
    let pipeline = CollagePipeline::new(
        settings,
        config.pipeline.clone(),
        client.clone(),
        client,
        Arc::new(ImageRsCodec::new()),
    );
    info!(run_id = %pipeline.run_id(), title = %pipeline.settings().title, "Collage run starting");

    let report = tokio::select! {
        result = pipeline.run() => result.context("Collage pipeline failed")?,
        _ = shutdown_signal() => bail!("Interrupted, no collage written"),
    };

    info!(
        summary = %serde_json::to_string(&report.summary()).unwrap_or_default(),
        "Run summary"
    );

    if report.collage.is_empty() {
        warn!(
            placed = report.assembly.placed,
            columns = report.collage.columns(),
            "Not enough images for a single row"
        );
        bail!(
            "Collage has no complete rows ({} images placed, {} needed per row)",
            report.assembly.placed,
            report.collage.columns()
        );
    }

    let path = output_path(&config.output.dir, &report.title);
    write_collage(&report.collage, &path)
        .with_context(|| format!("Failed to write collage to {:?}", path))?;
    println!("{}", path.display());

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let args = Args::try_parse_from([
            "collage", "-t", "red panda", "-q", "50", "-r", "3", "-c", "4", "-s", "120,90",
        ])
        .unwrap();

        assert_eq!(args.text.as_deref(), Some("red panda"));
        assert_eq!(args.quantity, Some(50));
        assert_eq!(args.rows, Some(3));
        assert_eq!(args.columns, Some(4));
        assert_eq!(args.size.as_deref(), Some("120,90"));
        assert!(!args.metrics);
    }

    #[test]
    fn test_apply_overrides_only_given_flags() {
        let args = Args::try_parse_from([
            "collage",
            "--text",
            "sunset",
            "--max-downloads",
            "4",
            "--failure-policy",
            "skip",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.search.text, "sunset");
        assert_eq!(config.search.quantity, 100);
        assert_eq!(config.grid.rows, 5);
        assert_eq!(config.grid.size, "240,180");
        assert_eq!(config.pipeline.max_concurrent_downloads, 4);
        assert_eq!(config.pipeline.failure_policy, FailurePolicy::Skip);
    }

    #[test]
    fn test_env_file_supplies_api_key() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(".env", "API_KEY=from-env-file\nCOLLAGE_GRID__ROWS=7\n")?;

            assert!(load_env_file().is_some());
            let config = load_config(None).unwrap();
            assert_eq!(config.flickr.api_key, "from-env-file");
            assert_eq!(config.grid.rows, 7);

            std::env::remove_var("API_KEY");
            std::env::remove_var("COLLAGE_GRID__ROWS");
            Ok(())
        });
    }

    #[test]
    fn test_environment_wins_over_env_file() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("API_KEY", "from-shell");
            jail.create_file(".env", "API_KEY=from-env-file\n")?;

            load_env_file();
            let config = load_config(None).unwrap();
            assert_eq!(config.flickr.api_key, "from-shell");
            Ok(())
        });
    }

    #[test]
    fn test_metrics_printed_on_failure() {
        let mut out = Vec::new();
        let code = finish(Err(anyhow::anyhow!("search failed")), true, &mut out);

        assert_eq!(code, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("collage_downloaded_bytes_total"));
    }

    #[test]
    fn test_metrics_not_printed_unless_asked() {
        let mut out = Vec::new();
        assert_eq!(finish(Ok(()), false, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = Args::try_parse_from(["collage", "--failure-policy", "retry"]);
        assert!(result.is_err());
    }
}
