//! SHLS chef CLI
//!
//! Operator entry point: one command per pipeline stage plus `run`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shls_chef::{
    config::{box_token, conversion_service_url, load_config},
    error::Result,
    models::Stage,
    pipeline::{self, PipelineContext, Step},
    services::YtDlp,
    storage::{CheckpointStorage, LocalStorage},
    utils::http::HttpClient,
};

/// SHLS chef - toolkit content pipeline
#[derive(Parser, Debug)]
#[command(
    name = "shls-chef",
    version,
    about = "Crawl, download, convert and package the SHLS toolkit"
)]
struct Cli {
    /// Working data directory (config.toml, trees, downloads)
    #[arg(short, long, default_value = "chefdata")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the working directories
    Setup,

    /// Crawl the toolkit site into the web resource tree
    Crawl,

    /// Resolve and download every linked resource
    Scrape,

    /// Convert downloaded documents to the portable format
    Transform,

    /// Build the publishable tree
    Load,

    /// Run all stages: crawl → scrape → transform → load
    Run {
        /// Resume from this stage, reusing earlier checkpoints
        #[arg(long, default_value = "crawl")]
        from: Step,
    },

    /// Validate configuration and existing checkpoints
    Validate,

    /// Show which checkpoints exist
    Info,
}

impl Command {
    fn step(&self) -> Option<Step> {
        match self {
            Command::Crawl => Some(Step::Crawl),
            Command::Scrape => Some(Step::Scrape),
            Command::Transform => Some(Step::Transform),
            Command::Load => Some(Step::Load),
            _ => None,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.data_dir);
    let dirs = config.paths.resolve(&cli.data_dir);
    let storage = LocalStorage::new(&dirs.trees);

    log::info!("Using data directory {}", cli.data_dir.display());

    match cli.command {
        Command::Setup => {
            pipeline::run_setup(&dirs).await?;
            log::info!("Working directories ready under {}", cli.data_dir.display());
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            for stage in Stage::all() {
                if storage.peek_checkpoint(stage).await?.is_none() {
                    log::info!("- {} tree: not found", stage);
                    continue;
                }
                if let Err(e) = storage.read_checkpoint(stage).await {
                    log::error!("{} tree is invalid: {}", stage, e);
                    return Err(e);
                }
                log::info!("✓ {} tree OK", stage);
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Trees directory: {}", dirs.trees.display());
            for stage in Stage::all() {
                match storage.peek_checkpoint(stage).await {
                    Ok(Some(cp)) => log::info!(
                        "{}: {} tree v{} from {} ({} nodes, {} links)",
                        stage.file_name(),
                        cp.stage,
                        cp.schema_version,
                        cp.created_at.to_rfc3339(),
                        cp.tree.node_count(),
                        cp.tree.links().len()
                    ),
                    Ok(None) => log::info!("{}: not found", stage.file_name()),
                    Err(e) => log::warn!("{}: unreadable ({})", stage.file_name(), e),
                }
            }
            let publishable = storage.publishable_path();
            log::info!(
                "{}: {}",
                publishable.display(),
                if publishable.exists() { "exists" } else { "not found" }
            );
        }

        command => {
            // Fail before any network activity when the environment is incomplete.
            let service_url = conversion_service_url(&config)?;
            let needs_token = match &command {
                Command::Run { from } => *from <= Step::Scrape,
                other => other.step() == Some(Step::Scrape),
            };
            let token = if needs_token { Some(box_token()?) } else { None };

            let http = HttpClient::new(&config.http)?;
            let videos = YtDlp::new(&config.providers.video_extractor);
            let ctx = PipelineContext {
                config: &config,
                dirs: &dirs,
                http: &http,
                storage: &storage,
                videos: &videos,
                service_url: &service_url,
                box_token: token.as_deref(),
            };

            match command {
                Command::Run { from } => pipeline::run_pipeline(&ctx, from).await?,
                other => {
                    if let Some(step) = other.step() {
                        ctx.run_step(step).await?;
                    }
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
