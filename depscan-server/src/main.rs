//! # depscan server
//!
//! Dependency analysis and license scanning service.
//!
//! One process runs the three pipeline workers (analyzer, scan job and
//! scanner) against a PostgreSQL job store and serves the JSON API used to
//! create projects, queue analyses and browse the results.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use depscan_config::{Config, ConfigLoad, ConfigLoader};
use depscan_core::{
    CatalogServices, CatalogStore, PipelineAdapters, PipelineRuntime,
    PostgresJobStore, RuntimeSettings,
    adapters::{CommandAnalyzer, CommandScanner, GitSourceFetcher},
    services::seed_example_project,
    worker::{AnalyzerWorkerSettings, ScannerWorkerSettings},
};
use depscan_model::{AnalyzerConfig, ScannerDetails};
use depscan_server::{AppState, create_app};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "depscan-server")]
#[command(about = "Dependency analysis and license scanning pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a TOML configuration file
    #[arg(long, env = "DEPSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the API and the pipeline workers (default)
    Serve,
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_runtime_config(&cli.serve)?;

    match cli.command {
        Some(Command::Db(DbCommand::Migrate)) => run_db_migrate(&config).await,
        Some(Command::Serve) | None => run_server(config).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "info,depscan=info,sqlx=warn,tower_http=warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }

    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(
                    message = %warning.message,
                    hint = %hint,
                    "configuration warning"
                )
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    Ok(config)
}

async fn connect_store(config: &Config) -> anyhow::Result<PostgresJobStore> {
    let database_url = config.database_url()?;
    PostgresJobStore::connect(database_url, config.database.max_connections)
        .await
        .context("failed to connect to PostgreSQL")
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    store
        .run_migrations()
        .await
        .context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

fn build_adapters(config: &Config) -> PipelineAdapters {
    let scanner_details = ScannerDetails {
        name: config.scanner.name.clone(),
        version: config.scanner.version.clone(),
        configuration: config.scanner.configuration.clone(),
    };

    PipelineAdapters {
        fetcher: Arc::new(GitSourceFetcher::new(config.git.program.clone())),
        analyzer: Arc::new(CommandAnalyzer::new(
            config.analyzer.program.clone(),
            config.analyzer.args.clone(),
        )),
        scanner: Arc::new(CommandScanner::new(
            config.scanner.program.clone(),
            config.scanner.args.clone(),
            scanner_details,
        )),
    }
}

fn runtime_settings(config: &Config) -> RuntimeSettings {
    let mut analyzer =
        AnalyzerWorkerSettings::new(config.workers.analyzer_download_root());
    analyzer.backends = config.analyzer.backends.clone();
    analyzer.config = AnalyzerConfig {
        ignore_tool_versions: config.analyzer.ignore_tool_versions,
        allow_dynamic_versions: config.analyzer.allow_dynamic_versions,
    };
    analyzer.allow_moving_revision = config.analyzer.allow_moving_revision;

    RuntimeSettings {
        poll_interval: config.workers.poll_interval,
        analyzer,
        scanner: ScannerWorkerSettings::under(config.workers.data_dir()),
        enable_analyzer: config.workers.enable_analyzer,
        enable_scan_jobs: config.workers.enable_scan_jobs,
        enable_scanner: config.workers.enable_scanner,
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(connect_store(&config).await?);
    if config.database.run_migrations {
        store
            .run_migrations()
            .await
            .context("database migration failed")?;
    }

    config
        .ensure_directories()
        .with_context(|| {
            format!(
                "failed to create working directories below {}",
                config.workers.data_dir().display()
            )
        })?;

    if config.seed_example_project {
        seed_example_project(&*store).await?;
    }

    let runtime = PipelineRuntime::start(
        store.clone(),
        build_adapters(&config),
        runtime_settings(&config),
    )
    .await?;

    let catalog: Arc<dyn CatalogStore> = store;
    let router = create_app(AppState::new(CatalogServices::new(catalog)));

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting depscan server on {addr}");

    let shutdown = runtime.shutdown_token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                }
                _ = shutdown.cancelled() => {}
            }
        })
        .await?;

    runtime.shutdown().await;
    info!("depscan server stopped");
    Ok(())
}
