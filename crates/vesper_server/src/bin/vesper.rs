//! Vesper - scheduled devotional and article generation.
//!
//! Runs the internal trigger server, single schedule runs, outbox drains and
//! migrations against PostgreSQL.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vesper_database::{InMemoryStore, PgStore, Store, create_pool, run_migrations};
use vesper_error::{ConfigError, VesperResult};
use vesper_pipeline::RefinementProvider;
use vesper_server::{
    AppState, ServerConfig, Services, TriggerLoop, create_router, init_observability,
    internal_secret, refinement_chain, shutdown_observability,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "vesper")]
#[command(about = "Vesper - scheduled content generation with translation fan-out")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "vesper.toml", global = true)]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the trigger API, the cron loop and the outbox worker
    Serve,
    /// Run one schedule now
    Run {
        /// Schedule id
        #[arg(long)]
        schedule: Uuid,
        /// Select, draft and refine only; write nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Drain pending translation tasks once
    DrainOutbox,
    /// Apply pending database migrations
    Migrate,
    /// Validate configuration and report credential status
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve => serve(&cli.config, cli.database_url).await?,
        Command::Run { schedule, dry_run } => {
            run_once(&cli.config, cli.database_url, schedule, dry_run).await?
        }
        Command::DrainOutbox => drain(&cli.config, cli.database_url).await?,
        Command::Migrate => migrate(cli.database_url).await?,
        Command::CheckConfig => check_config(&cli.config)?,
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

fn load_config(path: &Path) -> VesperResult<ServerConfig> {
    info!(config_file = ?path, "Loading configuration");
    Ok(ServerConfig::from_file(path)?)
}

fn postgres(database_url: Option<String>) -> VesperResult<Arc<dyn Store>> {
    let url = match database_url {
        Some(url) => url,
        None => vesper_database::database_url()?,
    };
    Ok(Arc::new(PgStore::new(create_pool(&url)?)))
}

async fn serve(path: &Path, database_url: Option<String>) -> VesperResult<()> {
    let config = load_config(path)?;
    let secret = internal_secret()?;
    init_observability("vesper", config.server.metrics_export_interval_seconds)?;

    let services = Services::from_config(&config, postgres(database_url)?)?;
    let outbox = services.spawn_outbox(Duration::from_secs(
        config.server.outbox_interval_seconds.max(1),
    ));
    let trigger = match config.server.trigger_interval_seconds {
        0 => {
            info!("Trigger loop disabled");
            None
        }
        seconds => Some(
            TriggerLoop::new(Arc::clone(&services.pipeline), Duration::from_secs(seconds))
                .spawn(),
        ),
    };

    let router = create_router(AppState::new(&services, secret));
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| ConfigError::new(format!("Cannot bind {}: {}", config.server.bind, e)))?;
    info!(bind = %config.server.bind, "Vesper listening");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    outbox.abort();
    if let Some(trigger) = trigger {
        trigger.abort();
    }
    shutdown_observability();

    if let Err(e) = served {
        warn!(error = %e, "Server stopped with error");
    }
    info!("Vesper stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn run_once(
    path: &Path,
    database_url: Option<String>,
    schedule_id: Uuid,
    dry_run: bool,
) -> VesperResult<()> {
    let config = load_config(path)?;
    let services = Services::from_config(&config, postgres(database_url)?)?;

    if dry_run {
        info!("DRY RUN MODE - nothing will be written");
        match services.pipeline.preview(schedule_id).await? {
            Some(preview) => {
                println!("source:   {}", preview.source);
                println!("provider: {}", preview.provider);
                println!("title:    {}", preview.content.title());
                println!("slug:     {}", preview.content.slug());
                println!();
                println!("{}", preview.content.body());
            }
            None => println!("No eligible source"),
        }
        return Ok(());
    }

    let outcome = services.pipeline.run(schedule_id).await?;
    println!("{}", outcome.message());

    let report = services.outbox.drain_once().await?;
    if report.claimed > 0 {
        println!(
            "translations: {} completed, {} rescheduled, {} failed",
            report.completed, report.rescheduled, report.failed
        );
    }
    Ok(())
}

async fn drain(path: &Path, database_url: Option<String>) -> VesperResult<()> {
    let config = load_config(path)?;
    let services = Services::from_config(&config, postgres(database_url)?)?;
    let report = services.outbox.drain_once().await?;
    println!(
        "claimed {}: {} completed, {} rescheduled, {} failed",
        report.claimed, report.completed, report.rescheduled, report.failed
    );
    Ok(())
}

async fn migrate(database_url: Option<String>) -> VesperResult<()> {
    let url = match database_url {
        Some(url) => url,
        None => vesper_database::database_url()?,
    };
    let applied = tokio::task::spawn_blocking(move || {
        let pool = create_pool(&url)?;
        run_migrations(&pool)
    })
    .await
    .map_err(|e| ConfigError::new(format!("Migration task failed: {}", e)))??;

    if applied.is_empty() {
        println!("Database is up to date");
    }
    for version in applied {
        println!("applied {}", version);
    }
    Ok(())
}

fn check_config(path: &Path) -> VesperResult<()> {
    let config = load_config(path)?;

    for provider in refinement_chain(&config.models)?.providers() {
        match provider {
            RefinementProvider::Available(generator) => println!(
                "refinement {}: {} ready",
                provider.label(),
                generator.model_name()
            ),
            RefinementProvider::Missing { label, env } => {
                println!("refinement {}: {} not set, will be skipped", label, env)
            }
        }
    }

    Services::from_config(&config, Arc::new(InMemoryStore::new()))?;
    match internal_secret() {
        Ok(_) => println!("internal secret: set"),
        Err(e) => println!("internal secret: {}", e.message),
    }
    println!("configuration ok");
    Ok(())
}
