//! mlx-indexer - music library indexing service
//!
//! `serve` (default) exposes the indexing engine over HTTP + SSE backed by SQLite.
//! `scan` runs one job inline and prints its report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};

use mlx_common::events::{EventBus, IndexingEvent};
use mlx_indexer::config::{write_default_config, ConfigOverrides, IndexerConfig};
use mlx_indexer::db::{cleanup_stale_jobs, init_database_pool, SqliteJobStore};
use mlx_indexer::models::{IndexingJob, JobStatus, Warning};
use mlx_indexer::services::{JobController, MemoryJobStore};
use mlx_indexer::AppState;

/// Command-line arguments for mlx-indexer
#[derive(Parser, Debug)]
#[command(name = "mlx-indexer")]
#[command(about = "Music library indexing service")]
#[command(version)]
struct Args {
    /// Config file (default: <config_dir>/mlx/config.toml)
    #[arg(short, long, global = true, env = "MLX_CONFIG")]
    config: Option<PathBuf>,

    /// Album folders processed concurrently
    #[arg(long, global = true)]
    parallelism: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Listen address, e.g. 127.0.0.1:5740
        #[arg(short, long)]
        bind: Option<String>,

        /// SQLite database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Library root used when a start request names none
        #[arg(short, long)]
        library_root: Option<PathBuf>,
    },

    /// Index one library and print the report
    Scan {
        /// Library root to index
        path: PathBuf,

        /// Print the job as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a config file with default values
    InitConfig {
        /// Destination (default: <config_dir>/mlx/config.toml)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve {
        bind: None,
        database: None,
        library_root: None,
    });

    let mut overrides = ConfigOverrides {
        config_path: args.config,
        parallelism: args.parallelism,
        ..Default::default()
    };

    match command {
        Command::Serve {
            bind,
            database,
            library_root,
        } => {
            overrides.bind_address = bind;
            overrides.database_path = database;
            overrides.library_root = library_root;
            let config = IndexerConfig::load(overrides)?;
            mlx_common::logging::init_tracing(&config.log_level);
            serve(config).await
        }
        Command::Scan { path, json } => {
            let config = IndexerConfig::load(overrides)?;
            mlx_common::logging::init_tracing(&config.log_level);
            let job = scan(&config, path).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                print_report(&job);
            }
            if job.status == JobStatus::Failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::InitConfig { path } => {
            mlx_common::logging::init_tracing("info");
            let path = path
                .or_else(mlx_common::config::default_config_path)
                .context("No config directory on this platform; pass a path")?;
            write_default_config(&path)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn serve(config: IndexerConfig) -> Result<()> {
    info!("Starting mlx-indexer");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    let pool = init_database_pool(&config.database_path)
        .await
        .context("Failed to open database")?;

    let interrupted = cleanup_stale_jobs(&pool).await?;
    if interrupted > 0 {
        info!(interrupted, "Recovered jobs left running by a previous process");
    }

    // 100 event capacity
    let event_bus = EventBus::new(100);
    let store = Arc::new(SqliteJobStore::new(pool));
    let controller = JobController::with_default_decoders(store, &config.indexing, event_bus);

    let state = AppState::new(controller).with_default_library_root(config.library_root.clone());
    let app = mlx_indexer::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Run one job against a process-local store
///
/// Ctrl+C cancels the job cooperatively; the partial report is still printed.
async fn scan(config: &IndexerConfig, path: PathBuf) -> Result<IndexingJob> {
    let controller = JobController::with_default_decoders(
        Arc::new(MemoryJobStore::new()),
        &config.indexing,
        EventBus::new(100),
    );

    // Subscribe before starting so the terminal event cannot be missed
    let mut events = controller.events().subscribe();
    let job_id = controller.start_indexing_job(&path).await?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut cancel_sent = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(IndexingEvent::JobCompleted { job_id: id, .. })
                | Ok(IndexingEvent::JobFailed { job_id: id, .. }) if id == job_id => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown, if !cancel_sent => {
                cancel_sent = true;
                if let Err(e) = controller.cancel_job(job_id).await {
                    error!(error = %e, "Cancel failed");
                }
            }
        }
    }

    Ok(controller.get_job_status(job_id).await?)
}

fn print_report(job: &IndexingJob) {
    println!("Job {} [{}] {}", job.job_id, job.status, job.library_root);
    println!("Progress: {}%", job.progress);
    if let Some(error) = &job.error {
        println!("Error: {}", error);
    }

    println!("Warnings: {}", job.warnings.len());
    for warning in &job.warnings {
        match warning {
            Warning::MetaflacParsingError {
                file_path,
                error_message,
            } => println!("  [tags]    {}: {}", file_path, error_message),
            Warning::LyricsParsingError {
                file_path,
                error_message,
            } => println!("  [lyrics]  {}: {}", file_path, error_message),
            Warning::SubdirectoriesWarning { dir_path } => {
                println!("  [subdir]  {}", dir_path)
            }
            Warning::FolderMetadataWarning {
                folder_path,
                messages,
            } => {
                println!("  [folder]  {}", folder_path);
                for message in messages {
                    println!("              - {}", message);
                }
            }
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
