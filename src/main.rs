//! Fogwalker command-line entry point.
//!
//! Replays recorded walks into the progress store and inspects or clears it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fogwalker::location::gpx::parse_gpx;
use fogwalker::location::{AccuracyFilter, LocationTracker};
use fogwalker::progress::decode_snapshot;
use fogwalker::storage::config::load_config;
use fogwalker::storage::remote::MemoryRemoteStore;
use fogwalker::storage::{Database, LocalStore, RemoteStore, PROGRESS_KEY};
use fogwalker::{AchievementEvaluator, IdentityContext, IdentityUpdate, ProgressService, ProgressSnapshot};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fogwalker", version, about = "Fog-of-war exploration tracker")]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed a GPX recording through the tracker and persist the result
    Replay {
        /// GPX file to replay
        gpx: PathBuf,
        /// Replay as this signed-in account against an in-process remote store
        #[arg(long)]
        account: Option<String>,
        /// Drop fixes less accurate than this, in meters
        #[arg(long)]
        max_accuracy: Option<f64>,
    },
    /// Print the locally stored progress
    Stats,
    /// Erase the locally stored progress
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fogwalker v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = load_config(cli.data_dir.as_deref()).context("loading configuration")?;

    std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
        format!(
            "creating data directory {}",
            config.storage.data_dir.display()
        )
    })?;
    let database = Arc::new(
        Database::open(&config.storage.database_path()).context("opening progress database")?,
    );

    match cli.command {
        Command::Replay {
            gpx,
            account,
            max_accuracy,
        } => {
            let content =
                std::fs::read(&gpx).with_context(|| format!("reading {}", gpx.display()))?;
            let fixes = parse_gpx(&content)?;

            let remote: Option<Arc<dyn RemoteStore>> = account
                .as_ref()
                .map(|_| Arc::new(MemoryRemoteStore::new()) as Arc<dyn RemoteStore>);
            let service = ProgressService::new(&config, database, remote)?;
            let identity = match account {
                Some(id) => IdentityContext::authenticated(id),
                None => IdentityContext::anonymous(),
            };
            service.apply_identity(IdentityUpdate::ready(identity));

            let threshold = max_accuracy.unwrap_or(config.tracking.max_accuracy_meters);
            let mut location = LocationTracker::new(AccuracyFilter::new(threshold));
            location.start();
            for fix in fixes {
                let Some(coord) = location.on_fix(fix) else {
                    continue;
                };
                if let Err(e) = service.ingest_fix(coord) {
                    tracing::warn!("Skipping fix: {}", e);
                }
            }
            location.stop();
            service.shutdown().await;

            println!(
                "Replayed {}: {} fixes accepted, {} dropped",
                gpx.display(),
                location.filter().accepted(),
                location.filter().rejected()
            );
            print_snapshot(&service.snapshot());
        }
        Command::Stats => {
            let snapshot = match database.get(PROGRESS_KEY)? {
                Some(json) => decode_snapshot(&json).context("decoding stored progress")?,
                None => ProgressSnapshot::default(),
            };
            print_snapshot(&snapshot);
        }
        Command::Reset => {
            database.remove(PROGRESS_KEY)?;
            println!("Local progress erased");
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &ProgressSnapshot) {
    let stats = snapshot.stats();
    println!("Distance:         {:.2} km", stats.distance_km);
    println!("Tiles discovered: {}", stats.discovered_tiles);
    println!("Path points:      {}", stats.path_len);

    let evaluator = AchievementEvaluator::default();
    println!(
        "Achievements:     {}/{} ({:.0}%)",
        stats.unlocked,
        evaluator.achievements().len(),
        evaluator.completion_percentage(snapshot)
    );
    for status in evaluator.statuses(snapshot) {
        let mark = if status.unlocked { "x" } else { " " };
        println!(
            "  [{}] {} - {}",
            mark, status.achievement.name, status.achievement.description
        );
    }
}
