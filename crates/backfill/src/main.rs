//! One-shot initial sync of the relational mirror from a document export.
//!
//! Reads newline-delimited documents, maps them exactly like live events and
//! upserts them through the same conditional statement, so it is safe to run
//! while the event receiver is live.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rollcall_core::collection::Collection;
use rollcall_db::{DbConfig, MemoryMirrorStore, MirrorStore, PgMirrorStore};
use rollcall_pipeline::backfill::DEFAULT_CONCURRENCY;
use rollcall_pipeline::{run_backfill, BackfillOptions, BackfillReport, Dispatcher};
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Replay a document export into the relational mirror.
#[derive(Parser, Debug)]
#[command(name = "rollcall-backfill", version, about)]
struct Args {
    /// Newline-delimited JSON export, one document per line (`-` for stdin).
    #[arg(long, short)]
    input: PathBuf,

    /// Comma-separated collections to mirror, e.g. `users,classes`.
    /// Defaults to every watched collection.
    #[arg(long, value_delimiter = ',')]
    collections: Vec<Collection>,

    /// Maximum number of upserts in flight.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Map and count documents without touching the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let options = BackfillOptions {
        collections: if args.collections.is_empty() {
            Collection::ALL.into_iter().collect()
        } else {
            args.collections.iter().copied().collect()
        },
        concurrency: args.concurrency.max(1),
    };
    tracing::info!(
        input = %args.input.display(),
        collections = ?options.collections,
        concurrency = options.concurrency,
        dry_run = args.dry_run,
        "Starting backfill"
    );

    let reader = open_input(&args.input).await?;

    let pg_store = if args.dry_run {
        None
    } else {
        let store = PgMirrorStore::open(&DbConfig::from_env()?)
            .await
            .context("Failed to connect to the mirror database")?;
        rollcall_db::run_migrations(store.pool())
            .await
            .context("Failed to run database migrations")?;
        Some(Arc::new(store))
    };
    let store: Arc<dyn MirrorStore> = match &pg_store {
        Some(pg_store) => pg_store.clone(),
        None => Arc::new(MemoryMirrorStore::new()),
    };

    let dispatcher = Dispatcher::new(store);
    let result = run_backfill(&dispatcher, reader, &options).await;

    if let Some(pg_store) = pg_store {
        pg_store.close().await;
    }

    let report = result.context("Failed to read export")?;
    log_report(&report);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.has_failures() {
        tracing::error!(
            failed = report.failed(),
            malformed = report.malformed,
            "Backfill finished with failures"
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn open_input(path: &Path) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open export {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn log_report(report: &BackfillReport) {
    for (collection, counts) in &report.collections {
        tracing::info!(
            %collection,
            processed = counts.processed,
            applied = counts.applied,
            stale = counts.stale,
            skipped = counts.skipped,
            failed = counts.failed,
            "Collection backfilled"
        );
    }
    tracing::info!(
        processed = report.processed(),
        ignored = report.ignored,
        malformed = report.malformed,
        "Backfill complete"
    );
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rollcall_backfill=info,rollcall_pipeline=info,rollcall_db=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    // Logs go to stderr; stdout carries the JSON report.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
