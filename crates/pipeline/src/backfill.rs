//! Initial sync from a newline-delimited document export.
//!
//! Each non-blank line holds one document in the store's JSON shape. Lines
//! are read in chunks of [`CHUNK_SIZE`] and every chunk is dispatched with at
//! most `concurrency` upserts in flight. Each document still goes through the
//! same dispatcher and conditional upsert as a live event, so replaying an
//! export over a populated mirror never rolls rows back.

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use futures::stream::{self, StreamExt};
use rollcall_core::collection::Collection;
use rollcall_core::error::CoreError;
use rollcall_core::event::Document;
use rollcall_core::notification::ChangeNotification;
use rollcall_db::DbError;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::dispatcher::{DispatchOutcome, Dispatcher};

/// Number of export lines buffered before they are dispatched.
pub const CHUNK_SIZE: usize = 500;

/// Default number of concurrent upserts.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// Collections to mirror; documents of other collections are ignored.
    pub collections: BTreeSet<Collection>,
    pub concurrency: usize,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            collections: Collection::ALL.into_iter().collect(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Counters for one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    /// Documents handed to the dispatcher.
    pub processed: u64,
    /// Rows inserted or updated.
    pub applied: u64,
    /// Rows left alone because the mirror was already as recent.
    pub stale: u64,
    /// Documents that failed validation.
    pub skipped: u64,
    /// Documents whose upsert returned an error.
    pub failed: u64,
}

/// Summary of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub collections: BTreeMap<Collection, CollectionReport>,
    /// Documents of unselected or unwatched collections.
    pub ignored: u64,
    /// Lines that were not a decodable top-level document.
    pub malformed: u64,
}

impl BackfillReport {
    fn with_collections(collections: &BTreeSet<Collection>) -> Self {
        Self {
            collections: collections
                .iter()
                .map(|c| (*c, CollectionReport::default()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn processed(&self) -> u64 {
        self.collections.values().map(|c| c.processed).sum()
    }

    pub fn failed(&self) -> u64 {
        self.collections.values().map(|c| c.failed).sum()
    }

    /// Whether any document could not be mirrored. Malformed lines count.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.malformed > 0
    }

    fn record(&mut self, collection: Collection, result: Result<DispatchOutcome, DbError>) {
        let counts = self.collections.entry(collection).or_default();
        counts.processed += 1;
        match result {
            Ok(DispatchOutcome::Upserted { applied: true }) => counts.applied += 1,
            Ok(DispatchOutcome::Upserted { applied: false }) => counts.stale += 1,
            Ok(DispatchOutcome::Skipped { .. }) => counts.skipped += 1,
            Ok(DispatchOutcome::Deleted { .. }) => {}
            Err(_) => counts.failed += 1,
        }
    }
}

enum Line {
    Document(ChangeNotification),
    Ignored,
    Malformed(String),
}

fn parse_line(line: &str) -> Line {
    let document: Document = match serde_json::from_str(line) {
        Ok(document) => document,
        Err(e) => return Line::Malformed(e.to_string()),
    };
    match document.into_notification() {
        Ok(notification) => Line::Document(notification),
        Err(CoreError::UnwatchedCollection(_)) => Line::Ignored,
        Err(e) => Line::Malformed(e.to_string()),
    }
}

/// Replay an export through `dispatcher`.
///
/// Only I/O errors on `reader` abort the run, after the documents already
/// read are dispatched. Per-document failures, including lines that are not
/// UTF-8, are counted in the report.
pub async fn run_backfill<R>(
    dispatcher: &Dispatcher,
    reader: R,
    options: &BackfillOptions,
) -> io::Result<BackfillReport>
where
    R: AsyncBufRead + Unpin,
{
    let concurrency = options.concurrency.max(1);
    let mut report = BackfillReport::with_collections(&options.collections);
    let mut chunk = Vec::with_capacity(CHUNK_SIZE);
    let mut segments = reader.split(b'\n');
    let mut line_no = 0_u64;

    loop {
        let raw = match segments.next_segment().await {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(e) => {
                if !chunk.is_empty() {
                    dispatch_chunk(dispatcher, &mut chunk, concurrency, &mut report).await;
                }
                tracing::error!(
                    line = line_no + 1,
                    error = %e,
                    processed = report.processed(),
                    "Export read failed"
                );
                return Err(e);
            }
        };
        line_no += 1;

        let parsed = match std::str::from_utf8(&raw) {
            Ok(text) if text.trim().is_empty() => continue,
            Ok(text) => parse_line(text.trim()),
            Err(e) => Line::Malformed(e.to_string()),
        };

        match parsed {
            Line::Document(notification) if options.collections.contains(&notification.collection) => {
                chunk.push(notification);
            }
            Line::Document(_) | Line::Ignored => report.ignored += 1,
            Line::Malformed(error) => {
                tracing::warn!(line = line_no, %error, "Skipping malformed export line");
                report.malformed += 1;
            }
        }

        if chunk.len() >= CHUNK_SIZE {
            dispatch_chunk(dispatcher, &mut chunk, concurrency, &mut report).await;
        }
    }

    if !chunk.is_empty() {
        dispatch_chunk(dispatcher, &mut chunk, concurrency, &mut report).await;
    }

    Ok(report)
}

async fn dispatch_chunk(
    dispatcher: &Dispatcher,
    chunk: &mut Vec<ChangeNotification>,
    concurrency: usize,
    report: &mut BackfillReport,
) {
    let size = chunk.len();
    let results: Vec<_> = stream::iter(chunk.drain(..))
        .map(|notification| async move {
            let result = dispatcher.dispatch(&notification).await;
            (notification.collection, result)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for (collection, result) in results {
        report.record(collection, result);
    }

    tracing::info!(
        documents = size,
        processed = report.processed(),
        failed = report.failed(),
        "Backfill chunk dispatched"
    );
}
