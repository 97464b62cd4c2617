//! Backfill runs over small in-memory exports.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use rollcall_core::collection::Collection;
use rollcall_pipeline::{run_backfill, BackfillOptions, CollectionReport, Dispatcher};

use common::{memory_dispatcher, UnreachableStore};

fn doc(path: &str, fields: serde_json::Value, update_time: &str) -> String {
    serde_json::json!({
        "name": format!("projects/demo/databases/(default)/documents/{path}"),
        "fields": fields,
        "updateTime": update_time,
    })
    .to_string()
}

fn export(lines: &[String]) -> String {
    lines.join("\n")
}

#[tokio::test]
async fn mirrors_every_selected_collection() {
    let (dispatcher, store) = memory_dispatcher();
    let input = export(&[
        doc(
            "attendance/a1",
            serde_json::json!({
                "userId": {"stringValue": "u1"},
                "classId": {"stringValue": "c1"},
                "status": {"stringValue": "present"}
            }),
            "2024-03-01T09:00:00Z",
        ),
        String::new(),
        doc(
            "users/u1",
            serde_json::json!({"email": {"stringValue": " Ada@Example.com "}}),
            "2024-03-01T09:00:00Z",
        ),
        doc(
            "users/u2",
            serde_json::json!({"displayName": {"stringValue": "No Email"}}),
            "2024-03-01T09:00:00Z",
        ),
        doc(
            "classes/c1",
            serde_json::json!({"name": {"stringValue": "Physics"}}),
            "2024-03-01T09:00:00Z",
        ),
    ]);

    let report = run_backfill(&dispatcher, input.as_bytes(), &BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(report.processed(), 4);
    assert_eq!(report.malformed, 0);
    assert!(!report.has_failures());
    assert_eq!(
        report.collections[&Collection::Users],
        CollectionReport {
            processed: 2,
            applied: 1,
            skipped: 1,
            ..CollectionReport::default()
        }
    );
    assert_eq!(report.collections[&Collection::Sessions], CollectionReport::default());
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn rerunning_an_export_applies_nothing() {
    let (dispatcher, _store) = memory_dispatcher();
    let input = export(&[doc(
        "organizations/o1",
        serde_json::json!({"name": {"stringValue": "North"}}),
        "2024-03-01T09:00:00Z",
    )]);
    let options = BackfillOptions::default();

    run_backfill(&dispatcher, input.as_bytes(), &options)
        .await
        .unwrap();
    let second = run_backfill(&dispatcher, input.as_bytes(), &options)
        .await
        .unwrap();

    let counts = &second.collections[&Collection::Organizations];
    assert_eq!(counts.applied, 0);
    assert_eq!(counts.stale, 1);
}

#[tokio::test]
async fn unselected_and_unwatched_collections_are_ignored() {
    let (dispatcher, store) = memory_dispatcher();
    let input = export(&[
        doc(
            "classes/c1",
            serde_json::json!({"name": {"stringValue": "Physics"}}),
            "2024-03-01T09:00:00Z",
        ),
        doc(
            "courses/x1",
            serde_json::json!({"name": {"stringValue": "Legacy"}}),
            "2024-03-01T09:00:00Z",
        ),
        doc(
            "sessions/s1",
            serde_json::json!({"title": {"stringValue": "Week 1"}}),
            "2024-03-01T09:00:00Z",
        ),
    ]);
    let options = BackfillOptions {
        collections: BTreeSet::from([Collection::Sessions]),
        ..BackfillOptions::default()
    };

    let report = run_backfill(&dispatcher, input.as_bytes(), &options)
        .await
        .unwrap();

    assert_eq!(report.ignored, 2);
    assert_eq!(report.processed(), 1);
    assert_eq!(report.collections.len(), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn malformed_lines_are_counted_and_skipped() {
    let (dispatcher, store) = memory_dispatcher();
    let input = export(&[
        "{not json".to_string(),
        doc(
            "classes/c1/students/s1",
            serde_json::json!({}),
            "2024-03-01T09:00:00Z",
        ),
        doc(
            "classes/c1",
            serde_json::json!({"name": {"stringValue": "Physics"}}),
            "2024-03-01T09:00:00Z",
        ),
    ]);

    let report = run_backfill(&dispatcher, input.as_bytes(), &BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(report.malformed, 2);
    assert_eq!(report.processed(), 1);
    assert!(report.has_failures());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn non_utf8_line_is_malformed_and_neighbours_still_mirror() {
    let (dispatcher, store) = memory_dispatcher();
    let mut input = doc(
        "classes/c1",
        serde_json::json!({"name": {"stringValue": "Physics"}}),
        "2024-03-01T09:00:00Z",
    )
    .into_bytes();
    input.extend_from_slice(b"\n{\"name\": \"\xff\xfe\"}\n");
    input.extend_from_slice(
        doc(
            "classes/c2",
            serde_json::json!({"name": {"stringValue": "Chemistry"}}),
            "2024-03-01T09:00:00Z",
        )
        .as_bytes(),
    );

    let report = run_backfill(&dispatcher, input.as_slice(), &BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(report.malformed, 1);
    assert_eq!(report.collections[&Collection::Classes].applied, 2);
    assert!(report.has_failures());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn store_failures_are_counted_per_collection() {
    let dispatcher = Dispatcher::new(Arc::new(UnreachableStore));
    let lines: Vec<String> = (0..3)
        .map(|i| {
            doc(
                &format!("organizations/o{i}"),
                serde_json::json!({"name": {"stringValue": "North"}}),
                "2024-03-01T09:00:00Z",
            )
        })
        .collect();

    let report = run_backfill(
        &dispatcher,
        export(&lines).as_bytes(),
        &BackfillOptions {
            concurrency: 2,
            ..BackfillOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(report.collections[&Collection::Organizations].failed, 3);
    assert_eq!(report.failed(), 3);
    assert!(report.has_failures());
}

#[tokio::test]
async fn large_exports_span_several_chunks() {
    let (dispatcher, store) = memory_dispatcher();
    let lines: Vec<String> = (0..1_203)
        .map(|i| {
            doc(
                &format!("classes/c{i}"),
                serde_json::json!({"seat": {"integerValue": i.to_string()}}),
                "2024-03-01T09:00:00Z",
            )
        })
        .collect();

    let report = run_backfill(&dispatcher, export(&lines).as_bytes(), &BackfillOptions::default())
        .await
        .unwrap();

    assert_eq!(report.collections[&Collection::Classes].applied, 1_203);
    assert_eq!(store.len(), 1_203);
}
