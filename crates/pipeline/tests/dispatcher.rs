//! Dispatcher behaviour against the in-memory store.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use rollcall_core::collection::Collection;
use rollcall_core::error::CoreError;
use rollcall_core::event::DocumentEventData;
use rollcall_core::mapper::SkipReason;
use rollcall_core::notification::ChangeNotification;
use rollcall_core::row::MirrorRow;
use rollcall_core::value::Value;
use rollcall_db::DbError;
use rollcall_pipeline::{DispatchOutcome, Dispatcher, PipelineError};

use common::{at, attendance_write, fields, memory_dispatcher, text, UnreachableStore};

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn attendance_write_is_mirrored_once() {
    let (dispatcher, store) = memory_dispatcher();
    let notification = attendance_write("present", 9, 1);

    assert_eq!(
        dispatcher.dispatch(&notification).await.unwrap(),
        DispatchOutcome::Upserted { applied: true }
    );
    let first = store.get(Collection::Attendance, "a1").unwrap();

    // Replaying the same notification changes nothing.
    assert_eq!(
        dispatcher.dispatch(&notification).await.unwrap(),
        DispatchOutcome::Upserted { applied: false }
    );
    assert_eq!(store.get(Collection::Attendance, "a1").unwrap(), first);

    let MirrorRow::AttendanceEvent(row) = first else {
        panic!("expected attendance row");
    };
    assert_eq!(row.user_id, "u1");
    assert_eq!(row.course_id, "c1");
    assert_eq!(row.status, "present");
    assert_eq!(row.ts_utc, at(8));
    assert_eq!(row.sync.version, 1);
}

#[tokio::test]
async fn reverse_order_delivery_converges_on_newest() {
    let (dispatcher, store) = memory_dispatcher();

    dispatcher
        .dispatch(&attendance_write("late", 10, 2))
        .await
        .unwrap();
    let outcome = dispatcher
        .dispatch(&attendance_write("present", 9, 1))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Upserted { applied: false });
    let row = store.get(Collection::Attendance, "a1").unwrap();
    assert_eq!(row.sync().version, 2);
    assert_eq!(row.sync().updated_at, at(10));
}

#[tokio::test]
async fn attendance_without_ids_is_skipped_without_error() {
    let (dispatcher, store) = memory_dispatcher();
    let notification = ChangeNotification::written(
        Collection::Attendance,
        "a2",
        fields(&[("status", text("present"))]),
        Some(at(9)),
    );

    let outcome = dispatcher.dispatch(&notification).await.unwrap();

    assert_matches!(
        outcome,
        DispatchOutcome::Skipped {
            reason: SkipReason::MissingUserOrCourse { .. }
        }
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn user_without_email_is_skipped() {
    let (dispatcher, store) = memory_dispatcher();
    let notification = ChangeNotification::written(
        Collection::Users,
        "u1",
        fields(&[("displayName", text("Ada"))]),
        Some(at(9)),
    );

    assert_eq!(
        dispatcher.dispatch(&notification).await.unwrap(),
        DispatchOutcome::Skipped {
            reason: SkipReason::MissingEmail
        }
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn generic_collections_store_sanitized_json() {
    let (dispatcher, store) = memory_dispatcher();
    let notification = ChangeNotification::written(
        Collection::Sessions,
        "s1",
        fields(&[
            ("title", text("Week 1")),
            (
                "schedule",
                Value::Map(fields(&[
                    ("startsAt", Value::Timestamp(at(8))),
                    ("room", Value::Unset),
                ])),
            ),
            ("version", Value::Integer(3)),
        ]),
        Some(at(9)),
    );

    dispatcher.dispatch(&notification).await.unwrap();

    let MirrorRow::Generic(row) = store.get(Collection::Sessions, "s1").unwrap() else {
        panic!("expected generic row");
    };
    assert_eq!(
        row.data,
        serde_json::json!({
            "title": "Week 1",
            "schedule": {"startsAt": "2024-03-01T08:00:00.000Z"}
        })
    );
    assert_eq!(row.sync.version, 3);
}

// ---------------------------------------------------------------------------
// Deletes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_row_regardless_of_version() {
    let (dispatcher, store) = memory_dispatcher();
    dispatcher
        .dispatch(&attendance_write("present", 23, 99))
        .await
        .unwrap();

    let delete = ChangeNotification::deleted(Collection::Attendance, "a1");
    assert_eq!(
        dispatcher.dispatch(&delete).await.unwrap(),
        DispatchOutcome::Deleted { removed: true }
    );
    assert!(store.get(Collection::Attendance, "a1").is_none());

    assert_eq!(
        dispatcher.dispatch(&delete).await.unwrap(),
        DispatchOutcome::Deleted { removed: false }
    );
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_failures_propagate() {
    let dispatcher = Dispatcher::new(Arc::new(UnreachableStore));

    let err = dispatcher
        .dispatch(&attendance_write("present", 9, 1))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Database(_));

    let err = dispatcher
        .dispatch(&ChangeNotification::deleted(Collection::Users, "u1"))
        .await
        .unwrap_err();
    assert_matches!(err, DbError::Database(_));
}

#[tokio::test]
async fn skipped_documents_never_reach_the_store() {
    let dispatcher = Dispatcher::new(Arc::new(UnreachableStore));
    let notification =
        ChangeNotification::written(Collection::Users, "u1", fields(&[]), Some(at(9)));

    assert_matches!(
        dispatcher.dispatch(&notification).await,
        Ok(DispatchOutcome::Skipped { .. })
    );
}

#[tokio::test]
async fn handle_event_decodes_then_dispatches() {
    let (dispatcher, store) = memory_dispatcher();
    let event: DocumentEventData = serde_json::from_value(serde_json::json!({
        "value": {
            "name": "projects/demo/databases/(default)/documents/users/u1",
            "fields": {"email": {"stringValue": "Ada@Example.com"}},
            "updateTime": "2024-03-01T09:00:00Z"
        }
    }))
    .unwrap();

    let outcome = dispatcher.handle_event(event, None, None).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Upserted { applied: true });
    let MirrorRow::AppUser(row) = store.get(Collection::Users, "u1").unwrap() else {
        panic!("expected user row");
    };
    assert_eq!(row.email, "ada@example.com");
}

#[tokio::test]
async fn handle_event_rejects_unwatched_collection() {
    let (dispatcher, _store) = memory_dispatcher();

    let err = dispatcher
        .handle_event(
            DocumentEventData::default(),
            Some("documents/courses/c1"),
            None,
        )
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Event(CoreError::UnwatchedCollection(_)));
    assert!(!err.is_retryable());
}
