//! Last-writer-wins rule for mirrored rows.
//!
//! A write replaces the stored row only when its `(updated_at, version)`
//! pair is strictly greater, compared lexicographically. Exact ties keep the
//! stored row, so replaying a notification is a no-op. The relational store
//! evaluates the same comparison inside the upsert statement
//! (see `rollcall_db::repositories::MirrorRepo`).

use crate::types::Timestamp;

/// The ordering key of a row. Field order defines the comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Recency {
    pub updated_at: Timestamp,
    pub version: i64,
}

/// Whether `incoming` should overwrite a row currently at `stored`.
pub fn should_apply(incoming: Recency, stored: Recency) -> bool {
    incoming > stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn key(hour: u32, version: i64) -> Recency {
        Recency {
            updated_at: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            version,
        }
    }

    #[test]
    fn newer_timestamp_wins_even_with_lower_version() {
        assert!(should_apply(key(10, 1), key(9, 5)));
    }

    #[test]
    fn older_timestamp_loses_even_with_higher_version() {
        assert!(!should_apply(key(8, 9), key(9, 1)));
    }

    #[test]
    fn equal_timestamp_falls_back_to_version() {
        assert!(should_apply(key(9, 2), key(9, 1)));
        assert!(!should_apply(key(9, 1), key(9, 2)));
    }

    #[test]
    fn exact_tie_keeps_stored_row() {
        assert!(!should_apply(key(9, 1), key(9, 1)));
    }
}
