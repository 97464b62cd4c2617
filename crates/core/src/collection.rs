//! The document collections under sync and their destination tables.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CoreError;

/// A watched top-level collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Attendance,
    Users,
    Organizations,
    Classes,
    Sessions,
}

/// How a collection's documents become rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    AttendanceEvent,
    AppUser,
    /// Whole document stored as one JSON column.
    Generic,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Attendance,
        Collection::Users,
        Collection::Organizations,
        Collection::Classes,
        Collection::Sessions,
    ];

    /// Collection name in the document store.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Attendance => "attendance",
            Collection::Users => "users",
            Collection::Organizations => "organizations",
            Collection::Classes => "classes",
            Collection::Sessions => "sessions",
        }
    }

    /// Destination table in the relational mirror.
    pub fn table(self) -> &'static str {
        match self {
            Collection::Attendance => "attendance_event",
            Collection::Users => "app_user",
            Collection::Organizations => "organizations_mirror",
            Collection::Classes => "classes_mirror",
            Collection::Sessions => "sessions_mirror",
        }
    }

    pub fn shape(self) -> RowShape {
        match self {
            Collection::Attendance => RowShape::AttendanceEvent,
            Collection::Users => RowShape::AppUser,
            Collection::Organizations | Collection::Classes | Collection::Sessions => {
                RowShape::Generic
            }
        }
    }
}

impl FromStr for Collection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| CoreError::UnwatchedCollection(s.to_string()))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
