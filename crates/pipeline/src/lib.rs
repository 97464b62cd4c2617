//! Routing of change notifications into the relational mirror.
//!
//! [`Dispatcher`] handles one notification at a time for the event receiver;
//! [`backfill::run_backfill`] streams an export through the same dispatcher.

pub mod backfill;
pub mod dispatcher;
pub mod error;

pub use backfill::{run_backfill, BackfillOptions, BackfillReport, CollectionReport};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::PipelineError;
