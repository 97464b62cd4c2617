//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod mirror_repo;

pub use mirror_repo::MirrorRepo;
