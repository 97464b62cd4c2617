//! Domain core for the rollcall document mirror.
//!
//! Everything in this crate is pure: decoding document-store values,
//! resolving sync metadata, mapping documents to relational rows and the
//! last-writer-wins rule. Database access lives in `rollcall-db`.

pub mod aliases;
pub mod collection;
pub mod conflict;
pub mod error;
pub mod event;
pub mod mapper;
pub mod metadata;
pub mod notification;
pub mod row;
pub mod serializer;
pub mod types;
pub mod value;
