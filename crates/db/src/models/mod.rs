//! Read models for the mirror tables.

pub mod mirror;
