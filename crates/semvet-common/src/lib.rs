//! Shared result types for the semvet workspace.
//!
//! This crate holds the report algebra: the `ResultCode` ordinal and the
//! `Report` reason chain that every comparison produces.

mod report;

pub use report::{Report, ResultCode};
