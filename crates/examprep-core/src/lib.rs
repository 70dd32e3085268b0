//! examprep-core: Answer scoring, progress aggregation, and question banks.
//!
//! This crate defines the data model, scoring rules, and statistics that
//! the rest of examprep builds on.

pub mod cache;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod statistics;
pub mod traits;
