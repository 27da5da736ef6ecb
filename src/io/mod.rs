//! Reshaping of published rows into analysis-ready tables, and CSV export of
//! the results.

pub mod export;
pub mod ingest;
