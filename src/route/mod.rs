//! Route ingestion.
//!
//! Validates a raw GPS point sequence, collapses duplicates, flags suspicious
//! samples, and simplifies the path before it is turned into a claim.

pub mod ingest;

pub use ingest::{IngestedRoute, RouteError, RouteIngestor, RouteWarning};
