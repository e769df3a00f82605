// Library root: re-exports all modules so integration tests and the CLI can
// reach the pipeline's public API.

pub mod backfill;
pub mod cache;
pub mod coerce;
pub mod config;
pub mod fbref;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod table;
pub mod ucl;
pub mod writeback;
