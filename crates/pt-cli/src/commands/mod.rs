//! CLI subcommand implementations.

pub mod ingest;
pub mod status;
pub mod timeline;
pub mod util;
