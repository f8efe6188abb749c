//! Presence timeline CLI library.
//!
//! This crate provides the command-line boundary for the presence tracker:
//! it validates caller input and hands snapshots and queries to `pt-core`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
