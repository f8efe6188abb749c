//! Core domain logic for presence timelines.
//!
//! This crate contains the fundamental types and logic for:
//! - Normalization: collapsing per-platform client statuses into one status
//! - Reconstruction: turning ordered presence snapshots into status intervals
//! - Storage contract: the [`EventStore`] trait implemented by storage backends
//! - Service: the query entry point that ties the pieces together

pub mod day;
pub mod service;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod timeline;
pub mod types;

pub use day::{DayBounds, SUPPORTED_YEARS, is_supported};
pub use service::TimelineService;
pub use snapshot::PresenceSnapshot;
pub use status::{ClientStatus, PresenceStatus, UnknownStatus, normalize};
pub use store::{EventStore, ReadError, WriteError};
pub use timeline::{StatusInterval, StatusSample, TimelineSummary, reconstruct, summarize};
pub use types::{GuildId, UserId, ValidationError};
