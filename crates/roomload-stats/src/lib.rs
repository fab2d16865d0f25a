//! Per-track and per-participant counters plus the derived summaries
//! rendered in load test reports.

pub mod format;
pub mod participant;
pub mod summary;
pub mod track;

pub use format::{format_bitrate, format_loss_pair, format_loss_percent, loss_ratio};
pub use participant::{ParticipantSnapshot, ParticipantStats};
pub use summary::{suite_snapshot, SuiteSummary, Summary};
pub use track::{TrackSnapshot, TrackStat};
