use std::time::Duration;

use crate::participant::ParticipantSnapshot;

/// Aggregate over one participant's tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub tracks: usize,
    pub expected: usize,
    pub bytes: u64,
    pub elapsed: Duration,
    pub packets: u64,
    pub dropped: u64,
    /// Empty when the participant finished without error.
    pub err_string: String,
}

/// Aggregate over every participant in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    pub tracks: usize,
    pub expected: usize,
    pub bytes: u64,
    pub elapsed: Duration,
    pub packets: u64,
    pub dropped: u64,
    pub err_count: usize,
}

impl Summary {
    /// Reduces a participant snapshot; `expected` comes from the
    /// participant's role.
    pub fn from_snapshot(snapshot: &ParticipantSnapshot, expected: usize) -> Self {
        let mut summary = Summary {
            tracks: snapshot.tracks.len(),
            expected,
            elapsed: snapshot.elapsed,
            err_string: snapshot.error.clone().unwrap_or_default(),
            ..Summary::default()
        };
        for track in &snapshot.tracks {
            summary.bytes += track.bytes;
            summary.packets += track.packets;
            summary.dropped += track.dropped;
        }
        summary
    }

    pub fn has_error(&self) -> bool {
        !self.err_string.is_empty()
    }
}

/// Sums every field across `summaries`, counting the ones that ended in
/// error.
pub fn suite_snapshot<'a>(summaries: impl IntoIterator<Item = &'a Summary>) -> SuiteSummary {
    summaries
        .into_iter()
        .fold(SuiteSummary::default(), |mut total, s| {
            total.tracks += s.tracks;
            total.expected += s.expected;
            total.bytes += s.bytes;
            total.elapsed += s.elapsed;
            total.packets += s.packets;
            total.dropped += s.dropped;
            if s.has_error() {
                total.err_count += 1;
            }
            total
        })
}
