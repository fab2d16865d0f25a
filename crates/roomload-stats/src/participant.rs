use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use roomload_core::MediaKind;

use crate::track::{TrackSnapshot, TrackStat};

/// Track counters observed by one participant, keyed by track id.
///
/// The session delivery path calls [`ParticipantStats::record_packet`];
/// the orchestrator reads a [`ParticipantSnapshot`] once the session has
/// stopped.
#[derive(Debug)]
pub struct ParticipantStats {
    name: String,
    tracks: RwLock<HashMap<String, Arc<TrackStat>>>,
    error: Mutex<Option<String>>,
    stopped_at: Mutex<Option<Instant>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSnapshot {
    pub name: String,
    /// Sorted by track id; reports re-sort by display label.
    pub tracks: Vec<TrackSnapshot>,
    /// Wall time from the first observed track until stop.
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl ParticipantStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: RwLock::new(HashMap::new()),
            error: Mutex::new(None),
            stopped_at: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Counts one packet for `track_id`, creating the track on first sight.
    pub fn record_packet(&self, track_id: &str, kind: MediaKind, byte_size: u64, dropped: bool) {
        self.track(track_id, kind).record(byte_size, dropped);
    }

    /// Returns the counters for `track_id`, creating them if needed.
    pub fn track(&self, track_id: &str, kind: MediaKind) -> Arc<TrackStat> {
        if let Some(stat) = self.tracks.read().expect("stats lock").get(track_id) {
            return Arc::clone(stat);
        }
        let mut tracks = self.tracks.write().expect("stats lock");
        Arc::clone(
            tracks
                .entry(track_id.to_string())
                .or_insert_with(|| Arc::new(TrackStat::new(track_id, kind))),
        )
    }

    pub fn track_count(&self) -> usize {
        self.tracks.read().expect("stats lock").len()
    }

    /// Stores the terminal error, replacing any earlier one.
    pub fn set_error(&self, error: impl Into<String>) {
        *self.error.lock().expect("stats lock") = Some(error.into());
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().expect("stats lock").clone()
    }

    /// Freezes elapsed-time accounting. Later calls keep the first stop time.
    pub fn mark_stopped(&self) {
        let mut stopped_at = self.stopped_at.lock().expect("stats lock");
        if stopped_at.is_none() {
            *stopped_at = Some(Instant::now());
        }
    }

    pub fn snapshot(&self) -> ParticipantSnapshot {
        let until = self
            .stopped_at
            .lock()
            .expect("stats lock")
            .unwrap_or_else(Instant::now);
        self.snapshot_until(until)
    }

    pub fn snapshot_until(&self, until: Instant) -> ParticipantSnapshot {
        let tracks = self.tracks.read().expect("stats lock");
        let started_at = tracks.values().map(|stat| stat.start_time()).min();
        let mut snapshots: Vec<_> = tracks
            .values()
            .map(|stat| stat.snapshot_until(until))
            .collect();
        snapshots.sort_by(|a, b| a.track_id.cmp(&b.track_id));

        ParticipantSnapshot {
            name: self.name.clone(),
            tracks: snapshots,
            elapsed: started_at
                .map(|start| until.saturating_duration_since(start))
                .unwrap_or_default(),
            error: self.error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use roomload_core::MediaKind;

    use super::ParticipantStats;

    #[test]
    fn first_packet_creates_track_lazily() {
        let stats = ParticipantStats::new("Sub 0");
        assert_eq!(stats.track_count(), 0);

        stats.record_packet("TR_A", MediaKind::Audio, 160, false);
        stats.record_packet("TR_A", MediaKind::Audio, 160, true);
        stats.record_packet("TR_V", MediaKind::Video, 1_200, false);

        assert_eq!(stats.track_count(), 2);
        let snap = stats.snapshot();
        assert_eq!(snap.tracks[0].track_id, "TR_A");
        assert_eq!(snap.tracks[0].packets, 1);
        assert_eq!(snap.tracks[0].dropped, 1);
        assert_eq!(snap.tracks[1].bytes, 1_200);
    }

    #[test]
    fn concurrent_first_observations_create_one_track() {
        let stats = Arc::new(ParticipantStats::new("Sub 1"));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..500 {
                        stats.record_packet("TR_shared", MediaKind::Video, 10, false);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker should not panic");
        }

        let snap = stats.snapshot();
        assert_eq!(snap.tracks.len(), 1);
        assert_eq!(snap.tracks[0].packets, 2_000);
    }

    #[test]
    fn elapsed_is_zero_without_tracks() {
        let stats = ParticipantStats::new("Pub 0");
        stats.mark_stopped();
        assert_eq!(stats.snapshot().elapsed, Duration::ZERO);
    }

    #[test]
    fn elapsed_runs_from_first_track_until_stop() {
        let stats = ParticipantStats::new("Sub 2");
        let track = stats.track("TR_A", MediaKind::Audio);
        let until = track.start_time() + Duration::from_secs(3);
        assert_eq!(stats.snapshot_until(until).elapsed, Duration::from_secs(3));
    }

    #[test]
    fn later_errors_replace_earlier_ones() {
        let stats = ParticipantStats::new("Pub 1");
        assert!(stats.error().is_none());
        stats.set_error("session closed");
        stats.set_error("could not connect");
        assert_eq!(stats.snapshot().error.as_deref(), Some("could not connect"));
    }
}
