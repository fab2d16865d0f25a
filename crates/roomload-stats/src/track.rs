use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use roomload_core::MediaKind;

/// Counters for one observed media track.
///
/// Counters only ever increase and are updated without locking from the
/// session's delivery path.
#[derive(Debug)]
pub struct TrackStat {
    track_id: String,
    kind: MediaKind,
    started_at: Instant,
    packets: AtomicU64,
    dropped: AtomicU64,
    bytes: AtomicU64,
}

/// Point-in-time copy of a [`TrackStat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSnapshot {
    pub track_id: String,
    pub kind: MediaKind,
    pub packets: u64,
    pub dropped: u64,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl TrackStat {
    pub fn new(track_id: impl Into<String>, kind: MediaKind) -> Self {
        Self::started_at(track_id, kind, Instant::now())
    }

    pub fn started_at(track_id: impl Into<String>, kind: MediaKind, started_at: Instant) -> Self {
        Self {
            track_id: track_id.into(),
            kind,
            started_at,
            packets: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Counts one packet; dropped packets carry no bytes.
    pub fn record(&self, byte_size: u64, dropped: bool) {
        if dropped {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.packets.fetch_add(1, Ordering::Relaxed);
            self.bytes.fetch_add(byte_size, Ordering::Relaxed);
        }
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn start_time(&self) -> Instant {
        self.started_at
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Snapshot with elapsed time measured up to `until`.
    pub fn snapshot_until(&self, until: Instant) -> TrackSnapshot {
        TrackSnapshot {
            track_id: self.track_id.clone(),
            kind: self.kind,
            packets: self.packets(),
            dropped: self.dropped(),
            bytes: self.bytes(),
            elapsed: until.saturating_duration_since(self.started_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use roomload_core::MediaKind;

    use super::TrackStat;

    #[test]
    fn received_and_dropped_packets_are_counted_separately() {
        let stat = TrackStat::new("TR_1", MediaKind::Audio);
        stat.record(160, false);
        stat.record(160, false);
        stat.record(160, true);

        assert_eq!(stat.packets(), 2);
        assert_eq!(stat.dropped(), 1);
        assert_eq!(stat.bytes(), 320);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stat = Arc::new(TrackStat::new("TR_2", MediaKind::Video));
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let stat = Arc::clone(&stat);
                thread::spawn(move || {
                    for n in 0..1_000 {
                        stat.record(1_200, (n + i) % 10 == 0);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker should not panic");
        }

        assert_eq!(stat.packets() + stat.dropped(), 8_000);
        assert_eq!(stat.dropped(), 800);
        assert_eq!(stat.bytes(), 7_200 * 1_200);
    }

    #[test]
    fn snapshot_measures_elapsed_from_start() {
        let start = Instant::now();
        let stat = TrackStat::started_at("TR_3", MediaKind::Audio, start);
        stat.record(100, false);

        let snap = stat.snapshot_until(start + Duration::from_secs(2));
        assert_eq!(snap.elapsed, Duration::from_secs(2));
        assert_eq!(snap.packets, 1);
        assert_eq!(snap.bytes, 100);
        assert_eq!(snap.kind, MediaKind::Audio);
    }
}
