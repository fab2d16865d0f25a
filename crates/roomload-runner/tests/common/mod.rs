#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roomload_core::MediaKind;
use roomload_session::{ParticipantSession, SessionError, SessionFactory, SessionParams};
use roomload_stats::ParticipantStats;
use tokio_util::sync::CancellationToken;

/// Shared counters across every scripted session of one factory.
#[derive(Debug, Default)]
pub struct Counters {
    pub created: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub speaker_toggles: AtomicUsize,
}

impl Counters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn speaker_toggles(&self) -> usize {
        self.speaker_toggles.load(Ordering::SeqCst)
    }
}

/// Factory whose sessions succeed instantly unless scripted otherwise.
#[derive(Default)]
pub struct ScriptedFactory {
    pub counters: Arc<Counters>,
    fail_start: HashSet<String>,
    panic_start: HashSet<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    created_names: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions with this display name fail to connect.
    pub fn failing(mut self, name: &str) -> Self {
        self.fail_start.insert(name.to_string());
        self
    }

    /// Sessions with this display name panic while connecting.
    pub fn panicking(mut self, name: &str) -> Self {
        self.panic_start.insert(name.to_string());
        self
    }

    /// Fires `token` when the `count`-th session is created.
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created_names.lock().expect("names lock").clone()
    }
}

impl SessionFactory for ScriptedFactory {
    fn create(&self, params: SessionParams) -> Arc<dyn ParticipantSession> {
        let created = self.counters.created.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = &self.cancel_after {
            if created == *count {
                token.cancel();
            }
        }
        self.created_names
            .lock()
            .expect("names lock")
            .push(params.name.clone());
        Arc::new(ScriptedSession {
            stats: Arc::new(ParticipantStats::new(params.name.clone())),
            fail: self.fail_start.contains(&params.name),
            panic: self.panic_start.contains(&params.name),
            counters: Arc::clone(&self.counters),
            params,
        })
    }
}

pub struct ScriptedSession {
    params: SessionParams,
    fail: bool,
    panic: bool,
    stats: Arc<ParticipantStats>,
    counters: Arc<Counters>,
}

#[async_trait]
impl ParticipantSession for ScriptedSession {
    async fn start(&self) -> Result<(), SessionError> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("scripted panic");
        }
        if self.fail {
            return Err(SessionError::Connect("scripted failure".to_string()));
        }
        // One delivered and one lost packet per expected track.
        if self.params.subscribe {
            for idx in 0..self.params.expected_tracks {
                let track_id = format!("remote-{idx}");
                self.stats.record_packet(&track_id, MediaKind::Video, 1_200, false);
                self.stats.record_packet(&track_id, MediaKind::Video, 0, true);
            }
        }
        Ok(())
    }

    async fn publish_audio_track(&self, _label: &str) -> Result<String, SessionError> {
        Ok(format!("{}-audio", self.params.identity))
    }

    async fn publish_video_track(
        &self,
        _label: &str,
        _resolution: &str,
        _codec: &str,
    ) -> Result<String, SessionError> {
        Ok(format!("{}-video", self.params.identity))
    }

    async fn publish_simulcast_track(
        &self,
        _label: &str,
        _resolution: &str,
        _codec: &str,
    ) -> Result<String, SessionError> {
        Ok(format!("{}-simulcast", self.params.identity))
    }

    async fn set_speaking(&self, _speaking: bool) -> Result<(), SessionError> {
        self.counters.speaker_toggles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        self.stats.mark_stopped();
    }

    fn stats(&self) -> Arc<ParticipantStats> {
        Arc::clone(&self.stats)
    }
}
