use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roomload_core::MediaKind;
use roomload_stats::ParticipantStats;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::SessionError;
use crate::session::{ParticipantSession, SessionFactory, SessionParams};

/// Knobs for the in-process session backend.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Delivery tick of each subscriber.
    pub tick: Duration,
    /// Packets per second delivered for every published track.
    pub packets_per_second: u32,
    /// Probability in `[0.0, 1.0]` that a delivered packet is dropped.
    pub loss_ratio: f64,
    pub audio_packet_bytes: u64,
    /// Audio packet size while the publisher is not an active speaker.
    pub silent_audio_packet_bytes: u64,
    pub video_packet_bytes: u64,
    /// Simulated connect latency.
    pub connect_delay: Duration,
    /// Display names whose `start` fails.
    pub fail_start: HashSet<String>,
    /// Display names whose publish calls fail.
    pub fail_publish: HashSet<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(20),
            packets_per_second: 50,
            loss_ratio: 0.0,
            audio_packet_bytes: 160,
            silent_audio_packet_bytes: 20,
            video_packet_bytes: 1_200,
            connect_delay: Duration::ZERO,
            fail_start: HashSet::new(),
            fail_publish: HashSet::new(),
        }
    }
}

impl SimulationConfig {
    fn packets_per_tick(&self) -> u64 {
        let per_tick = f64::from(self.packets_per_second) * self.tick.as_secs_f64();
        (per_tick.round() as u64).max(1)
    }
}

#[derive(Debug, Clone)]
struct PublishedTrack {
    track_id: String,
    kind: MediaKind,
    owner: String,
    speaking: Arc<AtomicBool>,
}

impl PublishedTrack {
    fn packet_bytes(&self, config: &SimulationConfig) -> u64 {
        match self.kind {
            MediaKind::Video => config.video_packet_bytes,
            MediaKind::Audio if self.speaking.load(Ordering::Relaxed) => config.audio_packet_bytes,
            MediaKind::Audio => config.silent_audio_packet_bytes,
        }
    }
}

/// Tracks currently published in one room.
#[derive(Debug, Default)]
struct SimRoom {
    tracks: Mutex<Vec<PublishedTrack>>,
}

impl SimRoom {
    fn publish(&self, track: PublishedTrack) {
        self.tracks.lock().expect("room lock").push(track);
    }

    fn unpublish(&self, track_ids: &[String]) {
        self.tracks
            .lock()
            .expect("room lock")
            .retain(|track| !track_ids.contains(&track.track_id));
    }

    fn tracks_excluding(&self, identity: &str) -> Vec<PublishedTrack> {
        self.tracks
            .lock()
            .expect("room lock")
            .iter()
            .filter(|track| track.owner != identity)
            .cloned()
            .collect()
    }
}

/// Creates [`SimulatedSession`]s that share rooms by name.
#[derive(Debug, Default)]
pub struct SimulatedSessionFactory {
    config: Arc<SimulationConfig>,
    rooms: Mutex<HashMap<String, Arc<SimRoom>>>,
    next_track: Arc<AtomicU64>,
}

impl SimulatedSessionFactory {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn room(&self, name: &str) -> Arc<SimRoom> {
        let mut rooms = self.rooms.lock().expect("rooms lock");
        Arc::clone(rooms.entry(name.to_string()).or_default())
    }
}

impl SessionFactory for SimulatedSessionFactory {
    fn create(&self, params: SessionParams) -> Arc<dyn ParticipantSession> {
        let room = self.room(&params.room);
        Arc::new(SimulatedSession {
            stats: Arc::new(ParticipantStats::new(params.name.clone())),
            params,
            config: Arc::clone(&self.config),
            room,
            next_track: Arc::clone(&self.next_track),
            speaking: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(SessionState::default()),
        })
    }
}

#[derive(Debug, Default)]
struct SessionState {
    running: bool,
    published: Vec<String>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

/// In-process participant: publishers register tracks in their room and
/// subscribers synthesize packet deliveries for every remote track.
pub struct SimulatedSession {
    params: SessionParams,
    config: Arc<SimulationConfig>,
    room: Arc<SimRoom>,
    next_track: Arc<AtomicU64>,
    stats: Arc<ParticipantStats>,
    speaking: Arc<AtomicBool>,
    state: Mutex<SessionState>,
}

impl SimulatedSession {
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        if self.state.lock().expect("session lock").running {
            Ok(())
        } else {
            Err(SessionError::NotRunning)
        }
    }

    fn publish(&self, label: &str, kind: MediaKind) -> Result<String, SessionError> {
        self.ensure_running()?;
        if self.config.fail_publish.contains(&self.params.name) {
            return Err(SessionError::Publish {
                label: label.to_string(),
                reason: "simulated publish failure".to_string(),
            });
        }
        let track_id = format!("TR_{:05}", self.next_track.fetch_add(1, Ordering::Relaxed));
        self.room.publish(PublishedTrack {
            track_id: track_id.clone(),
            kind,
            owner: self.params.identity.clone(),
            speaking: Arc::clone(&self.speaking),
        });
        self.state
            .lock()
            .expect("session lock")
            .published
            .push(track_id.clone());
        debug!(participant = %self.params.name, %track_id, %kind, "published track");
        Ok(track_id)
    }
}

#[async_trait]
impl ParticipantSession for SimulatedSession {
    async fn start(&self) -> Result<(), SessionError> {
        if !self.config.connect_delay.is_zero() {
            tokio::time::sleep(self.config.connect_delay).await;
        }
        if self.config.fail_start.contains(&self.params.name) {
            return Err(SessionError::Connect(
                "simulated connection failure".to_string(),
            ));
        }

        let mut state = self.state.lock().expect("session lock");
        if state.running {
            return Ok(());
        }
        state.running = true;
        if self.params.subscribe {
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            state.shutdown_tx = Some(shutdown_tx);
            state.worker = Some(tokio::spawn(run_delivery(
                Arc::clone(&self.room),
                Arc::clone(&self.stats),
                Arc::clone(&self.config),
                self.params.identity.clone(),
                shutdown_rx,
            )));
        }
        Ok(())
    }

    async fn publish_audio_track(&self, label: &str) -> Result<String, SessionError> {
        self.publish(label, MediaKind::Audio)
    }

    async fn publish_video_track(
        &self,
        label: &str,
        _resolution: &str,
        _codec: &str,
    ) -> Result<String, SessionError> {
        self.publish(label, MediaKind::Video)
    }

    async fn publish_simulcast_track(
        &self,
        label: &str,
        _resolution: &str,
        _codec: &str,
    ) -> Result<String, SessionError> {
        self.publish(label, MediaKind::Video)
    }

    async fn set_speaking(&self, speaking: bool) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.speaking.store(speaking, Ordering::Relaxed);
        Ok(())
    }

    async fn stop(&self) {
        let (shutdown_tx, worker, published) = {
            let mut state = self.state.lock().expect("session lock");
            state.running = false;
            (
                state.shutdown_tx.take(),
                state.worker.take(),
                std::mem::take(&mut state.published),
            )
        };
        if let Some(tx) = shutdown_tx {
            let _ = tx.send(());
        }
        if let Some(worker) = worker {
            let _ = worker.await;
        }
        self.room.unpublish(&published);
        self.stats.mark_stopped();
    }

    fn stats(&self) -> Arc<ParticipantStats> {
        Arc::clone(&self.stats)
    }
}

async fn run_delivery(
    room: Arc<SimRoom>,
    stats: Arc<ParticipantStats>,
    config: Arc<SimulationConfig>,
    identity: String,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.tick);
    let mut rng = StdRng::from_entropy();
    let per_tick = config.packets_per_tick();
    let loss = config.loss_ratio.clamp(0.0, 1.0);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                for track in room.tracks_excluding(&identity) {
                    let size = track.packet_bytes(&config);
                    for _ in 0..per_tick {
                        let dropped = loss > 0.0 && rng.gen_bool(loss);
                        stats.record_packet(&track.track_id, track.kind, size, dropped);
                    }
                }
            }
        }
    }
}
