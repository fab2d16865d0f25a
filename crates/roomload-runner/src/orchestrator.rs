use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use roomload_core::{
    IdentityGenerator, MediaKind, ParticipantRole, RandomIdentity, RunParameters, SetupError,
};
use roomload_session::{ParticipantSession, SessionError, SessionFactory, SessionParams};
use roomload_stats::{suite_snapshot, ParticipantSnapshot, SuiteSummary, Summary};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LoadTestError;
use crate::pacer::AdmissionPacer;
use crate::speaker::{SpeakerSimulator, SpeakerSimulatorParams, DEFAULT_SPEAKER_INTERVAL};

const AUDIO_TRACK_NAME: &str = "audio";
const VIDEO_TRACK_NAME: &str = "video";
const SIMULCAST_TRACK_NAME: &str = "video-simulcast";

/// Lifecycle of one load test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Configuring,
    Spawning,
    Running,
    Draining,
    Reporting,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Configuring => "configuring",
            RunPhase::Spawning => "spawning",
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Tables written by concurrent spawn units.
#[derive(Debug, Default)]
struct SpawnLedger {
    /// Track id to `"<ordinal>A"` / `"<ordinal>V"`.
    track_labels: Mutex<HashMap<String, String>>,
    /// Display name to the first spawn failure.
    errors: Mutex<HashMap<String, String>>,
}

impl SpawnLedger {
    fn label_track(&self, track_id: String, ordinal: usize, kind: MediaKind) {
        let label = format!("{ordinal}{}", kind.label_suffix());
        self.track_labels
            .lock()
            .expect("label lock")
            .insert(track_id, label);
    }

    fn record_error(&self, name: &str, error: String) {
        self.errors
            .lock()
            .expect("error lock")
            .entry(name.to_string())
            .or_insert(error);
    }

    fn take_errors(&self) -> HashMap<String, String> {
        std::mem::take(&mut *self.errors.lock().expect("error lock"))
    }

    fn take_labels(&self) -> HashMap<String, String> {
        std::mem::take(&mut *self.track_labels.lock().expect("label lock"))
    }
}

struct ParticipantRun {
    name: String,
    role: ParticipantRole,
    sequence: usize,
    session: Arc<dyn ParticipantSession>,
}

/// What a spawn unit does for one participant.
#[derive(Debug, Clone)]
struct UnitPlan {
    name: String,
    role: ParticipantRole,
    ordinal: usize,
    resolution: String,
    codec: String,
    simulcast: bool,
}

/// Final state of one participant after draining.
#[derive(Debug, Clone)]
pub struct ParticipantOutcome {
    pub name: String,
    pub role: ParticipantRole,
    pub sequence: usize,
    pub snapshot: ParticipantSnapshot,
    pub summary: Summary,
}

/// Everything a report needs once a run has drained.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub room: String,
    /// In spawn order.
    pub participants: Vec<ParticipantOutcome>,
    /// Track id to display label for every track published in the run.
    pub track_labels: HashMap<String, String>,
}

impl RunOutcome {
    pub fn empty(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            ..Self::default()
        }
    }

    pub fn summaries(&self) -> impl Iterator<Item = &Summary> {
        self.participants.iter().map(|p| &p.summary)
    }

    pub fn suite_summary(&self) -> SuiteSummary {
        suite_snapshot(self.summaries())
    }

    pub fn participant(&self, name: &str) -> Option<&ParticipantOutcome> {
        self.participants.iter().find(|p| p.name == name)
    }

    pub fn label_for(&self, track_id: &str) -> Option<&str> {
        self.track_labels.get(track_id).map(String::as_str)
    }
}

/// Drives one load test: paced admission, concurrent connect and publish,
/// optional speaker rotation, and teardown into a [`RunOutcome`].
pub struct LoadTest {
    params: RunParameters,
    factory: Arc<dyn SessionFactory>,
    identity: Arc<dyn IdentityGenerator>,
    speaker_interval: Duration,
    phase_tx: watch::Sender<RunPhase>,
}

impl LoadTest {
    pub fn new(params: RunParameters, factory: Arc<dyn SessionFactory>) -> Self {
        let (phase_tx, _) = watch::channel(RunPhase::Configuring);
        Self {
            params: params.with_default_counts(),
            factory,
            identity: Arc::new(RandomIdentity),
            speaker_interval: DEFAULT_SPEAKER_INTERVAL,
            phase_tx,
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityGenerator>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_speaker_interval(mut self, interval: Duration) -> Self {
        self.speaker_interval = interval;
        self
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase_tx.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase_tx.subscribe()
    }

    /// Runs until the configured duration elapses or `cancel` fires.
    ///
    /// Cancellation while running still produces a full outcome; cancellation
    /// while participants are being admitted drains what was spawned and
    /// returns [`LoadTestError::AdmissionCancelled`].
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunOutcome, LoadTestError> {
        self.run_with(&self.params, cancel).await
    }

    pub(crate) async fn run_with(
        &self,
        params: &RunParameters,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, LoadTestError> {
        self.enter(RunPhase::Configuring);
        let params = params.clone().with_default_counts();
        params.validate()?;
        if self.speaker_interval.is_zero() {
            return Err(SetupError::InvalidParameter {
                name: "speaker_interval",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        let room = params
            .room
            .clone()
            .unwrap_or_else(|| self.identity.room_name());
        let prefix = self.identity.identity_prefix();
        let published_tracks = params.published_tracks();
        let max_publishers = params.max_publishers();
        let mut pacer = AdmissionPacer::new(params.num_per_second);
        info!(
            "Starting load test with {}, room: {}",
            params.describe_participants(),
            room
        );

        self.enter(RunPhase::Spawning);
        let ledger = Arc::new(SpawnLedger::default());
        let mut runs: Vec<ParticipantRun> = Vec::with_capacity(params.participant_count());
        let mut units = JoinSet::new();
        let mut admission_cancelled = false;

        for ordinal in 0..params.participant_count() {
            if pacer.admit(cancel).await.is_err() {
                admission_cancelled = true;
                break;
            }
            let role = params.role_for(ordinal);
            let name = role.display_name(ordinal, params.video_publishers);
            let identity = if role.is_publisher() {
                format!("{prefix}_pub_{ordinal}")
            } else {
                format!("{prefix}_{ordinal}")
            };
            debug!(participant = %name, %identity, "admitted participant");

            let session = self.factory.create(SessionParams {
                name: name.clone(),
                url: params.url.clone(),
                room: room.clone(),
                identity,
                sequence: ordinal,
                subscribe: !role.is_publisher(),
                expected_tracks: role.expected_tracks(published_tracks),
            });
            runs.push(ParticipantRun {
                name: name.clone(),
                role,
                sequence: ordinal,
                session: Arc::clone(&session),
            });
            units.spawn(connect_and_publish(
                session,
                UnitPlan {
                    name,
                    role,
                    ordinal,
                    resolution: params.video_resolution.clone(),
                    codec: params.video_codec.clone(),
                    simulcast: params.simulcast,
                },
                Arc::clone(&ledger),
            ));
        }
        join_units(&mut units, cancel).await;
        info!(spawned = runs.len(), "finished spawning participants");

        let mut speakers = None;
        if !admission_cancelled {
            self.enter(RunPhase::Running);
            if params.simulate_speakers && max_publishers > 0 {
                let testers = runs
                    .iter()
                    .filter(|run| run.role.is_publisher())
                    .map(|run| Arc::clone(&run.session))
                    .collect();
                let mut simulator = SpeakerSimulator::new(SpeakerSimulatorParams {
                    interval: self.speaker_interval,
                    ..SpeakerSimulatorParams::new(testers)
                });
                simulator.start();
                speakers = Some(simulator);
            }
            wait_for_completion(params.duration, cancel).await;
        }

        self.enter(RunPhase::Draining);
        if let Some(mut simulator) = speakers {
            simulator.stop().await;
        }
        let mut errors = ledger.take_errors();
        let mut participants = Vec::with_capacity(runs.len());
        for run in &runs {
            run.session.stop().await;
            let stats = run.session.stats();
            if let Some(error) = errors.remove(&run.name) {
                stats.set_error(error);
            }
            let snapshot = stats.snapshot();
            let expected = run.role.expected_tracks(published_tracks);
            let summary = Summary::from_snapshot(&snapshot, expected);
            participants.push(ParticipantOutcome {
                name: run.name.clone(),
                role: run.role,
                sequence: run.sequence,
                snapshot,
                summary,
            });
        }

        self.enter(RunPhase::Reporting);
        let outcome = RunOutcome {
            room,
            participants,
            track_labels: ledger.take_labels(),
        };
        self.enter(RunPhase::Done);

        if admission_cancelled {
            return Err(LoadTestError::AdmissionCancelled {
                spawned: runs.len(),
                partial: Box::new(outcome),
            });
        }
        Ok(outcome)
    }

    fn enter(&self, phase: RunPhase) {
        self.phase_tx.send_replace(phase);
        info!(%phase, "load test phase");
    }
}

async fn connect_and_publish(
    session: Arc<dyn ParticipantSession>,
    plan: UnitPlan,
    ledger: Arc<SpawnLedger>,
) {
    let unit = AssertUnwindSafe(publish_plan(session.as_ref(), &plan, &ledger)).catch_unwind();
    let error = match unit.await {
        Ok(Ok(())) => return,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => format!(
            "participant task panicked: {}",
            panic_message(payload.as_ref())
        ),
    };
    warn!(participant = %plan.name, %error, "participant failed");
    ledger.record_error(&plan.name, error);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

async fn publish_plan(
    session: &dyn ParticipantSession,
    plan: &UnitPlan,
    ledger: &SpawnLedger,
) -> Result<(), SessionError> {
    session.start().await?;
    if plan.role.publishes_audio() {
        let track_id = session.publish_audio_track(AUDIO_TRACK_NAME).await?;
        ledger.label_track(track_id, plan.ordinal, MediaKind::Audio);
    }
    if plan.role.publishes_video() {
        let track_id = if plan.simulcast {
            session
                .publish_simulcast_track(SIMULCAST_TRACK_NAME, &plan.resolution, &plan.codec)
                .await?
        } else {
            session
                .publish_video_track(VIDEO_TRACK_NAME, &plan.resolution, &plan.codec)
                .await?
        };
        ledger.label_track(track_id, plan.ordinal, MediaKind::Video);
    }
    debug!(participant = %plan.name, "participant connected");
    Ok(())
}

/// Waits for every spawn unit; cancellation aborts the ones still running.
async fn join_units(units: &mut JoinSet<()>, cancel: &CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                units.abort_all();
                while units.join_next().await.is_some() {}
                return;
            }
            joined = units.join_next() => match joined {
                None => return,
                Some(Err(err)) if err.is_panic() => warn!(error = %err, "spawn unit panicked"),
                Some(_) => {}
            },
        }
    }
}

async fn wait_for_completion(duration: Duration, cancel: &CancellationToken) {
    if duration.is_zero() {
        cancel.cancelled().await;
        info!("load test cancelled");
        return;
    }
    tokio::select! {
        _ = cancel.cancelled() => info!("load test cancelled"),
        _ = tokio::time::sleep(duration) => info!(?duration, "load test duration elapsed"),
    }
}
