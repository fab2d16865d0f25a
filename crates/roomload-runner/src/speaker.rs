use std::sync::Arc;
use std::time::Duration;

use roomload_session::ParticipantSession;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub const DEFAULT_SPEAKER_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SpeakerSimulatorParams {
    /// Publishers to rotate the active-speaker role among.
    pub testers: Vec<Arc<dyn ParticipantSession>>,
    /// Time each speaker stays active.
    pub interval: Duration,
    /// Concurrent active speakers per rotation.
    pub speakers: usize,
}

impl SpeakerSimulatorParams {
    pub fn new(testers: Vec<Arc<dyn ParticipantSession>>) -> Self {
        Self {
            testers,
            interval: DEFAULT_SPEAKER_INTERVAL,
            speakers: 1,
        }
    }
}

/// Background task that periodically hands the active-speaker role to the
/// next publisher(s) in round-robin order.
pub struct SpeakerSimulator {
    params: SpeakerSimulatorParams,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SpeakerSimulator {
    pub fn new(params: SpeakerSimulatorParams) -> Self {
        Self {
            params,
            shutdown_tx: None,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Starts the rotation. Calling it on a running simulator is a no-op.
    pub fn start(&mut self) {
        if self.worker.is_some() || self.params.testers.is_empty() {
            return;
        }
        if self.params.interval.is_zero() {
            warn!("speaker interval is zero; not rotating speakers");
            return;
        }
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);
        self.worker = Some(tokio::spawn(run_rotation(
            self.params.clone(),
            shutdown_rx,
        )));
    }

    /// Stops the rotation and waits for the in-flight iteration to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                warn!(error = %err, "speaker simulator task failed");
            }
        }
    }
}

async fn run_rotation(params: SpeakerSimulatorParams, mut shutdown_rx: oneshot::Receiver<()>) {
    let count = params.testers.len();
    let per_round = params.speakers.clamp(1, count);
    let mut ticker = tokio::time::interval(params.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cursor = 0usize;
    let mut active: Vec<usize> = Vec::with_capacity(per_round);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                for idx in active.drain(..) {
                    toggle(&params.testers[idx], idx, false).await;
                }
                for _ in 0..per_round {
                    toggle(&params.testers[cursor], cursor, true).await;
                    active.push(cursor);
                    cursor = (cursor + 1) % count;
                }
            }
        }
    }

    for idx in active {
        toggle(&params.testers[idx], idx, false).await;
    }
}

async fn toggle(tester: &Arc<dyn ParticipantSession>, idx: usize, speaking: bool) {
    match tester.set_speaking(speaking).await {
        Ok(()) => debug!(tester = idx, speaking, "toggled active speaker"),
        Err(err) => warn!(tester = idx, speaking, error = %err, "failed to toggle speaker"),
    }
}
