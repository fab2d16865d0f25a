use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Rate used when the requested rate is zero, negative, or not a number.
pub const DEFAULT_ADMISSION_RATE: f64 = 5.0;
/// Highest admission rate accepted.
pub const MAX_ADMISSION_RATE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("admission cancelled")]
pub struct AdmissionCancelled;

/// Clamps a requested participants-per-second rate into `(0, 10]`.
pub fn clamp_admission_rate(requested: f64) -> f64 {
    if !requested.is_finite() || requested <= 0.0 {
        DEFAULT_ADMISSION_RATE
    } else {
        requested.min(MAX_ADMISSION_RATE)
    }
}

/// Token bucket with a single burst slot.
///
/// The first admission is immediate; every later one waits until
/// `1 / rate` seconds after the previous slot.
#[derive(Debug)]
pub struct AdmissionPacer {
    rate: f64,
    interval: Duration,
    next_slot: Instant,
    admitted: usize,
}

impl AdmissionPacer {
    pub fn new(requested_rate: f64) -> Self {
        let rate = clamp_admission_rate(requested_rate);
        Self {
            rate,
            interval: Duration::from_secs_f64(1.0 / rate),
            next_slot: Instant::now(),
            admitted: 0,
        }
    }

    /// Effective rate after clamping.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn admitted(&self) -> usize {
        self.admitted
    }

    /// Waits for the next admission slot. A fired `cancel` wins over an
    /// available slot and consumes nothing.
    pub async fn admit(&mut self, cancel: &CancellationToken) -> Result<(), AdmissionCancelled> {
        let slot = self.next_slot.max(Instant::now());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AdmissionCancelled),
            _ = tokio::time::sleep_until(slot) => {}
        }
        self.next_slot = slot + self.interval;
        self.admitted += 1;
        debug!(admitted = self.admitted, rate = self.rate, "admitted participant");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use tokio_util::sync::CancellationToken;

    use super::{clamp_admission_rate, AdmissionCancelled, AdmissionPacer};

    #[test]
    fn rate_is_clamped() {
        assert_eq!(clamp_admission_rate(0.0), 5.0);
        assert_eq!(clamp_admission_rate(-3.0), 5.0);
        assert_eq!(clamp_admission_rate(f64::NAN), 5.0);
        assert_eq!(clamp_admission_rate(25.0), 10.0);
        assert_eq!(clamp_admission_rate(3.0), 3.0);
        assert_eq!(clamp_admission_rate(10.0), 10.0);
        assert_eq!(clamp_admission_rate(0.5), 0.5);
    }

    #[test]
    fn interval_follows_rate() {
        assert_eq!(AdmissionPacer::new(10.0).interval(), Duration::from_millis(100));
        assert_eq!(AdmissionPacer::new(0.0).interval(), Duration::from_millis(200));
        assert_eq!(AdmissionPacer::new(40.0).rate(), 10.0);
    }

    #[tokio::test]
    async fn first_admission_is_immediate_and_later_ones_are_paced() {
        let cancel = CancellationToken::new();
        let mut pacer = AdmissionPacer::new(10.0);

        let start = Instant::now();
        pacer.admit(&cancel).await.expect("first admit");
        assert!(start.elapsed() < Duration::from_millis(50));

        for _ in 0..3 {
            pacer.admit(&cancel).await.expect("paced admit");
        }
        assert!(start.elapsed() >= Duration::from_millis(290));
        assert_eq!(pacer.admitted(), 4);
    }

    #[tokio::test]
    async fn idle_time_does_not_build_a_backlog() {
        let cancel = CancellationToken::new();
        let mut pacer = AdmissionPacer::new(10.0);
        pacer.admit(&cancel).await.expect("first admit");
        tokio::time::sleep(Duration::from_millis(400)).await;

        let start = Instant::now();
        pacer.admit(&cancel).await.expect("burst slot");
        pacer.admit(&cancel).await.expect("paced admit");
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn cancellation_wins_over_a_free_slot() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut pacer = AdmissionPacer::new(10.0);

        assert_eq!(pacer.admit(&cancel).await, Err(AdmissionCancelled));
        assert_eq!(pacer.admitted(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_wait() {
        let cancel = CancellationToken::new();
        let mut pacer = AdmissionPacer::new(0.5);
        pacer.admit(&cancel).await.expect("first admit");

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let start = Instant::now();
        assert_eq!(pacer.admit(&cancel).await, Err(AdmissionCancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
