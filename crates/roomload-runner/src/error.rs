use roomload_core::SetupError;
use thiserror::Error;

use crate::orchestrator::RunOutcome;

/// Run-level failures. Per-participant failures never show up here; they
/// are recorded in that participant's summary instead.
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// Spawning was cancelled at the admission pacer. The participants that
    /// were already admitted have been stopped and are carried in `partial`.
    #[error("load test cancelled after admitting {spawned} participants")]
    AdmissionCancelled {
        spawned: usize,
        partial: Box<RunOutcome>,
    },
}

#[cfg(test)]
mod tests {
    use roomload_core::SetupError;

    use super::LoadTestError;
    use crate::orchestrator::RunOutcome;

    #[test]
    fn error_messages_are_stable() {
        let err = LoadTestError::from(SetupError::InvalidParameter {
            name: "video_codec",
            reason: "unknown codec av2".to_string(),
        });
        assert_eq!(err.to_string(), "invalid parameter video_codec: unknown codec av2");

        let err = LoadTestError::AdmissionCancelled {
            spawned: 5,
            partial: Box::new(RunOutcome::empty("testroom1")),
        };
        assert_eq!(
            err.to_string(),
            "load test cancelled after admitting 5 participants"
        );
    }
}
