//! Load test orchestration: admission pacing, concurrent participant
//! startup, speaker rotation, teardown, and report rendering.

pub mod error;
pub mod orchestrator;
pub mod pacer;
pub mod report;
pub mod speaker;
pub mod suite;

pub use error::LoadTestError;
pub use orchestrator::{LoadTest, ParticipantOutcome, RunOutcome, RunPhase};
pub use pacer::{clamp_admission_rate, AdmissionCancelled, AdmissionPacer};
pub use report::{render_run_report, render_suite_table};
pub use speaker::{SpeakerSimulator, SpeakerSimulatorParams, DEFAULT_SPEAKER_INTERVAL};
pub use suite::{CaseResult, SuiteCase, SuiteRunner, DEFAULT_CASE_DURATION, SUITE_CASES};
