use std::time::Duration;

use roomload_core::RunParameters;
use roomload_stats::loss_ratio;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::LoadTestError;
use crate::orchestrator::{LoadTest, RunOutcome};

/// Duration of a suite case when the base parameters leave it unset.
pub const DEFAULT_CASE_DURATION: Duration = Duration::from_secs(15);

/// One publisher/subscriber mix in the benchmark suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteCase {
    pub publishers: usize,
    pub subscribers: usize,
    /// Video publishers when set, audio-only publishers otherwise.
    pub video: bool,
}

impl SuiteCase {
    pub const fn new(publishers: usize, subscribers: usize, video: bool) -> Self {
        Self {
            publishers,
            subscribers,
            video,
        }
    }
}

pub const SUITE_CASES: [SuiteCase; 11] = [
    SuiteCase::new(10, 10, false),
    SuiteCase::new(10, 100, false),
    SuiteCase::new(10, 500, false),
    SuiteCase::new(10, 1000, false),
    SuiteCase::new(50, 50, false),
    SuiteCase::new(100, 50, false),
    SuiteCase::new(10, 10, true),
    SuiteCase::new(10, 100, true),
    SuiteCase::new(10, 500, true),
    SuiteCase::new(1, 100, true),
    SuiteCase::new(1, 1000, true),
];

/// Totals for one finished suite case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub case: SuiteCase,
    pub tracks: usize,
    pub packets: u64,
    pub dropped: u64,
    pub errors: usize,
}

impl CaseResult {
    pub fn from_outcome(case: SuiteCase, outcome: &RunOutcome) -> Self {
        let total = outcome.suite_summary();
        Self {
            case,
            tracks: total.tracks,
            packets: total.packets,
            dropped: total.dropped,
            errors: total.err_count,
        }
    }

    pub fn loss_ratio(&self) -> f64 {
        loss_ratio(self.packets, self.dropped)
    }
}

/// Runs the fixed case list back to back against one target.
pub struct SuiteRunner {
    load_test: LoadTest,
    cases: Vec<SuiteCase>,
}

impl SuiteRunner {
    pub fn new(load_test: LoadTest) -> Self {
        Self {
            load_test,
            cases: SUITE_CASES.to_vec(),
        }
    }

    pub fn with_cases(mut self, cases: Vec<SuiteCase>) -> Self {
        self.cases = cases;
        self
    }

    pub fn cases(&self) -> &[SuiteCase] {
        &self.cases
    }

    /// Parameters for `case`, derived from the base run parameters.
    pub fn case_params(&self, case: SuiteCase) -> RunParameters {
        let mut params = self.load_test.params().clone();
        if case.video {
            params.video_publishers = case.publishers;
        } else {
            params.audio_publishers = case.publishers;
        }
        params.subscribers = case.subscribers;
        params.simulcast = true;
        if params.duration.is_zero() {
            params.duration = DEFAULT_CASE_DURATION;
        }
        params
    }

    /// Runs every case in order, handing each row to `on_case` as soon as
    /// it finishes. The first failing case aborts the suite; a fired
    /// `cancel` ends it after the case in progress.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        mut on_case: impl FnMut(&CaseResult),
    ) -> Result<Vec<CaseResult>, LoadTestError> {
        let mut results = Vec::with_capacity(self.cases.len());
        for &case in &self.cases {
            info!(
                "Running test: {} pub, {} sub, video: {}",
                case.publishers,
                case.subscribers,
                if case.video { "Yes" } else { "No" }
            );
            let outcome = self
                .load_test
                .run_with(&self.case_params(case), cancel)
                .await?;
            let result = CaseResult::from_outcome(case, &outcome);
            on_case(&result);
            results.push(result);
            if cancel.is_cancelled() {
                info!("suite cancelled");
                break;
            }
        }
        Ok(results)
    }
}
