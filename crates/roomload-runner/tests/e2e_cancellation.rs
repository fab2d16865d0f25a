mod common;

use std::sync::Arc;
use std::time::Duration;

use common::ScriptedFactory;
use roomload_core::{FixedIdentity, RunParameters};
use roomload_runner::{LoadTest, LoadTestError, RunPhase};
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread")]
async fn cancel_during_admission_drains_spawned_participants() {
    let cancel = CancellationToken::new();
    let factory = Arc::new(ScriptedFactory::new().cancel_after(5, cancel.clone()));
    let test = LoadTest::new(
        RunParameters {
            subscribers: 20,
            duration: Duration::from_secs(30),
            num_per_second: 10.0,
            ..RunParameters::default()
        },
        factory.clone(),
    )
    .with_identity(Arc::new(FixedIdentity::new("testroom5", "zxcvb")));

    let err = test
        .run(&cancel)
        .await
        .expect_err("cancelled admission is reported as an error");

    match err {
        LoadTestError::AdmissionCancelled { spawned, partial } => {
            assert_eq!(spawned, 5);
            assert_eq!(partial.participants.len(), 5);
            assert_eq!(partial.room, "testroom5");
            let names: Vec<_> = partial.participants.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["Sub 0", "Sub 1", "Sub 2", "Sub 3", "Sub 4"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(factory.counters.created(), 5);
    assert_eq!(factory.counters.stops(), 5);
    assert_eq!(test.phase(), RunPhase::Done);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_while_running_returns_a_full_outcome() {
    let cancel = CancellationToken::new();
    let factory = Arc::new(ScriptedFactory::new());
    let test = Arc::new(
        LoadTest::new(
            RunParameters {
                video_publishers: 1,
                subscribers: 2,
                num_per_second: 10.0,
                ..RunParameters::default()
            },
            factory.clone(),
        )
        .with_identity(Arc::new(FixedIdentity::new("testroom6", "yuiop"))),
    );
    let mut phases = test.watch_phase();

    let handle = {
        let test = Arc::clone(&test);
        let cancel = cancel.clone();
        tokio::spawn(async move { test.run(&cancel).await })
    };
    phases
        .wait_for(|phase| *phase == RunPhase::Running)
        .await
        .expect("run should start");
    cancel.cancel();

    let outcome = handle
        .await
        .expect("run task")
        .expect("zero duration runs end cleanly on cancel");
    assert_eq!(outcome.participants.len(), 3);
    assert_eq!(factory.counters.stops(), 3);
    assert_eq!(outcome.suite_summary().tracks, 2);
}
