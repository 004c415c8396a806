//! End-to-end pipeline tests against stub renderers run through `sh`.
//!
//! Each test builds a real `BuildPipeline` from a `ServiceFixture`, so the
//! scratch directory is recreated, child processes are spawned, and
//! artifacts are streamed and deleted exactly as in the server.

#![cfg(unix)]

use buffon_core::prelude::*;
use buffon_test_utils::{ServiceFixture, StubBehavior, STUB_PNG};
use std::collections::HashMap;

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

fn needle_query() -> HashMap<String, String> {
    query(&[("simulation", "needle"), ("trials", "1000"), ("length", "5"), ("gap", "10")])
}

async fn collect(delivery: Delivery) -> Vec<u8> {
    match delivery {
        Delivery::Image(stream) => {
            let mut body = Vec::new();
            stream.write_to(&mut body).await.expect("stream artifact");
            body
        }
        Delivery::Diagnostic(text) => panic!("expected image, got diagnostic: {text}"),
    }
}

fn diagnostic(delivery: Delivery) -> String {
    match delivery {
        Delivery::Diagnostic(text) => text,
        Delivery::Image(stream) => panic!("expected diagnostic, got image {}", stream.path().display()),
    }
}

/// needle, 1000 trials, length 5, gap 10: exact arguments, exact bytes,
/// scratch file gone afterwards.
#[tokio::test]
async fn needle_scenario_streams_renderer_bytes_and_cleans_up() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install(SimulationKind::NeedleDrop, &StubBehavior::WriteBytes(STUB_PNG.to_vec()));
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let delivery = pipeline.build(&needle_query()).await;
    assert_eq!(delivery.content_type(), "image/png");
    let body = collect(delivery).await;

    assert_eq!(body, STUB_PNG);
    assert_eq!(body.len(), 10);

    let expected_path = pipeline.scratch().file("needle.1000.5.10.png");
    let runs = fixture.renderers.recorded_args(SimulationKind::NeedleDrop.renderer());
    assert_eq!(
        runs,
        vec![vec![
            "-m".to_string(),
            "0".into(),
            "-s".into(),
            "0.5".into(),
            "-t".into(),
            "1000".into(),
            "-l".into(),
            "5".into(),
            "-g".into(),
            "10".into(),
            "-o".into(),
            expected_path.display().to_string(),
        ]]
    );
    assert!(!expected_path.exists());
    assert!(fixture.scratch_files().is_empty());
}

#[tokio::test]
async fn huge_and_tiny_reals_still_render() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install(SimulationKind::NeedleDrop, &StubBehavior::WriteBytes(STUB_PNG.to_vec()));
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let q = query(&[("simulation", "needle"), ("trials", "10"), ("length", "1e300"), ("gap", "1e-300")]);
    assert_eq!(collect(pipeline.build(&q).await).await, STUB_PNG);

    let runs = fixture.renderers.recorded_args(SimulationKind::NeedleDrop.renderer());
    let output = runs[0].last().unwrap();
    assert!(output.ends_with("needle.10.1e300.1e-300.png"), "{output}");
    assert!(fixture.scratch_files().is_empty());
}

#[tokio::test]
async fn every_kind_renders_through_its_stub() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install_all(&StubBehavior::WriteBytes(b"plot".to_vec()));
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    for kind in SimulationKind::ALL {
        let mut q: HashMap<String, String> = kind
            .params()
            .iter()
            .map(|p| (p.name.to_string(), "2".to_string()))
            .collect();
        q.insert("simulation".into(), kind.id().into());

        assert_eq!(collect(pipeline.build(&q).await).await, b"plot", "{kind}");
    }
    assert!(fixture.scratch_files().is_empty());
}

#[tokio::test]
async fn stderr_with_zero_exit_is_reported_as_failure() {
    let fixture = ServiceFixture::new();
    fixture.renderers.install(
        SimulationKind::NeedleDrop,
        &StubBehavior::WarnOnStderr("RuntimeWarning: divide by zero".into()),
    );
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let text = diagnostic(pipeline.build(&needle_query()).await);
    assert_eq!(text, "RuntimeWarning: divide by zero");

    // failure path never deletes; the renderer's file stays behind
    assert_eq!(fixture.scratch_files().len(), 1);
}

#[tokio::test]
async fn nonzero_exit_reports_stdout_when_stderr_is_empty() {
    let fixture = ServiceFixture::new();
    fixture.renderers.install(
        SimulationKind::NeedleDrop,
        &StubBehavior::Fail {
            code: 2,
            stdout: "width of gap is not positive".into(),
        },
    );
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let text = diagnostic(pipeline.build(&needle_query()).await);
    assert_eq!(text, "width of gap is not positive");
}

#[tokio::test]
async fn success_without_artifact_is_a_streaming_failure() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install(SimulationKind::NeedleDrop, &StubBehavior::WriteNothing);
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let text = diagnostic(pipeline.build(&needle_query()).await);
    assert!(text.contains("needle.1000.5.10.png"), "{text}");
}

#[tokio::test]
async fn same_request_twice_sequentially_cleans_up_each_time() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install(SimulationKind::NeedleDrop, &StubBehavior::WriteBytes(STUB_PNG.to_vec()));
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    for _ in 0..2 {
        assert_eq!(collect(pipeline.build(&needle_query()).await).await, STUB_PNG);
        assert!(fixture.scratch_files().is_empty());
    }
    assert_eq!(
        fixture
            .renderers
            .recorded_args(SimulationKind::NeedleDrop.renderer())
            .len(),
        2
    );
}

#[tokio::test]
async fn concurrent_identical_requests_are_serialised() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install(SimulationKind::NeedleDrop, &StubBehavior::WriteBytes(STUB_PNG.to_vec()));
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { collect(pipeline.build(&needle_query()).await).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), STUB_PNG);
    }
    assert!(fixture.scratch_files().is_empty());
    assert!(pipeline.locks().is_empty());
}

#[tokio::test]
async fn renderer_exceeding_timeout_is_killed() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install(SimulationKind::NeedleDrop, &StubBehavior::Slow { secs: 10 });
    let config = fixture.config().with_render_timeout_secs(Some(1));
    let pipeline = BuildPipeline::from_config(&config).unwrap();

    let started = std::time::Instant::now();
    let text = diagnostic(pipeline.build(&needle_query()).await);

    assert_eq!(text, "renderer timed out after 1s");
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn missing_renderer_program_is_a_launch_failure() {
    let fixture = ServiceFixture::new();
    // no stub installed and no interpreter: the script path itself is spawned
    let config = fixture.config().with_interpreter("");
    let pipeline = BuildPipeline::from_config(&config).unwrap();

    let text = diagnostic(pipeline.build(&needle_query()).await);
    assert!(text.starts_with("failed to launch renderer"), "{text}");
    assert!(fixture.scratch_files().is_empty());
}

#[tokio::test]
async fn validation_failure_touches_nothing() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install_all(&StubBehavior::WriteBytes(STUB_PNG.to_vec()));
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let text = diagnostic(pipeline.build(&query(&[("simulation", "needle"), ("trials", "1000")])).await);
    assert_eq!(text, "missing or invalid parameter: length");

    let text = diagnostic(pipeline.build(&query(&[("simulation", "buffon")])).await);
    assert_eq!(text, "unsupported simulation: buffon");

    for kind in SimulationKind::ALL {
        assert!(fixture.renderers.recorded_args(kind.renderer()).is_empty());
    }
    assert!(fixture.scratch_files().is_empty());
}

#[tokio::test]
async fn estimate_runs_buffon_in_run_mode() {
    let fixture = ServiceFixture::new();
    fixture
        .renderers
        .install_estimate(&StubBehavior::Report("637/1000\nobserved prob: 0.637000\n".into()));
    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    let q = query(&[("problem", "needle"), ("length", "1"), ("gap", "1"), ("trials", "1000")]);
    let report = pipeline.estimate(&q).await.unwrap();

    assert_eq!(report, "637/1000\nobserved prob: 0.637000\n");
    assert_eq!(
        fixture.renderers.recorded_args("buffon.py"),
        vec![vec!["run", "needle", "1", "1", "--trials", "1000"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()]
    );
}

#[tokio::test]
async fn startup_recreates_scratch_directory() {
    let fixture = ServiceFixture::new();
    std::fs::create_dir_all(fixture.scratch_dir()).unwrap();
    std::fs::write(fixture.scratch_dir().join("leftover.png"), b"old").unwrap();

    let pipeline = BuildPipeline::from_config(&fixture.config()).unwrap();

    assert!(pipeline.scratch().path().is_dir());
    assert!(fixture.scratch_files().is_empty());
}
