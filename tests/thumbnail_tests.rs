//! Integration tests for the still-frame extraction run.

use stillcast::prelude::*;
use std::time::Duration;

fn artifact_path(dir: &tempfile::TempDir) -> String {
    dir.path().join("still.jpg").to_string_lossy().into_owned()
}

/// A short clip runs to EOS: exactly one artifact exists afterwards and
/// the pipeline is back in null.
#[tokio::test(start_paused = true)]
async fn short_clip_runs_to_eos() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StageRegistry::new();
    let factory = SimFactory::new(SimScript::video(Duration::from_secs(2)));
    let probe = factory.probe();

    let extractor = ThumbnailExtractor::new(
        &registry,
        &factory,
        ThumbnailConfig::new(artifact_path(&dir)),
    );
    let report = extractor.extract("/media/clip.mp4", "mp4").await.unwrap();

    assert_eq!(report.format, ContainerFormat::Mp4);
    assert_eq!(report.duration, Some(Duration::from_secs(2)));
    assert_eq!(probe.artifacts().len(), 1);
    assert!(std::fs::metadata(&report.artifact).unwrap().len() > 0);
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}

/// The one-time seek is issued exactly once, with flush+accurate flags,
/// at the configured target.
#[tokio::test(start_paused = true)]
async fn seek_is_issued_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StageRegistry::new();
    let factory = SimFactory::new(SimScript::video(Duration::from_secs(8)));
    let probe = factory.probe();

    let mut config = ThumbnailConfig::new(artifact_path(&dir));
    config.seek_target = Duration::from_secs(30);
    let extractor = ThumbnailExtractor::new(&registry, &factory, config);
    extractor.extract("/media/clip.mp4", "mp4").await.unwrap();

    let seeks = probe.seeks();
    assert_eq!(seeks.len(), 1);
    let (target, flags) = seeks[0];
    assert_eq!(target, Duration::from_secs(30));
    assert!(flags.flush && flags.accurate);
}

/// A bus error mid-run terminates the loop, fails the run, leaves the
/// pipeline in null, and no seek happens after the error.
#[tokio::test(start_paused = true)]
async fn bus_error_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StageRegistry::new();
    let script = SimScript::video(Duration::from_secs(30)).with_fault(
        Duration::from_millis(200),
        "demux",
        "container is corrupt",
    );
    let factory = SimFactory::new(script);
    let probe = factory.probe();

    let artifact = artifact_path(&dir);
    let extractor =
        ThumbnailExtractor::new(&registry, &factory, ThumbnailConfig::new(artifact.clone()));
    let err = extractor.extract("/media/clip.mp4", "mp4").await.unwrap_err();

    match err {
        Error::Stream { element, message, .. } => {
            assert_eq!(element, "demux");
            assert_eq!(message, "container is corrupt");
        }
        other => panic!("expected stream error, got {other:?}"),
    }
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
    assert!(probe.seeks().is_empty());
    assert!(std::fs::metadata(&artifact).is_err());
}

/// Only the video pad is linked; the audio pad matches no thumbnail rule
/// and stays unlinked without escalating anything.
#[tokio::test(start_paused = true)]
async fn audio_pad_stays_unlinked() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StageRegistry::new();
    let factory = SimFactory::new(SimScript::video(Duration::from_secs(1)));
    let probe = factory.probe();

    let extractor = ThumbnailExtractor::new(
        &registry,
        &factory,
        ThumbnailConfig::new(artifact_path(&dir)),
    );
    extractor.extract("/media/clip.mp4", "mp4").await.unwrap();

    assert_eq!(
        probe.links(),
        vec![("video_0".to_string(), "vqueue".to_string())]
    );
}

/// A refused dynamic link is non-fatal: the run still terminates via EOS,
/// but the sink branch never received data, so there is no artifact.
#[tokio::test(start_paused = true)]
async fn failed_dynamic_link_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StageRegistry::new();
    let script = SimScript::video(Duration::from_secs(1)).with_link_failure("video_0");
    let factory = SimFactory::new(script);
    let probe = factory.probe();

    let artifact = artifact_path(&dir);
    let extractor =
        ThumbnailExtractor::new(&registry, &factory, ThumbnailConfig::new(artifact.clone()));
    // The run itself succeeds: a dead branch is a quality problem, not an
    // orchestration failure.
    extractor.extract("/media/clip.mp4", "mp4").await.unwrap();

    assert!(probe.links().is_empty());
    assert!(std::fs::metadata(&artifact).is_err());
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}

/// Unsupported extensions are rejected before anything is constructed.
#[tokio::test(start_paused = true)]
async fn unsupported_format_is_rejected() {
    let registry = StageRegistry::new();
    let factory = SimFactory::new(SimScript::default());
    let extractor =
        ThumbnailExtractor::new(&registry, &factory, ThumbnailConfig::new("/tmp/x.jpg"));

    for ext in ["mkv", "mp3", "txt", ""] {
        let err = extractor.extract("/media/file", ext).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)), "ext {ext:?}");
    }
    assert!(factory.probe().requested_states().is_empty());
}

/// Back-to-back extractions each own their pipeline: two runs, two
/// artifacts, both torn down.
#[tokio::test(start_paused = true)]
async fn consecutive_runs_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let registry = StageRegistry::new();
    let factory = SimFactory::new(SimScript::video(Duration::from_secs(1)));
    let probe = factory.probe();

    for (name, ext) in [("a.mp4", "mp4"), ("b.webm", "webm")] {
        let artifact = dir
            .path()
            .join(format!("{name}.jpg"))
            .to_string_lossy()
            .into_owned();
        let extractor =
            ThumbnailExtractor::new(&registry, &factory, ThumbnailConfig::new(artifact));
        extractor
            .extract(&format!("/media/{name}"), ext)
            .await
            .unwrap();
    }

    assert_eq!(probe.artifacts().len(), 2);
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}
