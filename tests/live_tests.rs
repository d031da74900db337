//! Integration tests for the interactive live session.

use stillcast::prelude::*;
use stillcast::runtime::sim::{SimProbe, SimRuntime};
use std::time::Duration;
use tokio::io::BufReader;

fn live_instance(
    script: SimScript,
    format: ContainerFormat,
) -> (PipelineInstance<SimRuntime>, SimProbe, String) {
    let registry = StageRegistry::new();
    let factory = SimFactory::new(script);
    let probe = factory.probe();

    let recipe = recipe::live_recipe(format);
    let media = format!("/media/item.{format}");
    let mut instance = PipelineBuilder::new(&registry, &factory)
        .build(&recipe, &BuildEndpoints::playback(media.clone()))
        .unwrap();
    instance.set_state(PipelineState::Playing).unwrap();

    (instance, probe, media)
}

fn volume_sets(probe: &SimProbe) -> Vec<f64> {
    probe
        .property_sets()
        .into_iter()
        .filter(|(role, key, _)| role == "volume" && key == "volume")
        .filter_map(|(_, _, v)| v.as_f64())
        .collect()
}

/// `q` against a playing session: the pipeline reaches null and the loop
/// exits with the quit verdict.
#[tokio::test(start_paused = true)]
async fn quit_tears_down_and_exits() {
    let (instance, probe, media) =
        live_instance(SimScript::video(Duration::from_secs(60)), ContainerFormat::Mp4);

    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b"q\n"[..]))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Quit);
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}

/// Thirty volume-up commands from 0.9: the control saturates at exactly
/// 1.0 after two steps and later commands mutate nothing.
#[tokio::test(start_paused = true)]
async fn volume_up_is_clamped() {
    let (mut instance, probe, media) =
        live_instance(SimScript::video(Duration::from_secs(600)), ContainerFormat::Mp4);
    instance
        .set_stage_property("volume", "volume", PropertyValue::Float(0.9))
        .unwrap();

    let input = format!("{}q\n", "v\n".repeat(30));
    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(input.as_bytes()))
        .await
        .unwrap();
    assert_eq!(exit, LoopExit::Quit);

    let sets = volume_sets(&probe);
    // Our seed plus exactly two effective increments; 28 commands hit the
    // ceiling and mutate nothing.
    assert_eq!(sets.len(), 3);
    assert!((sets[1] - 0.95).abs() < 1e-9);
    assert_eq!(sets[2], 1.0);
}

/// Volume-down bottoms out at 0.0 and stays there.
#[tokio::test(start_paused = true)]
async fn volume_down_is_clamped() {
    let (mut instance, probe, media) =
        live_instance(SimScript::video(Duration::from_secs(600)), ContainerFormat::Mp4);
    instance
        .set_stage_property("volume", "volume", PropertyValue::Float(0.05))
        .unwrap();

    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b"u\nu\nu\nq\n"[..]))
        .await
        .unwrap();
    assert_eq!(exit, LoopExit::Quit);

    let sets = volume_sets(&probe);
    // Seed plus one clamped decrement; the rest hit the floor.
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[1], 0.0);
}

/// The audio-only live pipeline carries the same volume control.
#[tokio::test(start_paused = true)]
async fn audio_session_has_volume_control() {
    let (mut instance, probe, media) =
        live_instance(SimScript::audio(Duration::from_secs(600)), ContainerFormat::Mp3);
    instance
        .set_stage_property("volume", "volume", PropertyValue::Float(0.5))
        .unwrap();

    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b"v\nq\n"[..]))
        .await
        .unwrap();
    assert_eq!(exit, LoopExit::Quit);

    let sets = volume_sets(&probe);
    assert_eq!(sets.len(), 2);
    assert!((sets[1] - 0.55).abs() < 1e-9);
}

/// `n` flushes, tears down and exits so the caller can load the next item.
#[tokio::test(start_paused = true)]
async fn next_flushes_and_exits() {
    let (instance, probe, media) =
        live_instance(SimScript::video(Duration::from_secs(60)), ContainerFormat::Mp4);

    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b"n\n"[..]))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Next);
    let states = probe.requested_states();
    assert_eq!(states.last(), Some(&PipelineState::Null));
    assert!(states.contains(&PipelineState::Paused));
    // The flush seek to zero was issued.
    let (target, flags) = *probe.seeks().last().unwrap();
    assert_eq!(target, Duration::ZERO);
    assert!(flags.flush && !flags.accurate);
}

/// End of stream tears the session down and reports a finished run.
#[tokio::test(start_paused = true)]
async fn eos_finishes_the_session() {
    let (instance, probe, media) = live_instance(
        SimScript::video(Duration::from_millis(300)),
        ContainerFormat::Mp4,
    );

    // No commands at all: the stream just runs out.
    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b""[..]))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Finished);
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}

/// A fatal bus error tears down and surfaces as the loop's error.
#[tokio::test(start_paused = true)]
async fn bus_error_fails_the_session() {
    let script = SimScript::audio(Duration::from_secs(60)).with_fault(
        Duration::from_millis(200),
        "adecode",
        "bad frame header",
    );
    let (instance, probe, media) = live_instance(script, ContainerFormat::Mp3);

    let err = LiveSession::new(instance, media)
        .run(BufReader::new(&b""[..]))
        .await
        .unwrap_err();

    match err {
        Error::Stream { element, .. } => assert_eq!(element, "adecode"),
        other => panic!("expected stream error, got {other:?}"),
    }
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}

/// Unrecognized keys are reported and ignored; the session stays usable.
#[tokio::test(start_paused = true)]
async fn unrecognized_input_is_ignored() {
    let (instance, probe, media) =
        live_instance(SimScript::video(Duration::from_secs(60)), ContainerFormat::Mp4);

    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b"x\n!\nk\nt\nd\nm\nq\n"[..]))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Quit);
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}

/// Forward seeks have no latch: every `c` issues one, 10 s past the
/// current position, flush-only.
#[tokio::test(start_paused = true)]
async fn forward_seek_repeats() {
    let (instance, probe, media) =
        live_instance(SimScript::video(Duration::from_secs(600)), ContainerFormat::Mp4);

    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b"c\nc\nc\nq\n"[..]))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Quit);
    let seeks = probe.seeks();
    assert_eq!(seeks.len(), 3);
    for (_, flags) in &seeks {
        assert!(flags.flush && !flags.accurate);
    }
    // Each seek lands 10 s past the then-current position, so targets
    // strictly increase.
    assert!(seeks.windows(2).all(|w| w[0].0 < w[1].0));
}

/// The still-stream pipeline (replaying an extracted frame to peers) runs
/// under the same session contract: linear, no dynamic links, EOS ends it.
#[tokio::test(start_paused = true)]
async fn still_stream_session_finishes() {
    let registry = StageRegistry::new();
    let factory = SimFactory::new(SimScript::audio(Duration::from_millis(300)));
    let probe = factory.probe();

    let recipe = recipe::still_stream_recipe();
    let endpoints = BuildEndpoints::file_to_network(
        "/var/run/still.jpg",
        NetworkEndpoint::new("239.0.0.1", 5003).with_client("10.0.0.2:5003"),
    )
    .with_frame(FrameSettings::still_stream());
    let mut instance = PipelineBuilder::new(&registry, &factory)
        .build(&recipe, &endpoints)
        .unwrap();
    instance.set_state(PipelineState::Playing).unwrap();

    let exit = LiveSession::new(instance, "/var/run/still.jpg")
        .run(BufReader::new(&b""[..]))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Finished);
    assert!(probe.links().is_empty());
    assert_eq!(probe.last_state(), Some(PipelineState::Null));
}

/// Pause and play flow through to the pipeline.
#[tokio::test(start_paused = true)]
async fn pause_and_play_change_state() {
    let (instance, probe, media) =
        live_instance(SimScript::video(Duration::from_secs(600)), ContainerFormat::Mp4);

    let exit = LiveSession::new(instance, media)
        .run(BufReader::new(&b"s\np\nq\n"[..]))
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Quit);
    let states = probe.requested_states();
    // Playing (fixture), Paused, Playing, Null.
    assert_eq!(
        states,
        vec![
            PipelineState::Playing,
            PipelineState::Paused,
            PipelineState::Playing,
            PipelineState::Null
        ]
    );
}
