//! Integration tests for recipe-driven pipeline construction.

use stillcast::prelude::*;
use std::time::Duration;

fn fixtures() -> (StageRegistry, SimFactory) {
    (
        StageRegistry::new(),
        SimFactory::new(SimScript::video(Duration::from_secs(2))),
    )
}

/// Every supported video format builds with all recipe stages present and
/// all static links established.
#[test]
fn build_succeeds_for_every_video_format() {
    let (registry, factory) = fixtures();

    for format in [ContainerFormat::Mp4, ContainerFormat::Avi, ContainerFormat::Webm] {
        let recipe = recipe::thumbnail_recipe(format).unwrap();
        let endpoints = BuildEndpoints::file_to_file("/media/in", "/media/out.jpg")
            .with_frame(FrameSettings::still_frame());
        let instance = PipelineBuilder::new(&registry, &factory)
            .build(&recipe, &endpoints)
            .unwrap();

        let graph = instance.graph();
        assert_eq!(graph.stage_count(), recipe.stages().len());
        assert_eq!(graph.link_count(), recipe.links().len());
        assert_eq!(instance.current_state(), PipelineState::Null);
        for spec in recipe.stages() {
            assert!(graph.stage_by_role(&spec.role).is_some(), "missing {}", spec.role);
        }
    }
}

/// A recipe naming a decoder the framework cannot construct fails with a
/// construction error naming that stage, and nothing ever changes state.
#[test]
fn missing_decoder_aborts_construction() {
    let mut registry = StageRegistry::new();
    registry.unregister("avdec_h264");
    let factory = SimFactory::new(SimScript::video(Duration::from_secs(2)));
    let probe = factory.probe();

    let recipe = recipe::thumbnail_recipe(ContainerFormat::Mp4).unwrap();
    let endpoints = BuildEndpoints::file_to_file("/media/in.mp4", "/media/out.jpg");
    let err = PipelineBuilder::new(&registry, &factory)
        .build(&recipe, &endpoints)
        .unwrap_err();

    match err {
        Error::Construction { stage, kind } => {
            assert_eq!(stage, "decode");
            assert_eq!(kind, "avdec_h264");
        }
        other => panic!("expected construction error, got {other:?}"),
    }
    assert!(probe.requested_states().is_empty());
}

/// An impossible static link aborts the build before a runtime exists.
#[test]
fn failed_static_link_aborts_construction() {
    let (registry, factory) = fixtures();
    let probe = factory.probe();

    let recipe = PipelineRecipe::new("backwards")
        .with_stage(StageSpec::new("sink", "filesink"))
        .with_stage(StageSpec::new("src", "filesrc"))
        .with_link("sink", "src");
    let err = PipelineBuilder::new(&registry, &factory)
        .build(&recipe, &BuildEndpoints::playback("/media/in"))
        .unwrap_err();

    assert!(matches!(err, Error::Link { .. }));
    assert!(probe.requested_states().is_empty());
}

/// Launch-string recipes build the same way table recipes do.
#[test]
fn parsed_recipe_builds() {
    let (registry, factory) = fixtures();

    let recipe = recipe::parse(
        "probe",
        "filesrc ! qtdemux ! queue ! avdec_h264 ! videoconvert ! jpegenc ! filesink",
    )
    .unwrap()
    .with_link_rule(LinkRule::video_to("queue"));

    let instance = PipelineBuilder::new(&registry, &factory)
        .build(&recipe, &BuildEndpoints::file_to_file("/in.mp4", "/out.jpg"))
        .unwrap();
    // The demuxer boundary stays unlinked until runtime.
    assert_eq!(instance.graph().link_count(), recipe.stages().len() - 2);
}

/// A launch string naming an unknown kind still yields a construction
/// error carrying the derived role.
#[test]
fn parsed_recipe_with_unknown_kind() {
    let (registry, factory) = fixtures();

    let recipe = recipe::parse("probe", "filesrc ! nosuchdec ! filesink").unwrap();
    let err = PipelineBuilder::new(&registry, &factory)
        .build(&recipe, &BuildEndpoints::playback("/in"))
        .unwrap_err();
    match err {
        Error::Construction { stage, kind } => {
            assert_eq!(stage, "nosuchdec");
            assert_eq!(kind, "nosuchdec");
        }
        other => panic!("expected construction error, got {other:?}"),
    }
}
