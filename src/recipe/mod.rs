//! Pipeline recipes: declarative stage graphs for each container format.
//!
//! A [`PipelineRecipe`] is an ordered list of [`StageSpec`]s plus the static
//! links between them and the dynamic-link policy applied when a
//! demultiplexer exposes its stream pads at runtime. Recipes are static
//! configuration: file locations, frame geometry and network endpoints are
//! injected at build time, never baked into the table.
//!
//! Recipes can also be written as launch strings:
//!
//! ```text
//! filesrc ! qtdemux ! queue ! avdec_h264 ! videoconvert ! jpegenc ! filesink
//! ```
//!
//! See [`parse`] for the grammar.

mod parser;

pub use parser::parse;

use crate::error::{Error, Result};
use crate::format::{ContainerFormat, Fraction, StreamCategory};
use std::collections::HashSet;
use std::fmt;

/// A property value applied to a stage at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A string value (paths, host names, client lists).
    String(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An exact rational value (framerates).
    Fraction(Fraction),
}

impl PropertyValue {
    /// Get as a string, converting if necessary.
    pub fn as_string(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Float(f) => f.to_string(),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Fraction(r) => r.to_string(),
        }
    }

    /// Try to get as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get as a u64.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|i| u64::try_from(i).ok())
    }

    /// Try to get as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            PropertyValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Try to get as a fraction.
    pub fn as_fraction(&self) -> Option<Fraction> {
        match self {
            PropertyValue::Fraction(r) => Some(*r),
            PropertyValue::Integer(i) => i32::try_from(*i).ok().map(|n| Fraction::new(n, 1)),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// One stage in a recipe: a role, a factory kind and its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    /// Unique role of the stage within the recipe (e.g. "demux", "vqueue").
    pub role: String,
    /// Factory kind used to construct the stage (e.g. "qtdemux").
    pub kind: String,
    /// Properties applied to the stage at construction time.
    pub properties: Vec<(String, PropertyValue)>,
}

impl StageSpec {
    /// Create a stage spec with no properties.
    pub fn new(role: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            kind: kind.into(),
            properties: Vec::new(),
        }
    }

    /// Add a property.
    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.push((key.into(), value));
        self
    }
}

/// Dynamic-link policy: which stream category goes to which stage.
///
/// When a demultiplexer discovers a pad whose negotiated media type falls
/// into `category`, it is linked to the pre-reserved sink pad of the stage
/// with role `target_role`. Pads matching no rule are left unlinked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRule {
    /// Stream category this rule accepts.
    pub category: StreamCategory,
    /// Role of the downstream stage to link to.
    pub target_role: String,
}

impl LinkRule {
    /// Create a link rule.
    pub fn new(category: StreamCategory, target_role: impl Into<String>) -> Self {
        Self {
            category,
            target_role: target_role.into(),
        }
    }

    /// The usual thumbnail policy: video pads only.
    pub fn video_to(target_role: impl Into<String>) -> Self {
        Self::new(StreamCategory::Video, target_role)
    }
}

/// Declarative description of an ordered stage graph for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRecipe {
    name: String,
    stages: Vec<StageSpec>,
    links: Vec<(String, String)>,
    link_rules: Vec<LinkRule>,
}

impl PipelineRecipe {
    /// Create an empty recipe.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            links: Vec::new(),
            link_rules: Vec::new(),
        }
    }

    /// Add a stage.
    pub fn with_stage(mut self, spec: StageSpec) -> Self {
        self.stages.push(spec);
        self
    }

    /// Add a static link between two roles.
    pub fn with_link(mut self, src: impl Into<String>, sink: impl Into<String>) -> Self {
        self.links.push((src.into(), sink.into()));
        self
    }

    /// Link the given roles as a linear chain.
    pub fn with_chain(mut self, roles: &[&str]) -> Self {
        for pair in roles.windows(2) {
            self.links.push((pair[0].to_string(), pair[1].to_string()));
        }
        self
    }

    /// Add a dynamic-link rule.
    pub fn with_link_rule(mut self, rule: LinkRule) -> Self {
        self.link_rules.push(rule);
        self
    }

    /// Name of the recipe (also used as the pipeline name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stages in construction order.
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// Static links by role.
    pub fn links(&self) -> &[(String, String)] {
        &self.links
    }

    /// Dynamic-link rules.
    pub fn link_rules(&self) -> &[LinkRule] {
        &self.link_rules
    }

    /// Find a stage spec by role.
    pub fn stage(&self, role: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.role == role)
    }

    /// Find the first stage with the given kind.
    pub fn stage_by_kind(&self, kind: &str) -> Option<&StageSpec> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// Check internal consistency: roles are unique, every link endpoint
    /// and every rule target names an existing stage.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.role.as_str()) {
                return Err(Error::Recipe {
                    recipe: self.name.clone(),
                    reason: format!("duplicate stage role '{}'", stage.role),
                });
            }
        }
        for (src, sink) in &self.links {
            for role in [src, sink] {
                if !seen.contains(role.as_str()) {
                    return Err(Error::Recipe {
                        recipe: self.name.clone(),
                        reason: format!("link references unknown role '{role}'"),
                    });
                }
            }
        }
        for rule in &self.link_rules {
            if !seen.contains(rule.target_role.as_str()) {
                return Err(Error::Recipe {
                    recipe: self.name.clone(),
                    reason: format!("link rule targets unknown role '{}'", rule.target_role),
                });
            }
        }
        Ok(())
    }
}

/// Demultiplexer and decoder kinds for a video container.
fn demux_decode_kinds(format: ContainerFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ContainerFormat::Mp4 => Some(("qtdemux", "avdec_h264")),
        ContainerFormat::Avi => Some(("avidemux", "avdec_mpeg4")),
        ContainerFormat::Webm => Some(("matroskademux", "vp8dec")),
        ContainerFormat::Mp3 => None,
    }
}

/// Audio decoder kind for a video container's audio track.
fn audio_decode_kind(format: ContainerFormat) -> &'static str {
    match format {
        ContainerFormat::Mp4 => "avdec_aac",
        ContainerFormat::Avi => "mpg123audiodec",
        ContainerFormat::Webm => "vorbisdec",
        ContainerFormat::Mp3 => "mpg123audiodec",
    }
}

/// Recipe for extracting a still frame from a video container.
///
/// `filesrc ! demux` statically linked, then a decode chain
/// `queue ! decoder ! videoconvert ! videorate ! videoscale ! capsfilter !
/// jpegenc ! filesink`, with the demultiplexer's video pad linked to the
/// queue at runtime. Audio-only formats have no still frame to extract.
pub fn thumbnail_recipe(format: ContainerFormat) -> Result<PipelineRecipe> {
    let (demux, decoder) = demux_decode_kinds(format)
        .ok_or_else(|| Error::UnsupportedFormat(format.to_string()))?;

    Ok(PipelineRecipe::new(format!("thumb-{format}"))
        .with_stage(StageSpec::new("src", "filesrc"))
        .with_stage(StageSpec::new("demux", demux))
        .with_stage(StageSpec::new("vqueue", "queue"))
        .with_stage(StageSpec::new("decode", decoder))
        .with_stage(StageSpec::new("convert", "videoconvert"))
        .with_stage(StageSpec::new("rate", "videorate"))
        .with_stage(StageSpec::new("scale", "videoscale"))
        .with_stage(StageSpec::new("caps", "capsfilter"))
        .with_stage(StageSpec::new("encode", "jpegenc"))
        .with_stage(StageSpec::new("sink", "filesink"))
        .with_link("src", "demux")
        .with_chain(&[
            "vqueue", "decode", "convert", "rate", "scale", "caps", "encode", "sink",
        ])
        .with_link_rule(LinkRule::video_to("vqueue")))
}

/// Recipe for interactive playback/streaming of a media file.
///
/// Video containers get a demuxed video branch ending in an RTP/UDP sink
/// and an audio branch carrying the session's volume stage. The audio-only
/// format is a simple linear chain with no dynamic linking.
pub fn live_recipe(format: ContainerFormat) -> PipelineRecipe {
    match demux_decode_kinds(format) {
        Some((demux, decoder)) => PipelineRecipe::new(format!("live-{format}"))
            .with_stage(StageSpec::new("src", "filesrc"))
            .with_stage(StageSpec::new("demux", demux))
            .with_stage(StageSpec::new("vqueue", "queue"))
            .with_stage(StageSpec::new("vdecode", decoder))
            .with_stage(StageSpec::new("vconvert", "videoconvert"))
            .with_stage(StageSpec::new("vencode", "jpegenc"))
            .with_stage(StageSpec::new("vpay", "rtpjpegpay"))
            .with_stage(StageSpec::new("vsink", "udpsink"))
            .with_stage(StageSpec::new("aqueue", "queue"))
            .with_stage(StageSpec::new("adecode", audio_decode_kind(format)))
            .with_stage(StageSpec::new("aconvert", "audioconvert"))
            .with_stage(StageSpec::new("volume", "volume"))
            .with_stage(StageSpec::new("asink", "autoaudiosink"))
            .with_link("src", "demux")
            .with_chain(&["vqueue", "vdecode", "vconvert", "vencode", "vpay", "vsink"])
            .with_chain(&["aqueue", "adecode", "aconvert", "volume", "asink"])
            .with_link_rule(LinkRule::video_to("vqueue"))
            .with_link_rule(LinkRule::new(StreamCategory::Audio, "aqueue")),
        None => PipelineRecipe::new(format!("live-{format}"))
            .with_stage(StageSpec::new("src", "filesrc"))
            .with_stage(StageSpec::new("parse", "mpegaudioparse"))
            .with_stage(StageSpec::new("adecode", audio_decode_kind(format)))
            .with_stage(StageSpec::new("aconvert", "audioconvert"))
            .with_stage(StageSpec::new("volume", "volume"))
            .with_stage(StageSpec::new("asink", "autoaudiosink"))
            .with_chain(&["src", "parse", "adecode", "aconvert", "volume", "asink"]),
    }
}

/// Recipe that streams an already-extracted still frame to connected peers.
///
/// A linear chain: the frozen image is decoded, replayed for a couple of
/// buffers, scaled and re-encoded, then RTP-payloaded onto a UDP sink.
pub fn still_stream_recipe() -> PipelineRecipe {
    PipelineRecipe::new("still-stream")
        .with_stage(StageSpec::new("src", "filesrc"))
        .with_stage(StageSpec::new("jdec", "jpegdec"))
        .with_stage(StageSpec::new("convert", "videoconvert"))
        .with_stage(
            StageSpec::new("freeze", "imagefreeze")
                .with_property("num-buffers", PropertyValue::Integer(2)),
        )
        .with_stage(StageSpec::new("scale", "videoscale"))
        .with_stage(StageSpec::new("caps", "capsfilter"))
        .with_stage(StageSpec::new("encode", "jpegenc"))
        .with_stage(StageSpec::new("pay", "rtpjpegpay"))
        .with_stage(StageSpec::new("sink", "udpsink"))
        .with_chain(&[
            "src", "jdec", "convert", "freeze", "scale", "caps", "encode", "pay", "sink",
        ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_recipes_validate() {
        for format in [ContainerFormat::Mp4, ContainerFormat::Avi, ContainerFormat::Webm] {
            let recipe = thumbnail_recipe(format).unwrap();
            recipe.validate().unwrap();
            assert_eq!(recipe.stages().len(), 10);
            assert_eq!(recipe.link_rules().len(), 1);
            assert_eq!(recipe.link_rules()[0].target_role, "vqueue");
        }
    }

    #[test]
    fn test_thumbnail_recipe_rejects_audio_only() {
        assert!(matches!(
            thumbnail_recipe(ContainerFormat::Mp3),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_live_audio_recipe_is_linear() {
        let recipe = live_recipe(ContainerFormat::Mp3);
        recipe.validate().unwrap();
        assert!(recipe.link_rules().is_empty());
        assert!(recipe.stage("volume").is_some());
    }

    #[test]
    fn test_live_video_recipe_has_two_rules() {
        let recipe = live_recipe(ContainerFormat::Mp4);
        recipe.validate().unwrap();
        assert_eq!(recipe.link_rules().len(), 2);
        assert!(recipe.stage("volume").is_some());
    }

    #[test]
    fn test_validate_rejects_duplicate_roles() {
        let recipe = PipelineRecipe::new("bad")
            .with_stage(StageSpec::new("a", "queue"))
            .with_stage(StageSpec::new("a", "queue"));
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dangling_link() {
        let recipe = PipelineRecipe::new("bad")
            .with_stage(StageSpec::new("a", "queue"))
            .with_link("a", "missing");
        assert!(recipe.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dangling_rule() {
        let recipe = PipelineRecipe::new("bad")
            .with_stage(StageSpec::new("a", "queue"))
            .with_link_rule(LinkRule::video_to("missing"));
        assert!(recipe.validate().is_err());
    }
}
