//! Deterministic simulation runtime.
//!
//! Stands in for the media framework behind [`PipelineRuntime`]: a virtual
//! media clock advanced by the supervising loop's poll budget, a scripted
//! stream topology, and scripted faults. State transitions, pad discovery,
//! EOS and artifact emission all behave like the real thing as far as the
//! control plane can observe, while staying instant and repeatable under a
//! paused test clock.

use crate::error::{Error, Result};
use crate::format::MediaType;
use crate::pipeline::{
    BusReceiver, BusSender, PipelineState, StageGraph, bus_channel,
};
use crate::recipe::PropertyValue;
use crate::runtime::{PipelineRuntime, RuntimeFactory, SeekBounds, SeekFlags, StateTransition};
use crate::stage::{ElementType, PadInfo};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Minimal JPEG byte stream written as the simulated still-frame artifact.
const STILL_FRAME_BYTES: &[u8] = &[
    0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0xff, 0xd9,
];

/// One elementary stream the simulated demultiplexer exposes.
#[derive(Debug, Clone)]
pub struct SimStream {
    /// Pad name the stream appears on.
    pub pad: String,
    /// Negotiated media type.
    pub media_type: MediaType,
}

impl SimStream {
    /// Create a stream description.
    pub fn new(pad: impl Into<String>, media_type: impl Into<MediaType>) -> Self {
        Self {
            pad: pad.into(),
            media_type: media_type.into(),
        }
    }
}

/// A scripted mid-run fault.
#[derive(Debug, Clone)]
pub struct SimFault {
    /// Media-clock position at which the fault fires.
    pub at: Duration,
    /// Element the error is attributed to.
    pub source: String,
    /// Error message.
    pub message: String,
    /// Optional debug detail.
    pub debug: Option<String>,
}

/// Script describing how a simulated pipeline behaves.
#[derive(Debug, Clone)]
pub struct SimScript {
    /// Total media duration; `None` simulates a stream that never reports one.
    pub duration: Option<Duration>,
    /// Whether the stream supports seeking.
    pub seekable: bool,
    /// Streams exposed by the demultiplexer once prerolled.
    pub streams: Vec<SimStream>,
    /// Optional scripted fault.
    pub fault: Option<SimFault>,
    /// Refuse the transition to `Playing`.
    pub refuse_playing: bool,
    /// Number of position queries that fail before they start succeeding.
    pub position_failures: u32,
    /// Pads whose dynamic link attempt is refused.
    pub link_failures: HashSet<String>,
    /// Media-clock position at which a duration change is announced.
    pub duration_restated_at: Option<Duration>,
}

impl Default for SimScript {
    fn default() -> Self {
        Self {
            duration: Some(Duration::from_secs(10)),
            seekable: true,
            streams: Vec::new(),
            fault: None,
            refuse_playing: false,
            position_failures: 0,
            link_failures: HashSet::new(),
            duration_restated_at: None,
        }
    }
}

impl SimScript {
    /// A video container: one video and one audio stream.
    pub fn video(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            streams: vec![
                SimStream::new("video_0", "video/x-h264"),
                SimStream::new("audio_0", "audio/mpeg"),
            ],
            ..Self::default()
        }
    }

    /// An audio-only file: linear pipeline, nothing to demux.
    pub fn audio(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Script a fault at the given media-clock position.
    pub fn with_fault(
        mut self,
        at: Duration,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.fault = Some(SimFault {
            at,
            source: source.into(),
            message: message.into(),
            debug: None,
        });
        self
    }

    /// Refuse the transition to `Playing`.
    pub fn refusing_playing(mut self) -> Self {
        self.refuse_playing = true;
        self
    }

    /// Make the stream unseekable.
    pub fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    /// Fail the first `n` position queries.
    pub fn with_position_failures(mut self, n: u32) -> Self {
        self.position_failures = n;
        self
    }

    /// Refuse dynamic links for the given pad.
    pub fn with_link_failure(mut self, pad: impl Into<String>) -> Self {
        self.link_failures.insert(pad.into());
        self
    }

    /// Announce a duration change at the given media-clock position.
    pub fn with_duration_restated_at(mut self, at: Duration) -> Self {
        self.duration_restated_at = Some(at);
        self
    }
}

/// Everything a test may want to assert about a finished run.
#[derive(Debug, Default)]
struct ProbeData {
    requested_states: Vec<PipelineState>,
    seeks: Vec<(Duration, SeekFlags)>,
    links: Vec<(String, String)>,
    artifacts: Vec<String>,
    position_queries: u32,
    property_sets: Vec<(String, String, PropertyValue)>,
}

/// Shared observation handle into the runtimes spawned by a [`SimFactory`].
#[derive(Clone, Default, Debug)]
pub struct SimProbe(Arc<Mutex<ProbeData>>);

impl SimProbe {
    fn data(&self) -> std::sync::MutexGuard<'_, ProbeData> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// States requested via `change_state`, in order.
    pub fn requested_states(&self) -> Vec<PipelineState> {
        self.data().requested_states.clone()
    }

    /// The most recently requested state.
    pub fn last_state(&self) -> Option<PipelineState> {
        self.data().requested_states.last().copied()
    }

    /// Seeks performed, in order.
    pub fn seeks(&self) -> Vec<(Duration, SeekFlags)> {
        self.data().seeks.clone()
    }

    /// Completed dynamic links as `(pad, target_role)` pairs.
    pub fn links(&self) -> Vec<(String, String)> {
        self.data().links.clone()
    }

    /// Artifact locations written on EOS.
    pub fn artifacts(&self) -> Vec<String> {
        self.data().artifacts.clone()
    }

    /// Number of position queries answered (or refused).
    pub fn position_queries(&self) -> u32 {
        self.data().position_queries
    }

    /// Properties set on the running pipeline as `(role, key, value)`.
    pub fn property_sets(&self) -> Vec<(String, String, PropertyValue)> {
        self.data().property_sets.clone()
    }
}

/// Spawns [`SimRuntime`]s for built stage graphs.
///
/// Scripts are keyed by source location so a test can give each input file
/// its own behaviour; unmatched locations fall back to the default script.
pub struct SimFactory {
    default_script: SimScript,
    scripts: HashMap<String, SimScript>,
    probe: SimProbe,
}

impl SimFactory {
    /// Create a factory with a default script.
    pub fn new(default_script: SimScript) -> Self {
        Self {
            default_script,
            scripts: HashMap::new(),
            probe: SimProbe::default(),
        }
    }

    /// Script a specific source location.
    pub fn with_script(mut self, location: impl Into<String>, script: SimScript) -> Self {
        self.scripts.insert(location.into(), script);
        self
    }

    /// Observation handle shared by every runtime this factory spawns.
    pub fn probe(&self) -> SimProbe {
        self.probe.clone()
    }
}

impl RuntimeFactory for SimFactory {
    type Runtime = SimRuntime;

    fn spawn(&self, graph: &StageGraph) -> Result<Self::Runtime> {
        let source_location = graph
            .find_kind("filesrc")
            .and_then(|s| s.property("location"))
            .map(|v| v.as_string());
        let script = source_location
            .as_deref()
            .and_then(|loc| self.scripts.get(loc))
            .unwrap_or(&self.default_script)
            .clone();

        let sink_location = graph
            .find_kind("filesink")
            .and_then(|s| s.property("location"))
            .map(|v| v.as_string());
        let demux_role = graph
            .stages()
            .find(|s| s.element_type() == ElementType::Demuxer)
            .map(|s| s.role().to_string());

        let mut properties = HashMap::new();
        for stage in graph.stages() {
            for (key, value) in stage.properties() {
                properties.insert((stage.role().to_string(), key.clone()), value.clone());
            }
        }
        let roles: HashSet<String> = graph.stages().map(|s| s.role().to_string()).collect();

        let (bus_tx, bus_rx) = bus_channel();

        debug!(
            pipeline = graph.name(),
            source = source_location.as_deref().unwrap_or("-"),
            "simulation runtime spawned"
        );

        Ok(SimRuntime {
            name: graph.name().to_string(),
            script,
            state: PipelineState::Null,
            clock: Duration::ZERO,
            bus_tx,
            bus_rx: Some(bus_rx),
            pending_pads: Vec::new(),
            pads_announced: false,
            eos_sent: false,
            faulted: false,
            duration_restated: false,
            sink_location,
            demux_role,
            links: Vec::new(),
            properties,
            roles,
            position_failures_left: 0,
            probe: self.probe.clone(),
        })
    }
}

/// A simulated pipeline runtime. See the module docs.
#[derive(Debug)]
pub struct SimRuntime {
    name: String,
    script: SimScript,
    state: PipelineState,
    clock: Duration,
    bus_tx: BusSender,
    bus_rx: Option<BusReceiver>,
    pending_pads: Vec<PadInfo>,
    pads_announced: bool,
    eos_sent: bool,
    faulted: bool,
    duration_restated: bool,
    sink_location: Option<String>,
    demux_role: Option<String>,
    links: Vec<(String, String)>,
    properties: HashMap<(String, String), PropertyValue>,
    roles: HashSet<String>,
    position_failures_left: u32,
    probe: SimProbe,
}

impl SimRuntime {
    fn rank(state: PipelineState) -> i8 {
        match state {
            PipelineState::Null => 0,
            PipelineState::Ready => 1,
            PipelineState::Paused => 2,
            PipelineState::Playing => 3,
        }
    }

    fn from_rank(rank: i8) -> PipelineState {
        match rank {
            0 => PipelineState::Null,
            1 => PipelineState::Ready,
            2 => PipelineState::Paused,
            _ => PipelineState::Playing,
        }
    }

    /// Walk the state ladder one hop at a time, posting a state-changed
    /// message per hop the way a real pipeline does.
    fn walk_to(&mut self, target: PipelineState) {
        let name = self.name.clone();
        let mut current = Self::rank(self.state);
        let goal = Self::rank(target);
        while current != goal {
            let old = Self::from_rank(current);
            current += if goal > current { 1 } else { -1 };
            let new = Self::from_rank(current);
            let pending = (new != target).then_some(target);

            // Substages report first, then the top-level pipeline; only the
            // latter may affect session state.
            self.bus_tx.state_changed("src", old, new, pending);
            self.bus_tx.state_changed(name.as_str(), old, new, pending);

            if new >= PipelineState::Paused && !self.pads_announced {
                self.announce_pads();
            }
        }
        self.state = target;
    }

    fn announce_pads(&mut self) {
        self.pads_announced = true;
        let Some(demux) = self.demux_role.clone() else {
            return;
        };
        let pads: Vec<PadInfo> = self
            .script
            .streams
            .iter()
            .map(|s| PadInfo::new(demux.as_str(), s.pad.as_str(), s.media_type.clone()))
            .collect();
        self.pending_pads.extend(pads);
    }

    fn emit_eos(&mut self) {
        self.eos_sent = true;
        self.write_artifact();
        self.bus_tx.eos(self.name.as_str());
    }

    /// The sink only receives data if its branch was actually wired: linear
    /// pipelines always are, demuxed ones need a completed dynamic link.
    fn write_artifact(&mut self) {
        let Some(location) = &self.sink_location else {
            return;
        };
        if self.demux_role.is_some() && self.links.is_empty() {
            warn!(
                pipeline = %self.name,
                "end of stream with no linked branch; no artifact written"
            );
            return;
        }
        match fs::write(location, STILL_FRAME_BYTES) {
            Ok(()) => {
                debug!(pipeline = %self.name, artifact = %location, "artifact written");
                self.probe.data().artifacts.push(location.clone());
            }
            Err(e) => {
                warn!(pipeline = %self.name, artifact = %location, "artifact write failed: {e}")
            }
        }
    }
}

impl PipelineRuntime for SimRuntime {
    fn change_state(&mut self, target: PipelineState) -> Result<StateTransition> {
        self.probe.data().requested_states.push(target);
        if target == PipelineState::Playing && self.script.refuse_playing {
            return Err(Error::StateChange {
                pipeline: self.name.clone(),
                target,
            });
        }
        if target == PipelineState::Playing && self.position_failures_left == 0 {
            self.position_failures_left = self.script.position_failures;
        }
        self.walk_to(target);
        Ok(StateTransition::Complete)
    }

    fn take_bus(&mut self) -> Option<BusReceiver> {
        self.bus_rx.take()
    }

    fn drain_pads(&mut self) -> Vec<PadInfo> {
        std::mem::take(&mut self.pending_pads)
    }

    fn complete_link(&mut self, pad: &PadInfo, target_role: &str) -> Result<()> {
        if self.script.link_failures.contains(&pad.pad) {
            return Err(Error::Link {
                src: pad.stage.clone(),
                sink: target_role.to_string(),
                reason: format!("runtime refused to link pad '{}'", pad.pad),
            });
        }
        self.links.push((pad.pad.clone(), target_role.to_string()));
        self.probe
            .data()
            .links
            .push((pad.pad.clone(), target_role.to_string()));
        Ok(())
    }

    fn advance(&mut self, budget: Duration) {
        if self.state != PipelineState::Playing || self.eos_sent || self.faulted {
            return;
        }
        self.clock += budget;

        if let Some(fault) = self.script.fault.clone() {
            if self.clock >= fault.at {
                self.faulted = true;
                self.bus_tx.error(fault.source, fault.message, fault.debug);
                return;
            }
        }
        if let Some(at) = self.script.duration_restated_at {
            if !self.duration_restated && self.clock >= at {
                self.duration_restated = true;
                self.bus_tx.duration_changed(self.name.as_str());
            }
        }
        if let Some(duration) = self.script.duration {
            if self.clock >= duration {
                self.clock = duration;
                self.emit_eos();
            }
        }
    }

    fn query_position(&mut self) -> Option<Duration> {
        self.probe.data().position_queries += 1;
        if self.state < PipelineState::Paused {
            return None;
        }
        if self.position_failures_left > 0 {
            self.position_failures_left -= 1;
            return None;
        }
        Some(self.clock)
    }

    fn query_duration(&mut self) -> Option<Duration> {
        if self.state < PipelineState::Paused {
            return None;
        }
        self.script.duration
    }

    fn query_seekable(&mut self) -> Option<SeekBounds> {
        if self.state < PipelineState::Paused {
            return None;
        }
        Some(SeekBounds {
            seekable: self.script.seekable,
            start: Duration::ZERO,
            end: self.script.duration.unwrap_or_default(),
        })
    }

    fn seek(&mut self, target: Duration, flags: SeekFlags) -> Result<()> {
        if !self.script.seekable || self.faulted {
            return Err(Error::Seek(self.name.clone()));
        }
        self.probe.data().seeks.push((target, flags));
        self.clock = match self.script.duration {
            Some(duration) => target.min(duration),
            None => target,
        };
        Ok(())
    }

    fn set_property(&mut self, role: &str, key: &str, value: PropertyValue) -> Result<()> {
        if !self.roles.contains(role) {
            return Err(Error::Recipe {
                recipe: self.name.clone(),
                reason: format!("no stage with role '{role}'"),
            });
        }
        self.probe
            .data()
            .property_sets
            .push((role.to_string(), key.to_string(), value.clone()));
        self.properties
            .insert((role.to_string(), key.to_string()), value);
        Ok(())
    }

    fn property(&self, role: &str, key: &str) -> Option<PropertyValue> {
        self.properties
            .get(&(role.to_string(), key.to_string()))
            .cloned()
    }
}
