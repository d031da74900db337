//! The seam to the media-processing framework.
//!
//! stillcast's control plane never touches decoders, demuxers or transport
//! directly; everything data-plane lives behind [`PipelineRuntime`]. A
//! production embedding implements the trait over its media framework; the
//! crate ships [`sim`], a deterministic simulation runtime used by the test
//! suite and the demos.

pub mod sim;

use crate::error::Result;
use crate::pipeline::{BusReceiver, PipelineState, StageGraph};
use crate::recipe::PropertyValue;
use crate::stage::PadInfo;
use std::time::Duration;

/// How a requested state change completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    /// The transition finished synchronously.
    Complete,
    /// The transition continues asynchronously; completion is reported as
    /// a state-changed message on the bus.
    Async,
}

/// Flags applied to a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeekFlags {
    /// Flush pending data before repositioning.
    pub flush: bool,
    /// Land exactly on the requested position rather than a keyframe.
    pub accurate: bool,
}

impl SeekFlags {
    /// Flush only (interactive seeks).
    pub const FLUSH: Self = Self {
        flush: true,
        accurate: false,
    };

    /// Flush and accurate (one-shot still-frame seek).
    pub const FLUSH_ACCURATE: Self = Self {
        flush: true,
        accurate: true,
    };
}

/// Answer to a seeking-capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekBounds {
    /// Whether the stream supports seeking at all.
    pub seekable: bool,
    /// First seekable position.
    pub start: Duration,
    /// Last seekable position.
    pub end: Duration,
}

/// Control surface of a running pipeline.
///
/// All methods are control-plane operations: quick, non-blocking calls
/// that either inspect or redirect the data plane. Queries return `None`
/// when the pipeline cannot answer yet; callers treat that as transient.
pub trait PipelineRuntime: Send {
    /// Request a state transition.
    fn change_state(&mut self, target: PipelineState) -> Result<StateTransition>;

    /// Take the receiving half of the status bus. Yields once.
    fn take_bus(&mut self) -> Option<BusReceiver>;

    /// Drain stream pads discovered since the last call.
    fn drain_pads(&mut self) -> Vec<PadInfo>;

    /// Complete a dynamic link from a discovered pad to a stage.
    fn complete_link(&mut self, pad: &PadInfo, target_role: &str) -> Result<()>;

    /// Give the data plane a slice of time to make progress.
    ///
    /// Called by the supervising loop with its poll timeout. Frameworks
    /// with their own threads treat this as a no-op; the simulation
    /// advances its media clock by the budget.
    fn advance(&mut self, budget: Duration);

    /// Query the current playback position.
    fn query_position(&mut self) -> Option<Duration>;

    /// Query the stream duration.
    fn query_duration(&mut self) -> Option<Duration>;

    /// Query seeking capability.
    fn query_seekable(&mut self) -> Option<SeekBounds>;

    /// Reposition playback to `target`.
    fn seek(&mut self, target: Duration, flags: SeekFlags) -> Result<()>;

    /// Set a stage property on the running pipeline.
    fn set_property(&mut self, role: &str, key: &str, value: PropertyValue) -> Result<()>;

    /// Read back a stage property.
    fn property(&self, role: &str, key: &str) -> Option<PropertyValue>;
}

/// Creates runtimes for built stage graphs.
pub trait RuntimeFactory {
    /// The runtime type produced.
    type Runtime: PipelineRuntime;

    /// Spawn a runtime for a validated, fully linked stage graph.
    fn spawn(&self, graph: &StageGraph) -> Result<Self::Runtime>;
}
