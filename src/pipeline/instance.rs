//! An owned, running pipeline and its control surface.

use crate::error::Result;
use crate::pipeline::bus::{BusMessage, BusReceiver, MessageMask};
use crate::pipeline::linker::{CategoryLinker, DynamicLinker, LinkDecision};
use crate::pipeline::{PipelineState, StageGraph};
use crate::recipe::PropertyValue;
use crate::runtime::{PipelineRuntime, SeekBounds, SeekFlags, StateTransition};
use std::time::Duration;
use tracing::{debug, warn};

/// An owned pipeline: its stage graph, runtime handle, status bus and
/// dynamic-link policy.
///
/// Exactly one instance exists per supervised run; the loop driving it is
/// the only owner, so no locking is involved anywhere in the control plane.
#[derive(Debug)]
pub struct PipelineInstance<R: PipelineRuntime> {
    graph: StageGraph,
    runtime: R,
    bus: Option<BusReceiver>,
    linker: CategoryLinker,
    state: PipelineState,
}

impl<R: PipelineRuntime> PipelineInstance<R> {
    pub(crate) fn new(
        graph: StageGraph,
        runtime: R,
        bus: BusReceiver,
        linker: CategoryLinker,
    ) -> Self {
        Self {
            graph,
            runtime,
            bus: Some(bus),
            linker,
            state: PipelineState::Null,
        }
    }

    /// Name of the pipeline.
    pub fn name(&self) -> &str {
        self.graph.name()
    }

    /// The stage graph.
    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    /// The most recently requested state.
    pub fn current_state(&self) -> PipelineState {
        self.state
    }

    /// Request a state transition.
    pub fn set_state(&mut self, target: PipelineState) -> Result<StateTransition> {
        let transition = self.runtime.change_state(target)?;
        debug!(pipeline = self.name(), %target, ?transition, "state change requested");
        self.state = target;
        Ok(transition)
    }

    /// Drain newly discovered pads through the dynamic-link policy and give
    /// the data plane a slice of time.
    ///
    /// A failed dynamic link is reported and otherwise ignored: the branch
    /// behind it simply produces no data.
    pub fn pump(&mut self, budget: Duration) {
        for pad in self.runtime.drain_pads() {
            match self.linker.on_pad_discovered(&pad) {
                LinkDecision::Link { target_role } => {
                    match self.runtime.complete_link(&pad, &target_role) {
                        Ok(()) => {
                            self.linker.mark_linked(&target_role);
                            self.record_dynamic_link(&pad.stage, &target_role);
                            debug!(
                                pipeline = self.graph.name(),
                                pad = %pad.pad,
                                media_type = %pad.media_type,
                                target = %target_role,
                                "dynamic pad linked"
                            );
                        }
                        Err(e) => {
                            warn!(
                                pipeline = self.graph.name(),
                                pad = %pad.pad,
                                media_type = %pad.media_type,
                                "pad type matched but link failed: {e}"
                            );
                        }
                    }
                }
                LinkDecision::Ignore => {
                    debug!(
                        pipeline = self.graph.name(),
                        pad = %pad.pad,
                        media_type = %pad.media_type,
                        "ignoring pad with no matching link rule"
                    );
                }
            }
        }
        self.runtime.advance(budget);
    }

    fn record_dynamic_link(&mut self, src_role: &str, sink_role: &str) {
        let (Some(src), Some(sink)) = (self.graph.stage_id(src_role), self.graph.stage_id(sink_role))
        else {
            return;
        };
        if let Err(e) = self.graph.link_dynamic(src, sink) {
            warn!(pipeline = self.graph.name(), "could not record dynamic link: {e}");
        }
    }

    /// Wait up to `timeout` for the next bus message matching `mask`.
    ///
    /// Pads discovered in the meantime are wired first, and the runtime is
    /// advanced by the timeout budget. Returns `None` when the timeout
    /// expires without a matching message.
    pub async fn poll_bus(&mut self, timeout: Duration, mask: MessageMask) -> Option<BusMessage> {
        self.pump(timeout);
        match &mut self.bus {
            Some(bus) => bus.timed_pop_filtered(timeout, mask).await,
            None => None,
        }
    }

    /// Pop the next matching bus message without waiting.
    pub fn try_pop_bus(&mut self, mask: MessageMask) -> Option<BusMessage> {
        self.bus.as_mut().and_then(|bus| bus.try_pop(mask))
    }

    /// Query the current playback position.
    pub fn query_position(&mut self) -> Option<Duration> {
        self.runtime.query_position()
    }

    /// Query the stream duration.
    pub fn query_duration(&mut self) -> Option<Duration> {
        self.runtime.query_duration()
    }

    /// Query seeking capability.
    pub fn query_seekable(&mut self) -> Option<SeekBounds> {
        self.runtime.query_seekable()
    }

    /// Reposition playback.
    pub fn seek(&mut self, target: Duration, flags: SeekFlags) -> Result<()> {
        debug!(pipeline = self.name(), ?target, ?flags, "seeking");
        self.runtime.seek(target, flags)
    }

    /// Set a stage property on the running pipeline.
    pub fn set_stage_property(
        &mut self,
        role: &str,
        key: &str,
        value: PropertyValue,
    ) -> Result<()> {
        self.runtime.set_property(role, key, value.clone())?;
        if let Some(node) = self.graph.stage_by_role_mut(role) {
            node.set_property(key, value);
        }
        Ok(())
    }

    /// Read a stage property back from the runtime.
    pub fn stage_property(&self, role: &str, key: &str) -> Option<PropertyValue> {
        self.runtime.property(role, key)
    }

    /// Tear the pipeline down: state to `Null` and the bus released.
    ///
    /// Safe to call more than once; runs unconditionally on both the EOS
    /// and the error path.
    pub fn shutdown(&mut self) -> Result<()> {
        self.bus = None;
        self.set_state(PipelineState::Null)?;
        Ok(())
    }

    /// Whether the status bus has been released.
    pub fn bus_released(&self) -> bool {
        self.bus.is_none()
    }

    /// Access the runtime (mainly for embedding-specific inspection).
    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}
