//! The bus event dispatcher: a bounded-timeout supervision loop.
//!
//! Each iteration either classifies one bus message into the session state
//! machine, or, on timeout, polls position and duration and decides
//! whether the one-time still-frame seek is due. The loop exits only when
//! the session is terminated, by EOS or by a fatal error.

use crate::error::Error;
use crate::pipeline::{BusMessage, MessageKind, MessageMask, PipelineInstance, PipelineState};
use crate::runtime::{PipelineRuntime, SeekFlags};
use crate::session::SessionState;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tuning for the supervision loop.
///
/// Both values are deployment parameters, not constants of the design: the
/// timeout paces position polling between unrelated bus messages, and the
/// seek target picks which part of the clip the still frame comes from.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// How long a single bus poll waits before the loop falls back to
    /// position/duration polling.
    pub poll_timeout: Duration,
    /// Target offset of the one-time seek.
    pub seek_target: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
            seek_target: Duration::from_secs(30),
        }
    }
}

/// Drive the pipeline until the session terminates.
///
/// Returns the fatal error recorded by the session, if the run ended on
/// one. The pipeline is left untouched on exit; teardown is the caller's
/// responsibility and must happen on both paths.
pub async fn supervise<R: PipelineRuntime>(
    instance: &mut PipelineInstance<R>,
    session: &mut SessionState,
    settings: &PollSettings,
) -> crate::error::Result<()> {
    while !session.terminated() {
        match instance
            .poll_bus(settings.poll_timeout, MessageMask::SUPERVISION)
            .await
        {
            Some(msg) => handle_message(instance, session, msg),
            None => on_timeout(instance, session, settings),
        }
    }
    match session.take_failure() {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

/// Classify one bus message and apply it to the session state.
fn handle_message<R: PipelineRuntime>(
    instance: &mut PipelineInstance<R>,
    session: &mut SessionState,
    msg: BusMessage,
) {
    match msg.kind {
        MessageKind::Error { message, debug } => {
            let debug_str = debug.as_deref().unwrap_or("none");
            error!(source = %msg.source, debug = debug_str,
                "error received from element: {message}");
            session.record_failure(Error::Stream {
                element: msg.source,
                message,
                debug,
            });
            session.terminate();
        }
        MessageKind::Eos => {
            info!(pipeline = instance.name(), "end of stream reached");
            session.terminate();
        }
        MessageKind::DurationChanged => {
            // Whatever we knew is stale; re-query on the next timeout.
            session.invalidate_duration();
        }
        MessageKind::StateChanged { old, new, .. } => {
            if msg.source != instance.name() {
                debug!(source = %msg.source, "ignoring substage state change");
                return;
            }
            debug!(pipeline = instance.name(), "pipeline state {old} -> {new}");
            session.set_playing(new == PipelineState::Playing);

            if session.playing() {
                // Just moved to playing: find out whether seeking is possible.
                match instance.query_seekable() {
                    Some(bounds) => {
                        session.enable_seek(bounds.seekable);
                        if bounds.seekable {
                            info!(
                                start = ?bounds.start,
                                end = ?bounds.end,
                                "seeking is enabled for this stream"
                            );
                        } else {
                            info!("seeking is disabled for this stream");
                        }
                    }
                    None => warn!("seeking query failed"),
                }
            }
        }
        MessageKind::Warning { message, debug } => {
            let debug_str = debug.as_deref().unwrap_or("none");
            warn!(source = %msg.source, debug = debug_str, "{message}");
        }
        MessageKind::Info { message, debug } => {
            let debug_str = debug.as_deref().unwrap_or("none");
            info!(source = %msg.source, debug = debug_str, "{message}");
        }
    }
}

/// Timeout work: poll position, resolve the duration once, and issue the
/// one-time seek when the session says the time is right.
fn on_timeout<R: PipelineRuntime>(
    instance: &mut PipelineInstance<R>,
    session: &mut SessionState,
    settings: &PollSettings,
) {
    if !session.playing() {
        return;
    }

    let position = instance.query_position();
    if position.is_none() {
        warn!("could not query current position");
    }

    if session.duration().is_none() {
        match instance.query_duration() {
            Some(duration) => session.set_duration(duration),
            None => warn!("could not query current duration"),
        }
    }

    if session.should_seek(position) {
        info!(target = ?settings.seek_target, "performing seek");
        if let Err(e) = instance.seek(settings.seek_target, SeekFlags::FLUSH_ACCURATE) {
            warn!("seek failed: {e}");
        }
        session.latch_seek_done();
    }
}
