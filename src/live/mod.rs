//! Interactive control of a long-running streaming pipeline.
//!
//! A [`LiveSession`] owns one pipeline for the duration of interactive
//! playback and runs a single event loop that multiplexes two inputs:
//! command lines from the reader it is given, and messages from the
//! pipeline's status bus. Both handlers run to completion on the loop;
//! nothing here is concurrent.
//!
//! The loop ends on `q` (quit), `n` (next item), end of stream, or a fatal
//! bus error; on every exit path the pipeline is back in `Null`.

mod command;
mod volume;

pub use command::{ControlCommand, HELP};
pub use volume::{
    VOLUME_DOWN_STEP, VOLUME_LEVEL_OFFSET, VOLUME_LEVEL_SCALE, VOLUME_MAX, VOLUME_MIN,
    VOLUME_UP_STEP, VolumeAdjust, VolumeControl, volume_level,
};

use crate::error::{Error, Result};
use crate::metadata::{BasicReporter, MetadataReporter};
use crate::pipeline::{BusMessage, MessageKind, MessageMask, PipelineInstance, PipelineState};
use crate::recipe::PropertyValue;
use crate::runtime::{PipelineRuntime, SeekFlags};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

/// Role of the stage the volume commands act on.
const VOLUME_ROLE: &str = "volume";

/// Why the live event loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// `q`: the session is over and the process should exit.
    Quit,
    /// `n`: this item is done, the caller may load the next one.
    Next,
    /// End of stream arrived on the bus.
    Finished,
}

/// Tuning for a live session.
#[derive(Debug, Clone, Copy)]
pub struct LiveConfig {
    /// How often the bus is drained between input lines.
    pub bus_poll_interval: Duration,
    /// Step of the `c` forward seek.
    pub seek_step: Duration,
    /// Volume step configuration.
    pub volume: VolumeControl,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            bus_poll_interval: Duration::from_millis(100),
            seek_step: Duration::from_secs(10),
            volume: VolumeControl::default(),
        }
    }
}

/// An interactive playback session owning one pipeline.
pub struct LiveSession<R: PipelineRuntime> {
    instance: PipelineInstance<R>,
    media_path: String,
    config: LiveConfig,
    reporter: Box<dyn MetadataReporter>,
}

impl<R: PipelineRuntime> LiveSession<R> {
    /// Create a session around a built pipeline.
    pub fn new(instance: PipelineInstance<R>, media_path: impl Into<String>) -> Self {
        Self {
            instance,
            media_path: media_path.into(),
            config: LiveConfig::default(),
            reporter: Box::new(BasicReporter),
        }
    }

    /// Override the default configuration.
    pub fn with_config(mut self, config: LiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the metadata reporter.
    pub fn with_reporter(mut self, reporter: Box<dyn MetadataReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The pipeline under control.
    pub fn instance(&self) -> &PipelineInstance<R> {
        &self.instance
    }

    /// Run the event loop until quit, next, EOS or a fatal error.
    ///
    /// The pipeline is torn down to `Null` on every exit path; a fatal bus
    /// error is returned after teardown.
    pub async fn run<I>(mut self, input: I) -> Result<LoopExit>
    where
        I: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut input_closed = false;
        let mut tick = tokio::time::interval(self.config.bus_poll_interval);

        loop {
            tokio::select! {
                line = lines.next_line(), if !input_closed => {
                    match line {
                        Ok(Some(line)) => {
                            if let Some(cmd) = ControlCommand::from_line(&line) {
                                if let Some(exit) = self.handle_command(cmd) {
                                    return Ok(exit);
                                }
                            }
                        }
                        Ok(None) => {
                            debug!("command input closed; continuing on bus messages only");
                            input_closed = true;
                        }
                        Err(e) => {
                            self.teardown();
                            return Err(e.into());
                        }
                    }
                }
                _ = tick.tick() => {
                    self.instance.pump(self.config.bus_poll_interval);
                    while let Some(msg) = self.instance.try_pop_bus(MessageMask::ALL) {
                        match self.handle_bus(msg) {
                            Ok(Some(exit)) => return Ok(exit),
                            Ok(None) => {}
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
        }
    }

    /// Apply one command. Returns the loop exit it caused, if any.
    fn handle_command(&mut self, cmd: ControlCommand) -> Option<LoopExit> {
        match cmd {
            ControlCommand::Play => {
                if let Err(e) = self.instance.set_state(PipelineState::Playing) {
                    error!("could not resume playback: {e}");
                }
            }
            ControlCommand::Pause => {
                if let Err(e) = self.instance.set_state(PipelineState::Paused) {
                    error!("could not pause playback: {e}");
                } else {
                    warn!("avoid holding the paused state for more than a few seconds");
                }
            }
            ControlCommand::QueryPosition => match self.instance.query_position() {
                Some(pos) => info!("current position: {}", format_clock(pos)),
                None => warn!("could not query current position"),
            },
            ControlCommand::QueryDuration => match self.instance.query_duration() {
                Some(duration) => info!("duration: {}", format_clock(duration)),
                None => warn!("could not query duration"),
            },
            ControlCommand::SeekForward => match self.instance.query_position() {
                Some(pos) => {
                    info!("current position: {}", format_clock(pos));
                    let target = pos + self.config.seek_step;
                    if let Err(e) = self.instance.seek(target, SeekFlags::FLUSH) {
                        warn!("forward seek failed: {e}");
                    }
                }
                None => warn!("could not query current position; not seeking"),
            },
            ControlCommand::VolumeUp => self.adjust_volume(true),
            ControlCommand::VolumeDown => self.adjust_volume(false),
            ControlCommand::PrintMetadata => {
                let report = self.reporter.report(Path::new(&self.media_path));
                info!("\n********************************\n{report}\n********************************");
            }
            ControlCommand::ShowHelp => info!("\n{HELP}"),
            ControlCommand::Next => {
                // Flush what is queued, then release everything; the caller
                // decides what plays next.
                if let Err(e) = self.instance.set_state(PipelineState::Paused) {
                    warn!("pause before next failed: {e}");
                }
                if let Err(e) = self.instance.seek(Duration::ZERO, SeekFlags::FLUSH) {
                    debug!("flush seek before next failed: {e}");
                }
                self.teardown();
                return Some(LoopExit::Next);
            }
            ControlCommand::Quit => {
                self.teardown();
                return Some(LoopExit::Quit);
            }
            ControlCommand::Unrecognized(c) => {
                warn!("unexpected key '{c}' received");
            }
        }
        None
    }

    /// Apply one bus message. A fatal error tears down and is returned.
    fn handle_bus(&mut self, msg: BusMessage) -> Result<Option<LoopExit>> {
        match msg.kind {
            MessageKind::Eos => {
                info!("end of stream reached");
                self.teardown();
                Ok(Some(LoopExit::Finished))
            }
            MessageKind::Error { message, debug } => {
                let debug_str = debug.as_deref().unwrap_or("none");
                error!(source = %msg.source, debug = debug_str,
                    "error received: {message}");
                self.teardown();
                Err(Error::Stream {
                    element: msg.source,
                    message,
                    debug,
                })
            }
            MessageKind::Warning { message, debug } => {
                let debug_str = debug.as_deref().unwrap_or("none");
                warn!(source = %msg.source, debug = debug_str, "{message}");
                Ok(None)
            }
            MessageKind::Info { message, debug } => {
                let debug_str = debug.as_deref().unwrap_or("none");
                info!(source = %msg.source, debug = debug_str, "{message}");
                Ok(None)
            }
            MessageKind::StateChanged { old, new, .. } => {
                if msg.source == self.instance.name() {
                    debug!("pipeline state {old} -> {new}");
                }
                Ok(None)
            }
            MessageKind::DurationChanged => {
                debug!("stream duration changed");
                Ok(None)
            }
        }
    }

    fn adjust_volume(&mut self, up: bool) {
        if self.instance.graph().stage_by_role(VOLUME_ROLE).is_none() {
            warn!("this pipeline has no volume control");
            return;
        }
        let current = self
            .instance
            .stage_property(VOLUME_ROLE, "volume")
            .and_then(|v| v.as_f64())
            .unwrap_or(VOLUME_MAX);

        let adjust = if up {
            self.config.volume.increase(current)
        } else {
            self.config.volume.decrease(current)
        };
        match adjust {
            VolumeAdjust::Changed(new_volume) => {
                if let Err(e) = self.instance.set_stage_property(
                    VOLUME_ROLE,
                    "volume",
                    PropertyValue::Float(new_volume),
                ) {
                    warn!("could not apply volume: {e}");
                    return;
                }
                info!(
                    "volume {} to {} (vol: {new_volume:.3})",
                    if up { "increased" } else { "decreased" },
                    volume_level(new_volume)
                );
            }
            VolumeAdjust::AtMax => info!("maximum level"),
            VolumeAdjust::AtMin => info!("minimum level"),
        }
    }

    fn teardown(&mut self) {
        if let Err(e) = self.instance.shutdown() {
            warn!("pipeline teardown failed: {e}");
        }
    }
}

/// Render a stream time as minutes:seconds.
fn format_clock(t: Duration) -> String {
    let total = t.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_secs(0)), "0:00");
        assert_eq!(format_clock(Duration::from_secs(61)), "1:01");
        assert_eq!(format_clock(Duration::from_secs(605)), "10:05");
    }
}
