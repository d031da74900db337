//! Pad abstraction for stage inputs and outputs.
//!
//! Pads are the connection points of stages. Static pads exist from
//! construction time and are wired by the builder; `Sometimes` pads appear
//! at runtime once a demultiplexer has parsed its container, and are wired
//! by the dynamic pad linker.

use crate::format::MediaType;

/// Direction of a pad (input or output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// An input pad (receives data from upstream).
    Input,
    /// An output pad (sends data downstream).
    Output,
}

/// Whether a pad is always present or discovered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadPresence {
    /// Pad is always present on the stage.
    Always,
    /// Pad appears once the stage has inspected its input (demuxers).
    Sometimes,
}

/// A pad on a stage, as known at construction time.
#[derive(Debug, Clone)]
pub struct Pad {
    name: String,
    direction: PadDirection,
    presence: PadPresence,
}

impl Pad {
    /// Create a new pad.
    pub fn new(name: impl Into<String>, direction: PadDirection, presence: PadPresence) -> Self {
        Self {
            name: name.into(),
            direction,
            presence,
        }
    }

    /// Create a standard always-present input pad named "sink".
    pub fn sink() -> Self {
        Self::new("sink", PadDirection::Input, PadPresence::Always)
    }

    /// Create a standard always-present output pad named "src".
    pub fn src() -> Self {
        Self::new("src", PadDirection::Output, PadPresence::Always)
    }

    /// Create a runtime-discovered output pad pattern (e.g. "src_%u").
    pub fn sometimes_src(name: impl Into<String>) -> Self {
        Self::new(name, PadDirection::Output, PadPresence::Sometimes)
    }

    /// Get the pad's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pad's direction.
    pub fn direction(&self) -> PadDirection {
        self.direction
    }

    /// Get the pad's presence.
    pub fn presence(&self) -> PadPresence {
        self.presence
    }

    /// Check if this is an input pad.
    pub fn is_input(&self) -> bool {
        self.direction == PadDirection::Input
    }

    /// Check if this is an output pad.
    pub fn is_output(&self) -> bool {
        self.direction == PadDirection::Output
    }

    /// Check if this pad exists from construction time.
    pub fn is_static(&self) -> bool {
        self.presence == PadPresence::Always
    }
}

/// A pad discovered on a running stage, with its negotiated media type.
#[derive(Debug, Clone)]
pub struct PadInfo {
    /// Role of the stage the pad appeared on.
    pub stage: String,
    /// Name of the pad (e.g. "video_0").
    pub pad: String,
    /// Negotiated media type of the stream behind the pad.
    pub media_type: MediaType,
}

impl PadInfo {
    /// Create a pad description.
    pub fn new(
        stage: impl Into<String>,
        pad: impl Into<String>,
        media_type: impl Into<MediaType>,
    ) -> Self {
        Self {
            stage: stage.into(),
            pad: pad.into(),
            media_type: media_type.into(),
        }
    }
}
