//! Stage system: the construction contract against the media framework.
//!
//! stillcast never implements demuxing, decoding or transport itself; it
//! constructs and supervises stages supplied by a pipeline runtime. This
//! module defines what the control plane knows about a stage:
//!
//! - [`StageClass`]: a factory kind with its element type and pad layout
//! - [`StageRegistry`]: kind-string lookup used by the pipeline builder
//! - [`Pad`] / [`PadInfo`]: static pad layout and runtime-discovered pads

mod pad;
mod registry;

pub use pad::{Pad, PadDirection, PadInfo, PadPresence};
pub use registry::{ElementType, StageClass, StageRegistry};
