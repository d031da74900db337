//! # stillcast
//!
//! A control plane for media pipelines: extract a representative still
//! frame from a video file, and drive long-running audio/video streaming
//! pipelines under interactive keyboard control.
//!
//! stillcast deliberately contains no codec, demultiplexer or transport
//! code. It builds stage graphs from declarative [`recipe`]s, wires them
//! through a [`stage`] registry, and supervises them over a status bus,
//! while the data plane lives behind the [`runtime::PipelineRuntime`]
//! trait. The crate ships [`runtime::sim`], a deterministic simulation
//! runtime, so every control-plane behaviour is testable without media
//! files or framework plugins.
//!
//! ## Extracting a still frame
//!
//! ```rust,ignore
//! use stillcast::prelude::*;
//!
//! let registry = StageRegistry::new();
//! let factory = SimFactory::new(SimScript::video(Duration::from_secs(2)));
//! let extractor = ThumbnailExtractor::new(
//!     &registry,
//!     &factory,
//!     ThumbnailConfig::new("/tmp/still.jpg"),
//! );
//! let report = extractor.extract("/media/clip.mp4", "mp4").await?;
//! ```
//!
//! ## Driving an interactive session
//!
//! ```rust,ignore
//! let recipe = recipe::live_recipe(ContainerFormat::Mp4);
//! let mut instance = PipelineBuilder::new(&registry, &factory)
//!     .build(&recipe, &BuildEndpoints::playback("/media/clip.mp4"))?;
//! instance.set_state(PipelineState::Playing)?;
//!
//! let session = LiveSession::new(instance, "/media/clip.mp4");
//! let exit = session.run(tokio::io::BufReader::new(tokio::io::stdin())).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod error;
pub mod format;
pub mod live;
pub mod metadata;
pub mod pipeline;
pub mod recipe;
pub mod runtime;
pub mod session;
pub mod stage;
pub mod thumbnail;

pub use error::{Error, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dispatch::{PollSettings, supervise};
    pub use crate::error::{Error, Result};
    pub use crate::format::{ContainerFormat, FrameSettings, MediaType, StreamCategory};
    pub use crate::live::{ControlCommand, LiveConfig, LiveSession, LoopExit, VolumeControl};
    pub use crate::metadata::{BasicReporter, MetadataReporter};
    pub use crate::pipeline::{
        BuildEndpoints, BusMessage, MessageKind, MessageMask, NetworkEndpoint, PipelineBuilder,
        PipelineInstance, PipelineState,
    };
    pub use crate::recipe::{self, LinkRule, PipelineRecipe, PropertyValue, StageSpec};
    pub use crate::runtime::sim::{SimFactory, SimScript};
    pub use crate::runtime::{PipelineRuntime, RuntimeFactory, SeekFlags};
    pub use crate::session::SessionState;
    pub use crate::stage::StageRegistry;
    pub use crate::thumbnail::{ThumbnailConfig, ThumbnailExtractor, ThumbnailReport};
}
