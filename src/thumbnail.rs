//! Still-frame extraction: recipe selection, supervision, teardown.
//!
//! One call, one pipeline, one artifact. The extractor picks the recipe for
//! the file's container format, drives the pipeline to playing, runs the
//! bus dispatcher until the session terminates, and tears everything down
//! to `Null` whether the run ended in EOS or in an error.

use crate::dispatch::{self, PollSettings};
use crate::error::{Error, Result};
use crate::format::{ContainerFormat, FrameSettings};
use crate::pipeline::{BuildEndpoints, PipelineBuilder, PipelineState};
use crate::recipe;
use crate::runtime::RuntimeFactory;
use crate::session::SessionState;
use crate::stage::StageRegistry;
use std::time::Duration;
use tracing::{error, info, warn};

/// Configuration for one extraction run.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Where the extracted frame is written.
    pub artifact_path: String,
    /// Bus poll timeout of the supervision loop.
    pub poll_timeout: Duration,
    /// Offset of the one-time seek into the clip.
    pub seek_target: Duration,
    /// Output frame geometry.
    pub frame: FrameSettings,
}

impl ThumbnailConfig {
    /// Defaults: 100 ms poll, 30 s seek target, still-frame geometry.
    pub fn new(artifact_path: impl Into<String>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            poll_timeout: Duration::from_millis(100),
            seek_target: Duration::from_secs(30),
            frame: FrameSettings::still_frame(),
        }
    }
}

/// Outcome of a successful extraction.
#[derive(Debug, Clone)]
pub struct ThumbnailReport {
    /// Location of the written artifact.
    pub artifact: String,
    /// Container format that was processed.
    pub format: ContainerFormat,
    /// Stream duration, if the pipeline resolved one.
    pub duration: Option<Duration>,
}

/// Extracts still frames from video files.
pub struct ThumbnailExtractor<'a, F> {
    registry: &'a StageRegistry,
    factory: &'a F,
    config: ThumbnailConfig,
}

impl<'a, F: RuntimeFactory> ThumbnailExtractor<'a, F> {
    /// Create an extractor.
    pub fn new(registry: &'a StageRegistry, factory: &'a F, config: ThumbnailConfig) -> Self {
        Self {
            registry,
            factory,
            config,
        }
    }

    /// Extract a still frame from `media_path`, dispatching on the file's
    /// extension tag.
    ///
    /// Fails with [`Error::UnsupportedFormat`] for extensions outside the
    /// video recipe table, with [`Error::Construction`]/[`Error::Link`] if
    /// the pipeline cannot be built, and with [`Error::StateChange`] if it
    /// never reaches playing. Whatever happens after that, the pipeline is
    /// back in `Null` with its bus released before this returns.
    pub async fn extract(&self, media_path: &str, extension: &str) -> Result<ThumbnailReport> {
        let format = ContainerFormat::from_extension(extension)
            .ok_or_else(|| Error::UnsupportedFormat(extension.to_string()))?;
        let recipe = recipe::thumbnail_recipe(format)?;

        info!(media = media_path, %format, "extracting still frame");

        let endpoints =
            BuildEndpoints::file_to_file(media_path, self.config.artifact_path.clone())
                .with_frame(self.config.frame);
        let mut instance =
            PipelineBuilder::new(self.registry, self.factory).build(&recipe, &endpoints)?;

        if let Err(e) = instance.set_state(PipelineState::Playing) {
            error!("unable to set the pipeline to the playing state");
            if let Err(teardown) = instance.shutdown() {
                warn!("teardown after failed start also failed: {teardown}");
            }
            return Err(e);
        }

        let settings = PollSettings {
            poll_timeout: self.config.poll_timeout,
            seek_target: self.config.seek_target,
        };
        let mut session = SessionState::new();
        let outcome = dispatch::supervise(&mut instance, &mut session, &settings).await;

        // Unconditional teardown, on the EOS path and the error path alike.
        if let Err(e) = instance.shutdown() {
            warn!("pipeline teardown failed: {e}");
        }

        outcome?;
        Ok(ThumbnailReport {
            artifact: self.config.artifact_path.clone(),
            format,
            duration: session.duration(),
        })
    }
}
