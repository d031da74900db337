//! Error types for stillcast.

use crate::pipeline::PipelineState;
use thiserror::Error;

/// Result type alias using stillcast's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stillcast operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A stage named by a recipe could not be created.
    ///
    /// Fatal to the build: no pipeline is left running.
    #[error("failed to create stage '{stage}': unknown kind '{kind}'")]
    Construction {
        /// Role of the stage that failed to construct.
        stage: String,
        /// Factory kind that was not recognized.
        kind: String,
    },

    /// A required link between two stages failed.
    #[error("failed to link '{src}' to '{sink}': {reason}")]
    Link {
        /// Role of the upstream stage.
        src: String,
        /// Role of the downstream stage.
        sink: String,
        /// Why the link was rejected.
        reason: String,
    },

    /// A recipe is internally inconsistent (duplicate roles, dangling links).
    #[error("invalid recipe '{recipe}': {reason}")]
    Recipe {
        /// Name of the offending recipe.
        recipe: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No recipe exists for the given format tag.
    #[error("unsupported media format '{0}'")]
    UnsupportedFormat(String),

    /// The pipeline refused a requested state transition.
    #[error("pipeline '{pipeline}' could not reach the {target} state")]
    StateChange {
        /// Name of the pipeline.
        pipeline: String,
        /// State that could not be reached.
        target: PipelineState,
    },

    /// A fatal error reported on the pipeline bus.
    #[error("error from '{element}': {message}")]
    Stream {
        /// Name of the element that reported the error.
        element: String,
        /// Human-readable message.
        message: String,
        /// Optional debug detail.
        debug: Option<String>,
    },

    /// A seek request was rejected by the pipeline.
    #[error("seek rejected by pipeline '{0}'")]
    Seek(String),

    /// A launch-string recipe description could not be parsed.
    #[error("recipe parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
