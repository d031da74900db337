//! Pipeline construction and supervision.
//!
//! This module provides the control-plane infrastructure:
//!
//! - [`StageGraph`]: the stage DAG built from a recipe
//! - [`PipelineBuilder`]: recipe + endpoints → [`PipelineInstance`]
//! - [`PipelineInstance`]: an owned pipeline with its bus and runtime
//! - [`BusMessage`] / [`BusReceiver`]: the status channel and its
//!   bounded-timeout filtered poll
//! - [`DynamicLinker`] / [`CategoryLinker`]: runtime pad wiring across the
//!   demultiplexer boundary
//!
//! # Example
//!
//! ```rust,ignore
//! use stillcast::pipeline::{BuildEndpoints, PipelineBuilder};
//! use stillcast::recipe;
//!
//! let recipe = recipe::thumbnail_recipe(format)?;
//! let endpoints = BuildEndpoints::file_to_file("clip.mp4", "still.jpg");
//! let mut instance = PipelineBuilder::new(&registry, &factory)
//!     .build(&recipe, &endpoints)?;
//! instance.set_state(PipelineState::Playing)?;
//! ```

mod builder;
mod bus;
mod graph;
mod instance;
mod linker;

pub use builder::{BuildEndpoints, NetworkEndpoint, PipelineBuilder};
pub use bus::{
    BusMessage, BusReceiver, BusSender, MessageCategory, MessageKind, MessageMask, bus_channel,
};
pub use graph::{GraphLink, PipelineState, StageGraph, StageId, StageNode};
pub use instance::PipelineInstance;
pub use linker::{CategoryLinker, DynamicLinker, LinkDecision};
