//! Builds pipeline instances from recipes.
//!
//! The builder resolves every recipe stage through the [`StageRegistry`],
//! applies recipe and endpoint properties, performs all static links, and
//! only then asks the [`RuntimeFactory`] to spawn the data plane. Any
//! construction or link failure aborts before a runtime exists, so a failed
//! build never leaves a partial pipeline running.

use crate::error::{Error, Result};
use crate::format::FrameSettings;
use crate::pipeline::instance::PipelineInstance;
use crate::pipeline::linker::CategoryLinker;
use crate::pipeline::{StageGraph, StageNode};
use crate::recipe::{PipelineRecipe, PropertyValue};
use crate::runtime::{PipelineRuntime, RuntimeFactory};
use crate::stage::{ElementType, StageRegistry};
use tracing::debug;

/// A UDP streaming destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    /// Host to bind the sink to.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Additional `host:port` client entries.
    pub clients: Vec<String>,
}

impl NetworkEndpoint {
    /// Create an endpoint with no extra clients.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            clients: Vec::new(),
        }
    }

    /// Add a client entry.
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.clients.push(client.into());
        self
    }
}

/// Deployment parameters injected into a recipe at build time.
///
/// Recipes name stages and kinds; where the data comes from and goes to is
/// decided here, per invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildEndpoints {
    /// Location for `filesrc` stages.
    pub source_location: String,
    /// Location for `filesink` stages (the output artifact).
    pub sink_location: Option<String>,
    /// Endpoint for `udpsink` stages.
    pub network: Option<NetworkEndpoint>,
    /// Geometry for `capsfilter` stages.
    pub frame: Option<FrameSettings>,
}

impl BuildEndpoints {
    /// Read from a file, write an artifact to a file.
    pub fn file_to_file(source: impl Into<String>, sink: impl Into<String>) -> Self {
        Self {
            source_location: source.into(),
            sink_location: Some(sink.into()),
            ..Self::default()
        }
    }

    /// Read from a file, stream to a network endpoint.
    pub fn file_to_network(source: impl Into<String>, network: NetworkEndpoint) -> Self {
        Self {
            source_location: source.into(),
            network: Some(network),
            ..Self::default()
        }
    }

    /// Read from a file with no file or network sink (device playback).
    pub fn playback(source: impl Into<String>) -> Self {
        Self {
            source_location: source.into(),
            ..Self::default()
        }
    }

    /// Set the frame geometry for capsfilter stages.
    pub fn with_frame(mut self, frame: FrameSettings) -> Self {
        self.frame = Some(frame);
        self
    }
}

/// Instantiates recipes against a registry and a runtime factory.
pub struct PipelineBuilder<'a, F> {
    registry: &'a StageRegistry,
    factory: &'a F,
}

impl<'a, F: RuntimeFactory> PipelineBuilder<'a, F> {
    /// Create a builder.
    pub fn new(registry: &'a StageRegistry, factory: &'a F) -> Self {
        Self { registry, factory }
    }

    /// Build a pipeline instance from a recipe.
    ///
    /// On success the instance is in the `Null` state with all static links
    /// established and the recipe's dynamic-link policy installed.
    pub fn build(
        &self,
        recipe: &PipelineRecipe,
        endpoints: &BuildEndpoints,
    ) -> Result<PipelineInstance<F::Runtime>> {
        recipe.validate()?;

        let mut graph = StageGraph::new(recipe.name());

        // Construct every stage; the first unknown kind aborts the build.
        for spec in recipe.stages() {
            let class = self.registry.lookup(&spec.kind).ok_or_else(|| {
                Error::Construction {
                    stage: spec.role.clone(),
                    kind: spec.kind.clone(),
                }
            })?;
            let mut node = StageNode::new(spec.role.as_str(), class);
            for (key, value) in &spec.properties {
                node.set_property(key, value.clone());
            }
            self.apply_endpoints(&mut node, endpoints);
            graph.add_stage(node)?;
        }

        // Wire every static link; a single failure aborts construction.
        // Links out of a demultiplexer are deferred: those pads only exist
        // at runtime and are wired by the dynamic-link policy.
        for (src, sink) in recipe.links() {
            let src_id = graph.stage_id(src).ok_or_else(|| Error::Recipe {
                recipe: recipe.name().to_string(),
                reason: format!("link references unknown role '{src}'"),
            })?;
            let sink_id = graph.stage_id(sink).ok_or_else(|| Error::Recipe {
                recipe: recipe.name().to_string(),
                reason: format!("link references unknown role '{sink}'"),
            })?;
            let deferred = graph
                .stage(src_id)
                .is_some_and(|s| s.element_type() == ElementType::Demuxer);
            if deferred {
                debug!(src = %src, sink = %sink, "deferring link across demultiplexer boundary");
                continue;
            }
            graph.link(src_id, sink_id)?;
        }

        debug!(
            pipeline = recipe.name(),
            stages = graph.stage_count(),
            links = graph.link_count(),
            "pipeline graph constructed"
        );

        let mut runtime = self.factory.spawn(&graph)?;
        let bus = runtime.take_bus().ok_or_else(|| Error::Recipe {
            recipe: recipe.name().to_string(),
            reason: "runtime did not expose a status bus".to_string(),
        })?;
        let linker = CategoryLinker::new(recipe.link_rules().to_vec());

        Ok(PipelineInstance::new(graph, runtime, bus, linker))
    }

    /// Inject deployment parameters into well-known stage kinds.
    fn apply_endpoints(&self, node: &mut StageNode, endpoints: &BuildEndpoints) {
        match node.kind() {
            "filesrc" => {
                node.set_property(
                    "location",
                    PropertyValue::String(endpoints.source_location.clone()),
                );
            }
            "filesink" => {
                if let Some(sink) = &endpoints.sink_location {
                    node.set_property("location", PropertyValue::String(sink.clone()));
                }
            }
            "udpsink" => {
                if let Some(net) = &endpoints.network {
                    node.set_property("host", PropertyValue::String(net.host.clone()));
                    node.set_property("port", PropertyValue::Integer(i64::from(net.port)));
                    if !net.clients.is_empty() {
                        node.set_property(
                            "clients",
                            PropertyValue::String(net.clients.join(",")),
                        );
                    }
                }
            }
            "capsfilter" => {
                if let Some(frame) = &endpoints.frame {
                    node.set_property("width", PropertyValue::Integer(i64::from(frame.width)));
                    node.set_property("height", PropertyValue::Integer(i64::from(frame.height)));
                    node.set_property("framerate", PropertyValue::Fraction(frame.framerate));
                }
            }
            _ => {}
        }
    }
}
