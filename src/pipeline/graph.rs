//! Stage graph structure using daggy.

use crate::error::{Error, Result};
use crate::recipe::PropertyValue;
use crate::stage::{ElementType, Pad, StageClass};
use daggy::{Dag, NodeIndex, Walker};
use std::collections::HashMap;
use std::fmt;

/// Unique identifier for a stage in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(pub(crate) NodeIndex);

impl StageId {
    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

/// Lifecycle state of a pipeline.
///
/// Ordered: `Null < Ready < Paused < Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PipelineState {
    /// Not yet started; all resources released.
    #[default]
    Null,
    /// Constructed and ready to preroll.
    Ready,
    /// Prerolled, clock stopped.
    Paused,
    /// Running.
    Playing,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Null => "null",
            PipelineState::Ready => "ready",
            PipelineState::Paused => "paused",
            PipelineState::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// A stage in the graph: role, kind, pad layout and applied properties.
#[derive(Debug, Clone)]
pub struct StageNode {
    role: String,
    kind: String,
    element_type: ElementType,
    input_pads: Vec<Pad>,
    output_pads: Vec<Pad>,
    properties: Vec<(String, PropertyValue)>,
}

impl StageNode {
    /// Create a stage from its resolved class.
    pub fn new(role: impl Into<String>, class: &StageClass) -> Self {
        Self {
            role: role.into(),
            kind: class.kind().to_string(),
            element_type: class.element_type(),
            input_pads: class.inputs().to_vec(),
            output_pads: class.outputs().to_vec(),
            properties: Vec::new(),
        }
    }

    /// The stage's role within the pipeline.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The factory kind the stage was constructed from.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The element type.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Input pads.
    pub fn input_pads(&self) -> &[Pad] {
        &self.input_pads
    }

    /// Output pads.
    pub fn output_pads(&self) -> &[Pad] {
        &self.output_pads
    }

    /// Set a property, replacing any earlier value for the same key.
    pub fn set_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        if let Some(slot) = self.properties.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.properties.push((key, value));
        }
    }

    /// Get a property value.
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// All applied properties.
    pub fn properties(&self) -> &[(String, PropertyValue)] {
        &self.properties
    }
}

/// A link between two stages.
#[derive(Debug, Clone)]
pub struct GraphLink {
    /// Name of the upstream pad.
    pub src_pad: String,
    /// Name of the downstream pad.
    pub sink_pad: String,
    /// Whether the link was completed at runtime by the pad linker.
    pub dynamic: bool,
}

impl GraphLink {
    fn new(src_pad: impl Into<String>, sink_pad: impl Into<String>, dynamic: bool) -> Self {
        Self {
            src_pad: src_pad.into(),
            sink_pad: sink_pad.into(),
            dynamic,
        }
    }
}

/// The stage DAG for one pipeline.
pub struct StageGraph {
    name: String,
    graph: Dag<StageNode, GraphLink>,
    stages_by_role: HashMap<String, StageId>,
}

impl StageGraph {
    /// Create an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: Dag::new(),
            stages_by_role: HashMap::new(),
        }
    }

    /// Name of the pipeline this graph describes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a stage to the graph.
    pub fn add_stage(&mut self, node: StageNode) -> Result<StageId> {
        if self.stages_by_role.contains_key(node.role()) {
            return Err(Error::Recipe {
                recipe: self.name.clone(),
                reason: format!("duplicate stage role '{}'", node.role()),
            });
        }
        let role = node.role().to_string();
        let idx = self.graph.add_node(node);
        let id = StageId(idx);
        self.stages_by_role.insert(role, id);
        Ok(id)
    }

    /// Get a stage by ID.
    pub fn stage(&self, id: StageId) -> Option<&StageNode> {
        self.graph.node_weight(id.0)
    }

    /// Get a mutable reference to a stage by ID.
    pub fn stage_mut(&mut self, id: StageId) -> Option<&mut StageNode> {
        self.graph.node_weight_mut(id.0)
    }

    /// Get a stage ID by role.
    pub fn stage_id(&self, role: &str) -> Option<StageId> {
        self.stages_by_role.get(role).copied()
    }

    /// Get a stage by role.
    pub fn stage_by_role(&self, role: &str) -> Option<&StageNode> {
        self.stage_id(role).and_then(|id| self.stage(id))
    }

    /// Get a mutable stage by role.
    pub fn stage_by_role_mut(&mut self, role: &str) -> Option<&mut StageNode> {
        let id = self.stage_id(role)?;
        self.stage_mut(id)
    }

    /// Iterate all stages.
    pub fn stages(&self) -> impl Iterator<Item = &StageNode> {
        self.graph.graph().node_weights()
    }

    /// Find the first stage of a given kind.
    pub fn find_kind(&self, kind: &str) -> Option<&StageNode> {
        self.stages().find(|s| s.kind() == kind)
    }

    /// Link two stages statically, validating pad existence on both ends.
    ///
    /// The upstream end must have a static output pad; the downstream end a
    /// static input pad. The link is atomic-or-fail: an invalid endpoint
    /// rejects the link with no side effect on the graph.
    pub fn link(&mut self, src: StageId, sink: StageId) -> Result<()> {
        self.add_link(src, sink, false)
    }

    /// Record a link completed at runtime across a demultiplexer boundary.
    pub fn link_dynamic(&mut self, src: StageId, sink: StageId) -> Result<()> {
        self.add_link(src, sink, true)
    }

    fn add_link(&mut self, src: StageId, sink: StageId, dynamic: bool) -> Result<()> {
        let src_node = self
            .graph
            .node_weight(src.0)
            .ok_or_else(|| self.link_error("?", "?", "source stage not found"))?;

        let src_pad = if dynamic {
            src_node.output_pads().iter().find(|p| !p.is_static())
        } else {
            src_node.output_pads().iter().find(|p| p.is_static())
        };
        let src_pad = match src_pad {
            Some(p) => p.name().to_string(),
            None => {
                let role = src_node.role().to_string();
                return Err(self.link_error(&role, "?", "source stage has no suitable output pad"));
            }
        };
        let src_role = src_node.role().to_string();

        let sink_node = self
            .graph
            .node_weight(sink.0)
            .ok_or_else(|| self.link_error(&src_role, "?", "sink stage not found"))?;

        let sink_pad = match sink_node.input_pads().iter().find(|p| p.is_static()) {
            Some(p) => p.name().to_string(),
            None => {
                let role = sink_node.role().to_string();
                return Err(self.link_error(&src_role, &role, "sink stage has no input pad"));
            }
        };
        let sink_role = sink_node.role().to_string();

        self.graph
            .add_edge(src.0, sink.0, GraphLink::new(src_pad, sink_pad, dynamic))
            .map_err(|_| self.link_error(&src_role, &sink_role, "linking would create a cycle"))?;

        Ok(())
    }

    fn link_error(&self, src: &str, sink: &str, reason: &str) -> Error {
        Error::Link {
            src: src.to_string(),
            sink: sink.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get all stages with no incoming links.
    pub fn sources(&self) -> Vec<StageId> {
        self.graph
            .graph()
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .graph()
                    .neighbors_directed(idx, daggy::petgraph::Direction::Incoming)
                    .count()
                    == 0
            })
            .map(StageId)
            .collect()
    }

    /// Get all stages with no outgoing links.
    pub fn sinks(&self) -> Vec<StageId> {
        self.graph
            .graph()
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .graph()
                    .neighbors_directed(idx, daggy::petgraph::Direction::Outgoing)
                    .count()
                    == 0
            })
            .map(StageId)
            .collect()
    }

    /// Get the downstream neighbours of a stage.
    pub fn children(&self, id: StageId) -> Vec<(StageId, &GraphLink)> {
        self.graph
            .children(id.0)
            .iter(&self.graph)
            .map(|(edge_idx, node_idx)| {
                let link = self.graph.edge_weight(edge_idx).unwrap();
                (StageId(node_idx), link)
            })
            .collect()
    }

    /// Number of stages.
    pub fn stage_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl fmt::Debug for StageGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageGraph")
            .field("name", &self.name)
            .field("stages", &self.stage_count())
            .field("links", &self.link_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageRegistry;

    fn node(registry: &StageRegistry, role: &str, kind: &str) -> StageNode {
        StageNode::new(role, registry.lookup(kind).unwrap())
    }

    #[test]
    fn test_add_and_look_up_stages() {
        let registry = StageRegistry::new();
        let mut graph = StageGraph::new("g");

        let src = graph.add_stage(node(&registry, "src", "filesrc")).unwrap();
        let sink = graph.add_stage(node(&registry, "sink", "filesink")).unwrap();

        assert_eq!(graph.stage_count(), 2);
        assert_eq!(graph.stage_id("src"), Some(src));
        assert_eq!(graph.stage_id("sink"), Some(sink));
        assert_eq!(graph.stage(src).unwrap().kind(), "filesrc");
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let registry = StageRegistry::new();
        let mut graph = StageGraph::new("g");
        graph.add_stage(node(&registry, "a", "queue")).unwrap();
        assert!(graph.add_stage(node(&registry, "a", "queue")).is_err());
    }

    #[test]
    fn test_static_link() {
        let registry = StageRegistry::new();
        let mut graph = StageGraph::new("g");

        let src = graph.add_stage(node(&registry, "src", "filesrc")).unwrap();
        let q = graph.add_stage(node(&registry, "q", "queue")).unwrap();
        let sink = graph.add_stage(node(&registry, "sink", "filesink")).unwrap();

        graph.link(src, q).unwrap();
        graph.link(q, sink).unwrap();
        assert_eq!(graph.link_count(), 2);

        let children = graph.children(src);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].0, q);
        assert!(!children[0].1.dynamic);
    }

    #[test]
    fn test_static_link_rejects_demuxer_output() {
        // A demuxer has no static output pad; its downstream links are
        // completed at runtime.
        let registry = StageRegistry::new();
        let mut graph = StageGraph::new("g");

        let demux = graph.add_stage(node(&registry, "demux", "qtdemux")).unwrap();
        let q = graph.add_stage(node(&registry, "q", "queue")).unwrap();

        assert!(graph.link(demux, q).is_err());
        graph.link_dynamic(demux, q).unwrap();
        assert!(graph.children(demux)[0].1.dynamic);
    }

    #[test]
    fn test_cycle_rejected() {
        let registry = StageRegistry::new();
        let mut graph = StageGraph::new("g");

        let a = graph.add_stage(node(&registry, "a", "queue")).unwrap();
        let b = graph.add_stage(node(&registry, "b", "queue")).unwrap();

        graph.link(a, b).unwrap();
        let err = graph.link(b, a).unwrap_err();
        assert!(matches!(err, Error::Link { .. }));
    }

    #[test]
    fn test_sources_and_sinks() {
        let registry = StageRegistry::new();
        let mut graph = StageGraph::new("g");

        let src = graph.add_stage(node(&registry, "src", "filesrc")).unwrap();
        let q = graph.add_stage(node(&registry, "q", "queue")).unwrap();
        let sink = graph.add_stage(node(&registry, "sink", "filesink")).unwrap();

        graph.link(src, q).unwrap();
        graph.link(q, sink).unwrap();

        assert_eq!(graph.sources(), vec![src]);
        assert_eq!(graph.sinks(), vec![sink]);
    }

    #[test]
    fn test_properties() {
        let registry = StageRegistry::new();
        let mut node = node(&registry, "src", "filesrc");
        node.set_property("location", PropertyValue::String("/a".into()));
        node.set_property("location", PropertyValue::String("/b".into()));
        assert_eq!(node.property("location").unwrap().as_string(), "/b");
        assert_eq!(node.properties().len(), 1);
    }
}
