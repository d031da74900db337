//! Registry of stage classes keyed by factory kind.
//!
//! The registry is the crate's view of what the underlying media framework
//! can construct. The pipeline builder resolves every recipe stage through
//! it; an unknown kind aborts the build before any runtime is spawned.

use crate::stage::pad::{Pad, PadPresence};
use std::collections::HashMap;

/// Coarse element taxonomy, used to derive default pad layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Produces data (file reader, network receiver).
    Source,
    /// One input, one output (decoder, converter, encoder, payloader).
    Transform,
    /// One input, stream pads discovered at runtime.
    Demuxer,
    /// Consumes data (file writer, network sender, audio device).
    Sink,
}

/// A constructible stage kind: its element type and pad layout.
#[derive(Debug, Clone)]
pub struct StageClass {
    kind: String,
    element_type: ElementType,
    inputs: Vec<Pad>,
    outputs: Vec<Pad>,
}

impl StageClass {
    /// Create a class with the default pad layout for its element type.
    pub fn new(kind: impl Into<String>, element_type: ElementType) -> Self {
        let (inputs, outputs) = match element_type {
            ElementType::Source => (vec![], vec![Pad::src()]),
            ElementType::Sink => (vec![Pad::sink()], vec![]),
            ElementType::Transform => (vec![Pad::sink()], vec![Pad::src()]),
            ElementType::Demuxer => (vec![Pad::sink()], vec![Pad::sometimes_src("src_%u")]),
        };
        Self {
            kind: kind.into(),
            element_type,
            inputs,
            outputs,
        }
    }

    /// The factory kind string.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The element type.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Input pads.
    pub fn inputs(&self) -> &[Pad] {
        &self.inputs
    }

    /// Output pads.
    pub fn outputs(&self) -> &[Pad] {
        &self.outputs
    }

    /// Whether any output pad is only discovered at runtime.
    pub fn has_dynamic_outputs(&self) -> bool {
        self.outputs
            .iter()
            .any(|p| p.presence() == PadPresence::Sometimes)
    }
}

/// Registry of stage classes.
pub struct StageRegistry {
    classes: HashMap<String, StageClass>,
}

impl StageRegistry {
    /// Create a registry with the built-in stage kinds registered.
    pub fn new() -> Self {
        use ElementType::*;

        let mut registry = Self {
            classes: HashMap::new(),
        };

        // Sources and sinks
        registry.register(StageClass::new("filesrc", Source));
        registry.register(StageClass::new("filesink", Sink));
        registry.register(StageClass::new("udpsink", Sink));
        registry.register(StageClass::new("autoaudiosink", Sink));

        // Demuxers
        registry.register(StageClass::new("qtdemux", Demuxer));
        registry.register(StageClass::new("avidemux", Demuxer));
        registry.register(StageClass::new("matroskademux", Demuxer));

        // Video decode chain
        registry.register(StageClass::new("queue", Transform));
        registry.register(StageClass::new("avdec_h264", Transform));
        registry.register(StageClass::new("avdec_mpeg4", Transform));
        registry.register(StageClass::new("vp8dec", Transform));
        registry.register(StageClass::new("videoconvert", Transform));
        registry.register(StageClass::new("videorate", Transform));
        registry.register(StageClass::new("videoscale", Transform));
        registry.register(StageClass::new("capsfilter", Transform));
        registry.register(StageClass::new("jpegenc", Transform));
        registry.register(StageClass::new("jpegdec", Transform));
        registry.register(StageClass::new("imagefreeze", Transform));
        registry.register(StageClass::new("rtpjpegpay", Transform));

        // Audio chain
        registry.register(StageClass::new("mpegaudioparse", Transform));
        registry.register(StageClass::new("mpg123audiodec", Transform));
        registry.register(StageClass::new("avdec_aac", Transform));
        registry.register(StageClass::new("vorbisdec", Transform));
        registry.register(StageClass::new("audioconvert", Transform));
        registry.register(StageClass::new("volume", Transform));

        registry
    }

    /// Register a stage class, replacing any existing one of the same kind.
    pub fn register(&mut self, class: StageClass) {
        self.classes.insert(class.kind().to_string(), class);
    }

    /// Remove a kind from the registry.
    ///
    /// Mainly useful in tests that simulate a framework missing a plugin.
    pub fn unregister(&mut self, kind: &str) -> Option<StageClass> {
        self.classes.remove(kind)
    }

    /// Look up a class by kind.
    pub fn lookup(&self, kind: &str) -> Option<&StageClass> {
        self.classes.get(kind)
    }

    /// Check if a kind is registered.
    pub fn is_registered(&self, kind: &str) -> bool {
        self.classes.contains_key(kind)
    }

    /// List all registered kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let registry = StageRegistry::new();
        assert!(registry.is_registered("filesrc"));
        assert!(registry.is_registered("qtdemux"));
        assert!(registry.is_registered("vp8dec"));
        assert!(registry.is_registered("volume"));
        assert!(!registry.is_registered("unknown"));
    }

    #[test]
    fn test_demuxer_has_dynamic_outputs() {
        let registry = StageRegistry::new();
        assert!(registry.lookup("qtdemux").unwrap().has_dynamic_outputs());
        assert!(!registry.lookup("queue").unwrap().has_dynamic_outputs());
    }

    #[test]
    fn test_pad_layouts() {
        let registry = StageRegistry::new();
        let src = registry.lookup("filesrc").unwrap();
        assert!(src.inputs().is_empty());
        assert_eq!(src.outputs().len(), 1);

        let sink = registry.lookup("filesink").unwrap();
        assert_eq!(sink.inputs().len(), 1);
        assert!(sink.outputs().is_empty());
    }

    #[test]
    fn test_unregister() {
        let mut registry = StageRegistry::new();
        assert!(registry.unregister("avdec_h264").is_some());
        assert!(!registry.is_registered("avdec_h264"));
    }
}
