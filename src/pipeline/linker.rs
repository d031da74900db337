//! Runtime pad wiring across the demultiplexer boundary.
//!
//! A demultiplexer only exposes its stream pads once it has parsed the
//! container, at an unspecified time after the pipeline leaves the `Null`
//! state. The [`DynamicLinker`] decides, per discovered pad, whether and
//! where to link it; the pipeline instance carries the decision out and
//! reports back so the linker can stay idempotent across repeated
//! discoveries.

use crate::recipe::LinkRule;
use crate::stage::PadInfo;
use std::collections::HashSet;

/// Decision taken for one discovered pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    /// Link the pad to the stage with this role.
    Link {
        /// Role of the downstream stage to link to.
        target_role: String,
    },
    /// Leave the pad unlinked.
    Ignore,
}

/// Callback interface invoked once per newly discovered stream pad.
pub trait DynamicLinker: Send {
    /// Decide what to do with a discovered pad.
    fn on_pad_discovered(&mut self, pad: &PadInfo) -> LinkDecision;

    /// Record that a decided link was completed by the runtime.
    ///
    /// Only successful links are reported; a failed link leaves the rule
    /// open so a later pad of the same category can still claim it.
    fn mark_linked(&mut self, target_role: &str);
}

/// Links pads by stream category according to a recipe's link rules.
///
/// Each rule is satisfied at most once: further pads of the same category
/// are ignored, so repeated discoveries are harmless.
#[derive(Debug)]
pub struct CategoryLinker {
    rules: Vec<LinkRule>,
    satisfied: HashSet<String>,
}

impl CategoryLinker {
    /// Create a linker from a recipe's rules.
    pub fn new(rules: Vec<LinkRule>) -> Self {
        Self {
            rules,
            satisfied: HashSet::new(),
        }
    }

    /// Whether every rule has been satisfied.
    pub fn complete(&self) -> bool {
        self.rules
            .iter()
            .all(|r| self.satisfied.contains(&r.target_role))
    }
}

impl DynamicLinker for CategoryLinker {
    fn on_pad_discovered(&mut self, pad: &PadInfo) -> LinkDecision {
        let category = pad.media_type.category();
        for rule in &self.rules {
            if rule.category == category && !self.satisfied.contains(&rule.target_role) {
                return LinkDecision::Link {
                    target_role: rule.target_role.clone(),
                };
            }
        }
        LinkDecision::Ignore
    }

    fn mark_linked(&mut self, target_role: &str) {
        self.satisfied.insert(target_role.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::StreamCategory;

    fn video_pad(name: &str) -> PadInfo {
        PadInfo::new("demux", name, "video/x-h264")
    }

    fn audio_pad(name: &str) -> PadInfo {
        PadInfo::new("demux", name, "audio/mpeg")
    }

    #[test]
    fn test_links_video_only() {
        let mut linker = CategoryLinker::new(vec![LinkRule::video_to("vqueue")]);

        assert_eq!(
            linker.on_pad_discovered(&video_pad("video_0")),
            LinkDecision::Link {
                target_role: "vqueue".to_string()
            }
        );
        assert_eq!(linker.on_pad_discovered(&audio_pad("audio_0")), LinkDecision::Ignore);
    }

    #[test]
    fn test_idempotent_after_success() {
        let mut linker = CategoryLinker::new(vec![LinkRule::video_to("vqueue")]);

        assert!(matches!(
            linker.on_pad_discovered(&video_pad("video_0")),
            LinkDecision::Link { .. }
        ));
        linker.mark_linked("vqueue");

        // A second video pad must not be linked again.
        assert_eq!(linker.on_pad_discovered(&video_pad("video_1")), LinkDecision::Ignore);
        assert!(linker.complete());
    }

    #[test]
    fn test_failed_link_leaves_rule_open() {
        let mut linker = CategoryLinker::new(vec![LinkRule::video_to("vqueue")]);

        assert!(matches!(
            linker.on_pad_discovered(&video_pad("video_0")),
            LinkDecision::Link { .. }
        ));
        // No mark_linked: the runtime link failed. The next pad retries.
        assert!(matches!(
            linker.on_pad_discovered(&video_pad("video_1")),
            LinkDecision::Link { .. }
        ));
        assert!(!linker.complete());
    }

    #[test]
    fn test_two_rules() {
        let mut linker = CategoryLinker::new(vec![
            LinkRule::video_to("vqueue"),
            LinkRule::new(StreamCategory::Audio, "aqueue"),
        ]);

        assert_eq!(
            linker.on_pad_discovered(&audio_pad("audio_0")),
            LinkDecision::Link {
                target_role: "aqueue".to_string()
            }
        );
        linker.mark_linked("aqueue");
        assert!(!linker.complete());

        assert!(matches!(
            linker.on_pad_discovered(&video_pad("video_0")),
            LinkDecision::Link { .. }
        ));
        linker.mark_linked("vqueue");
        assert!(linker.complete());
    }
}
