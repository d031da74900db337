//! The pipeline status bus.
//!
//! A running pipeline reports lifecycle and diagnostic events on its bus.
//! The control plane consumes them two ways: the thumbnail run uses a
//! bounded-timeout filtered poll ([`BusReceiver::timed_pop_filtered`]), the
//! live session drains the bus from its event loop ([`BusReceiver::try_pop`]).

use crate::pipeline::PipelineState;
use std::fmt;
use std::ops::BitOr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Category of a bus message, used for filtered polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    /// A stage or the pipeline changed state.
    StateChanged,
    /// A fatal error.
    Error,
    /// A non-fatal warning.
    Warning,
    /// Informational diagnostics.
    Info,
    /// End of stream.
    Eos,
    /// The stream duration changed and must be re-queried.
    DurationChanged,
}

impl MessageCategory {
    const fn bit(self) -> u8 {
        match self {
            MessageCategory::StateChanged => 1 << 0,
            MessageCategory::Error => 1 << 1,
            MessageCategory::Warning => 1 << 2,
            MessageCategory::Info => 1 << 3,
            MessageCategory::Eos => 1 << 4,
            MessageCategory::DurationChanged => 1 << 5,
        }
    }
}

/// A set of message categories accepted by a filtered poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageMask(u8);

impl MessageMask {
    /// Accept nothing.
    pub const NONE: Self = Self(0);
    /// Accept state-change messages.
    pub const STATE_CHANGED: Self = Self(MessageCategory::StateChanged.bit());
    /// Accept errors.
    pub const ERROR: Self = Self(MessageCategory::Error.bit());
    /// Accept warnings.
    pub const WARNING: Self = Self(MessageCategory::Warning.bit());
    /// Accept informational messages.
    pub const INFO: Self = Self(MessageCategory::Info.bit());
    /// Accept end-of-stream.
    pub const EOS: Self = Self(MessageCategory::Eos.bit());
    /// Accept duration changes.
    pub const DURATION_CHANGED: Self = Self(MessageCategory::DurationChanged.bit());
    /// Accept everything.
    pub const ALL: Self = Self(0x3f);

    /// The set watched by the thumbnail supervision loop.
    pub const SUPERVISION: Self = Self(
        MessageCategory::StateChanged.bit()
            | MessageCategory::Error.bit()
            | MessageCategory::Eos.bit()
            | MessageCategory::DurationChanged.bit(),
    );

    /// Whether the mask accepts the given category.
    pub fn contains(&self, category: MessageCategory) -> bool {
        self.0 & category.bit() != 0
    }
}

impl BitOr for MessageMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Payload of a bus message.
#[derive(Debug, Clone)]
pub enum MessageKind {
    /// A state transition completed somewhere in the pipeline.
    StateChanged {
        /// State before the transition.
        old: PipelineState,
        /// State after the transition.
        new: PipelineState,
        /// State the element is still heading for, if any.
        pending: Option<PipelineState>,
    },
    /// A fatal error; the run is over once this is observed.
    Error {
        /// Human-readable message.
        message: String,
        /// Optional debug detail.
        debug: Option<String>,
    },
    /// A non-fatal problem; logged, never terminal.
    Warning {
        /// Human-readable message.
        message: String,
        /// Optional debug detail.
        debug: Option<String>,
    },
    /// Informational diagnostics; logged only.
    Info {
        /// Human-readable message.
        message: String,
        /// Optional debug detail.
        debug: Option<String>,
    },
    /// All sources are exhausted.
    Eos,
    /// The pipeline's duration is no longer what was last queried.
    DurationChanged,
}

impl MessageKind {
    /// The category this payload belongs to.
    pub fn category(&self) -> MessageCategory {
        match self {
            MessageKind::StateChanged { .. } => MessageCategory::StateChanged,
            MessageKind::Error { .. } => MessageCategory::Error,
            MessageKind::Warning { .. } => MessageCategory::Warning,
            MessageKind::Info { .. } => MessageCategory::Info,
            MessageKind::Eos => MessageCategory::Eos,
            MessageKind::DurationChanged => MessageCategory::DurationChanged,
        }
    }
}

/// A message on the pipeline status bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Name of the element the message originated from. Messages from the
    /// top-level pipeline carry the pipeline's name.
    pub source: String,
    /// The payload.
    pub kind: MessageKind,
}

impl BusMessage {
    /// Create a message.
    pub fn new(source: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            source: source.into(),
            kind,
        }
    }
}

impl fmt::Display for BusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MessageKind::StateChanged { old, new, .. } => {
                write!(f, "{}: state {old} -> {new}", self.source)
            }
            MessageKind::Error { message, .. } => write!(f, "{}: error: {message}", self.source),
            MessageKind::Warning { message, .. } => {
                write!(f, "{}: warning: {message}", self.source)
            }
            MessageKind::Info { message, .. } => write!(f, "{}: info: {message}", self.source),
            MessageKind::Eos => write!(f, "{}: end of stream", self.source),
            MessageKind::DurationChanged => write!(f, "{}: duration changed", self.source),
        }
    }
}

/// Create a connected bus sender/receiver pair.
pub fn bus_channel() -> (BusSender, BusReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BusSender { tx }, BusReceiver { rx })
}

/// Producer half of the bus, held by the pipeline runtime.
#[derive(Clone, Debug)]
pub struct BusSender {
    tx: mpsc::UnboundedSender<BusMessage>,
}

impl BusSender {
    /// Post a message. Posting to a released bus is silently dropped.
    pub fn post(&self, message: BusMessage) {
        let _ = self.tx.send(message);
    }

    /// Post a state-change message.
    pub fn state_changed(
        &self,
        source: impl Into<String>,
        old: PipelineState,
        new: PipelineState,
        pending: Option<PipelineState>,
    ) {
        self.post(BusMessage::new(
            source,
            MessageKind::StateChanged { old, new, pending },
        ));
    }

    /// Post an error message.
    pub fn error(
        &self,
        source: impl Into<String>,
        message: impl Into<String>,
        debug: Option<String>,
    ) {
        self.post(BusMessage::new(
            source,
            MessageKind::Error {
                message: message.into(),
                debug,
            },
        ));
    }

    /// Post a warning message.
    pub fn warning(
        &self,
        source: impl Into<String>,
        message: impl Into<String>,
        debug: Option<String>,
    ) {
        self.post(BusMessage::new(
            source,
            MessageKind::Warning {
                message: message.into(),
                debug,
            },
        ));
    }

    /// Post an end-of-stream message.
    pub fn eos(&self, source: impl Into<String>) {
        self.post(BusMessage::new(source, MessageKind::Eos));
    }

    /// Post a duration-changed message.
    pub fn duration_changed(&self, source: impl Into<String>) {
        self.post(BusMessage::new(source, MessageKind::DurationChanged));
    }
}

/// Consumer half of the bus, owned by the supervising loop.
#[derive(Debug)]
pub struct BusReceiver {
    rx: mpsc::UnboundedReceiver<BusMessage>,
}

impl BusReceiver {
    /// Receive the next message of any category.
    ///
    /// Returns `None` once the sender is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }

    /// Pop the next matching message without waiting.
    ///
    /// Non-matching messages encountered on the way are dropped, mirroring
    /// a filtered bus pop.
    pub fn try_pop(&mut self, mask: MessageMask) -> Option<BusMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) if mask.contains(msg.kind.category()) => return Some(msg),
                Ok(msg) => {
                    tracing::trace!(message = %msg, "dropping unwatched bus message");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Wait up to `timeout` for the next message matching `mask`.
    ///
    /// Returns `None` when the timeout expires or the bus is released;
    /// non-matching messages are dropped.
    pub async fn timed_pop_filtered(
        &mut self,
        timeout: Duration,
        mask: MessageMask,
    ) -> Option<BusMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(msg)) if mask.contains(msg.kind.category()) => return Some(msg),
                Ok(Some(msg)) => {
                    tracing::trace!(message = %msg, "dropping unwatched bus message");
                    continue;
                }
                Ok(None) => return None,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_contains() {
        assert!(MessageMask::SUPERVISION.contains(MessageCategory::Eos));
        assert!(MessageMask::SUPERVISION.contains(MessageCategory::Error));
        assert!(MessageMask::SUPERVISION.contains(MessageCategory::StateChanged));
        assert!(MessageMask::SUPERVISION.contains(MessageCategory::DurationChanged));
        assert!(!MessageMask::SUPERVISION.contains(MessageCategory::Warning));
        assert!(!MessageMask::SUPERVISION.contains(MessageCategory::Info));
        assert!(MessageMask::ALL.contains(MessageCategory::Info));
        assert!(!MessageMask::NONE.contains(MessageCategory::Eos));
    }

    #[test]
    fn test_mask_union() {
        let mask = MessageMask::EOS | MessageMask::ERROR;
        assert!(mask.contains(MessageCategory::Eos));
        assert!(mask.contains(MessageCategory::Error));
        assert!(!mask.contains(MessageCategory::StateChanged));
    }

    #[tokio::test]
    async fn test_post_and_recv() {
        let (tx, mut rx) = bus_channel();
        tx.eos("pipe");

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.source, "pipe");
        assert!(matches!(msg.kind, MessageKind::Eos));
    }

    #[tokio::test]
    async fn test_filtered_pop_drops_unwatched() {
        let (tx, mut rx) = bus_channel();
        tx.warning("stage", "harmless", None);
        tx.eos("pipe");

        let msg = rx
            .timed_pop_filtered(Duration::from_millis(100), MessageMask::SUPERVISION)
            .await
            .unwrap();
        assert!(matches!(msg.kind, MessageKind::Eos));
        // The warning was consumed and dropped.
        assert!(rx.try_pop(MessageMask::ALL).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_pop_times_out() {
        let (_tx, mut rx) = bus_channel();
        let msg = rx
            .timed_pop_filtered(Duration::from_millis(100), MessageMask::ALL)
            .await;
        assert!(msg.is_none());
    }

    #[tokio::test]
    async fn test_try_pop_on_empty() {
        let (_tx, mut rx) = bus_channel();
        assert!(rx.try_pop(MessageMask::ALL).is_none());
    }
}
