//! Frame delivery: synchronous listeners and an owned-event queue

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};

#[cfg(feature = "logging")]
use tracing::debug;

use super::stats::FrameSyncStats;

/// One frame attempt as seen by a listener; borrows synchronizer buffers
#[derive(Debug, Clone, Copy)]
pub struct ReceivedFrame<'a> {
    /// User header bytes
    pub header: &'a [u8],
    /// Whether the header passed its integrity check
    pub header_valid: bool,
    /// Payload bytes; empty when no payload was demodulated
    pub payload: &'a [u8],
    /// Whether the payload passed its integrity check
    pub payload_valid: bool,
    /// Reception statistics
    pub stats: FrameSyncStats,
}

impl ReceivedFrame<'_> {
    /// Copy into an owned event
    pub fn to_event(&self) -> FrameEvent {
        FrameEvent {
            header: Bytes::copy_from_slice(self.header),
            header_valid: self.header_valid,
            payload: Bytes::copy_from_slice(self.payload),
            payload_valid: self.payload_valid,
            stats: self.stats,
        }
    }
}

/// Owned copy of a [`ReceivedFrame`]
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvent {
    /// User header bytes
    pub header: Bytes,
    /// Whether the header passed its integrity check
    pub header_valid: bool,
    /// Payload bytes
    pub payload: Bytes,
    /// Whether the payload passed its integrity check
    pub payload_valid: bool,
    /// Reception statistics
    pub stats: FrameSyncStats,
}

/// Receives every frame attempt that reaches the callback state
///
/// Called inline from `execute`; a slow listener stalls sample ingestion.
pub trait FrameListener {
    /// Handle one frame attempt
    fn on_frame(&mut self, frame: &ReceivedFrame<'_>);
}

impl<F> FrameListener for F
where
    F: FnMut(&ReceivedFrame<'_>),
{
    fn on_frame(&mut self, frame: &ReceivedFrame<'_>) {
        self(frame)
    }
}

/// Listener that collects owned events, mostly useful in tests and tools
#[derive(Debug, Clone, Default)]
pub struct FrameCollector {
    /// Events received so far, in order
    pub frames: Vec<FrameEvent>,
}

impl FrameListener for FrameCollector {
    fn on_frame(&mut self, frame: &ReceivedFrame<'_>) {
        self.frames.push(frame.to_event());
    }
}

/// Listener that forwards owned events into a channel
///
/// Decouples frame consumers from the thread running the synchronizer.
/// Events are dropped once every receiver has hung up.
#[derive(Debug, Clone)]
pub struct FrameQueue {
    sender: Sender<FrameEvent>,
}

impl FrameQueue {
    /// Queue feeding `sender`
    pub fn new(sender: Sender<FrameEvent>) -> Self {
        Self { sender }
    }

    /// Queue backed by a new unbounded channel
    pub fn unbounded() -> (Self, Receiver<FrameEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    /// Queue backed by a new channel holding at most `cap` events
    pub fn bounded(cap: usize) -> (Self, Receiver<FrameEvent>) {
        let (sender, receiver) = crossbeam_channel::bounded(cap);
        (Self { sender }, receiver)
    }
}

impl FrameListener for FrameQueue {
    fn on_frame(&mut self, frame: &ReceivedFrame<'_>) {
        if self.sender.send(frame.to_event()).is_err() {
            #[cfg(feature = "logging")]
            debug!("Frame queue disconnected, dropping frame");
        }
    }
}
