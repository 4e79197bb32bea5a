use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use railbus_frame::Frame;

/// Unbounded FIFO of frames, safe to share between threads.
///
/// The lock is held only for the duration of a single push or pop, never
/// across I/O or subscriber callbacks.
#[derive(Debug, Default)]
pub struct MessageQueue {
    frames: Mutex<VecDeque<Frame>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame. Always succeeds.
    pub fn enqueue(&self, frame: Frame) {
        self.lock().push_back(frame);
    }

    /// Pop the oldest frame, or `None` if the queue is empty. Never blocks
    /// waiting for a frame.
    pub fn try_dequeue(&self) -> Option<Frame> {
        self.lock().pop_front()
    }

    /// Advisory length; may be stale by the time the caller acts on it.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Put a frame back at the head, ahead of everything queued.
    pub(crate) fn requeue_front(&self, frame: Frame) {
        self.lock().push_front(frame);
    }

    // Every critical section leaves the deque consistent, so a panic while
    // holding the lock cannot corrupt it.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The two queues shared between the transport worker and the rest of the
/// process.
#[derive(Debug, Default)]
pub struct MessageBus {
    incoming: MessageQueue,
    outgoing: MessageQueue,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames read from the link, waiting for fan-out or polling.
    pub fn incoming(&self) -> &MessageQueue {
        &self.incoming
    }

    /// Frames waiting to be written to the link.
    pub fn outgoing(&self) -> &MessageQueue {
        &self.outgoing
    }
}
