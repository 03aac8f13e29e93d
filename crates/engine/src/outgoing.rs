//! Bounded per-device outgoing frame ring.
//!
//! Overflow drops the new frame, not the oldest: a full ring means the
//! channel has been congested for a while, and replacing queued handshake
//! frames with later cosmetic ones would wedge setup.

use std::collections::VecDeque;

/// One queued frame, waiting for the channel to drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFrame {
    /// L2CAP channel to send on.
    pub channel_id: u16,
    /// Full payload, transaction header included.
    pub payload: Vec<u8>,
}

/// Fixed-capacity FIFO of frames that hit a busy channel.
#[derive(Debug)]
pub struct OutgoingRing {
    queue: VecDeque<PendingFrame>,
    capacity: usize,
}

impl OutgoingRing {
    /// Ring holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        OutgoingRing {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue a frame. Returns `false` (frame dropped) when full.
    #[must_use]
    pub fn push(&mut self, frame: PendingFrame) -> bool {
        if self.queue.len() >= self.capacity {
            return false;
        }
        self.queue.push_back(frame);
        true
    }

    /// Put a frame back at the head after a failed retry.
    pub fn requeue_front(&mut self, frame: PendingFrame) {
        // The frame just came off this ring, so there is room.
        self.queue.push_front(frame);
        self.queue.truncate(self.capacity);
    }

    /// Take the oldest queued frame.
    pub fn pop(&mut self) -> Option<PendingFrame> {
        self.queue.pop_front()
    }

    /// Queued frame count.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything (device teardown).
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn frame(n: u8) -> PendingFrame {
        PendingFrame {
            channel_id: 0x41,
            payload: vec![n],
        }
    }

    #[test]
    fn overflow_drops_the_new_frame() {
        let mut ring = OutgoingRing::new(2);
        assert!(ring.push(frame(1)));
        assert!(ring.push(frame(2)));
        assert!(!ring.push(frame(3)));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop().unwrap().payload, vec![1]);
        assert_eq!(ring.pop().unwrap().payload, vec![2]);
        assert!(ring.pop().is_none());
    }

    #[test]
    fn requeue_restores_order() {
        let mut ring = OutgoingRing::new(4);
        assert!(ring.push(frame(1)));
        assert!(ring.push(frame(2)));
        let head = ring.pop().unwrap();
        ring.requeue_front(head);
        assert_eq!(ring.pop().unwrap().payload, vec![1]);
        assert_eq!(ring.pop().unwrap().payload, vec![2]);
    }
}
