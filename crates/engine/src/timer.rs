//! Deadline-heap timer service.
//!
//! Timers carry generation-checked device handles, never references: firing
//! a timer whose device has been recycled is a logged no-op at the caller.
//! `cancel` is synchronous; a cancelled timer can never fire.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::registry::DeviceHandle;

/// Identifies one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// What a timer was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Device never became ready.
    ConnectionGuard,
    /// A handshake step reply never came.
    SetupStep,
    /// Delayed rumble start.
    RumbleDelay,
    /// Rumble duration elapsed.
    RumbleDuration,
    /// Switch-family system button cooldown.
    MiscCooldown,
}

/// One fired timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    /// What it was armed for.
    pub kind: TimerKind,
    /// The device it belongs to; may be stale by the time it fires.
    pub device: DeviceHandle,
    /// The handle it was armed under.
    pub timer: TimerHandle,
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    deadline_ms: u64,
    id: u64,
    kind: TimerKind,
    device: DeviceHandle,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline_ms, self.id).cmp(&(other.deadline_ms, other.id))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Monotonic-deadline timer heap. Time is caller-supplied milliseconds.
#[derive(Debug, Default)]
pub struct TimerService {
    heap: BinaryHeap<Reverse<Entry>>,
    cancelled: HashSet<u64>,
    next_id: u64,
}

impl TimerService {
    /// Empty service.
    pub fn new() -> Self {
        TimerService::default()
    }

    /// Arm a timer at an absolute deadline.
    pub fn arm(&mut self, deadline_ms: u64, kind: TimerKind, device: DeviceHandle) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse(Entry {
            deadline_ms,
            id,
            kind,
            device,
        }));
        TimerHandle(id)
    }

    /// Cancel a timer. Idempotent; cancelling an already-fired timer does
    /// nothing.
    pub fn cancel(&mut self, timer: TimerHandle) {
        self.cancelled.insert(timer.0);
    }

    /// Deadline of the next live timer, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.heap
            .iter()
            .filter(|Reverse(e)| !self.cancelled.contains(&e.id))
            .map(|Reverse(e)| e.deadline_ms)
            .min()
    }

    /// Number of live (armed, not cancelled) timers.
    pub fn live(&self) -> usize {
        self.heap
            .iter()
            .filter(|Reverse(e)| !self.cancelled.contains(&e.id))
            .count()
    }

    /// Pop the next timer due at or before `now_ms`, skipping cancelled
    /// entries.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Fired> {
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.deadline_ms > now_ms {
                return None;
            }
            let Reverse(entry) = self.heap.pop()?;
            if self.cancelled.remove(&entry.id) {
                continue;
            }
            return Some(Fired {
                kind: entry.kind,
                device: entry.device,
                timer: TimerHandle(entry.id),
            });
        }
        None
    }
}
