//! Haptics scheduler state.
//!
//! Every rumble request cancels whatever was scheduled before it; at most
//! one timer is live per device. The actual frame encoding is per-family,
//! the scheduling is not.

use crate::timer::TimerHandle;

/// Per-device rumble scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RumbleState {
    /// Nothing scheduled, motors assumed off.
    #[default]
    Disabled,
    /// Start frame not sent yet; the delay timer will send it.
    Delayed {
        /// The armed delay timer.
        timer: TimerHandle,
        /// Duration to play once started.
        duration_ms: u16,
        /// Weak (high-frequency) magnitude.
        weak: u8,
        /// Strong (low-frequency) magnitude.
        strong: u8,
    },
    /// Start frame sent; the duration timer will send the stop.
    InProgress {
        /// The armed duration timer.
        timer: TimerHandle,
    },
}

impl RumbleState {
    /// The live timer, if one is armed.
    pub fn live_timer(&self) -> Option<TimerHandle> {
        match self {
            RumbleState::Disabled => None,
            RumbleState::Delayed { timer, .. } | RumbleState::InProgress { timer } => Some(*timer),
        }
    }
}

/// What a `play_dual_rumble` request should do, after the old schedule is
/// cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RumbleAction {
    /// Send the start frame and arm a duration timer.
    StartNow,
    /// Arm a delayed-start timer.
    StartLater,
    /// Send the stop frame.
    StopNow,
    /// Nothing to send.
    Ignore,
}

/// Decide the action for a request against the current state.
///
/// `stops_when_idle` is the family quirk for `duration == 0` on an idle
/// device: Wii sends the rumble-off frame anyway, Sony and Switch treat it
/// as a no-op.
pub fn plan(
    state: &RumbleState,
    start_delay_ms: u16,
    duration_ms: u16,
    stops_when_idle: bool,
) -> RumbleAction {
    if duration_ms == 0 {
        return match state {
            RumbleState::InProgress { .. } => RumbleAction::StopNow,
            RumbleState::Disabled | RumbleState::Delayed { .. } => {
                if stops_when_idle {
                    RumbleAction::StopNow
                } else {
                    RumbleAction::Ignore
                }
            }
        };
    }
    if start_delay_ms == 0 {
        RumbleAction::StartNow
    } else {
        RumbleAction::StartLater
    }
}
