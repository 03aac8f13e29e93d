//! Force-feedback output reports.
//!
//! The controller has four actuators: the two body motors plus one in each
//! trigger. The wire duration field is unreliable (8BitDo clones ignore it
//! and rumble forever), so frames are sent with an effectively unlimited
//! duration and the engine's duration timer issues the stop frame.

use padhost_hid_common::{ReportBuilder, TRANSACTION_DATA_OUTPUT, WireFrame};

/// Rumble output report id.
pub const RUMBLE_REPORT_ID: u8 = 0x03;

// enable_actuators bits.
const FF_WEAK: u8 = 1 << 0;
const FF_STRONG: u8 = 1 << 1;
const FF_TRIGGER_RIGHT: u8 = 1 << 2;
const FF_TRIGGER_LEFT: u8 = 1 << 3;

const FF_ALL: u8 = FF_WEAK | FF_STRONG | FF_TRIGGER_RIGHT | FF_TRIGGER_LEFT;

/// Requested intensity for the four actuators, 8-bit each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuadRumble {
    /// Left trigger actuator.
    pub trigger_left: u8,
    /// Right trigger actuator.
    pub trigger_right: u8,
    /// Weak (high-frequency) body motor.
    pub weak_magnitude: u8,
    /// Strong (low-frequency) body motor.
    pub strong_magnitude: u8,
}

impl QuadRumble {
    /// Dual rumble: body motors only.
    pub fn dual(weak_magnitude: u8, strong_magnitude: u8) -> Self {
        QuadRumble {
            weak_magnitude,
            strong_magnitude,
            ..QuadRumble::default()
        }
    }
}

/// Frame that starts the requested actuators.
///
/// Magnitudes are rescaled onto the 0..=100 range the descriptor declares.
pub fn rumble_frame(rumble: QuadRumble) -> WireFrame {
    let mut mask = 0u8;
    if rumble.trigger_left != 0 {
        mask |= FF_TRIGGER_LEFT;
    }
    if rumble.trigger_right != 0 {
        mask |= FF_TRIGGER_RIGHT;
    }
    if rumble.weak_magnitude != 0 {
        mask |= FF_WEAK;
    }
    if rumble.strong_magnitude != 0 {
        mask |= FF_STRONG;
    }

    ff_report(
        mask,
        percent(rumble.trigger_left),
        percent(rumble.trigger_right),
        percent(rumble.strong_magnitude),
        percent(rumble.weak_magnitude),
        0xff, // run until told otherwise; the engine times the stop
        25,
    )
}

/// Frame that stops all four actuators.
pub fn rumble_stop_frame() -> WireFrame {
    ff_report(FF_ALL, 0, 0, 0, 0, 0, 0)
}

fn percent(magnitude: u8) -> u8 {
    (u16::from(magnitude) * 100 / 255) as u8
}

#[allow(clippy::too_many_arguments)]
fn ff_report(
    enable_actuators: u8,
    magnitude_left_trigger: u8,
    magnitude_right_trigger: u8,
    magnitude_strong: u8,
    magnitude_weak: u8,
    duration_10ms: u8,
    loop_count: u8,
) -> WireFrame {
    let mut b = ReportBuilder::with_capacity(10);
    b.write_u8(TRANSACTION_DATA_OUTPUT);
    b.write_u8(RUMBLE_REPORT_ID);
    b.write_u8(enable_actuators);
    b.write_u8(magnitude_left_trigger);
    b.write_u8(magnitude_right_trigger);
    b.write_u8(magnitude_strong);
    b.write_u8(magnitude_weak);
    b.write_u8(duration_10ms);
    b.write_u8(0); // start delay; the engine owns delayed starts
    b.write_u8(loop_count);
    WireFrame::Interrupt(b.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_rumble_enables_body_motors_only() {
        let f = rumble_frame(QuadRumble::dual(255, 128));
        let p = f.payload();
        assert_eq!(p[1], RUMBLE_REPORT_ID);
        assert_eq!(p[2], FF_WEAK | FF_STRONG);
        assert_eq!(p[3], 0); // left trigger
        assert_eq!(p[5], 50); // strong, rescaled
        assert_eq!(p[6], 100); // weak, rescaled
        assert_eq!(p[7], 0xff);
        assert_eq!(p[9], 25);
    }

    #[test]
    fn trigger_only_rumble() {
        let f = rumble_frame(QuadRumble {
            trigger_left: 255,
            ..QuadRumble::default()
        });
        let p = f.payload();
        assert_eq!(p[2], FF_TRIGGER_LEFT);
        assert_eq!(p[3], 100);
        assert_eq!(p[4], 0);
    }

    #[test]
    fn stop_frame_addresses_all_actuators() {
        let p = rumble_stop_frame();
        let p = p.payload();
        assert_eq!(p[2], FF_ALL);
        assert!(p[3..].iter().all(|&b| b == 0));
    }
}
