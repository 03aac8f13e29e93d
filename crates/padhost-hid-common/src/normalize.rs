//! Integer normalization helpers for usage-stream decoding.
//!
//! Axes land in `-512..=511`, pedals in `0..=1023`, matching the canonical
//! gamepad range ([`AXIS_NORMALIZE_RANGE`]). All math is integer-only.

/// Full span of a normalized axis. Centered axes cover `±AXIS_NORMALIZE_RANGE/2`.
pub const AXIS_NORMALIZE_RANGE: i32 = 1024;

/// Logical bounds of a HID field, taken from the report descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidGlobals {
    /// Logical minimum of the field.
    pub logical_minimum: i32,
    /// Logical maximum of the field.
    pub logical_maximum: i32,
    /// Field width in bits.
    pub report_size: u8,
}

/// Normalize a centered axis to `-512..=511`.
pub fn process_axis(globals: &HidGlobals, value: i32) -> i32 {
    let min = globals.logical_minimum;
    let mut max = globals.logical_maximum;

    // Some descriptors declare an unsigned 0xff maximum that parses as -1.
    if max == -1 {
        max = (1i32 << globals.report_size) - 1;
    }

    let range = (max - min) + 1;
    // Center so that 0 means "axis at rest", then scale.
    let centered = value - range / 2 - min;
    centered * AXIS_NORMALIZE_RANGE / range
}

/// Normalize a trigger/pedal to `0..=1023`.
pub fn process_pedal(globals: &HidGlobals, value: i32) -> i32 {
    let min = globals.logical_minimum;
    let mut max = globals.logical_maximum;

    if max == -1 {
        max = (1i32 << globals.report_size) - 1;
    }

    let range = (max - min) + 1;
    value * AXIS_NORMALIZE_RANGE / range
}

/// Rebase a hat value so 0 is "up"; out-of-range means released (`0xff`).
pub fn process_hat(globals: &HidGlobals, value: i32) -> u8 {
    if value < globals.logical_minimum || value > globals.logical_maximum {
        return 0xff;
    }
    (value - globals.logical_minimum) as u8
}

/// Dpad bit for "up".
pub const DPAD_UP: u8 = 1 << 0;
/// Dpad bit for "down".
pub const DPAD_DOWN: u8 = 1 << 1;
/// Dpad bit for "right".
pub const DPAD_RIGHT: u8 = 1 << 2;
/// Dpad bit for "left".
pub const DPAD_LEFT: u8 = 1 << 3;

/// Convert an 8-way hat value (0 = up, clockwise) into dpad bits.
pub fn hat_to_dpad(hat: u8) -> u8 {
    match hat {
        0 => DPAD_UP,
        1 => DPAD_UP | DPAD_RIGHT,
        2 => DPAD_RIGHT,
        3 => DPAD_RIGHT | DPAD_DOWN,
        4 => DPAD_DOWN,
        5 => DPAD_DOWN | DPAD_LEFT,
        6 => DPAD_LEFT,
        7 => DPAD_LEFT | DPAD_UP,
        // 0x08 and 0xff both mean "released"
        _ => 0,
    }
}

/// Set or clear one dpad bit from a discrete dpad usage.
pub fn process_dpad(usage: u16, value: i32, dpad: &mut u8) {
    use crate::usage::{USAGE_DPAD_DOWN, USAGE_DPAD_LEFT, USAGE_DPAD_RIGHT, USAGE_DPAD_UP};
    let bit = match usage {
        USAGE_DPAD_UP => DPAD_UP,
        USAGE_DPAD_DOWN => DPAD_DOWN,
        USAGE_DPAD_RIGHT => DPAD_RIGHT,
        USAGE_DPAD_LEFT => DPAD_LEFT,
        _ => return,
    };
    if value != 0 {
        *dpad |= bit;
    } else {
        *dpad &= !bit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const U8_AXIS: HidGlobals = HidGlobals {
        logical_minimum: 0,
        logical_maximum: 255,
        report_size: 8,
    };

    #[test]
    fn axis_center_is_zero() {
        assert_eq!(process_axis(&U8_AXIS, 128), 0);
        assert_eq!(process_axis(&U8_AXIS, 0), -512);
        assert_eq!(process_axis(&U8_AXIS, 255), 508);
    }

    #[test]
    fn unsigned_max_parsed_as_minus_one() {
        let g = HidGlobals {
            logical_minimum: 0,
            logical_maximum: -1,
            report_size: 8,
        };
        assert_eq!(process_axis(&g, 128), 0);
    }

    #[test]
    fn pedal_spans_zero_to_full() {
        assert_eq!(process_pedal(&U8_AXIS, 0), 0);
        assert_eq!(process_pedal(&U8_AXIS, 255), 1020);
    }

    #[test]
    fn hat_null_value_is_released() {
        let g = HidGlobals {
            logical_minimum: 1,
            logical_maximum: 8,
            report_size: 4,
        };
        assert_eq!(process_hat(&g, 0), 0xff);
        assert_eq!(process_hat(&g, 1), 0);
        assert_eq!(hat_to_dpad(0xff), 0);
        assert_eq!(hat_to_dpad(8), 0);
    }

    #[test]
    fn hat_corners() {
        assert_eq!(hat_to_dpad(1), DPAD_UP | DPAD_RIGHT);
        assert_eq!(hat_to_dpad(7), DPAD_LEFT | DPAD_UP);
    }

    proptest! {
        #[test]
        fn axis_stays_in_range(v in 0i32..=255) {
            let out = process_axis(&U8_AXIS, v);
            prop_assert!((-512..=511).contains(&out));
        }

        #[test]
        fn pedal_stays_in_range(v in 0i32..=255) {
            let out = process_pedal(&U8_AXIS, v);
            prop_assert!((0..=1023).contains(&out));
        }
    }
}
