//! Switch input report decoding and calibration math.

use padhost_controller_types::gamepad::{button, misc_button};
use padhost_controller_types::{BATTERY_EMPTY, BATTERY_FULL, Controller, Gamepad};
use padhost_errors::report::ReportError;
use padhost_hid_common::normalize::{
    AXIS_NORMALIZE_RANGE, DPAD_DOWN, DPAD_LEFT, DPAD_RIGHT, DPAD_UP, hat_to_dpad,
};

use crate::ids::{
    ControllerType, DEFAULT_ACCEL_OFFSET, DEFAULT_ACCEL_SCALE, DEFAULT_GYRO_OFFSET,
    DEFAULT_GYRO_SCALE, IMU_PREC_RANGE_SCALE,
};

const FAMILY: &str = "switch";

/// Calibration for one stick axis: raw min, center and max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickCal {
    /// Raw value at full negative deflection.
    pub min: i32,
    /// Raw value at rest.
    pub center: i32,
    /// Raw value at full positive deflection.
    pub max: i32,
}

impl Default for StickCal {
    fn default() -> Self {
        // Reasonable defaults for a 12-bit stick when SPI reads fail.
        StickCal {
            min: 512,
            center: 2048,
            max: 3583,
        }
    }
}

impl StickCal {
    /// True when either span around center collapses to zero or negative.
    /// Clone pads ship all-zero SPI calibration blocks that decode to this.
    pub fn is_degenerate(self) -> bool {
        self.max <= self.center || self.center <= self.min
    }
}

/// Factory IMU calibration: per-axis offset and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImuCal {
    /// Raw value at rest.
    pub offset: [i16; 3],
    /// Raw value at the reference rate.
    pub scale: [i16; 3],
}

/// All calibration state carried by one connected controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    /// Left stick horizontal.
    pub x: StickCal,
    /// Left stick vertical.
    pub y: StickCal,
    /// Right stick horizontal.
    pub rx: StickCal,
    /// Right stick vertical.
    pub ry: StickCal,
    /// Accelerometer factory calibration.
    pub accel: ImuCal,
    /// Gyroscope factory calibration.
    pub gyro: ImuCal,
    accel_divisor: [i32; 3],
    gyro_divisor: [i32; 3],
}

impl Default for Calibration {
    fn default() -> Self {
        let mut cal = Calibration {
            x: StickCal::default(),
            y: StickCal::default(),
            rx: StickCal::default(),
            ry: StickCal::default(),
            accel: ImuCal {
                offset: [DEFAULT_ACCEL_OFFSET; 3],
                scale: [DEFAULT_ACCEL_SCALE; 3],
            },
            gyro: ImuCal {
                offset: [DEFAULT_GYRO_OFFSET; 3],
                scale: [DEFAULT_GYRO_SCALE; 3],
            },
            accel_divisor: [0; 3],
            gyro_divisor: [0; 3],
        };
        cal.update_imu_divisors();
        cal
    }
}

impl Calibration {
    /// Recompute the cached `scale - offset` divisors after an IMU update.
    pub fn update_imu_divisors(&mut self) {
        for i in 0..3 {
            self.accel_divisor[i] = i32::from(self.accel.scale[i]) - i32::from(self.accel.offset[i]);
            self.gyro_divisor[i] = i32::from(self.gyro.scale[i]) - i32::from(self.gyro.offset[i]);
        }
    }
}

/// Unpack one 9-byte factory stick calibration block.
///
/// Left and right sticks store the same three 12-bit pairs in a different
/// order: left is max, center, min; right is center, min, max. Blocks whose
/// decoded ranges collapse are rejected so the caller keeps its defaults.
pub fn parse_stick_calibration(data: &[u8], is_left: bool) -> Option<(StickCal, StickCal)> {
    if data.len() < 9 {
        return None;
    }
    let pair = |a: u8, b: u8, c: u8| -> (i32, i32) {
        (
            i32::from(a) | (i32::from(b & 0x0f) << 8),
            i32::from(b >> 4) | (i32::from(c) << 4),
        )
    };
    let (p0x, p0y) = pair(data[0], data[1], data[2]);
    let (p1x, p1y) = pair(data[3], data[4], data[5]);
    let (p2x, p2y) = pair(data[6], data[7], data[8]);

    let (x_max, y_max, x_center, y_center, x_min, y_min) = if is_left {
        (p0x, p0y, p1x, p1y, p2x, p2y)
    } else {
        (p2x, p2y, p0x, p0y, p1x, p1y)
    };

    let x = StickCal {
        min: x_center - x_min,
        center: x_center,
        max: x_center + x_max,
    };
    let y = StickCal {
        min: y_center - y_min,
        center: y_center,
        max: y_center + y_max,
    };
    if x.is_degenerate() || y.is_degenerate() {
        return None;
    }
    Some((x, y))
}

/// Unpack the 24-byte factory IMU calibration block into `cal`.
pub fn parse_imu_calibration(data: &[u8], cal: &mut Calibration) -> bool {
    if data.len() != 24 {
        return false;
    }
    let le16 = |j: usize| (i32::from(data[j]) | (i32::from(data[j + 1]) << 8)) as i16;
    for i in 0..3 {
        let j = i * 2;
        cal.accel.offset[i] = le16(j);
        cal.accel.scale[i] = le16(j + 6);
        cal.gyro.offset[i] = le16(j + 12);
        cal.gyro.scale[i] = le16(j + 18);
    }
    cal.update_imu_divisors();
    true
}

/// Map a raw 12-bit stick sample through its calibration, clamped to
/// `-512..=512`. The spans are floored at 1 so a degenerate calibration
/// saturates instead of dividing by zero.
pub fn calibrate_axis(v: i32, cal: StickCal) -> i32 {
    let half = AXIS_NORMALIZE_RANGE / 2;
    let ret = if v > cal.center {
        (v - cal.center) * half / (cal.max - cal.center).max(1)
    } else {
        (cal.center - v) * -half / (cal.center - cal.min).max(1)
    };
    ret.clamp(-half, half)
}

/// Battery level from the `bat_con` byte of 0x21 replies; `None` for
/// out-of-range values.
pub fn battery_level(bat_con: u8) -> Option<u8> {
    match bat_con >> 5 {
        0 => Some(BATTERY_EMPTY),
        1 => Some(64),
        2 => Some(128),
        3 => Some(192),
        4 => Some(BATTERY_FULL),
        _ => None,
    }
}

fn stick_12bit(data: &[u8]) -> (i32, i32) {
    (
        i32::from(data[0]) | (i32::from(data[1] & 0x0f) << 8),
        i32::from(data[1] >> 4) | (i32::from(data[2]) << 4),
    )
}

fn mult_frac(x: i64, numer: i64, denom: i64) -> i64 {
    let quot = x / denom;
    let rem = x % denom;
    quot * numer + rem * numer / denom
}

fn parse_imu_sample(
    sample: &[u8],
    cal: &Calibration,
    controller_type: ControllerType,
    gp: &mut Gamepad,
) {
    let mut accel = [0i32; 3];
    let mut gyro = [0i32; 3];
    for i in 0..3 {
        let raw_a = i32::from(i16::from_le_bytes([sample[i * 2], sample[i * 2 + 1]]));
        let raw_g = i32::from(i16::from_le_bytes([sample[6 + i * 2], sample[7 + i * 2]]));
        accel[i] = if cal.accel_divisor[i] == 0 {
            raw_a
        } else {
            raw_a * i32::from(cal.accel.scale[i]) / cal.accel_divisor[i]
        };
        gyro[i] = mult_frac(
            i64::from(IMU_PREC_RANGE_SCALE) * i64::from(raw_g - i32::from(cal.gyro.offset[i])),
            i64::from(cal.gyro.scale[i]),
            i64::from(cal.gyro_divisor[i].max(1)),
        ) as i32;
    }

    // The right Joy-Con mounts the IMU flipped: Y and Z are negated.
    if controller_type == ControllerType::JoyconRight {
        accel[1] = -accel[1];
        accel[2] = -accel[2];
        gyro[1] = -gyro[1];
        gyro[2] = -gyro[2];
    }

    gp.accel = accel;
    gp.gyro = gyro;
}

/// Decode a 0x30 full report into a fresh gamepad snapshot.
///
/// `imu_enabled` gates the IMU tail: three samples follow the button block
/// and the last (most recent) one is taken.
pub fn decode_full_report(
    report: &[u8],
    cal: &Calibration,
    controller_type: ControllerType,
    imu_enabled: bool,
    ctl: &mut Controller,
) -> Result<(), ReportError> {
    // id, timer, bat_con, then the 10-byte button block.
    if report.len() < 13 {
        return Err(ReportError::malformed(FAMILY, report.len(), 13));
    }
    let buttons_right = report[3];
    let buttons_misc = report[4];
    let buttons_left = report[5];
    let stick_left = &report[6..9];
    let stick_right = &report[9..12];

    let mut gp = Gamepad::default();

    match controller_type {
        ControllerType::Pro | ControllerType::Snes => {
            gp.set_button(button::X, buttons_right & 0x01 != 0); // Y
            gp.set_button(button::Y, buttons_right & 0x02 != 0); // X
            gp.set_button(button::A, buttons_right & 0x04 != 0); // B
            gp.set_button(button::B, buttons_right & 0x08 != 0); // A
            gp.set_button(button::SHOULDER_R, buttons_right & 0x40 != 0);
            gp.set_button(button::TRIGGER_R, buttons_right & 0x80 != 0);

            if buttons_left & 0x01 != 0 {
                gp.dpad |= DPAD_DOWN;
            }
            if buttons_left & 0x02 != 0 {
                gp.dpad |= DPAD_UP;
            }
            if buttons_left & 0x04 != 0 {
                gp.dpad |= DPAD_RIGHT;
            }
            if buttons_left & 0x08 != 0 {
                gp.dpad |= DPAD_LEFT;
            }
            gp.set_button(button::SHOULDER_L, buttons_left & 0x40 != 0);
            gp.set_button(button::TRIGGER_L, buttons_left & 0x80 != 0);

            gp.set_misc(misc_button::SELECT, buttons_misc & 0x01 != 0); // -
            gp.set_misc(misc_button::START, buttons_misc & 0x02 != 0); // +
            gp.set_misc(misc_button::SYSTEM, buttons_misc & 0x10 != 0); // Home
            gp.set_misc(misc_button::CAPTURE, buttons_misc & 0x20 != 0);

            // SNES model has no sticks.
            if controller_type == ControllerType::Pro {
                gp.set_button(button::THUMB_R, buttons_misc & 0x04 != 0);
                gp.set_button(button::THUMB_L, buttons_misc & 0x08 != 0);

                let (lx, ly) = stick_12bit(stick_left);
                gp.axis_x = calibrate_axis(lx, cal.x);
                gp.axis_y = -calibrate_axis(ly, cal.y);
                let (rx, ry) = stick_12bit(stick_right);
                gp.axis_rx = calibrate_axis(rx, cal.rx);
                gp.axis_ry = -calibrate_axis(ry, cal.ry);
            }
        }
        ControllerType::JoyconLeft => {
            // Sideways orientation: the stick and face buttons are rotated.
            let (lx, ly) = stick_12bit(stick_left);
            gp.axis_y = -calibrate_axis(lx, cal.x);
            gp.axis_x = -calibrate_axis(ly, cal.y);

            gp.set_button(button::B, buttons_left & 0x01 != 0);
            gp.set_button(button::X, buttons_left & 0x02 != 0);
            gp.set_button(button::Y, buttons_left & 0x04 != 0);
            gp.set_button(button::A, buttons_left & 0x08 != 0);
            gp.set_button(button::SHOULDER_R, buttons_left & 0x10 != 0); // SR
            gp.set_button(button::SHOULDER_L, buttons_left & 0x20 != 0); // SL
            gp.set_button(button::TRIGGER_L, buttons_left & 0x40 != 0); // L
            gp.set_button(button::TRIGGER_R, buttons_left & 0x80 != 0); // ZL
            gp.set_button(button::THUMB_L, buttons_misc & 0x08 != 0);

            gp.set_misc(misc_button::SELECT, buttons_misc & 0x01 != 0); // -
            gp.set_misc(misc_button::START, buttons_misc & 0x20 != 0); // Capture
        }
        ControllerType::JoyconRight => {
            let (rx, ry) = stick_12bit(stick_right);
            gp.axis_y = calibrate_axis(rx, cal.rx);
            gp.axis_x = calibrate_axis(ry, cal.ry);

            gp.set_button(button::Y, buttons_right & 0x01 != 0);
            gp.set_button(button::B, buttons_right & 0x02 != 0);
            gp.set_button(button::X, buttons_right & 0x04 != 0);
            gp.set_button(button::A, buttons_right & 0x08 != 0);
            gp.set_button(button::SHOULDER_R, buttons_right & 0x10 != 0); // SR
            gp.set_button(button::SHOULDER_L, buttons_right & 0x20 != 0); // SL
            gp.set_button(button::TRIGGER_L, buttons_right & 0x40 != 0); // R
            gp.set_button(button::TRIGGER_R, buttons_right & 0x80 != 0); // ZR
            gp.set_button(button::THUMB_L, buttons_misc & 0x04 != 0);

            gp.set_misc(misc_button::SELECT, buttons_misc & 0x10 != 0); // Home
            gp.set_misc(misc_button::START, buttons_misc & 0x02 != 0); // +
        }
    }

    // Three IMU samples follow the button block; take the most recent.
    if imu_enabled && report.len() >= 49 {
        parse_imu_sample(&report[37..49], cal, controller_type, &mut gp);
    }

    if let Some(out) = ctl.gamepad_mut() {
        *out = gp;
    }
    Ok(())
}

/// Decode a 0x3f simple button event into a fresh gamepad snapshot.
pub fn decode_button_event(report: &[u8], ctl: &mut Controller) -> Result<(), ReportError> {
    if report.len() < 12 {
        return Err(ReportError::malformed(FAMILY, report.len(), 12));
    }
    let main = report[1];
    let aux = report[2];
    let hat = report[3];

    let mut gp = Gamepad::default();
    gp.set_button(button::A, main & 0x01 != 0); // B
    gp.set_button(button::B, main & 0x02 != 0); // A
    gp.set_button(button::X, main & 0x04 != 0); // Y
    gp.set_button(button::Y, main & 0x08 != 0); // X
    gp.set_button(button::SHOULDER_L, main & 0x10 != 0);
    gp.set_button(button::SHOULDER_R, main & 0x20 != 0);
    gp.set_button(button::TRIGGER_L, main & 0x40 != 0);
    gp.set_button(button::TRIGGER_R, main & 0x80 != 0);

    gp.set_misc(misc_button::SELECT, aux & 0x01 != 0); // -
    gp.set_misc(misc_button::START, aux & 0x02 != 0); // +
    gp.set_button(button::THUMB_L, aux & 0x04 != 0);
    gp.set_button(button::THUMB_R, aux & 0x08 != 0);
    gp.set_misc(misc_button::SYSTEM, aux & 0x10 != 0); // Home
    gp.set_misc(misc_button::CAPTURE, aux & 0x20 != 0);

    gp.dpad = hat_to_dpad(hat);

    let half = AXIS_NORMALIZE_RANGE / 2;
    let axis16 = |lsb: u8, msb: u8| -> i32 {
        (i32::from(msb) << 8 | i32::from(lsb)) * AXIS_NORMALIZE_RANGE / 65536 - half
    };
    gp.axis_x = axis16(report[4], report[5]);
    gp.axis_y = axis16(report[6], report[7]);
    gp.axis_rx = axis16(report[8], report[9]);
    gp.axis_ry = axis16(report[10], report[11]);

    if let Some(out) = ctl.gamepad_mut() {
        *out = gp;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn calibrate_axis_center_is_zero() {
        let cal = StickCal::default();
        assert_eq!(calibrate_axis(cal.center, cal), 0);
        assert_eq!(calibrate_axis(cal.max, cal), 512);
        assert_eq!(calibrate_axis(cal.min, cal), -512);
    }

    #[test]
    fn calibrate_axis_clamps_outside_range() {
        let cal = StickCal::default();
        assert_eq!(calibrate_axis(4095, cal), 512);
        assert_eq!(calibrate_axis(0, cal), -512);
    }

    #[test]
    fn battery_levels_follow_anchor_points() {
        assert_eq!(battery_level(0 << 5), Some(BATTERY_EMPTY));
        assert_eq!(battery_level(2 << 5), Some(128));
        assert_eq!(battery_level(4 << 5), Some(BATTERY_FULL));
        assert_eq!(battery_level(7 << 5), None);
    }

    #[test]
    fn stick_cal_left_field_order() {
        // max = (0x100, 0x200), center = (0x800, 0x800), min = (0x300, 0x100)
        let data = [
            0x00, 0x01, 0x20, // max: x=0x100, y=0x200
            0x00, 0x08, 0x80, // center: x=0x800, y=0x800
            0x00, 0x03, 0x10, // min: x=0x300, y=0x100
        ];
        let (x, y) = parse_stick_calibration(&data, true).unwrap();
        assert_eq!(x, StickCal { min: 0x500, center: 0x800, max: 0x900 });
        assert_eq!(y, StickCal { min: 0x700, center: 0x800, max: 0xa00 });
    }

    #[test]
    fn stick_cal_right_field_order() {
        let data = [
            0x00, 0x08, 0x80, // center
            0x00, 0x03, 0x10, // min offsets
            0x00, 0x01, 0x20, // max offsets
        ];
        let (x, y) = parse_stick_calibration(&data, false).unwrap();
        assert_eq!(x.center, 0x800);
        assert_eq!(x.min, 0x800 - 0x300);
        assert_eq!(x.max, 0x800 + 0x100);
        assert_eq!(y.max, 0x800 + 0x200);
    }

    #[test]
    fn stick_cal_short_data_is_rejected() {
        assert!(parse_stick_calibration(&[0u8; 8], true).is_none());
    }

    #[test]
    fn all_zero_stick_cal_is_rejected() {
        // Clone pads answer SPI calibration reads with zero-filled blocks;
        // accepting them would collapse the ranges `calibrate_axis` divides
        // by.
        assert!(parse_stick_calibration(&[0u8; 9], true).is_none());
        assert!(parse_stick_calibration(&[0u8; 9], false).is_none());
    }

    #[test]
    fn flat_calibration_saturates_instead_of_panicking() {
        let flat = StickCal {
            min: 0,
            center: 0,
            max: 0,
        };
        assert!(flat.is_degenerate());
        assert_eq!(calibrate_axis(100, flat), 512);
        assert_eq!(calibrate_axis(-100, flat), -512);
        assert_eq!(calibrate_axis(0, flat), 0);
    }

    #[test]
    fn full_report_pro_buttons_and_sticks() {
        let mut report = vec![0u8; 49];
        report[0] = 0x30;
        report[3] = 0x08 | 0x40; // A + R
        report[4] = 0x10; // Home
        report[5] = 0x02; // dpad up
        // Left stick at center (0x800, 0x800)
        report[6] = 0x00;
        report[7] = 0x08;
        report[8] = 0x80;
        report[9] = 0x00;
        report[10] = 0x08;
        report[11] = 0x80;

        let mut ctl = Controller::gamepad();
        decode_full_report(
            &report,
            &Calibration::default(),
            ControllerType::Pro,
            false,
            &mut ctl,
        )
        .unwrap();
        let gp = ctl.gamepad_mut().unwrap();
        assert!(gp.is_pressed(button::B)); // physical A -> canonical B
        assert!(gp.is_pressed(button::SHOULDER_R));
        assert_eq!(gp.misc_buttons, misc_button::SYSTEM);
        assert_eq!(gp.dpad, DPAD_UP);
        assert_eq!(gp.axis_x, 0);
        assert_eq!(gp.axis_y, 0);
    }

    #[test]
    fn snes_ignores_sticks() {
        let mut report = vec![0u8; 13];
        report[0] = 0x30;
        report[6] = 0xff; // garbage stick bytes
        report[7] = 0xff;
        let mut ctl = Controller::gamepad();
        decode_full_report(
            &report,
            &Calibration::default(),
            ControllerType::Snes,
            false,
            &mut ctl,
        )
        .unwrap();
        assert_eq!(ctl.gamepad_mut().unwrap().axis_x, 0);
    }

    #[test]
    fn button_event_axes_are_centered_u16() {
        let mut report = vec![0u8; 12];
        report[0] = 0x3f;
        report[3] = 0x08; // hat released
        report[4] = 0x00;
        report[5] = 0x80; // x = 0x8000
        let mut ctl = Controller::gamepad();
        decode_button_event(&report, &mut ctl).unwrap();
        let gp = ctl.gamepad_mut().unwrap();
        assert_eq!(gp.axis_x, 0);
        assert_eq!(gp.axis_y, -512);
        assert_eq!(gp.dpad, 0);
    }

    #[test]
    fn imu_sample_uses_latest_of_three() {
        let mut report = vec![0u8; 49];
        report[0] = 0x30;
        // Third sample: accel x = 100, gyro x = offset (zero rate)
        report[37..39].copy_from_slice(&100i16.to_le_bytes());
        let mut ctl = Controller::gamepad();
        decode_full_report(
            &report,
            &Calibration::default(),
            ControllerType::Pro,
            true,
            &mut ctl,
        )
        .unwrap();
        let gp = ctl.gamepad_mut().unwrap();
        // 100 * 16384 / 16384
        assert_eq!(gp.accel[0], 100);
        assert_eq!(gp.gyro, [0, 0, 0]);
    }

    #[test]
    fn right_joycon_negates_imu_y_z() {
        let mut report = vec![0u8; 49];
        report[0] = 0x30;
        report[39..41].copy_from_slice(&50i16.to_le_bytes()); // accel y
        let mut ctl = Controller::gamepad();
        decode_full_report(
            &report,
            &Calibration::default(),
            ControllerType::JoyconRight,
            true,
            &mut ctl,
        )
        .unwrap();
        assert_eq!(ctl.gamepad_mut().unwrap().accel[1], -50);
    }

    proptest! {
        #[test]
        fn calibrated_axis_stays_in_range(v in 0i32..4096) {
            let out = calibrate_axis(v, StickCal::default());
            prop_assert!((-512..=512).contains(&out));
        }
    }
}
