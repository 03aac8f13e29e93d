//! Decoding shared by the DualShock 4 and the DualSense.
//!
//! Both generations use the same 8-bit stick encoding, the same three
//! button bytes and the same motion-sensor calibration scheme, lifted from
//! the Linux `hid-playstation` driver.

use padhost_controller_types::gamepad::{Gamepad, button, misc_button};
use padhost_hid_common::normalize::hat_to_dpad;

/// Accelerometer resolution, units per g.
pub const ACC_RES_PER_G: i32 = 8192;
/// Accelerometer range when calibration is unavailable.
pub const ACC_RANGE: i32 = 4 * ACC_RES_PER_G;
/// Gyroscope resolution, units per degree/s.
pub const GYRO_RES_PER_DEG_S: i32 = 1024;
/// Gyroscope range when calibration is unavailable.
pub const GYRO_RANGE: i32 = 2048 * GYRO_RES_PER_DEG_S;

/// Calibration for one motion-sensor axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCalibration {
    /// Raw value at rest.
    pub bias: i16,
    /// Sensitivity numerator.
    pub sens_numer: i32,
    /// Sensitivity denominator.
    pub sens_denom: i32,
}

impl AxisCalibration {
    /// Identity gyro calibration: raw `i16` maps onto the full range.
    pub fn gyro_default() -> Self {
        AxisCalibration {
            bias: 0,
            sens_numer: GYRO_RANGE,
            sens_denom: i32::from(i16::MAX),
        }
    }

    /// Identity accelerometer calibration.
    pub fn accel_default() -> Self {
        AxisCalibration {
            bias: 0,
            sens_numer: ACC_RANGE,
            sens_denom: i32::from(i16::MAX),
        }
    }

    /// Apply the calibration to one raw sample.
    pub fn apply(&self, raw: i16) -> i32 {
        mult_frac(
            self.sens_numer,
            i32::from(raw) - i32::from(self.bias),
            self.sens_denom,
        )
    }
}

/// Gyro and accelerometer calibration for all six axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCalibration {
    /// Pitch, yaw, roll.
    pub gyro: [AxisCalibration; 3],
    /// X, Y, Z.
    pub accel: [AxisCalibration; 3],
}

impl Default for SensorCalibration {
    fn default() -> Self {
        SensorCalibration {
            gyro: [AxisCalibration::gyro_default(); 3],
            accel: [AxisCalibration::accel_default(); 3],
        }
    }
}

/// Raw values from the calibration feature report, before normalization.
///
/// The DS4 and DualSense store the same fields in a different order; each
/// family codec fills this in and the math below is shared.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCalibration {
    /// Gyro bias per axis (pitch, yaw, roll).
    pub gyro_bias: [i16; 3],
    /// Gyro reading at +range per axis.
    pub gyro_plus: [i16; 3],
    /// Gyro reading at -range per axis.
    pub gyro_minus: [i16; 3],
    /// Gyro speed calibration points.
    pub gyro_speed_plus: i16,
    /// Gyro speed calibration points.
    pub gyro_speed_minus: i16,
    /// Accelerometer reading at +1g per axis.
    pub acc_plus: [i16; 3],
    /// Accelerometer reading at -1g per axis.
    pub acc_minus: [i16; 3],
}

impl RawCalibration {
    /// Normalize into per-axis sensitivities.
    ///
    /// A zero denominator (clones, broken units) falls back to the identity
    /// calibration for that axis so report handling cannot divide by zero.
    pub fn normalize(&self) -> SensorCalibration {
        let mut out = SensorCalibration::default();

        let speed_2x = i32::from(self.gyro_speed_plus) + i32::from(self.gyro_speed_minus);
        for i in 0..3 {
            // The pitch axis measures the minus point with the bias added;
            // yaw and roll subtract it on both sides.
            let minus_bias = if i == 0 {
                i32::from(self.gyro_minus[i]) + i32::from(self.gyro_bias[i])
            } else {
                i32::from(self.gyro_minus[i]) - i32::from(self.gyro_bias[i])
            };
            let denom = (i32::from(self.gyro_plus[i]) - i32::from(self.gyro_bias[i])).abs()
                + minus_bias.abs();
            if denom != 0 {
                out.gyro[i] = AxisCalibration {
                    bias: 0,
                    sens_numer: speed_2x * GYRO_RES_PER_DEG_S,
                    sens_denom: denom,
                };
            }
        }

        for i in 0..3 {
            let range_2g = i32::from(self.acc_plus[i]) - i32::from(self.acc_minus[i]);
            if range_2g != 0 {
                out.accel[i] = AxisCalibration {
                    bias: (i32::from(self.acc_plus[i]) - range_2g / 2) as i16,
                    sens_numer: 2 * ACC_RES_PER_G,
                    sens_denom: range_2g,
                };
            }
        }
        out
    }
}

/// Overflow-safe `x * numer / denom`.
pub fn mult_frac(numer: i32, x: i32, denom: i32) -> i32 {
    let quot = i64::from(numer) * i64::from(x) / i64::from(denom);
    quot as i32
}

/// Decode the three Sony button bytes shared by both generations.
///
/// `capture` selects whether `buttons[2]` bit 2 maps to the capture/mute
/// button (DualSense only).
pub fn decode_buttons(bytes: [u8; 3], capture: bool, gp: &mut Gamepad) {
    let hat = bytes[0] & 0x0f;
    gp.dpad = hat_to_dpad(if hat > 7 { 0xff } else { hat });

    gp.set_button(button::X, bytes[0] & 0x10 != 0); // West
    gp.set_button(button::A, bytes[0] & 0x20 != 0); // South
    gp.set_button(button::B, bytes[0] & 0x40 != 0); // East
    gp.set_button(button::Y, bytes[0] & 0x80 != 0); // North

    gp.set_button(button::SHOULDER_L, bytes[1] & 0x01 != 0); // L1
    gp.set_button(button::SHOULDER_R, bytes[1] & 0x02 != 0); // R1
    gp.set_button(button::TRIGGER_L, bytes[1] & 0x04 != 0); // L2
    gp.set_button(button::TRIGGER_R, bytes[1] & 0x08 != 0); // R2
    gp.set_misc(misc_button::SELECT, bytes[1] & 0x10 != 0); // Share / Create
    gp.set_misc(misc_button::START, bytes[1] & 0x20 != 0); // Options
    gp.set_button(button::THUMB_L, bytes[1] & 0x40 != 0);
    gp.set_button(button::THUMB_R, bytes[1] & 0x80 != 0);

    gp.set_misc(misc_button::SYSTEM, bytes[2] & 0x01 != 0); // PS
    if capture {
        gp.set_misc(misc_button::CAPTURE, bytes[2] & 0x04 != 0); // Mute
    }
}

/// Center an 8-bit stick sample onto `-508..=512`.
pub fn center_stick(v: u8) -> i32 {
    (i32::from(v) - 127) * 4
}

/// Scale an 8-bit trigger onto `0..=1020`.
pub fn scale_trigger(v: u8) -> i32 {
    i32::from(v) * 4
}

/// Battery capacity nibble (0..=10) onto the 1..=255 anchor scale.
pub fn battery_capacity(status: u8) -> u8 {
    let level = u16::from(status & 0x0f) * 25 + 1;
    level.min(255) as u8
}
