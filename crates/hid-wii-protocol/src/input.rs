//! DRM input report decoding and Balance Board calibration.
//!
//! Bit layouts come from wiibrew.org and the Linux `hid-wiimote-modules`
//! driver. Every decoder starts from a zeroed snapshot; each report carries
//! full state.

use padhost_controller_types::gamepad::{Gamepad, button, misc_button};
use padhost_controller_types::{BATTERY_EMPTY, BalanceBoard};
use padhost_errors::report::ReportError;
use padhost_hid_common::normalize::{
    AXIS_NORMALIZE_RANGE, DPAD_DOWN, DPAD_LEFT, DPAD_RIGHT, DPAD_UP,
};

use crate::ids::WiiMode;

const FAMILY: &str = "wii";

/// Core buttons (DRM 0x30).
///
/// Horizontal mode rotates the dpad a quarter turn and puts "1"/"2" where
/// the face buttons sit on a sideways remote.
pub fn decode_drm_k(report: &[u8], mode: WiiMode, gp: &mut Gamepad) -> Result<(), ReportError> {
    if report.len() < 3 {
        return Err(ReportError::malformed(FAMILY, report.len(), 3));
    }
    let data = &report[1..];
    match mode {
        WiiMode::Horizontal => {
            gp.dpad |= if data[0] & 0x01 != 0 { DPAD_DOWN } else { 0 };
            gp.dpad |= if data[0] & 0x02 != 0 { DPAD_UP } else { 0 };
            gp.dpad |= if data[0] & 0x04 != 0 { DPAD_RIGHT } else { 0 };
            gp.dpad |= if data[0] & 0x08 != 0 { DPAD_LEFT } else { 0 };

            gp.set_button(button::Y, data[1] & 0x04 != 0); // shoulder "B"
            gp.set_button(button::X, data[1] & 0x08 != 0); // big "A"
            gp.set_button(button::A, data[1] & 0x02 != 0); // "1"
            gp.set_button(button::B, data[1] & 0x01 != 0); // "2"
        }
        WiiMode::Vertical | WiiMode::Accel => {
            gp.dpad |= if data[0] & 0x01 != 0 { DPAD_LEFT } else { 0 };
            gp.dpad |= if data[0] & 0x02 != 0 { DPAD_RIGHT } else { 0 };
            gp.dpad |= if data[0] & 0x04 != 0 { DPAD_DOWN } else { 0 };
            gp.dpad |= if data[0] & 0x08 != 0 { DPAD_UP } else { 0 };

            gp.set_button(button::A, data[1] & 0x04 != 0); // shoulder "B"
            gp.set_button(button::B, data[1] & 0x08 != 0); // big "A"
            gp.set_button(button::X, data[1] & 0x02 != 0); // "1"
            gp.set_button(button::Y, data[1] & 0x01 != 0); // "2"
        }
    }
    decode_core_misc(data[0], data[1], gp);
    Ok(())
}

fn decode_core_misc(b0: u8, b1: u8, gp: &mut Gamepad) {
    gp.set_misc(misc_button::SYSTEM, b1 & 0x80 != 0); // home
    gp.set_misc(misc_button::START, b0 & 0x10 != 0); // "+"
    gp.set_misc(misc_button::SELECT, b1 & 0x10 != 0); // "-"
}

/// Core buttons + accelerometer (DRM 0x31).
///
/// The low accelerometer bits ride in the unused button bits.
pub fn decode_drm_ka(report: &[u8], gp: &mut Gamepad) -> Result<(), ReportError> {
    if report.len() < 6 {
        return Err(ReportError::malformed(FAMILY, report.len(), 6));
    }
    let x = (u16::from(report[3]) << 2) | (u16::from(report[1] >> 5) & 0x3);
    let y = (u16::from(report[4]) << 2) | (u16::from(report[2] >> 4) & 0x2);
    let z = (u16::from(report[5]) << 2) | (u16::from(report[2] >> 5) & 0x2);

    gp.accel[0] = i32::from(x) - 0x200;
    gp.accel[1] = i32::from(y) - 0x200;
    gp.accel[2] = i32::from(z) - 0x200;

    // Dpad keeps working as a dpad, useful for menus.
    gp.dpad |= if report[1] & 0x01 != 0 { DPAD_DOWN } else { 0 };
    gp.dpad |= if report[1] & 0x02 != 0 { DPAD_UP } else { 0 };
    gp.dpad |= if report[1] & 0x04 != 0 { DPAD_RIGHT } else { 0 };
    gp.dpad |= if report[1] & 0x08 != 0 { DPAD_LEFT } else { 0 };

    gp.set_button(button::A, report[2] & 0x02 != 0); // "1"
    gp.set_button(button::B, report[2] & 0x01 != 0); // "2"
    gp.set_button(button::X, report[2] & 0x08 != 0); // big "A"
    gp.set_button(button::Y, report[2] & 0x04 != 0); // shoulder

    decode_core_misc(report[1], report[2], gp);
    Ok(())
}

/// Nunchuk extension bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nunchuk {
    /// Stick X, centered.
    pub sx: i32,
    /// Stick Y, centered and inverted to match the virtual gamepad.
    pub sy: i32,
    /// Accelerometer, centered 10-bit.
    pub accel: [i32; 3],
    /// Button C.
    pub bc: bool,
    /// Button Z.
    pub bz: bool,
}

/// Decode the 6 Nunchuk extension bytes.
pub fn decode_nunchuk(e: &[u8]) -> Result<Nunchuk, ReportError> {
    if e.len() < 6 {
        return Err(ReportError::malformed(FAMILY, e.len(), 6));
    }
    let half = AXIS_NORMALIZE_RANGE / 2;
    let ax = (i32::from(e[2]) << 2) | i32::from((e[5] & 0b0000_1100) >> 2);
    let ay = (i32::from(e[3]) << 2) | i32::from((e[5] & 0b0011_0000) >> 4);
    let az = (i32::from(e[4]) << 2) | i32::from((e[5] & 0b1100_0000) >> 6);
    Ok(Nunchuk {
        sx: i32::from(e[0]) - 0x80,
        sy: -(i32::from(e[1]) - 0x80),
        accel: [ax - half, ay - half, az - half],
        bc: e[5] & 0b10 == 0,
        bz: e[5] & 0b01 == 0,
    })
}

/// Core buttons + Nunchuk (DRM 0x32).
///
/// The Nunchuk stick lands on the right axis pair so the remote dpad keeps
/// the left side; C and Z become X and Y.
pub fn decode_drm_ke(report: &[u8], gp: &mut Gamepad) -> Result<(), ReportError> {
    if report.len() < 11 {
        return Err(ReportError::malformed(FAMILY, report.len(), 11));
    }
    let n = decode_nunchuk(&report[3..])?;
    let factor = (AXIS_NORMALIZE_RANGE / 2) / 128;
    gp.axis_rx = n.sx * factor;
    gp.axis_ry = n.sy * factor;
    gp.set_button(button::X, n.bc);
    gp.set_button(button::Y, n.bz);

    // Remote core, vertical orientation.
    gp.dpad |= if report[1] & 0x01 != 0 { DPAD_LEFT } else { 0 };
    gp.dpad |= if report[1] & 0x02 != 0 { DPAD_RIGHT } else { 0 };
    gp.dpad |= if report[1] & 0x04 != 0 { DPAD_DOWN } else { 0 };
    gp.dpad |= if report[1] & 0x08 != 0 { DPAD_UP } else { 0 };

    gp.set_button(button::A, report[2] & 0x04 != 0); // shoulder "B"
    gp.set_button(button::B, report[2] & 0x08 != 0); // big "A"
    gp.set_button(button::SHOULDER_L, report[2] & 0x02 != 0); // "1"
    gp.set_button(button::SHOULDER_R, report[2] & 0x01 != 0); // "2"

    decode_core_misc(report[1], report[2], gp);
    Ok(())
}

/// Wii U Pro extension bytes (DRM 0x34), buttons low-active.
///
/// Face buttons are swapped into the canonical layout (Nintendo A is east)
/// and the Y axes inverted. Returns the battery level.
pub fn decode_drm_kee_pro(report: &[u8], gp: &mut Gamepad) -> Result<u8, ReportError> {
    if report.len() < 14 {
        return Err(ReportError::malformed(FAMILY, report.len(), 14));
    }
    let data = &report[3..];

    let axis = |lo: u8, hi: u8| i32::from(lo) + (i32::from(hi & 0x0f) << 8) - 0x800;
    // 12-bit resolution on the wire, but the hardware tops out near 1280.
    let scale = |v: i32| v * 512 / 1280;
    let lx = scale(axis(data[0], data[1]));
    let rx = scale(axis(data[2], data[3]));
    let ly = scale(axis(data[4], data[5]));
    let ry = scale(axis(data[6], data[7]));

    gp.axis_x = lx;
    gp.axis_y = -ly;
    gp.axis_rx = rx;
    gp.axis_ry = -ry;

    gp.dpad |= if data[8] & 0x80 == 0 { DPAD_RIGHT } else { 0 };
    gp.dpad |= if data[8] & 0x40 == 0 { DPAD_DOWN } else { 0 };
    gp.dpad |= if data[9] & 0x02 == 0 { DPAD_LEFT } else { 0 };
    gp.dpad |= if data[9] & 0x01 == 0 { DPAD_UP } else { 0 };

    gp.set_button(button::B, data[9] & 0x10 == 0); // BA
    gp.set_button(button::A, data[9] & 0x40 == 0); // BB
    gp.set_button(button::Y, data[9] & 0x08 == 0); // BX
    gp.set_button(button::X, data[9] & 0x20 == 0); // BY
    gp.set_button(button::TRIGGER_L, data[9] & 0x80 == 0); // BZL
    gp.set_button(button::TRIGGER_R, data[9] & 0x04 == 0); // BZR
    gp.set_button(button::SHOULDER_L, data[8] & 0x20 == 0); // BLT
    gp.set_button(button::SHOULDER_R, data[8] & 0x02 == 0); // BRT
    gp.set_button(button::THUMB_L, data[10] & 0x02 == 0);
    gp.set_button(button::THUMB_R, data[10] & 0x01 == 0);

    gp.set_misc(misc_button::SYSTEM, data[8] & 0x08 == 0); // home
    gp.set_misc(misc_button::START, data[8] & 0x04 == 0); // "+"
    gp.set_misc(misc_button::SELECT, data[8] & 0x10 == 0); // "-"

    // Battery rides in bits 4..=6; keep the masked-but-unshifted scaling.
    let bat = (i32::from(data[10] & 0x70) * 4 - 1).clamp(i32::from(BATTERY_EMPTY), 255);
    Ok(bat as u8)
}

/// Calibration points for one Balance Board load level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardPoints {
    /// Top-right sensor.
    pub tr: u16,
    /// Bottom-right sensor.
    pub br: u16,
    /// Top-left sensor.
    pub tl: u16,
    /// Bottom-left sensor.
    pub bl: u16,
}

impl BoardPoints {
    /// Parse four big-endian sensor values.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        let [a, b, c, d, e, f, g, h] = *bytes.first_chunk::<8>()?;
        Some(BoardPoints {
            tr: u16::from_be_bytes([a, b]),
            br: u16::from_be_bytes([c, d]),
            tl: u16::from_be_bytes([e, f]),
            bl: u16::from_be_bytes([g, h]),
        })
    }
}

/// Balance Board calibration: readings at 0, 17 and 34 kg per sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardCalibration {
    /// Unloaded reading.
    pub kg0: BoardPoints,
    /// Reading at 17 kg.
    pub kg17: BoardPoints,
    /// Reading at 34 kg.
    pub kg34: BoardPoints,
}

/// Piecewise-linear interpolation of one sensor reading into grams.
///
/// The sensors read a little past 34 kg in practice, so the top segment is
/// extrapolated rather than capped. The calibration points come off the
/// board unvalidated; spans are computed in `i32` and floored at 1 so a
/// non-monotonic or constant block cannot divide by zero.
pub fn balance_interpolate(val: u16, kg0: u16, kg17: u16, kg34: u16) -> i32 {
    let weight = if val < kg0 {
        0.0
    } else if val < kg17 {
        let span = (i32::from(kg17) - i32::from(kg0)).max(1);
        17.0 * (i32::from(val) - i32::from(kg0)) as f32 / span as f32
    } else {
        let span = (i32::from(kg34) - i32::from(kg17)).max(1);
        17.0 + 17.0 * (i32::from(val) - i32::from(kg17)) as f32 / span as f32
    };
    (weight * 1000.0) as i32
}

/// Balance Board extension bytes (DRM 0x34). Returns the snapshot and the
/// battery level.
pub fn decode_drm_kee_board(
    report: &[u8],
    cal: &BoardCalibration,
) -> Result<(BalanceBoard, u8), ReportError> {
    if report.len() < 14 {
        return Err(ReportError::malformed(FAMILY, report.len(), 14));
    }
    let e = &report[3..];
    let raw = BoardPoints::from_wire(e).ok_or(ReportError::malformed(FAMILY, e.len(), 8))?;

    let board = BalanceBoard {
        tr: balance_interpolate(raw.tr, cal.kg0.tr, cal.kg17.tr, cal.kg34.tr),
        br: balance_interpolate(raw.br, cal.kg0.br, cal.kg17.br, cal.kg34.br),
        tl: balance_interpolate(raw.tl, cal.kg0.tl, cal.kg17.tl, cal.kg34.tl),
        bl: balance_interpolate(raw.bl, cal.kg0.bl, cal.kg17.bl, cal.kg34.bl),
        temperature: i32::from(e[8]),
    };

    // Raw battery runs 0x69 (empty) to 0x82 (full).
    let batt = match e[10] {
        0x82.. => 255,
        0x7d.. => 192,
        0x78.. => 128,
        0x6a.. => 64,
        _ => 0,
    };
    Ok((board, batt.max(BATTERY_EMPTY)))
}

/// Classic Controller extension bytes (DRM 0x3d), buttons low-active.
pub fn decode_drm_e(report: &[u8], gp: &mut Gamepad) -> Result<(), ReportError> {
    if report.len() < 22 {
        return Err(ReportError::malformed(FAMILY, report.len(), 22));
    }
    let data = &report[1..];

    // Left stick has 6 bits, right stick 5, right X scattered over three
    // fields.
    let lx = i32::from(data[0] & 0b0011_1111) - 32;
    let ly = i32::from(data[1] & 0b0011_1111) - 32;
    let rx = i32::from(
        (data[0] & 0b1100_0000) >> 3 | (data[1] & 0b1100_0000) >> 5 | (data[0] & 0b1000_0000) >> 7,
    ) - 16;
    let ry = i32::from(data[2] & 0b0001_1111) - 16;

    gp.axis_x = lx * (AXIS_NORMALIZE_RANGE / 2 / 32);
    gp.axis_y = -ly * (AXIS_NORMALIZE_RANGE / 2 / 32);
    gp.axis_rx = rx * (AXIS_NORMALIZE_RANGE / 2 / 16);
    gp.axis_ry = -ry * (AXIS_NORMALIZE_RANGE / 2 / 16);

    let lt = i32::from((data[2] & 0b0110_0000) >> 2 | (data[3] & 0b1110_0000) >> 5);
    let rt = i32::from(data[3] & 0b0001_1111);
    gp.brake = lt * (AXIS_NORMALIZE_RANGE / 32);
    gp.throttle = rt * (AXIS_NORMALIZE_RANGE / 32);

    gp.dpad |= if data[4] & 0b1000_0000 == 0 { DPAD_RIGHT } else { 0 };
    gp.dpad |= if data[4] & 0b0100_0000 == 0 { DPAD_DOWN } else { 0 };
    gp.dpad |= if data[5] & 0b0000_0001 == 0 { DPAD_UP } else { 0 };
    gp.dpad |= if data[5] & 0b0000_0010 == 0 { DPAD_LEFT } else { 0 };

    gp.set_button(button::A, data[5] & 0b0100_0000 == 0);
    gp.set_button(button::B, data[5] & 0b0001_0000 == 0);
    gp.set_button(button::X, data[5] & 0b0010_0000 == 0);
    gp.set_button(button::Y, data[5] & 0b0000_1000 == 0);

    gp.set_button(button::SHOULDER_L, data[4] & 0b0010_0000 == 0); // BLT
    gp.set_button(button::SHOULDER_R, data[4] & 0b0000_0010 == 0); // BRT
    gp.set_button(button::TRIGGER_L, data[5] & 0b1000_0000 == 0); // BZL
    gp.set_button(button::TRIGGER_R, data[5] & 0b0000_0100 == 0); // BZR

    gp.set_misc(misc_button::SYSTEM, data[4] & 0b0000_1000 == 0); // home
    gp.set_misc(misc_button::START, data[4] & 0b0000_0100 == 0); // "+"
    gp.set_misc(misc_button::SELECT, data[4] & 0b0001_0000 == 0); // "-"
    Ok(())
}
