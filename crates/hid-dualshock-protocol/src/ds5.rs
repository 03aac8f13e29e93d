//! DualSense codec.
//!
//! Setup is a three-step feature-report chain (pairing info, firmware
//! version, calibration) followed by one output report that lights the bar
//! and switches the pad into extended 0x31 input reports. Input reports are
//! ignored until the chain completes so calibration math never runs on
//! defaults mid-handshake.

use padhost_controller_types::Controller;
use padhost_errors::report::ReportError;
use padhost_hid_common::crc::append_sony_crc;
use padhost_hid_common::{TRANSACTION_DATA_OUTPUT, TRANSACTION_GET_FEATURE, WireFrame};
use tracing::{debug, warn};

use crate::common::{
    RawCalibration, SensorCalibration, battery_capacity, center_stick, decode_buttons,
    scale_trigger,
};
use crate::touchpad::{TouchPoint, TouchpadTracker};

const FAMILY: &str = "ds5";

/// DualSense product id.
pub const DS5_PID: u16 = 0x0ce6;
/// DualSense Edge product id.
pub const DS5_EDGE_PID: u16 = 0x0df2;

/// Calibration feature report id.
pub const FEATURE_CALIBRATION: u8 = 0x05;
/// Calibration feature report size.
pub const FEATURE_CALIBRATION_SIZE: usize = 41;
/// Pairing info feature report id.
pub const FEATURE_PAIRING_INFO: u8 = 0x09;
/// Pairing info feature report size.
pub const FEATURE_PAIRING_INFO_SIZE: usize = 20;
/// Firmware version feature report id.
pub const FEATURE_FIRMWARE_VERSION: u8 = 0x20;
/// Firmware version feature report size.
pub const FEATURE_FIRMWARE_VERSION_SIZE: usize = 64;

const OUTPUT_REPORT_SIZE: usize = 78;

// valid_flag0 bits.
const FLAG0_COMPATIBLE_VIBRATION: u8 = 1 << 0;
const FLAG0_HAPTICS_SELECT: u8 = 1 << 1;

// valid_flag1 bits.
const FLAG1_LIGHTBAR_CONTROL_ENABLE: u8 = 1 << 2;
const FLAG1_PLAYER_LED_CONTROL_ENABLE: u8 = 1 << 4;

// valid_flag2 bits.
const FLAG2_LIGHTBAR_SETUP_CONTROL_ENABLE: u8 = 1 << 1;
const FLAG2_COMPATIBLE_VIBRATION2: u8 = 1 << 2;

const LIGHTBAR_SETUP_LIGHT_OUT: u8 = 1 << 1;

/// Firmware update version that introduced the "vibration2" rumble mode.
const VIBRATION2_UPDATE_VERSION: u16 = (2 << 8) | 21;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ds5State {
    /// Nothing sent yet.
    Initial,
    /// Waiting for the pairing info reply.
    PairingInfoRequest,
    /// Waiting for the firmware version reply.
    FirmwareVersionRequest,
    /// Waiting for the calibration reply.
    CalibrationRequest,
    /// Extended reports flowing.
    Ready,
}

/// What one feature report produced.
#[derive(Debug, Default)]
pub struct FeatureReaction {
    /// Frames to queue, in order.
    pub frames: Vec<WireFrame>,
    /// The handshake just completed.
    pub ready: bool,
}

/// What one input report produced.
#[derive(Debug, Default)]
pub struct Reaction {
    /// A fresh gamepad snapshot was decoded.
    pub snapshot: bool,
    /// The virtual mouse snapshot changed too.
    pub mouse_snapshot: bool,
}

/// Per-connection DualSense state.
#[derive(Debug)]
pub struct Ds5Device {
    state: Ds5State,
    output_seq: u8,
    product_id: u16,
    hw_version: u32,
    fw_version: u32,
    update_version: u16,
    use_vibration2: bool,
    cal: SensorCalibration,
    touch: TouchpadTracker,
}

impl Ds5Device {
    /// Fresh state; the product id distinguishes the Edge.
    pub fn new(product_id: u16) -> Self {
        Ds5Device {
            state: Ds5State::Initial,
            output_seq: 0,
            product_id,
            hw_version: 0,
            fw_version: 0,
            update_version: 0,
            use_vibration2: false,
            cal: SensorCalibration::default(),
            touch: TouchpadTracker::default(),
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> Ds5State {
        self.state
    }

    /// True once the feature-report chain completed.
    pub fn is_ready(&self) -> bool {
        self.state == Ds5State::Ready
    }

    /// Firmware and hardware versions, once known.
    pub fn versions(&self) -> (u32, u32) {
        (self.fw_version, self.hw_version)
    }

    /// Kick off the handshake with the pairing info request.
    pub fn start(&mut self) -> Vec<WireFrame> {
        self.state = Ds5State::PairingInfoRequest;
        vec![WireFrame::Control(vec![
            TRANSACTION_GET_FEATURE,
            FEATURE_PAIRING_INFO,
        ])]
    }

    /// Feed one GET_REPORT reply from the control channel.
    pub fn process_feature_report(
        &mut self,
        report: &[u8],
    ) -> Result<FeatureReaction, ReportError> {
        let mut r = FeatureReaction::default();
        match report.first().copied() {
            Some(FEATURE_PAIRING_INFO) => {
                if report.len() != FEATURE_PAIRING_INFO_SIZE {
                    warn!(len = report.len(), "ds5: unexpected pairing info size");
                }
                // Nothing is kept from the pairing info; it only sequences
                // the chain the way the stock controller expects.
                self.state = Ds5State::FirmwareVersionRequest;
                r.frames.push(WireFrame::Control(vec![
                    TRANSACTION_GET_FEATURE,
                    FEATURE_FIRMWARE_VERSION,
                ]));
            }
            Some(FEATURE_FIRMWARE_VERSION) => {
                if report.len() != FEATURE_FIRMWARE_VERSION_SIZE {
                    warn!(len = report.len(), "ds5: unexpected firmware version size");
                }
                if report.len() >= 46 {
                    let u32_at = |o: usize| {
                        u32::from_le_bytes([report[o], report[o + 1], report[o + 2], report[o + 3]])
                    };
                    self.hw_version = u32_at(24);
                    self.fw_version = u32_at(28);
                    self.update_version = u16::from_le_bytes([report[44], report[45]]);
                }
                // The Edge and newer regular units rumble through the
                // "vibration2" flag instead of classic-compat mode.
                self.use_vibration2 = self.product_id == DS5_EDGE_PID
                    || self.update_version >= VIBRATION2_UPDATE_VERSION;
                debug!(
                    fw = format_args!("{:#010x}", self.fw_version),
                    hw = format_args!("{:#010x}", self.hw_version),
                    update = format_args!("{:#06x}", self.update_version),
                    vibration2 = self.use_vibration2,
                    "ds5: firmware version"
                );
                self.state = Ds5State::CalibrationRequest;
                r.frames.push(WireFrame::Control(vec![
                    TRANSACTION_GET_FEATURE,
                    FEATURE_CALIBRATION,
                ]));
            }
            Some(FEATURE_CALIBRATION) => {
                if report.len() != FEATURE_CALIBRATION_SIZE {
                    warn!(len = report.len(), "ds5: unexpected calibration size");
                }
                if report.len() >= 35 {
                    self.cal = parse_calibration(report).normalize();
                }
                debug!("ds5: calibration received");
                // Lighting the bar also enables 0x31 input reports.
                r.frames.push(self.enable_lightbar_report());
                self.state = Ds5State::Ready;
                r.ready = true;
            }
            Some(id) => return Err(ReportError::UnexpectedReportId { family: FAMILY, id }),
            None => return Err(ReportError::malformed(FAMILY, 0, 1)),
        }
        Ok(r)
    }

    /// Feed one interrupt-channel input report.
    pub fn process_report(
        &mut self,
        report: &[u8],
        ctl: &mut Controller,
        mouse: Option<&mut Controller>,
    ) -> Result<Reaction, ReportError> {
        // Ignore everything until the handshake is done; early reports
        // would otherwise run against default calibration.
        if self.state != Ds5State::Ready {
            return Ok(Reaction::default());
        }
        match report.first().copied() {
            Some(0x31) => {}
            Some(id) => return Err(ReportError::UnexpectedReportId { family: FAMILY, id }),
            None => return Err(ReportError::malformed(FAMILY, 0, 78)),
        }
        if report.len() != 78 {
            return Err(ReportError::malformed(FAMILY, report.len(), 78));
        }
        let payload = &report[2..];

        if let Some(gp) = ctl.gamepad_mut() {
            *gp = Default::default();
            gp.axis_x = center_stick(payload[0]);
            gp.axis_y = center_stick(payload[1]);
            gp.axis_rx = center_stick(payload[2]);
            gp.axis_ry = center_stick(payload[3]);
            gp.brake = scale_trigger(payload[4]);
            gp.throttle = scale_trigger(payload[5]);
            decode_buttons([payload[7], payload[8], payload[9]], true, gp);

            for i in 0..3 {
                let raw_g = i16::from_le_bytes([payload[15 + i * 2], payload[16 + i * 2]]);
                let raw_a = i16::from_le_bytes([payload[21 + i * 2], payload[22 + i * 2]]);
                gp.gyro[i] = self.cal.gyro[i].apply(raw_g);
                gp.accel[i] = self.cal.accel[i].apply(raw_a);
            }
        }

        ctl.battery = battery_capacity(payload[52]);

        let mut mouse_snapshot = false;
        if let Some(mouse_ctl) = mouse {
            if let Some(m) = mouse_ctl.mouse_mut() {
                let clicked = payload[9] & 0x02 != 0;
                if let Some(point) = TouchPoint::from_wire(&payload[32..36]) {
                    self.touch.update(point, clicked, m);
                    mouse_snapshot = true;
                }
            }
        }

        Ok(Reaction {
            snapshot: true,
            mouse_snapshot,
        })
    }

    fn output_report(&mut self, fill: impl FnOnce(&mut [u8])) -> WireFrame {
        let mut out = vec![0u8; OUTPUT_REPORT_SIZE - 4];
        out[0] = TRANSACTION_DATA_OUTPUT;
        out[1] = 0x31;
        // High nibble is a per-report sequence number.
        out[2] = self.output_seq << 4;
        self.output_seq += 1;
        if self.output_seq == 15 {
            self.output_seq = 0;
        }
        out[3] = 0x10;
        fill(&mut out);
        append_sony_crc(&mut out);
        WireFrame::Interrupt(out)
    }

    fn enable_lightbar_report(&mut self) -> WireFrame {
        self.output_report(|out| {
            out[5] = FLAG1_LIGHTBAR_CONTROL_ENABLE;
            out[42] = FLAG2_LIGHTBAR_SETUP_CONTROL_ENABLE;
            out[45] = LIGHTBAR_SETUP_LIGHT_OUT;
            out[50] = 255; // blue
        })
    }

    /// Set the player LEDs from a 1-based player number.
    ///
    /// The DualSense has five LEDs and shows the player number by symmetry
    /// around the center one.
    pub fn set_player_leds(&mut self, player: u8) -> WireFrame {
        const LED_VALUES: [u8; 5] = [
            0x00,                                      // no player
            1 << 2,                                    // player 1, center
            (1 << 1) | (1 << 3),                       // player 2
            (1 << 0) | (1 << 2) | (1 << 4),            // player 3
            (1 << 0) | (1 << 1) | (1 << 3) | (1 << 4), // player 4
        ];
        let leds = LED_VALUES[usize::from(player) % LED_VALUES.len()];
        self.output_report(|out| {
            out[5] = FLAG1_PLAYER_LED_CONTROL_ENABLE;
            out[47] = leds;
        })
    }

    /// Set the lightbar color.
    pub fn set_lightbar_color(&mut self, r: u8, g: u8, b: u8) -> WireFrame {
        self.output_report(|out| {
            out[5] = FLAG1_LIGHTBAR_CONTROL_ENABLE;
            out[48] = r;
            out[49] = g;
            out[50] = b;
        })
    }

    /// Frame to start both rumble motors.
    pub fn rumble_start(&mut self, weak_magnitude: u8, strong_magnitude: u8) -> WireFrame {
        let vibration2 = self.use_vibration2;
        self.output_report(|out| {
            out[4] = FLAG0_HAPTICS_SELECT;
            if vibration2 {
                out[42] |= FLAG2_COMPATIBLE_VIBRATION2;
            } else {
                out[4] |= FLAG0_COMPATIBLE_VIBRATION;
            }
            out[6] = weak_magnitude; // motor_right, small force
            out[7] = strong_magnitude; // motor_left, big force
        })
    }

    /// Frame to stop both rumble motors.
    pub fn rumble_stop(&mut self) -> WireFrame {
        self.rumble_start(0, 0)
    }
}

fn parse_calibration(report: &[u8]) -> RawCalibration {
    let i16_at = |o: usize| i16::from_le_bytes([report[o], report[o + 1]]);
    RawCalibration {
        gyro_bias: [i16_at(1), i16_at(3), i16_at(5)],
        // DualSense interleaves plus/minus per axis.
        gyro_plus: [i16_at(7), i16_at(11), i16_at(15)],
        gyro_minus: [i16_at(9), i16_at(13), i16_at(17)],
        gyro_speed_plus: i16_at(19),
        gyro_speed_minus: i16_at(21),
        acc_plus: [i16_at(23), i16_at(27), i16_at(31)],
        acc_minus: [i16_at(25), i16_at(29), i16_at(33)],
    }
}
