//! DualShock 4 codec.
//!
//! On Bluetooth a DS4 boots sending short 0x01 reports. Requesting the
//! calibration feature report flips it into extended 0x11 reports with
//! motion data, touchpad and battery; some clones never answer and stay on
//! 0x01, which remains fully decoded.

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

const FAMILY: &str = "ds4";

/// Calibration feature report id.
pub const FEATURE_CALIBRATION: u8 = 0x02;
/// Calibration feature report size.
pub const FEATURE_CALIBRATION_SIZE: usize = 37;
/// Firmware version feature report id.
pub const FEATURE_FIRMWARE_VERSION: u8 = 0xa3;
/// Firmware version feature report size.
pub const FEATURE_FIRMWARE_VERSION_SIZE: usize = 49;

const OUTPUT_REPORT_SIZE: usize = 79;

// valid_flags bits of the output report.
const FF_FLAG_RUMBLE: u8 = 1 << 0;
const FF_FLAG_LED_COLOR: u8 = 1 << 1;
const FF_FLAG_LED_BLINK: u8 = 1 << 2;
const FF_FLAG_ALL: u8 = FF_FLAG_RUMBLE | FF_FLAG_LED_COLOR | FF_FLAG_LED_BLINK;

/// Default lightbar color, set during setup.
pub const DEFAULT_LIGHTBAR: (u8, u8, u8) = (0x00, 0x00, 0x40);

/// What one DS4 report produced.
#[derive(Debug, Default)]
pub struct Reaction {
    /// Frames to queue, in order.
    pub frames: Vec<WireFrame>,
    /// A fresh gamepad snapshot was decoded.
    pub snapshot: bool,
    /// The virtual mouse snapshot changed too.
    pub mouse_snapshot: bool,
}

/// Per-connection DualShock 4 state.
#[derive(Debug, Default)]
pub struct Ds4Device {
    cal: SensorCalibration,
    fw_version: u16,
    hw_version: u16,
    touch: TouchpadTracker,
    // Output reports always carry color and rumble together, so each one
    // re-sends the last value of whichever half it does not change.
    color: (u8, u8, u8),
    rumble: (u8, u8),
}

impl Ds4Device {
    /// Fresh state for a newly connected controller.
    pub fn new() -> Self {
        Ds4Device::default()
    }

    /// Firmware and hardware versions, once the feature report arrived.
    pub fn versions(&self) -> (u16, u16) {
        (self.fw_version, self.hw_version)
    }

    /// Setup frames: light the bar (which also enables 0x11 reports on most
    /// units) and request calibration. The device is usable immediately;
    /// there is no reply to wait for before reports flow.
    pub fn start(&mut self) -> Vec<WireFrame> {
        self.color = DEFAULT_LIGHTBAR;
        self.rumble = (0, 0);
        vec![
            self.output_report(|_| {}),
            WireFrame::Control(vec![TRANSACTION_GET_FEATURE, FEATURE_CALIBRATION]),
        ]
    }

    /// Feed one GET_REPORT reply from the control channel.
    pub fn process_feature_report(&mut self, report: &[u8]) -> Result<Vec<WireFrame>, ReportError> {
        match report.first().copied() {
            Some(FEATURE_CALIBRATION) => {
                if report.len() != FEATURE_CALIBRATION_SIZE {
                    warn!(
                        len = report.len(),
                        "ds4: unexpected calibration report size"
                    );
                }
                if report.len() >= 35 {
                    self.cal = parse_calibration(report).normalize();
                }
                debug!("ds4: calibration received");
                Ok(vec![WireFrame::Control(vec![
                    TRANSACTION_GET_FEATURE,
                    FEATURE_FIRMWARE_VERSION,
                ])])
            }
            Some(FEATURE_FIRMWARE_VERSION) => {
                if report.len() != FEATURE_FIRMWARE_VERSION_SIZE {
                    warn!(len = report.len(), "ds4: unexpected firmware report size");
                }
                if report.len() >= 43 {
                    self.hw_version = u16::from_le_bytes([report[35], report[36]]);
                    self.fw_version = u16::from_le_bytes([report[41], report[42]]);
                }
                debug!(
                    fw = format_args!("{:#06x}", self.fw_version),
                    hw = format_args!("{:#06x}", self.hw_version),
                    "ds4: firmware version"
                );
                Ok(Vec::new())
            }
            Some(id) => Err(ReportError::UnexpectedReportId { family: FAMILY, id }),
            None => Err(ReportError::malformed(FAMILY, 0, 1)),
        }
    }

    /// Feed one interrupt-channel input report.
    ///
    /// `mouse` receives the virtual touchpad mouse when the report is an
    /// extended one.
    pub fn process_report(
        &mut self,
        report: &[u8],
        ctl: &mut Controller,
        mouse: Option<&mut Controller>,
    ) -> Result<Reaction, ReportError> {
        match (report.first().copied(), report.len()) {
            (Some(0x11), 78) => {
                self.decode_extended(&report[3..], ctl, mouse)?;
                Ok(Reaction {
                    snapshot: true,
                    mouse_snapshot: true,
                    ..Reaction::default()
                })
            }
            (Some(0x01), 10) => {
                decode_simple(&report[1..], ctl)?;
                Ok(Reaction {
                    snapshot: true,
                    ..Reaction::default()
                })
            }
            (Some(id), len) => {
                warn!(id, len, "ds4: unexpected report type or length");
                Err(ReportError::UnexpectedReportId { family: FAMILY, id })
            }
            (None, _) => Err(ReportError::malformed(FAMILY, 0, 10)),
        }
    }

    fn decode_extended(
        &mut self,
        payload: &[u8],
        ctl: &mut Controller,
        mouse: Option<&mut Controller>,
    ) -> Result<(), ReportError> {
        if payload.len() < 43 {
            return Err(ReportError::malformed(FAMILY, payload.len(), 43));
        }
        let Some(gp) = ctl.gamepad_mut() else {
            return Ok(());
        };
        *gp = Default::default();

        gp.axis_x = center_stick(payload[0]);
        gp.axis_y = center_stick(payload[1]);
        gp.axis_rx = center_stick(payload[2]);
        gp.axis_ry = center_stick(payload[3]);
        decode_buttons([payload[4], payload[5], payload[6]], false, gp);
        gp.brake = scale_trigger(payload[7]);
        gp.throttle = scale_trigger(payload[8]);

        for i in 0..3 {
            let raw_g = i16::from_le_bytes([payload[12 + i * 2], payload[13 + i * 2]]);
            let raw_a = i16::from_le_bytes([payload[18 + i * 2], payload[19 + i * 2]]);
            gp.gyro[i] = self.cal.gyro[i].apply(raw_g);
            gp.accel[i] = self.cal.accel[i].apply(raw_a);
        }

        ctl.battery = battery_capacity(payload[29]);

        if let Some(mouse_ctl) = mouse {
            let clicked = payload[6] & 0x02 != 0;
            let num_touches = payload[32];
            if let Some(m) = mouse_ctl.mouse_mut() {
                if num_touches < 1 {
                    self.touch.reset();
                } else if let Some(point) = TouchPoint::from_wire(&payload[34..38]) {
                    self.touch.update(point, clicked, m);
                }
            }
        }
        Ok(())
    }

    fn output_report(&mut self, fill: impl FnOnce(&mut [u8])) -> WireFrame {
        let mut out = vec![0u8; OUTPUT_REPORT_SIZE - 4];
        out[0] = TRANSACTION_DATA_OUTPUT;
        out[1] = 0x11;
        out[2] = 0xc4; // HID alone + poll interval
        out[4] = FF_FLAG_ALL;
        out[7] = self.rumble.0; // motor_right, small force
        out[8] = self.rumble.1; // motor_left, big force
        out[9] = self.color.0;
        out[10] = self.color.1;
        out[11] = self.color.2;
        fill(&mut out);
        append_sony_crc(&mut out);
        WireFrame::Interrupt(out)
    }

    /// Set the lightbar color, preserving the current rumble.
    pub fn set_lightbar_color(&mut self, r: u8, g: u8, b: u8) -> WireFrame {
        self.color = (r, g, b);
        self.output_report(|_| {})
    }

    /// Frame to start both rumble motors, preserving the lightbar.
    pub fn rumble_start(&mut self, weak_magnitude: u8, strong_magnitude: u8) -> WireFrame {
        self.rumble = (weak_magnitude, strong_magnitude);
        self.output_report(|_| {})
    }

    /// Frame to stop both rumble motors.
    pub fn rumble_stop(&mut self) -> WireFrame {
        self.rumble = (0, 0);
        self.output_report(|_| {})
    }
}

fn parse_calibration(report: &[u8]) -> RawCalibration {
    let i16_at = |o: usize| i16::from_le_bytes([report[o], report[o + 1]]);
    RawCalibration {
        gyro_bias: [i16_at(1), i16_at(3), i16_at(5)],
        // Bluetooth field order: all plus values, then all minus values.
        gyro_plus: [i16_at(7), i16_at(9), i16_at(11)],
        gyro_minus: [i16_at(13), i16_at(15), i16_at(17)],
        gyro_speed_plus: i16_at(19),
        gyro_speed_minus: i16_at(21),
        acc_plus: [i16_at(23), i16_at(27), i16_at(31)],
        acc_minus: [i16_at(25), i16_at(29), i16_at(33)],
    }
}

/// Decode the short 0x01 report used before stream mode (and by clones that
/// never leave it).
fn decode_simple(payload: &[u8], ctl: &mut Controller) -> Result<(), ReportError> {
    if payload.len() < 9 {
        return Err(ReportError::malformed(FAMILY, payload.len(), 9));
    }
    let Some(gp) = ctl.gamepad_mut() else {
        return Ok(());
    };
    *gp = Default::default();

    gp.axis_x = center_stick(payload[0]);
    gp.axis_y = center_stick(payload[1]);
    gp.axis_rx = center_stick(payload[2]);
    gp.axis_ry = center_stick(payload[3]);
    decode_buttons([payload[4], payload[5], payload[6]], false, gp);
    gp.brake = scale_trigger(payload[7]);
    gp.throttle = scale_trigger(payload[8]);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use padhost_controller_types::gamepad::{button, misc_button};
    use padhost_hid_common::crc::verify_sony_crc;

    fn extended_report() -> Vec<u8> {
        let mut r = vec![0u8; 78];
        r[0] = 0x11;
        // Payload starts at 3: sticks centered.
        r[3] = 127;
        r[4] = 127;
        r[5] = 127;
        r[6] = 127;
        r[7] = 0x08; // hat released
        r
    }

    #[test]
    fn start_sends_lightbar_then_calibration_request() {
        let mut dev = Ds4Device::new();
        let frames = dev.start();
        assert_eq!(frames.len(), 2);
        let lightbar = frames[0].payload();
        assert_eq!(lightbar.len(), 79);
        assert_eq!(lightbar[1], 0x11);
        assert_eq!(lightbar[11], 0x40); // default blue
        assert!(verify_sony_crc(lightbar));
        assert_eq!(
            frames[1].payload(),
            &[TRANSACTION_GET_FEATURE, FEATURE_CALIBRATION]
        );
    }

    #[test]
    fn calibration_reply_chains_firmware_request() {
        let mut dev = Ds4Device::new();
        let mut report = vec![0u8; FEATURE_CALIBRATION_SIZE];
        report[0] = FEATURE_CALIBRATION;
        let frames = dev.process_feature_report(&report).unwrap();
        assert_eq!(
            frames[0].payload(),
            &[TRANSACTION_GET_FEATURE, FEATURE_FIRMWARE_VERSION]
        );
    }

    #[test]
    fn firmware_reply_stores_versions() {
        let mut dev = Ds4Device::new();
        let mut report = vec![0u8; FEATURE_FIRMWARE_VERSION_SIZE];
        report[0] = FEATURE_FIRMWARE_VERSION;
        report[35] = 0x10; // hw
        report[41] = 0x64; // fw
        assert!(dev.process_feature_report(&report).unwrap().is_empty());
        assert_eq!(dev.versions(), (0x64, 0x10));
    }

    #[test]
    fn extended_report_decodes_buttons_and_battery() {
        let mut dev = Ds4Device::new();
        let mut report = extended_report();
        report[7] |= 0x20; // cross
        report[8] = 0x01; // L1
        report[32] = 5; // battery capacity 5 -> 126
        let mut ctl = Controller::gamepad();
        let r = dev.process_report(&report, &mut ctl, None).unwrap();
        assert!(r.snapshot);
        assert_eq!(ctl.battery, 126);
        let gp = ctl.gamepad_mut().unwrap();
        assert!(gp.is_pressed(button::A));
        assert!(gp.is_pressed(button::SHOULDER_L));
        assert_eq!(gp.axis_x, 0);
    }

    #[test]
    fn simple_report_still_decodes() {
        let mut dev = Ds4Device::new();
        let mut report = vec![0u8; 10];
        report[0] = 0x01;
        report[1] = 255; // x full right
        report[2] = 127;
        report[3] = 127;
        report[4] = 127;
        report[5] = 0x08 | 0x40; // hat released + circle
        report[6] = 0x10; // share
        let mut ctl = Controller::gamepad();
        dev.process_report(&report, &mut ctl, None).unwrap();
        let gp = ctl.gamepad_mut().unwrap();
        assert_eq!(gp.axis_x, 512);
        assert!(gp.is_pressed(button::B));
        assert_eq!(gp.misc_buttons, misc_button::SELECT);
    }

    #[test]
    fn touchpad_feeds_virtual_mouse() {
        let mut dev = Ds4Device::new();
        let mut ctl = Controller::gamepad();
        let mut mouse = Controller::mouse();

        let mut report = extended_report();
        report[35] = 1; // one touch report
        report[37] = 0x01; // contact id, active
        report[38] = 100; // x low
        dev.process_report(&report, &mut ctl, Some(&mut mouse)).unwrap();

        report[38] = 150;
        dev.process_report(&report, &mut ctl, Some(&mut mouse)).unwrap();
        assert_eq!(mouse.mouse_mut().unwrap().delta_x, 50);
    }

    #[test]
    fn rumble_keeps_lightbar_color() {
        let mut dev = Ds4Device::new();
        dev.set_lightbar_color(10, 20, 30);
        let frame = dev.rumble_start(0x80, 0xff);
        let p = frame.payload();
        assert_eq!(p[7], 0x80);
        assert_eq!(p[8], 0xff);
        assert_eq!(&p[9..12], &[10, 20, 30]);
        assert!(verify_sony_crc(p));

        let stop = dev.rumble_stop();
        assert_eq!(stop.payload()[7], 0);
        assert_eq!(&stop.payload()[9..12], &[10, 20, 30]);
    }

    #[test]
    fn unknown_feature_report_is_rejected() {
        let mut dev = Ds4Device::new();
        let err = dev.process_feature_report(&[0x77]).unwrap_err();
        assert!(matches!(err, ReportError::UnexpectedReportId { .. }));
    }
}
