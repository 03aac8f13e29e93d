//! Extension probing state machine and report dispatch.
//!
//! Wii devices all enumerate the same way: request status, and if the
//! status report flags an extension, initialize it, disable its encryption
//! and read the 6-byte identity register to find out what is plugged in.
//! Only then can the right data reporting mode (DRM) be selected.
//!
//! Second-generation remotes keep their extension registers at bank 0xa6
//! instead of 0xa4; a failed register write triggers one retry on the
//! other bank.

use padhost_controller_types::gamepad::Gamepad;
use padhost_controller_types::{Controller, ControllerState};
use padhost_errors::report::ReportError;
use padhost_hid_common::WireFrame;
use tracing::{debug, info, warn};

use crate::ids::{
    DevType, EXT_ENCRYPTION_OFF, EXT_INIT_VALUE, ExtType, REG_BOARD_CAL_1, REG_BOARD_CAL_2,
    REG_EXT_ENCRYPTION, REG_EXT_IDENT, REG_EXT_INIT, REGISTER_BANK_DEFAULT, REGISTER_BANK_MP,
    REMOTE_MP_PID, REMOTE_PID, WiiMode, input, output,
};
use crate::input::{
    BoardCalibration, BoardPoints, decode_drm_e, decode_drm_k, decode_drm_ka, decode_drm_ke,
    decode_drm_kee_board, decode_drm_kee_pro,
};
use crate::output::{
    read_register_frame, rumble_frame, set_drm_frame, set_led_frame, status_request_frame,
    write_register_frame,
};

const FAMILY: &str = "wii";

/// Probe progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WiiFsm {
    /// Nothing sent yet.
    Setup,
    /// Status request sent.
    StatusRequested,
    /// Extension init byte written, waiting for the ack.
    ExtInit,
    /// Encryption-off byte written, waiting for the ack.
    ExtEncryptOff,
    /// Identity register read issued, waiting for the data.
    ExtReadIdent,
    /// Balance Board 0/17 kg calibration read issued.
    BoardCal1,
    /// Balance Board 34 kg calibration read issued.
    BoardCal2,
    /// DRM selected, reports flowing.
    Ready,
}

/// What one input report produced.
#[derive(Debug, Default)]
pub struct Reaction {
    /// Frames to queue, in order.
    pub frames: Vec<WireFrame>,
    /// A fresh snapshot was decoded into the controller.
    pub snapshot: bool,
    /// The probe just finished.
    pub ready: bool,
}

/// Per-connection Wii state.
#[derive(Debug)]
pub struct WiiDevice {
    state: WiiFsm,
    mode: WiiMode,
    dev_type: DevType,
    ext_type: ExtType,
    register_bank: u8,
    product_id: u16,
    seat_leds: u8,
    rumble_on: bool,
    board_cal: BoardCalibration,
}

impl WiiDevice {
    /// Fresh state for a device with the given product id.
    pub fn new(product_id: u16) -> Self {
        WiiDevice {
            state: WiiFsm::Setup,
            mode: WiiMode::Horizontal,
            dev_type: DevType::Unknown,
            ext_type: ExtType::None,
            register_bank: REGISTER_BANK_DEFAULT,
            product_id,
            seat_leds: 0,
            rumble_on: false,
            board_cal: BoardCalibration::default(),
        }
    }

    /// Current probe state.
    pub fn state(&self) -> WiiFsm {
        self.state
    }

    /// True once the DRM is selected.
    pub fn is_ready(&self) -> bool {
        self.state == WiiFsm::Ready
    }

    /// Identified base unit.
    pub fn dev_type(&self) -> DevType {
        self.dev_type
    }

    /// Identified extension.
    pub fn ext_type(&self) -> ExtType {
        self.ext_type
    }

    /// Remote orientation in use.
    pub fn mode(&self) -> WiiMode {
        self.mode
    }

    /// Kick off the probe with a status request.
    pub fn start(&mut self) -> Vec<WireFrame> {
        self.state = WiiFsm::StatusRequested;
        vec![status_request_frame()]
    }

    /// Re-issue the current probe step after its reply never came.
    ///
    /// Remotes occasionally eat a register write right after connecting.
    /// The connection guard timer still bounds a device that never answers
    /// at all.
    pub fn on_setup_timeout(&mut self) -> Vec<WireFrame> {
        if self.state == WiiFsm::Ready {
            return Vec::new();
        }
        warn!(state = ?self.state, "wii: probe step timed out, re-issuing");
        match self.state {
            WiiFsm::Setup | WiiFsm::StatusRequested => {
                self.state = WiiFsm::StatusRequested;
                vec![status_request_frame()]
            }
            WiiFsm::ExtInit => vec![write_register_frame(
                self.register_bank,
                REG_EXT_INIT,
                EXT_INIT_VALUE,
            )],
            WiiFsm::ExtEncryptOff => vec![write_register_frame(
                self.register_bank,
                REG_EXT_ENCRYPTION,
                EXT_ENCRYPTION_OFF,
            )],
            WiiFsm::ExtReadIdent => {
                vec![read_register_frame(self.register_bank, REG_EXT_IDENT, 6)]
            }
            WiiFsm::BoardCal1 => {
                vec![read_register_frame(self.register_bank, REG_BOARD_CAL_1, 16)]
            }
            WiiFsm::BoardCal2 => {
                vec![read_register_frame(self.register_bank, REG_BOARD_CAL_2, 8)]
            }
            WiiFsm::Ready => Vec::new(),
        }
    }

    /// Feed one interrupt-channel input report.
    pub fn process_report(
        &mut self,
        report: &[u8],
        ctl: &mut Controller,
    ) -> Result<Reaction, ReportError> {
        match report.first().copied() {
            Some(input::STATUS) => self.handle_status(report),
            Some(input::RETURN) => self.handle_return(report),
            Some(input::DATA) => self.handle_data(report),
            Some(input::DRM_K) => {
                decode_drm_k(report, self.mode, fresh_gamepad(ctl))?;
                Ok(snapshot())
            }
            Some(input::DRM_KA) => {
                decode_drm_ka(report, fresh_gamepad(ctl))?;
                Ok(snapshot())
            }
            Some(input::DRM_KE) => {
                if self.ext_type != ExtType::Nunchuk {
                    warn!(ext = ?self.ext_type, "wii: drm_ke without a nunchuk");
                    return Ok(Reaction::default());
                }
                decode_drm_ke(report, fresh_gamepad(ctl))?;
                Ok(snapshot())
            }
            Some(input::DRM_KEE) => self.handle_drm_kee(report, ctl),
            Some(input::DRM_KAE) => {
                // Nunchuk + accelerometer reports are not decoded yet.
                debug!("wii: drm_kae ignored");
                Ok(Reaction::default())
            }
            Some(input::DRM_E) => {
                if self.ext_type != ExtType::ClassicController {
                    warn!(ext = ?self.ext_type, "wii: drm_e without a classic controller");
                    return Ok(Reaction::default());
                }
                decode_drm_e(report, fresh_gamepad(ctl))?;
                Ok(snapshot())
            }
            Some(id) => Err(ReportError::UnexpectedReportId { family: FAMILY, id }),
            None => Err(ReportError::malformed(FAMILY, 0, 1)),
        }
    }

    fn handle_drm_kee(
        &mut self,
        report: &[u8],
        ctl: &mut Controller,
    ) -> Result<Reaction, ReportError> {
        match self.ext_type {
            ExtType::BalanceBoard => {
                let (board, battery) = decode_drm_kee_board(report, &self.board_cal)?;
                ctl.state = ControllerState::BalanceBoard(board);
                ctl.battery = battery;
                Ok(snapshot())
            }
            ExtType::UProController => {
                let battery = decode_drm_kee_pro(report, fresh_gamepad(ctl))?;
                ctl.battery = battery;
                Ok(snapshot())
            }
            other => {
                warn!(ext = ?other, "wii: drm_kee without a pro controller or board");
                Ok(Reaction::default())
            }
        }
    }

    /// Status report (0x20): guess the device type and detect extensions.
    fn handle_status(&mut self, report: &[u8]) -> Result<Reaction, ReportError> {
        if report.len() < 7 {
            return Err(ReportError::malformed(FAMILY, report.len(), 7));
        }
        if self.state != WiiFsm::StatusRequested {
            // Also sent on extension plug/unplug; re-probing mid-session is
            // not supported.
            debug!(state = ?self.state, "wii: unsolicited status report");
            return Ok(Reaction::default());
        }

        let flags = report[3] & 0x0f;
        let ext_present = flags & 0x02 != 0;

        let mut guessed = false;
        if self.product_id == REMOTE_PID {
            self.dev_type = DevType::Remote;
            guessed = true;
        } else if self.product_id == REMOTE_MP_PID {
            if ext_present {
                // Could be a remote with a nunchuk or a Wii U Pro; the
                // identity register settles it.
            } else {
                self.dev_type = DevType::RemoteMotionPlus;
                guessed = true;
            }
        }

        // Remote only: held buttons at connect pick the mode. "A" selects
        // accelerometer reports, "+" upright orientation.
        if report[2] & 0x08 != 0 {
            self.mode = WiiMode::Accel;
        } else if report[1] & 0x10 != 0 {
            self.mode = WiiMode::Vertical;
        }

        if ext_present {
            info!("wii: extension found");
            self.ext_type = ExtType::Unknown;
            self.state = WiiFsm::ExtInit;
            return Ok(Reaction {
                frames: vec![write_register_frame(
                    self.register_bank,
                    REG_EXT_INIT,
                    EXT_INIT_VALUE,
                )],
                ..Reaction::default()
            });
        }

        self.ext_type = ExtType::None;
        if guessed {
            Ok(self.assign_device())
        } else {
            warn!(pid = format_args!("{:#06x}", self.product_id), "wii: cannot identify device");
            Ok(Reaction::default())
        }
    }

    /// Output-report ack (0x22): drives the register write sequence.
    fn handle_return(&mut self, report: &[u8]) -> Result<Reaction, ReportError> {
        if report.len() < 5 {
            return Err(ReportError::malformed(FAMILY, report.len(), 5));
        }
        if report[3] != output::WMEM {
            return Ok(Reaction::default());
        }
        if report[4] != 0 {
            if self.register_bank == REGISTER_BANK_MP {
                // Both banks failed; start over.
                warn!("wii: extension registers unreachable, restarting probe");
                self.state = WiiFsm::StatusRequested;
                return Ok(Reaction {
                    frames: vec![status_request_frame()],
                    ..Reaction::default()
                });
            }
            // The default bank failed: a Motion Plus remote keeps its
            // extension registers at 0xa6.
            info!("wii: retrying extension registers at bank 0xa6");
            self.register_bank = REGISTER_BANK_MP;
            self.state = WiiFsm::ExtInit;
            return Ok(Reaction {
                frames: vec![write_register_frame(
                    self.register_bank,
                    REG_EXT_INIT,
                    EXT_INIT_VALUE,
                )],
                ..Reaction::default()
            });
        }

        match self.state {
            WiiFsm::ExtInit => {
                self.state = WiiFsm::ExtEncryptOff;
                Ok(Reaction {
                    frames: vec![write_register_frame(
                        self.register_bank,
                        REG_EXT_ENCRYPTION,
                        EXT_ENCRYPTION_OFF,
                    )],
                    ..Reaction::default()
                })
            }
            WiiFsm::ExtEncryptOff => {
                self.state = WiiFsm::ExtReadIdent;
                Ok(Reaction {
                    frames: vec![read_register_frame(self.register_bank, REG_EXT_IDENT, 6)],
                    ..Reaction::default()
                })
            }
            _ => Ok(Reaction::default()),
        }
    }

    /// Read-memory data (0x21): identity register and board calibration.
    fn handle_data(&mut self, report: &[u8]) -> Result<Reaction, ReportError> {
        if report.len() < 22 {
            return Err(ReportError::malformed(FAMILY, report.len(), 22));
        }
        let size = report[3] >> 4;
        let error = report[3] & 0x0f;
        if error != 0 {
            warn!(error = format_args!("{error:#04x}"), "wii: memory read failed");
            return Ok(Reaction::default());
        }
        let addr = u16::from_be_bytes([report[4], report[5]]);

        match self.state {
            WiiFsm::ExtReadIdent => {
                if size != 5 || addr != REG_EXT_IDENT {
                    warn!(size, addr, "wii: unexpected identity read");
                    return Ok(Reaction::default());
                }
                self.identify(report[10], report[11]);
                if self.ext_type == ExtType::BalanceBoard {
                    self.state = WiiFsm::BoardCal1;
                    Ok(Reaction {
                        frames: vec![read_register_frame(self.register_bank, REG_BOARD_CAL_1, 16)],
                        ..Reaction::default()
                    })
                } else {
                    Ok(self.assign_device())
                }
            }
            WiiFsm::BoardCal1 => {
                if size == 15 && addr == REG_BOARD_CAL_1 {
                    if let (Some(kg0), Some(kg17)) = (
                        BoardPoints::from_wire(&report[6..14]),
                        BoardPoints::from_wire(&report[14..22]),
                    ) {
                        self.board_cal.kg0 = kg0;
                        self.board_cal.kg17 = kg17;
                    }
                } else {
                    warn!(size, addr, "wii: unexpected board calibration read");
                }
                self.state = WiiFsm::BoardCal2;
                Ok(Reaction {
                    frames: vec![read_register_frame(self.register_bank, REG_BOARD_CAL_2, 8)],
                    ..Reaction::default()
                })
            }
            WiiFsm::BoardCal2 => {
                if size == 7 && addr == REG_BOARD_CAL_2 {
                    if let Some(kg34) = BoardPoints::from_wire(&report[6..14]) {
                        self.board_cal.kg34 = kg34;
                    }
                } else {
                    warn!(size, addr, "wii: unexpected board calibration read");
                }
                debug!(cal = ?self.board_cal, "wii: balance board calibrated");
                Ok(self.assign_device())
            }
            _ => {
                warn!(state = ?self.state, "wii: unexpected read-memory data");
                Ok(Reaction::default())
            }
        }
    }

    fn identify(&mut self, b0: u8, b1: u8) {
        if (b0, b1) == (0x01, 0x20) {
            self.dev_type = DevType::ProController;
            self.ext_type = ExtType::UProController;
        } else if self.dev_type == DevType::Unknown {
            self.dev_type = match self.product_id {
                REMOTE_MP_PID => DevType::RemoteMotionPlus,
                REMOTE_PID => DevType::Remote,
                other => {
                    warn!(pid = format_args!("{other:#06x}"), "wii: unknown product id");
                    DevType::Unknown
                }
            };
        }

        if self.ext_type == ExtType::Unknown {
            match ExtType::from_ident(b0, b1) {
                Some(ext) => {
                    self.ext_type = ext;
                    if ext == ExtType::Nunchuk {
                        // A nunchuk implies the remote is held upright.
                        self.mode = WiiMode::Vertical;
                    }
                }
                None => warn!(b0, b1, "wii: unknown extension identity"),
            }
        }
        info!(dev = ?self.dev_type, ext = ?self.ext_type, "wii: device identified");
    }

    /// Pick the DRM for the identified device and light the LEDs.
    fn assign_device(&mut self) -> Reaction {
        let drm = match (self.dev_type, self.ext_type, self.mode) {
            (DevType::ProController, _, _) => input::DRM_KEE,
            (_, ExtType::Nunchuk, WiiMode::Accel) => input::DRM_KAE,
            (_, ExtType::Nunchuk, _) => input::DRM_KE,
            (_, ExtType::ClassicController, _) => input::DRM_E,
            (_, ExtType::BalanceBoard, _) => input::DRM_KEE,
            (_, _, WiiMode::Accel) => input::DRM_KA,
            _ => input::DRM_K,
        };
        info!(drm = format_args!("{drm:#04x}"), "wii: data reporting mode selected");
        self.state = WiiFsm::Ready;
        Reaction {
            frames: vec![
                set_drm_frame(drm),
                set_led_frame(self.seat_leds, self.mode, self.rumble_on),
            ],
            snapshot: false,
            ready: true,
        }
    }

    /// Store the seat mask; emits an LED frame once the probe is done.
    pub fn set_player_leds(&mut self, seat: u8) -> Option<WireFrame> {
        self.seat_leds = seat;
        if self.is_ready() {
            Some(set_led_frame(self.seat_leds, self.mode, self.rumble_on))
        } else {
            None
        }
    }

    /// Frame to start the rumble motor; `None` until the probe is done.
    pub fn rumble_start(&mut self) -> Option<WireFrame> {
        if !self.is_ready() {
            return None;
        }
        self.rumble_on = true;
        Some(rumble_frame(true))
    }

    /// Frame to stop the rumble motor.
    pub fn rumble_stop(&mut self) -> Option<WireFrame> {
        if !self.is_ready() {
            return None;
        }
        self.rumble_on = false;
        Some(rumble_frame(false))
    }
}

/// Reset the snapshot to a zeroed gamepad; every DRM report is full-state.
fn fresh_gamepad(ctl: &mut Controller) -> &mut Gamepad {
    ctl.state = ControllerState::Gamepad(Gamepad::default());
    match &mut ctl.state {
        ControllerState::Gamepad(gp) => gp,
        // Just assigned above.
        _ => unreachable!(),
    }
}

fn snapshot() -> Reaction {
    Reaction {
        snapshot: true,
        ..Reaction::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use padhost_controller_types::gamepad::button;

    fn status_reply(flags: u8, b1: u8, b2: u8) -> Vec<u8> {
        vec![input::STATUS, b1, b2, flags, 0x00, 0x00, 0x50]
    }

    fn wmem_ack(status: u8) -> Vec<u8> {
        vec![input::RETURN, 0x00, 0x00, output::WMEM, status]
    }

    fn data_reply(size: u8, addr: u16, data: &[u8]) -> Vec<u8> {
        let mut r = vec![
            input::DATA,
            0x00,
            0x00,
            size << 4,
            (addr >> 8) as u8,
            (addr & 0xff) as u8,
        ];
        r.extend_from_slice(data);
        r.resize(22.max(r.len()), 0);
        r
    }

    fn probe_extension(dev: &mut WiiDevice, ctl: &mut Controller, ident: [u8; 2]) -> Reaction {
        let frames = dev.start();
        assert_eq!(frames[0].payload(), &[0xa2, 0x15, 0x00]);

        // Extension present.
        let r = dev.process_report(&status_reply(0x02, 0, 0), ctl).unwrap();
        assert_eq!(r.frames[0].payload()[..8], [0xa2, 0x16, 0x04, 0xa4, 0x00, 0xf0, 0x01, 0x55]);

        let r = dev.process_report(&wmem_ack(0), ctl).unwrap();
        assert_eq!(r.frames[0].payload()[..8], [0xa2, 0x16, 0x04, 0xa4, 0x00, 0xfb, 0x01, 0x00]);

        let r = dev.process_report(&wmem_ack(0), ctl).unwrap();
        assert_eq!(r.frames[0].payload(), &[0xa2, 0x17, 0x04, 0xa4, 0x00, 0xfa, 0x00, 0x06]);

        let ident_data = [0x00, 0x00, 0xa4, 0x20, ident[0], ident[1]];
        dev.process_report(&data_reply(5, REG_EXT_IDENT, &ident_data), ctl)
            .unwrap()
    }

    #[test]
    fn remote_without_extension_goes_straight_to_core_buttons() {
        let mut dev = WiiDevice::new(REMOTE_PID);
        let mut ctl = Controller::gamepad();
        dev.start();
        let r = dev.process_report(&status_reply(0x00, 0, 0), &mut ctl).unwrap();
        assert!(r.ready);
        assert_eq!(r.frames[0].payload(), &[0xa2, 0x12, 0x00, input::DRM_K]);
        assert_eq!(r.frames[1].payload(), &[0xa2, 0x11, 0x00]);
        assert_eq!(dev.dev_type(), DevType::Remote);
    }

    #[test]
    fn holding_a_at_connect_selects_accel_mode() {
        let mut dev = WiiDevice::new(REMOTE_PID);
        let mut ctl = Controller::gamepad();
        dev.start();
        let r = dev
            .process_report(&status_reply(0x00, 0x00, 0x08), &mut ctl)
            .unwrap();
        assert_eq!(dev.mode(), WiiMode::Accel);
        assert_eq!(r.frames[0].payload()[3], input::DRM_KA);
        // LED 3 marks accel mode.
        assert_eq!(r.frames[1].payload()[2], 0x40);
    }

    #[test]
    fn pro_controller_identified_from_register() {
        let mut dev = WiiDevice::new(REMOTE_MP_PID);
        let mut ctl = Controller::gamepad();
        let r = probe_extension(&mut dev, &mut ctl, [0x01, 0x20]);
        assert!(r.ready);
        assert_eq!(dev.dev_type(), DevType::ProController);
        assert_eq!(r.frames[0].payload()[3], input::DRM_KEE);

        // A pro report now decodes.
        let mut report = vec![0x34, 0x00, 0x00];
        let mut ext = [0xffu8; 11];
        ext[..8].copy_from_slice(&[0x00, 0x08, 0x00, 0x08, 0x00, 0x08, 0x00, 0x08]);
        ext[9] = !0x40; // BB -> canonical A
        report.extend_from_slice(&ext);
        let r = dev.process_report(&report, &mut ctl).unwrap();
        assert!(r.snapshot);
        assert!(ctl.gamepad_mut().unwrap().is_pressed(button::A));
    }

    #[test]
    fn nunchuk_forces_vertical_mode() {
        let mut dev = WiiDevice::new(REMOTE_MP_PID);
        let mut ctl = Controller::gamepad();
        let r = probe_extension(&mut dev, &mut ctl, [0x00, 0x00]);
        assert!(r.ready);
        assert_eq!(dev.ext_type(), ExtType::Nunchuk);
        assert_eq!(dev.mode(), WiiMode::Vertical);
        assert_eq!(r.frames[0].payload()[3], input::DRM_KE);
    }

    #[test]
    fn balance_board_reads_calibration_before_ready() {
        let mut dev = WiiDevice::new(REMOTE_MP_PID);
        let mut ctl = Controller::gamepad();
        let r = probe_extension(&mut dev, &mut ctl, [0x04, 0x02]);
        assert!(!r.ready);
        assert_eq!(r.frames[0].payload(), &[0xa2, 0x17, 0x04, 0xa4, 0x00, 0x24, 0x00, 0x10]);

        // 0/17 kg points: 1000 and 2000 everywhere.
        let mut cal1 = Vec::new();
        for _ in 0..4 {
            cal1.extend_from_slice(&1000u16.to_be_bytes());
        }
        for _ in 0..4 {
            cal1.extend_from_slice(&2000u16.to_be_bytes());
        }
        let r = dev
            .process_report(&data_reply(15, REG_BOARD_CAL_1, &cal1), &mut ctl)
            .unwrap();
        assert_eq!(r.frames[0].payload(), &[0xa2, 0x17, 0x04, 0xa4, 0x00, 0x34, 0x00, 0x08]);

        let mut cal2 = Vec::new();
        for _ in 0..4 {
            cal2.extend_from_slice(&3000u16.to_be_bytes());
        }
        let r = dev
            .process_report(&data_reply(7, REG_BOARD_CAL_2, &cal2), &mut ctl)
            .unwrap();
        assert!(r.ready);
        assert_eq!(r.frames[0].payload()[3], input::DRM_KEE);

        // Weight report: tr at the 17 kg point.
        let mut report = vec![0x34, 0x00, 0x00];
        report.extend_from_slice(&[0x07, 0xd0, 0x03, 0xe8, 0x03, 0xe8, 0x03, 0xe8, 20, 0, 0x82]);
        let r = dev.process_report(&report, &mut ctl).unwrap();
        assert!(r.snapshot);
        match &ctl.state {
            ControllerState::BalanceBoard(b) => {
                assert_eq!(b.tr, 17000);
                assert_eq!(b.bl, 0);
            }
            other => panic!("expected balance board, got {other:?}"),
        }
        assert_eq!(ctl.battery, 255);
    }

    #[test]
    fn failed_register_write_retries_on_mp_bank() {
        let mut dev = WiiDevice::new(REMOTE_MP_PID);
        let mut ctl = Controller::gamepad();
        dev.start();
        dev.process_report(&status_reply(0x02, 0, 0), &mut ctl).unwrap();

        // First write fails: retry the init write on bank 0xa6.
        let r = dev.process_report(&wmem_ack(0x07), &mut ctl).unwrap();
        assert_eq!(r.frames[0].payload()[..8], [0xa2, 0x16, 0x04, 0xa6, 0x00, 0xf0, 0x01, 0x55]);

        // Failing again on 0xa6 restarts the probe.
        let r = dev.process_report(&wmem_ack(0x07), &mut ctl).unwrap();
        assert_eq!(r.frames[0].payload(), &[0xa2, 0x15, 0x00]);
        assert_eq!(dev.state(), WiiFsm::StatusRequested);
    }

    #[test]
    fn rumble_and_leds_wait_for_ready() {
        let mut dev = WiiDevice::new(REMOTE_PID);
        let mut ctl = Controller::gamepad();
        dev.start();
        assert!(dev.rumble_start().is_none());
        assert!(dev.set_player_leds(0x01).is_none());

        dev.process_report(&status_reply(0x00, 0, 0), &mut ctl).unwrap();
        assert!(dev.is_ready());

        let f = dev.rumble_start().unwrap();
        assert_eq!(f.payload(), &[0xa2, 0x10, 0x01]);
        // The LED frame keeps rumble running.
        let f = dev.set_player_leds(0x01).unwrap();
        assert_eq!(f.payload(), &[0xa2, 0x11, 0x11]);
        let f = dev.rumble_stop().unwrap();
        assert_eq!(f.payload(), &[0xa2, 0x10, 0x00]);
    }
}
