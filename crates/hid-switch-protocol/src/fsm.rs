//! The Switch setup handshake.
//!
//! After a controller connects it boots in simple (0x3f) report mode. The
//! handshake walks it to full-report mode: request device info, read the
//! factory stick and IMU calibration out of SPI flash, switch to 0x30
//! reports, enable the IMU, and light the player LEDs. Each step is one
//! subcommand; the 0x21 acknowledgement drives the next step.
//!
//! The driver is transport-free: it consumes report bytes and returns
//! frames for the engine to queue. The engine also owns the setup timer;
//! [`SwitchDevice::on_setup_timeout`] forces a stuck handshake forward so a
//! clone that ignores a subcommand still ends up usable.

use padhost_controller_types::Controller;
use padhost_errors::report::ReportError;
use padhost_hid_common::WireFrame;
use tracing::{debug, warn};

use crate::ids::{self, ControllerType, input, subcmd};
use crate::input::{
    Calibration, battery_level, decode_button_event, decode_full_report, parse_imu_calibration,
    parse_stick_calibration,
};
use crate::output;

const FAMILY: &str = "switch";

/// Handshake progress. Each state names the subcommand currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandshakeState {
    /// Nothing sent yet.
    Setup,
    /// Waiting for the device-info reply.
    ReqDevInfo,
    /// Waiting for the factory stick calibration SPI read.
    ReadFactoryStickCal,
    /// Waiting for the user stick calibration SPI read.
    ReadUserStickCal,
    /// Waiting for the factory IMU calibration SPI read.
    ReadFactoryImuCal,
    /// Waiting for the 0x30 report-mode acknowledgement.
    SetFullReport,
    /// Waiting for the IMU-enable acknowledgement.
    EnableImu,
    /// Waiting for the player-LED acknowledgement.
    UpdateLed,
    /// Handshake done, full reports flowing.
    Ready,
}

/// What one input report produced.
#[derive(Debug, Default)]
pub struct Reaction {
    /// Frames to queue, in order.
    pub frames: Vec<WireFrame>,
    /// A fresh controller snapshot was decoded.
    pub snapshot: bool,
    /// The handshake just completed.
    pub ready: bool,
}

/// Per-connection Switch protocol state.
#[derive(Debug)]
pub struct SwitchDevice {
    state: HandshakeState,
    imu_enabled: bool,
    controller_type: ControllerType,
    firmware: [u8; 2],
    packet_num: u8,
    seat_leds: u8,
    cal: Calibration,
}

impl Default for SwitchDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchDevice {
    /// Fresh state for a newly connected controller.
    ///
    /// Until device info arrives we assume a Pro Controller, so a device
    /// that never answers still decodes reasonably.
    pub fn new() -> Self {
        SwitchDevice {
            state: HandshakeState::Setup,
            imu_enabled: false,
            controller_type: ControllerType::Pro,
            firmware: [0, 0],
            packet_num: 0,
            seat_leds: 0,
            cal: Calibration::default(),
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// True once the handshake completed.
    pub fn is_ready(&self) -> bool {
        self.state == HandshakeState::Ready
    }

    /// Controller type reported by device info.
    pub fn controller_type(&self) -> ControllerType {
        self.controller_type
    }

    /// Firmware version as (major, minor).
    pub fn firmware_version(&self) -> (u8, u8) {
        (self.firmware[0], self.firmware[1])
    }

    fn next_packet_num(&mut self) -> u8 {
        let n = self.packet_num;
        self.packet_num = (self.packet_num + 1) & 0x0f;
        n
    }

    /// Kick off the handshake. The engine should also arm a timer for
    /// [`ids::SETUP_TIMEOUT_MS`] and call [`Self::on_setup_timeout`] when it
    /// fires.
    pub fn start(&mut self) -> Vec<WireFrame> {
        self.advance().frames
    }

    /// Force the handshake past a step whose reply never came.
    pub fn on_setup_timeout(&mut self) -> Reaction {
        if self.state == HandshakeState::Ready {
            return Reaction::default();
        }
        warn!(state = ?self.state, "switch: setup step timed out, forcing next");
        self.advance()
    }

    /// Feed one interrupt-channel input report.
    pub fn process_report(
        &mut self,
        report: &[u8],
        ctl: &mut Controller,
    ) -> Result<Reaction, ReportError> {
        if report.len() < 12 {
            return Err(ReportError::malformed(FAMILY, report.len(), 12));
        }
        match report[0] {
            input::SUBCMD_REPLY => self.process_subcmd_reply(report, ctl),
            input::IMU_DATA => {
                decode_full_report(
                    report,
                    &self.cal,
                    self.controller_type,
                    self.imu_enabled,
                    ctl,
                )?;
                Ok(Reaction {
                    snapshot: true,
                    ..Reaction::default()
                })
            }
            input::BUTTON_EVENT => {
                decode_button_event(report, ctl)?;
                Ok(Reaction {
                    snapshot: true,
                    ..Reaction::default()
                })
            }
            input::MCU_DATA => {
                debug!("switch: ignoring MCU data report");
                Ok(Reaction::default())
            }
            id => Err(ReportError::UnexpectedReportId { family: FAMILY, id }),
        }
    }

    fn process_subcmd_reply(
        &mut self,
        report: &[u8],
        ctl: &mut Controller,
    ) -> Result<Reaction, ReportError> {
        if report.len() < 15 {
            return Err(ReportError::malformed(FAMILY, report.len(), 15));
        }
        let ack = report[13];
        let subcmd_id = report[14];
        let data = &report[15..];

        if ack & 0x80 == 0 {
            warn!(subcmd_id, "switch: subcommand was not acknowledged");
        }

        match subcmd_id {
            subcmd::REQ_DEV_INFO => self.handle_dev_info(data),
            subcmd::SPI_FLASH_READ => self.handle_spi_read(data)?,
            subcmd::SET_REPORT_MODE | subcmd::SET_PLAYER_LEDS | subcmd::ENABLE_IMU => {}
            other => warn!(subcmd_id = other, "switch: unexpected subcommand reply"),
        }

        match battery_level(report[2]) {
            Some(level) => ctl.battery = level,
            None => warn!(bat_con = report[2], "switch: invalid battery value"),
        }

        Ok(self.advance())
    }

    fn handle_dev_info(&mut self, data: &[u8]) {
        if data.len() < 3 {
            warn!(len = data.len(), "switch: short device-info reply");
            return;
        }
        self.firmware = [data[0], data[1]];
        match ControllerType::from_wire(data[2]) {
            Some(t) => self.controller_type = t,
            None => warn!(wire = data[2], "switch: unknown controller type"),
        }
        self.imu_enabled = true;
        debug!(
            fw_hi = data[0],
            fw_lo = data[1],
            controller_type = ?self.controller_type,
            "switch: device info"
        );
    }

    fn handle_spi_read(&mut self, data: &[u8]) -> Result<(), ReportError> {
        if data.len() < 5 {
            return Err(ReportError::malformed(FAMILY, data.len(), 5));
        }
        let mem_len = usize::from(data[4]);
        let payload = data
            .get(5..5 + mem_len)
            .ok_or(ReportError::malformed(FAMILY, data.len(), 5 + mem_len))?;

        match self.state {
            HandshakeState::ReadFactoryStickCal => self.handle_stick_cal(payload),
            HandshakeState::ReadUserStickCal => {
                // Parsing the user calibration area is not supported; the
                // factory values are good enough.
            }
            HandshakeState::ReadFactoryImuCal => {
                if !parse_imu_calibration(payload, &mut self.cal) {
                    warn!(len = payload.len(), "switch: bad IMU calibration size");
                }
            }
            _ => warn!(state = ?self.state, "switch: SPI reply in unexpected state"),
        }
        Ok(())
    }

    fn handle_stick_cal(&mut self, payload: &[u8]) {
        match self.controller_type {
            ControllerType::Pro => {
                match (
                    parse_stick_calibration(payload, true),
                    payload.get(9..).and_then(|p| parse_stick_calibration(p, false)),
                ) {
                    (Some((x, y)), Some((rx, ry))) => {
                        self.cal.x = x;
                        self.cal.y = y;
                        self.cal.rx = rx;
                        self.cal.ry = ry;
                    }
                    _ => warn!(len = payload.len(), "switch: unusable pro stick calibration, keeping defaults"),
                }
            }
            ControllerType::JoyconLeft => match parse_stick_calibration(payload, true) {
                Some((x, y)) => {
                    self.cal.x = x;
                    self.cal.y = y;
                }
                None => warn!(len = payload.len(), "switch: unusable stick calibration, keeping defaults"),
            },
            ControllerType::JoyconRight => match parse_stick_calibration(payload, false) {
                Some((rx, ry)) => {
                    self.cal.rx = rx;
                    self.cal.ry = ry;
                }
                None => warn!(len = payload.len(), "switch: unusable stick calibration, keeping defaults"),
            },
            ControllerType::Snes => {}
        }
    }

    /// Issue the next handshake request for the current state.
    fn advance(&mut self) -> Reaction {
        let mut r = Reaction::default();
        match self.state {
            HandshakeState::Setup => {
                self.state = HandshakeState::ReqDevInfo;
                let n = self.next_packet_num();
                r.frames.push(output::subcmd_frame(n, subcmd::REQ_DEV_INFO, &[]));
            }
            HandshakeState::ReqDevInfo => {
                self.state = HandshakeState::ReadFactoryStickCal;
                // Pro reads both sticks in one go; Joy-Cons read only theirs.
                let (addr, size) = match self.controller_type {
                    ControllerType::JoyconRight => (
                        ids::FACTORY_STICK_CAL_ADDR_RIGHT,
                        ids::FACTORY_STICK_CAL_SIZE,
                    ),
                    ControllerType::Pro => (
                        ids::FACTORY_STICK_CAL_ADDR_LEFT,
                        ids::FACTORY_STICK_CAL_SIZE * 2,
                    ),
                    _ => (
                        ids::FACTORY_STICK_CAL_ADDR_LEFT,
                        ids::FACTORY_STICK_CAL_SIZE,
                    ),
                };
                let n = self.next_packet_num();
                r.frames.push(output::spi_read_frame(n, addr, size));
            }
            HandshakeState::ReadFactoryStickCal => {
                self.state = HandshakeState::ReadUserStickCal;
                let n = self.next_packet_num();
                r.frames.push(output::spi_read_frame(
                    n,
                    ids::USER_STICK_CAL_ADDR,
                    ids::USER_STICK_CAL_SIZE,
                ));
            }
            HandshakeState::ReadUserStickCal => {
                self.state = HandshakeState::ReadFactoryImuCal;
                let n = self.next_packet_num();
                r.frames.push(output::spi_read_frame(
                    n,
                    ids::FACTORY_IMU_CAL_ADDR,
                    ids::FACTORY_IMU_CAL_SIZE,
                ));
            }
            HandshakeState::ReadFactoryImuCal => {
                self.state = HandshakeState::SetFullReport;
                let n = self.next_packet_num();
                r.frames
                    .push(output::subcmd_frame(n, subcmd::SET_REPORT_MODE, &[0x30]));
            }
            HandshakeState::SetFullReport => {
                self.state = HandshakeState::EnableImu;
                let n = self.next_packet_num();
                let enable = u8::from(self.imu_enabled);
                r.frames
                    .push(output::subcmd_frame(n, subcmd::ENABLE_IMU, &[enable]));
            }
            HandshakeState::EnableImu => {
                self.state = HandshakeState::UpdateLed;
                let leds = self.seat_leds;
                let n = self.next_packet_num();
                r.frames.push(output::player_leds_frame(n, leds));
            }
            HandshakeState::UpdateLed => {
                self.state = HandshakeState::Ready;
                r.ready = true;
                debug!("switch: handshake complete");
            }
            HandshakeState::Ready => {}
        }
        r
    }

    /// Record the seat LED mask. Emits a frame only once the handshake is
    /// done; before that the `UpdateLed` step picks the stored value up.
    pub fn set_player_leds(&mut self, leds: u8) -> Option<WireFrame> {
        self.seat_leds = leds;
        if !self.is_ready() {
            return None;
        }
        let n = self.next_packet_num();
        Some(output::player_leds_frame(n, leds))
    }

    /// Frame to start both rumble motors.
    pub fn rumble_start(&mut self, weak_magnitude: u8, strong_magnitude: u8) -> WireFrame {
        let n = self.next_packet_num();
        output::rumble_frame(n, weak_magnitude, strong_magnitude)
    }

    /// Frame to stop both rumble motors.
    pub fn rumble_stop(&mut self) -> WireFrame {
        let n = self.next_packet_num();
        output::rumble_off_frame(n)
    }
}
