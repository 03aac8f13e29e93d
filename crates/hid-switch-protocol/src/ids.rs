//! Wire identifiers for the Switch subcommand protocol.
//!
//! Values follow the dekuNukem reverse-engineering notes and the Linux
//! `hid-nintendo` driver.

/// Nintendo's Bluetooth vendor id.
pub const NINTENDO_VID: u16 = 0x057e;
/// Joy-Con (L) product id.
pub const JOYCON_L_PID: u16 = 0x2006;
/// Joy-Con (R) product id.
pub const JOYCON_R_PID: u16 = 0x2007;
/// Pro Controller product id.
pub const PRO_CONTROLLER_PID: u16 = 0x2009;
/// Switch Online SNES controller product id.
pub const ONLINE_SNES_CONTROLLER_PID: u16 = 0x2017;

/// Input report ids.
pub mod input {
    /// Acknowledgement of a subcommand, carries the reply payload.
    pub const SUBCMD_REPLY: u8 = 0x21;
    /// Full report: buttons, sticks and three IMU samples.
    pub const IMU_DATA: u8 = 0x30;
    /// NFC/IR MCU data, unused here.
    pub const MCU_DATA: u8 = 0x31;
    /// Simple button event, the mode controllers boot in.
    pub const BUTTON_EVENT: u8 = 0x3f;
}

/// Output report ids.
pub mod output {
    /// Rumble data plus one subcommand.
    pub const RUMBLE_AND_SUBCMD: u8 = 0x01;
    /// Rumble data only.
    pub const RUMBLE_ONLY: u8 = 0x10;
}

/// Subcommand ids sent inside [`output::RUMBLE_AND_SUBCMD`] reports.
pub mod subcmd {
    /// Request device info (firmware version, controller type).
    pub const REQ_DEV_INFO: u8 = 0x02;
    /// Set the input report mode (0x30 = standard full).
    pub const SET_REPORT_MODE: u8 = 0x03;
    /// Read a chunk of SPI flash.
    pub const SPI_FLASH_READ: u8 = 0x10;
    /// Set the player LEDs, low nibble = steady-on mask.
    pub const SET_PLAYER_LEDS: u8 = 0x30;
    /// Enable or disable the IMU.
    pub const ENABLE_IMU: u8 = 0x40;
}

/// SPI flash address of the factory calibration for the left stick.
pub const FACTORY_STICK_CAL_ADDR_LEFT: u32 = 0x603d;
/// SPI flash address of the factory calibration for the right stick.
pub const FACTORY_STICK_CAL_ADDR_RIGHT: u32 = 0x6046;
/// Bytes of factory calibration per stick.
pub const FACTORY_STICK_CAL_SIZE: u8 = 9;
/// SPI flash address of the user stick calibration magic.
pub const USER_STICK_CAL_ADDR: u32 = 0x8010;
/// Bytes read from the user stick calibration area.
pub const USER_STICK_CAL_SIZE: u8 = 2;
/// SPI flash address of the factory IMU calibration.
pub const FACTORY_IMU_CAL_ADDR: u32 = 0x6020;
/// Bytes of factory IMU calibration.
pub const FACTORY_IMU_CAL_SIZE: u8 = 24;

/// Time to wait for a subcommand reply before forcing the handshake forward.
pub const SETUP_TIMEOUT_MS: u64 = 600;

/// Accelerometer offset used when factory calibration is missing.
pub const DEFAULT_ACCEL_OFFSET: i16 = 0;
/// Accelerometer scale used when factory calibration is missing.
pub const DEFAULT_ACCEL_SCALE: i16 = 16384;
/// Gyroscope offset used when factory calibration is missing.
pub const DEFAULT_GYRO_OFFSET: i16 = 0;
/// Gyroscope scale used when factory calibration is missing.
pub const DEFAULT_GYRO_SCALE: i16 = 13371;
/// Fixed-point scale applied to calibrated gyro values.
pub const IMU_PREC_RANGE_SCALE: i32 = 1000;

/// Controller type byte reported by `REQ_DEV_INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerType {
    /// Left Joy-Con, used sideways as a standalone pad.
    JoyconLeft,
    /// Right Joy-Con, used sideways as a standalone pad.
    JoyconRight,
    /// Pro Controller.
    Pro,
    /// Switch Online SNES controller: Pro layout without sticks.
    Snes,
}

impl ControllerType {
    /// Decode the device-info type byte; unknown values get `None`.
    pub fn from_wire(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(ControllerType::JoyconLeft),
            0x02 => Some(ControllerType::JoyconRight),
            0x03 => Some(ControllerType::Pro),
            0x0b => Some(ControllerType::Snes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_type_round_trip() {
        assert_eq!(ControllerType::from_wire(0x03), Some(ControllerType::Pro));
        assert_eq!(ControllerType::from_wire(0x0b), Some(ControllerType::Snes));
        assert_eq!(ControllerType::from_wire(0x55), None);
    }
}
