//! Report ids, register addresses and device identities.
//!
//! Report ids follow the `wiiproto` naming from the Linux `hid-wiimote`
//! driver; register layout is documented on wiibrew.org.

/// Nintendo vendor id.
pub const NINTENDO_VID: u16 = 0x057e;
/// Wii Remote first generation product id.
pub const REMOTE_PID: u16 = 0x0306;
/// Wii Remote Motion Plus / Wii U Pro product id (shared).
pub const REMOTE_MP_PID: u16 = 0x0330;

/// Output report ids (host to device).
pub mod output {
    /// Rumble on/off.
    pub const RUMBLE: u8 = 0x10;
    /// LEDs, plus the rumble bit.
    pub const LED: u8 = 0x11;
    /// Select the data reporting mode.
    pub const DRM: u8 = 0x12;
    /// Status request.
    pub const SREQ: u8 = 0x15;
    /// Write memory or registers.
    pub const WMEM: u8 = 0x16;
    /// Read memory or registers.
    pub const RMEM: u8 = 0x17;
}

/// Input report ids (device to host).
pub mod input {
    /// Status report, sent on request and on extension plug/unplug.
    pub const STATUS: u8 = 0x20;
    /// Read-memory data.
    pub const DATA: u8 = 0x21;
    /// Acknowledge / result of an output report.
    pub const RETURN: u8 = 0x22;

    /// Core buttons.
    pub const DRM_K: u8 = 0x30;
    /// Core buttons + accelerometer.
    pub const DRM_KA: u8 = 0x31;
    /// Core buttons + 8 extension bytes.
    pub const DRM_KE: u8 = 0x32;
    /// Core buttons + 19 extension bytes (Wii U Pro, Balance Board).
    pub const DRM_KEE: u8 = 0x34;
    /// Core buttons + accelerometer + 16 extension bytes.
    pub const DRM_KAE: u8 = 0x35;
    /// 21 extension bytes (Classic Controller).
    pub const DRM_E: u8 = 0x3d;
}

/// Read target selector for RMEM/WMEM: control registers, not EEPROM.
pub const READ_FROM_REGISTERS: u8 = 0x04;

/// Default extension register bank (`0xa4....`).
pub const REGISTER_BANK_DEFAULT: u8 = 0xa4;
/// Fallback bank used by the Wii Remote Motion Plus.
pub const REGISTER_BANK_MP: u8 = 0xa6;

/// Extension init register (low 16 bits; bank byte goes on top).
pub const REG_EXT_INIT: u16 = 0x00f0;
/// Extension encryption register.
pub const REG_EXT_ENCRYPTION: u16 = 0x00fb;
/// Extension identity register.
pub const REG_EXT_IDENT: u16 = 0x00fa;
/// Balance Board calibration, first block (16 bytes: 0 kg and 17 kg points).
pub const REG_BOARD_CAL_1: u16 = 0x0024;
/// Balance Board calibration, second block (8 bytes: 34 kg points).
pub const REG_BOARD_CAL_2: u16 = 0x0034;

/// Value written to [`REG_EXT_INIT`] to initialize the extension.
pub const EXT_INIT_VALUE: u8 = 0x55;
/// Value written to [`REG_EXT_ENCRYPTION`] to disable encryption.
pub const EXT_ENCRYPTION_OFF: u8 = 0x00;

/// Wii Remote orientation / report flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WiiMode {
    /// Remote held sideways, dpad as stick.
    #[default]
    Horizontal,
    /// Remote held upright.
    Vertical,
    /// Accelerometer reports enabled.
    Accel,
}

/// What kind of base unit is talking to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevType {
    /// Not yet identified.
    #[default]
    Unknown,
    /// Wii U Pro Controller.
    ProController,
    /// Wii Remote, first generation.
    Remote,
    /// Wii Remote with built-in Motion Plus (second generation).
    RemoteMotionPlus,
}

/// Extension plugged into the remote, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtType {
    /// No extension port activity.
    #[default]
    None,
    /// Extension present but not yet identified.
    Unknown,
    /// Nunchuk.
    Nunchuk,
    /// Classic Controller / Classic Controller Pro.
    ClassicController,
    /// Wii U Pro Controller (reports as an extension).
    UProController,
    /// Balance Board.
    BalanceBoard,
}

impl ExtType {
    /// Identify an extension from the last two identity bytes read from
    /// the `0x..00fa` register block.
    pub fn from_ident(b0: u8, b1: u8) -> Option<Self> {
        match (b0, b1) {
            (0x00, 0x00) => Some(ExtType::Nunchuk),
            (0x01, 0x01) => Some(ExtType::ClassicController),
            (0x01, 0x20) => Some(ExtType::UProController),
            (0x04, 0x02) => Some(ExtType::BalanceBoard),
            _ => None,
        }
    }
}
