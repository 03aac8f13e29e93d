//! Outgoing Wii frames: status requests, register I/O, DRM selection,
//! LEDs and rumble.

use padhost_hid_common::{ReportBuilder, TRANSACTION_DATA_OUTPUT, WireFrame};

use crate::ids::{READ_FROM_REGISTERS, WiiMode, output};

/// Register writes pad the data section to 16 bytes.
const WMEM_DATA_LEN: usize = 16;

/// Request a status report (also clears LEDs and rumble).
pub fn status_request_frame() -> WireFrame {
    WireFrame::Interrupt(vec![TRANSACTION_DATA_OUTPUT, output::SREQ, 0x00])
}

/// Write one byte into a control register.
///
/// `bank` is the high address byte (0xa4, or 0xa6 on the Motion Plus),
/// `reg` the low 16 bits.
pub fn write_register_frame(bank: u8, reg: u16, value: u8) -> WireFrame {
    let mut b = ReportBuilder::with_capacity(7 + WMEM_DATA_LEN);
    b.write_u8(TRANSACTION_DATA_OUTPUT);
    b.write_u8(output::WMEM);
    b.write_u8(READ_FROM_REGISTERS);
    b.write_u8(bank);
    b.write_u8((reg >> 8) as u8);
    b.write_u8((reg & 0xff) as u8);
    b.write_u8(1); // bytes to write
    b.write_u8(value);
    b.pad(WMEM_DATA_LEN - 1);
    WireFrame::Interrupt(b.into_bytes())
}

/// Read `size` bytes from a control register.
pub fn read_register_frame(bank: u8, reg: u16, size: u16) -> WireFrame {
    let mut b = ReportBuilder::with_capacity(8);
    b.write_u8(TRANSACTION_DATA_OUTPUT);
    b.write_u8(output::RMEM);
    b.write_u8(READ_FROM_REGISTERS);
    b.write_u8(bank);
    b.write_u8((reg >> 8) as u8);
    b.write_u8((reg & 0xff) as u8);
    b.write_u8((size >> 8) as u8);
    b.write_u8((size & 0xff) as u8);
    WireFrame::Interrupt(b.into_bytes())
}

/// Select the data reporting mode.
pub fn set_drm_frame(drm: u8) -> WireFrame {
    WireFrame::Interrupt(vec![TRANSACTION_DATA_OUTPUT, output::DRM, 0x00, drm])
}

/// Set the player LEDs from the seat mask.
///
/// LED 4 marks vertical mode and LED 3 accelerometer mode, so a glance at
/// the remote shows how it was picked up. The low bit keeps rumble running
/// across LED updates.
pub fn set_led_frame(seat: u8, mode: WiiMode, rumble_on: bool) -> WireFrame {
    let mut led = seat << 4;
    match mode {
        WiiMode::Vertical => led |= 0x80,
        WiiMode::Accel => led |= 0x40,
        WiiMode::Horizontal => {}
    }
    if rumble_on {
        led |= 0x01;
    }
    WireFrame::Interrupt(vec![TRANSACTION_DATA_OUTPUT, output::LED, led])
}

/// Turn the rumble motor on or off.
pub fn rumble_frame(on: bool) -> WireFrame {
    WireFrame::Interrupt(vec![
        TRANSACTION_DATA_OUTPUT,
        output::RUMBLE,
        u8::from(on),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EXT_INIT_VALUE, REG_EXT_IDENT, REG_EXT_INIT, REGISTER_BANK_DEFAULT};

    #[test]
    fn write_register_pads_to_sixteen_data_bytes() {
        let f = write_register_frame(REGISTER_BANK_DEFAULT, REG_EXT_INIT, EXT_INIT_VALUE);
        let p = f.payload();
        assert_eq!(p.len(), 23);
        assert_eq!(&p[..8], &[0xa2, 0x16, 0x04, 0xa4, 0x00, 0xf0, 0x01, 0x55]);
        assert!(p[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn read_register_encodes_big_endian() {
        let f = read_register_frame(0xa6, REG_EXT_IDENT, 6);
        assert_eq!(
            f.payload(),
            &[0xa2, 0x17, 0x04, 0xa6, 0x00, 0xfa, 0x00, 0x06]
        );
    }

    #[test]
    fn led_frame_flags_mode_bits() {
        let f = set_led_frame(0x01, WiiMode::Vertical, false);
        assert_eq!(f.payload(), &[0xa2, 0x11, 0x90]);
        let f = set_led_frame(0x02, WiiMode::Accel, true);
        assert_eq!(f.payload(), &[0xa2, 0x11, 0x61]);
    }

    #[test]
    fn rumble_frames() {
        assert_eq!(rumble_frame(true).payload(), &[0xa2, 0x10, 0x01]);
        assert_eq!(rumble_frame(false).payload(), &[0xa2, 0x10, 0x00]);
    }
}
