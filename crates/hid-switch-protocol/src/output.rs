//! Outgoing Switch frames: subcommands, player LEDs and HD rumble.

use padhost_hid_common::{ReportBuilder, TRANSACTION_DATA_OUTPUT, WireFrame};

use crate::ids::{output, subcmd};

/// Neutral rumble payload, motor off.
pub const RUMBLE_OFF: [u8; 4] = [0x00, 0x01, 0x40, 0x40];

/// Build one subcommand frame for the interrupt channel.
///
/// Layout: transaction header, report id 0x01, packet number, 8 bytes of
/// rumble data (neutral here), subcommand id, payload.
pub fn subcmd_frame(packet_num: u8, subcmd_id: u8, data: &[u8]) -> WireFrame {
    let mut b = ReportBuilder::with_capacity(12 + data.len());
    b.write_u8(TRANSACTION_DATA_OUTPUT);
    b.write_u8(output::RUMBLE_AND_SUBCMD);
    b.write_u8(packet_num & 0x0f);
    b.pad(8);
    b.write_u8(subcmd_id);
    b.write_bytes(data);
    WireFrame::Interrupt(b.into_bytes())
}

/// Build an `SPI_FLASH_READ` subcommand frame.
pub fn spi_read_frame(packet_num: u8, addr: u32, size: u8) -> WireFrame {
    let mut data = [0u8; 5];
    data[..4].copy_from_slice(&addr.to_le_bytes());
    data[4] = size;
    subcmd_frame(packet_num, subcmd::SPI_FLASH_READ, &data)
}

/// Build a `SET_PLAYER_LEDS` frame. Low nibble is the steady-on mask.
pub fn player_leds_frame(packet_num: u8, leds: u8) -> WireFrame {
    subcmd_frame(packet_num, subcmd::SET_PLAYER_LEDS, &[leds & 0x0f])
}

/// Build a rumble-only frame driving both motors.
///
/// Magnitudes follow the convention used by the rest of the stack: the weak
/// motor maps to the left rumble payload, the strong motor to the right.
pub fn rumble_frame(packet_num: u8, weak_magnitude: u8, strong_magnitude: u8) -> WireFrame {
    let mut b = ReportBuilder::with_capacity(11);
    b.write_u8(TRANSACTION_DATA_OUTPUT);
    b.write_u8(output::RUMBLE_ONLY);
    b.write_u8(packet_num & 0x0f);
    b.write_bytes(&encode_rumble(
        u16::from(weak_magnitude) << 2,
        u16::from(weak_magnitude),
        500,
    ));
    b.write_bytes(&encode_rumble(
        u16::from(strong_magnitude) << 2,
        u16::from(strong_magnitude),
        500,
    ));
    WireFrame::Interrupt(b.into_bytes())
}

/// Build a rumble-only frame that stops both motors.
pub fn rumble_off_frame(packet_num: u8) -> WireFrame {
    let mut b = ReportBuilder::with_capacity(11);
    b.write_u8(TRANSACTION_DATA_OUTPUT);
    b.write_u8(output::RUMBLE_ONLY);
    b.write_u8(packet_num & 0x0f);
    b.write_bytes(&RUMBLE_OFF);
    b.write_bytes(&RUMBLE_OFF);
    WireFrame::Interrupt(b.into_bytes())
}

struct FreqData {
    high: u16,
    low: u8,
    freq: u16,
}

struct AmpData {
    high: u8,
    low: u16,
    amp: u16,
}

// Subsampled from the dekuNukem rumble data tables. The full tables step in
// ~2% increments; a coarser grid is indistinguishable on the actuator.
// https://github.com/dekuNukem/Nintendo_Switch_Reverse_Engineering/blob/master/rumble_data_table.md
static RUMBLE_FREQS: [FreqData; 24] = [
    FreqData { high: 0x0000, low: 0x01, freq: 41 },
    FreqData { high: 0x0000, low: 0x08, freq: 48 },
    FreqData { high: 0x0000, low: 0x10, freq: 57 },
    FreqData { high: 0x0000, low: 0x18, freq: 67 },
    FreqData { high: 0x0000, low: 0x20, freq: 80 },
    FreqData { high: 0x2000, low: 0x28, freq: 95 },
    FreqData { high: 0x4000, low: 0x30, freq: 113 },
    FreqData { high: 0x6000, low: 0x38, freq: 135 },
    FreqData { high: 0x8000, low: 0x40, freq: 160 },
    FreqData { high: 0xa000, low: 0x48, freq: 190 },
    FreqData { high: 0xc000, low: 0x50, freq: 226 },
    FreqData { high: 0xe000, low: 0x58, freq: 269 },
    FreqData { high: 0x0001, low: 0x60, freq: 320 },
    FreqData { high: 0x2001, low: 0x68, freq: 381 },
    FreqData { high: 0x4001, low: 0x70, freq: 453 },
    FreqData { high: 0x6001, low: 0x78, freq: 538 },
    FreqData { high: 0x8001, low: 0x00, freq: 640 },
    FreqData { high: 0x9801, low: 0x00, freq: 729 },
    FreqData { high: 0xb001, low: 0x00, freq: 830 },
    FreqData { high: 0xc801, low: 0x00, freq: 945 },
    FreqData { high: 0xd801, low: 0x00, freq: 1031 },
    FreqData { high: 0xe801, low: 0x00, freq: 1124 },
    FreqData { high: 0xf401, low: 0x00, freq: 1199 },
    FreqData { high: 0xfc01, low: 0x00, freq: 1253 },
];

static RUMBLE_AMPS: [AmpData; 20] = [
    AmpData { high: 0x00, low: 0x0040, amp: 0 },
    AmpData { high: 0x04, low: 0x0041, amp: 12 },
    AmpData { high: 0x08, low: 0x0042, amp: 17 },
    AmpData { high: 0x0c, low: 0x0043, amp: 24 },
    AmpData { high: 0x10, low: 0x0044, amp: 33 },
    AmpData { high: 0x14, low: 0x0045, amp: 47 },
    AmpData { high: 0x18, low: 0x0046, amp: 67 },
    AmpData { high: 0x1c, low: 0x0047, amp: 95 },
    AmpData { high: 0x20, low: 0x0048, amp: 117 },
    AmpData { high: 0x28, low: 0x004a, amp: 140 },
    AmpData { high: 0x30, low: 0x004c, amp: 166 },
    AmpData { high: 0x38, low: 0x004e, amp: 198 },
    AmpData { high: 0x40, low: 0x0050, amp: 230 },
    AmpData { high: 0x50, low: 0x0054, amp: 273 },
    AmpData { high: 0x60, low: 0x0058, amp: 325 },
    AmpData { high: 0x70, low: 0x005c, amp: 387 },
    AmpData { high: 0x80, low: 0x0060, amp: 460 },
    AmpData { high: 0x98, low: 0x0066, amp: 596 },
    AmpData { high: 0xb0, low: 0x006c, amp: 773 },
    AmpData { high: 0xc8, low: 0x0072, amp: 1003 },
];

fn find_freq(freq: u16) -> &'static FreqData {
    let mut i = 0;
    if freq > RUMBLE_FREQS[0].freq {
        i = RUMBLE_FREQS.len() - 1;
        for (n, entry) in RUMBLE_FREQS.iter().enumerate().skip(1) {
            if freq > RUMBLE_FREQS[n - 1].freq && freq <= entry.freq {
                i = n;
                break;
            }
        }
    }
    &RUMBLE_FREQS[i]
}

fn find_amp(amp: u16) -> &'static AmpData {
    let mut i = 0;
    if amp > RUMBLE_AMPS[0].amp {
        i = RUMBLE_AMPS.len() - 1;
        for (n, entry) in RUMBLE_AMPS.iter().enumerate().skip(1) {
            if amp > RUMBLE_AMPS[n - 1].amp && amp <= entry.amp {
                i = n;
                break;
            }
        }
    }
    &RUMBLE_AMPS[i]
}

/// Encode one 4-byte HD rumble payload from low/high frequencies in Hz and
/// a target amplitude.
pub fn encode_rumble(freq_low: u16, freq_high: u16, amp: u16) -> [u8; 4] {
    let fl = find_freq(freq_low);
    let fh = find_freq(freq_high);
    let a = find_amp(amp);

    [
        ((fh.high >> 8) & 0xff) as u8,
        ((fh.high & 0xff) as u8).wrapping_add(a.high),
        fl.low.wrapping_add(((a.low >> 8) & 0xff) as u8),
        (a.low & 0xff) as u8,
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subcmd_frame_layout() {
        let f = subcmd_frame(0x07, subcmd::REQ_DEV_INFO, &[]);
        let p = f.payload();
        assert_eq!(p.len(), 12);
        assert_eq!(p[0], TRANSACTION_DATA_OUTPUT);
        assert_eq!(p[1], output::RUMBLE_AND_SUBCMD);
        assert_eq!(p[2], 0x07);
        assert_eq!(&p[3..11], &[0u8; 8]);
        assert_eq!(p[11], subcmd::REQ_DEV_INFO);
    }

    #[test]
    fn spi_read_frame_encodes_addr_le() {
        let f = spi_read_frame(0, crate::ids::FACTORY_STICK_CAL_ADDR_LEFT, 9);
        let p = f.payload();
        assert_eq!(&p[12..17], &[0x3d, 0x60, 0x00, 0x00, 9]);
    }

    #[test]
    fn rumble_off_uses_neutral_payload() {
        let f = rumble_off_frame(3);
        let p = f.payload();
        assert_eq!(p[1], output::RUMBLE_ONLY);
        assert_eq!(&p[3..7], &RUMBLE_OFF);
        assert_eq!(&p[7..11], &RUMBLE_OFF);
    }

    #[test]
    fn zero_amp_encodes_first_table_entry() {
        let data = encode_rumble(160, 160, 0);
        assert_eq!(data, [0x80, 0x00, 0x40, 0x40]);
    }

    #[test]
    fn freq_lookup_clamps_at_table_edges() {
        assert_eq!(find_freq(1).freq, 41);
        assert_eq!(find_freq(9000).freq, 1253);
        assert_eq!(find_amp(5000).amp, 1003);
    }
}
