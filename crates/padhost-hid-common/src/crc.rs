//! CRC-32 trailer for Sony output reports.
//!
//! DualShock 4 and DualSense Bluetooth output reports end in a little-endian
//! IEEE CRC-32 computed over every byte before the trailer, including the
//! `0xa2` transaction header.

/// Compute the trailer value for `body` (all report bytes before the CRC).
pub fn sony_report_crc(body: &[u8]) -> u32 {
    crc32fast::hash(body)
}

/// Append the 4-byte little-endian CRC trailer to a finished report body.
pub fn append_sony_crc(report: &mut Vec<u8>) {
    let crc = sony_report_crc(report);
    report.extend_from_slice(&crc.to_le_bytes());
}

/// Check the trailer of a received CRC-trailed report.
///
/// Returns `false` when the report is too short to carry a trailer.
pub fn verify_sony_crc(report: &[u8]) -> bool {
    if report.len() < 4 {
        return false;
    }
    let (body, trailer) = report.split_at(report.len() - 4);
    let got = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    sony_report_crc(body) == got
}
