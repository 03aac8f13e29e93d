//! Cursor-style readers and writers for fixed-layout HID reports.

use padhost_errors::ReportError;

/// Borrowed cursor over a received report.
///
/// All reads are bounds-checked and return [`ReportError::Truncated`] past
/// the end; codecs propagate that with `?` and leave the controller snapshot
/// untouched.
pub struct ReportParser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ReportParser<'a> {
    /// Create a parser over `data` with the cursor at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes left between the cursor and the end of the report.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Current cursor offset.
    pub fn position(&self) -> usize {
        self.position
    }

    fn truncated(&self) -> ReportError {
        ReportError::Truncated {
            offset: self.position,
            len: self.data.len(),
        }
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, ReportError> {
        let value = *self.data.get(self.position).ok_or_else(|| self.truncated())?;
        self.position += 1;
        Ok(value)
    }

    /// Read one signed byte.
    pub fn read_i8(&mut self) -> Result<i8, ReportError> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16, ReportError> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    /// Read a little-endian i16.
    pub fn read_i16_le(&mut self) -> Result<i16, ReportError> {
        Ok(self.read_u16_le()? as i16)
    }

    /// Read a big-endian u16 (Wii memory reports use network order).
    pub fn read_u16_be(&mut self) -> Result<u16, ReportError> {
        let hi = self.read_u8()? as u16;
        let lo = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, ReportError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read `count` bytes as a borrowed slice.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ReportError> {
        let end = self
            .position
            .checked_add(count)
            .filter(|&e| e <= self.data.len())
            .ok_or_else(|| self.truncated())?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, ReportError> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| self.truncated())
    }

    /// Advance the cursor, clamped to the end of the report.
    pub fn skip(&mut self, count: usize) {
        self.position = (self.position + count).min(self.data.len());
    }
}

/// Growable builder for outgoing reports.
pub struct ReportBuilder {
    buffer: Vec<u8>,
}

impl ReportBuilder {
    /// Create an empty builder with `capacity` reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Append one byte.
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Append a little-endian u16.
    pub fn write_u16_le(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append a little-endian u32.
    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Append `count` zero bytes.
    pub fn pad(&mut self, count: usize) -> &mut Self {
        self.buffer.resize(self.buffer.len() + count, 0);
        self
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the builder and return the report bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_mixed_widths() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0xff];
        let mut p = ReportParser::new(&data);
        assert_eq!(p.read_u8().unwrap(), 0x01);
        assert_eq!(p.read_u16_le().unwrap(), 0x1234);
        assert_eq!(p.read_u16_be().unwrap(), 0x7856);
        assert_eq!(p.read_i8().unwrap(), -1);
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut p = ReportParser::new(&[0xaa]);
        assert_eq!(p.read_u8().unwrap(), 0xaa);
        let err = p.read_u16_le().expect_err("past end");
        assert_eq!(
            err,
            padhost_errors::ReportError::Truncated { offset: 1, len: 1 }
        );
    }

    #[test]
    fn skip_clamps() {
        let mut p = ReportParser::new(&[1, 2, 3]);
        p.skip(10);
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn builder_round_trip() {
        let mut b = ReportBuilder::with_capacity(8);
        b.write_u8(0xa2).write_u16_le(0xbeef).pad(2);
        assert_eq!(b.into_bytes(), vec![0xa2, 0xef, 0xbe, 0x00, 0x00]);
    }
}
