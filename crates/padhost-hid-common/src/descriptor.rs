//! HID report-descriptor parsing and input-report walking.
//!
//! Families without a fixed wire format (Xbox Wireless, generic gamepads,
//! mice, keyboards) are decoded usage-by-usage: the descriptor is parsed
//! once at bind time into a flat field table, and every incoming input
//! report is then walked against that table, emitting one [`UsageEvent`]
//! per declared field.
//!
//! Only short items are handled; long items do not occur in controller
//! descriptors. Output and feature items are skipped — the walker only
//! drives input decoding.

use crate::normalize::HidGlobals;

/// Errors raised while parsing a descriptor or walking a report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Descriptor ended in the middle of an item.
    #[error("Descriptor truncated at offset {0}")]
    Truncated(usize),

    /// Descriptor declared no input fields at all.
    #[error("Descriptor contains no input items")]
    NoInputItems,

    /// Report started with an id the descriptor never declared.
    #[error("Report id {0:#04x} not declared by descriptor")]
    UnknownReportId(u8),

    /// Report too short for the fields the descriptor declares.
    #[error("Report too short: {got} bytes, fields need {want} bits")]
    ReportTooShort {
        /// Bytes in the received report (after the id byte).
        got: usize,
        /// Bits the field table covers.
        want: usize,
    },
}

/// One `(usage page, usage, value)` triple produced by the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageEvent {
    /// HID usage page of the field.
    pub page: u16,
    /// Usage within the page.
    pub usage: u16,
    /// Field value, sign-extended when the logical minimum is negative.
    pub value: i32,
    /// Logical bounds for normalization.
    pub globals: HidGlobals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldKind {
    /// One usage per element; the last usage repeats when the descriptor
    /// declares fewer usages than elements.
    Variable { usages: Vec<u16> },
    /// Element value *is* the usage (keyboard key arrays).
    Array,
    /// Constant filler bits.
    Padding,
}

#[derive(Debug, Clone)]
struct Field {
    report_id: Option<u8>,
    page: u16,
    kind: FieldKind,
    bit_size: u8,
    count: u16,
    globals: HidGlobals,
}

/// Parsed descriptor: a flat, ordered table of input fields.
#[derive(Debug, Clone)]
pub struct ReportDescriptor {
    fields: Vec<Field>,
    uses_report_ids: bool,
}

// Item prefix constants
const TYPE_MAIN: u8 = 0;
const TYPE_GLOBAL: u8 = 1;
const TYPE_LOCAL: u8 = 2;

const MAIN_INPUT: u8 = 0x8;
const MAIN_COLLECTION: u8 = 0xa;
const MAIN_END_COLLECTION: u8 = 0xc;

const GLOBAL_USAGE_PAGE: u8 = 0x0;
const GLOBAL_LOGICAL_MIN: u8 = 0x1;
const GLOBAL_LOGICAL_MAX: u8 = 0x2;
const GLOBAL_REPORT_SIZE: u8 = 0x7;
const GLOBAL_REPORT_ID: u8 = 0x8;
const GLOBAL_REPORT_COUNT: u8 = 0x9;

const LOCAL_USAGE: u8 = 0x0;
const LOCAL_USAGE_MIN: u8 = 0x1;
const LOCAL_USAGE_MAX: u8 = 0x2;

const INPUT_CONSTANT: u32 = 1 << 0;
const INPUT_VARIABLE: u32 = 1 << 1;

#[derive(Debug, Clone, Copy, Default)]
struct GlobalState {
    page: u16,
    logical_min: i32,
    logical_max: i32,
    report_size: u8,
    report_count: u16,
    report_id: Option<u8>,
}

impl ReportDescriptor {
    /// Parse a raw report descriptor into an input field table.
    pub fn parse(desc: &[u8]) -> Result<Self, DescriptorError> {
        let mut fields = Vec::new();
        let mut globals = GlobalState::default();
        let mut usages: Vec<u16> = Vec::new();
        let mut usage_range: Option<(u16, u16)> = None;

        let mut pos = 0usize;
        while pos < desc.len() {
            let prefix = desc[pos];
            pos += 1;
            let size = match prefix & 0x03 {
                3 => 4usize,
                n => n as usize,
            };
            let tag = prefix >> 4;
            let item_type = (prefix >> 2) & 0x03;

            if pos + size > desc.len() {
                return Err(DescriptorError::Truncated(pos));
            }
            let data = &desc[pos..pos + size];
            pos += size;

            let unsigned = data
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | b as u32);
            // Sign-extend for the globals that are signed by spec.
            let signed = match size {
                1 => data[0] as i8 as i32,
                2 => u16::from_le_bytes([data[0], data[1]]) as i16 as i32,
                4 => unsigned as i32,
                _ => 0,
            };

            match item_type {
                TYPE_GLOBAL => match tag {
                    GLOBAL_USAGE_PAGE => globals.page = unsigned as u16,
                    GLOBAL_LOGICAL_MIN => globals.logical_min = signed,
                    GLOBAL_LOGICAL_MAX => globals.logical_max = signed,
                    GLOBAL_REPORT_SIZE => globals.report_size = unsigned as u8,
                    GLOBAL_REPORT_ID => globals.report_id = Some(unsigned as u8),
                    GLOBAL_REPORT_COUNT => globals.report_count = unsigned as u16,
                    _ => {}
                },
                TYPE_LOCAL => match tag {
                    LOCAL_USAGE => usages.push(unsigned as u16),
                    LOCAL_USAGE_MIN => {
                        let max = usage_range.map(|(_, m)| m).unwrap_or(0);
                        usage_range = Some((unsigned as u16, max));
                    }
                    LOCAL_USAGE_MAX => {
                        let min = usage_range.map(|(m, _)| m).unwrap_or(0);
                        usage_range = Some((min, unsigned as u16));
                    }
                    _ => {}
                },
                TYPE_MAIN => {
                    if tag == MAIN_INPUT {
                        fields.push(Self::build_field(
                            &globals,
                            &mut usages,
                            usage_range.take(),
                            unsigned,
                        ));
                    } else if tag == MAIN_COLLECTION || tag == MAIN_END_COLLECTION {
                        // Collections do not affect field layout.
                    }
                    // Locals reset after every main item.
                    usages.clear();
                    usage_range = None;
                }
                _ => {}
            }
        }

        if fields.is_empty() {
            return Err(DescriptorError::NoInputItems);
        }
        let uses_report_ids = fields.iter().any(|f| f.report_id.is_some());
        Ok(Self {
            fields,
            uses_report_ids,
        })
    }

    fn build_field(
        globals: &GlobalState,
        usages: &mut Vec<u16>,
        usage_range: Option<(u16, u16)>,
        input_flags: u32,
    ) -> Field {
        let hid_globals = HidGlobals {
            logical_minimum: globals.logical_min,
            logical_maximum: globals.logical_max,
            report_size: globals.report_size,
        };

        let kind = if input_flags & INPUT_CONSTANT != 0 {
            FieldKind::Padding
        } else if input_flags & INPUT_VARIABLE != 0 {
            let mut list = std::mem::take(usages);
            if let Some((min, max)) = usage_range {
                list.extend(min..=max);
            }
            FieldKind::Variable { usages: list }
        } else {
            FieldKind::Array
        };

        Field {
            report_id: globals.report_id,
            page: globals.page,
            kind,
            bit_size: globals.report_size,
            count: globals.report_count,
            globals: hid_globals,
        }
    }

    /// True when reports start with a report-id byte.
    pub fn uses_report_ids(&self) -> bool {
        self.uses_report_ids
    }

    /// Walk an input report, emitting one event per declared field element.
    pub fn walk_input<F>(&self, report: &[u8], mut emit: F) -> Result<(), DescriptorError>
    where
        F: FnMut(UsageEvent),
    {
        let (report_id, payload) = if self.uses_report_ids {
            let (&id, rest) = report
                .split_first()
                .ok_or(DescriptorError::ReportTooShort { got: 0, want: 8 })?;
            (Some(id), rest)
        } else {
            (None, report)
        };

        let fields: Vec<&Field> = self
            .fields
            .iter()
            .filter(|f| f.report_id == report_id)
            .collect();
        if fields.is_empty() {
            return Err(DescriptorError::UnknownReportId(report_id.unwrap_or(0)));
        }

        let total_bits: usize = fields
            .iter()
            .map(|f| f.bit_size as usize * f.count as usize)
            .sum();
        if payload.len() * 8 < total_bits {
            return Err(DescriptorError::ReportTooShort {
                got: payload.len(),
                want: total_bits,
            });
        }

        let mut bit = 0usize;
        for field in fields {
            for i in 0..field.count as usize {
                let raw = extract_bits(payload, bit, field.bit_size);
                bit += field.bit_size as usize;

                match &field.kind {
                    FieldKind::Padding => {}
                    FieldKind::Variable { usages } => {
                        if usages.is_empty() {
                            continue;
                        }
                        let usage = usages[i.min(usages.len() - 1)];
                        let value = sign_extend(raw, field.bit_size, &field.globals);
                        emit(UsageEvent {
                            page: field.page,
                            usage,
                            value,
                            globals: field.globals,
                        });
                    }
                    FieldKind::Array => {
                        // The element value is itself the usage id; zero
                        // means "no key in this slot".
                        if raw != 0 {
                            emit(UsageEvent {
                                page: field.page,
                                usage: raw as u16,
                                value: 1,
                                globals: field.globals,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fields wider than 32 bits keep their declared width in the report
/// layout but only the low 32 bits land in the value.
fn extract_bits(data: &[u8], bit_offset: usize, bit_size: u8) -> u32 {
    let mut value = 0u32;
    for i in 0..usize::from(bit_size).min(32) {
        let bit = bit_offset + i;
        let byte = data[bit / 8];
        if byte & (1 << (bit % 8)) != 0 {
            value |= 1 << i;
        }
    }
    value
}

fn sign_extend(raw: u32, bit_size: u8, globals: &HidGlobals) -> i32 {
    if globals.logical_minimum >= 0 || bit_size == 0 || bit_size >= 32 {
        return raw as i32;
    }
    let sign_bit = 1u32 << (bit_size - 1);
    if raw & sign_bit != 0 {
        (raw | !(sign_bit | (sign_bit - 1))) as i32
    } else {
        raw as i32
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Minimal joystick: report id 1, X/Y as u8, 4 buttons + 4 bits padding.
    fn joystick_descriptor() -> Vec<u8> {
        vec![
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x04, // Usage (Joystick)
            0xa1, 0x01, // Collection (Application)
            0x85, 0x01, //   Report ID (1)
            0x09, 0x30, //   Usage (X)
            0x09, 0x31, //   Usage (Y)
            0x15, 0x00, //   Logical Minimum (0)
            0x26, 0xff, 0x00, //   Logical Maximum (255)
            0x75, 0x08, //   Report Size (8)
            0x95, 0x02, //   Report Count (2)
            0x81, 0x02, //   Input (Data,Var,Abs)
            0x05, 0x09, //   Usage Page (Button)
            0x19, 0x01, //   Usage Minimum (1)
            0x29, 0x04, //   Usage Maximum (4)
            0x25, 0x01, //   Logical Maximum (1)
            0x75, 0x01, //   Report Size (1)
            0x95, 0x04, //   Report Count (4)
            0x81, 0x02, //   Input (Data,Var,Abs)
            0x75, 0x04, //   Report Size (4)
            0x95, 0x01, //   Report Count (1)
            0x81, 0x03, //   Input (Const)
            0xc0, // End Collection
        ]
    }

    #[test]
    fn parses_and_walks_variable_fields() {
        let desc = ReportDescriptor::parse(&joystick_descriptor()).unwrap();
        assert!(desc.uses_report_ids());

        let mut events = Vec::new();
        // X = 0x40, Y = 0xc0, buttons 1 and 3 pressed.
        desc.walk_input(&[0x01, 0x40, 0xc0, 0b0000_0101], |e| events.push(e))
            .unwrap();

        assert_eq!(events.len(), 6);
        assert_eq!(events[0].usage, 0x30);
        assert_eq!(events[0].value, 0x40);
        assert_eq!(events[1].usage, 0x31);
        assert_eq!(events[1].value, 0xc0);
        let pressed: Vec<u16> = events[2..]
            .iter()
            .filter(|e| e.value != 0)
            .map(|e| e.usage)
            .collect();
        assert_eq!(pressed, vec![1, 3]);
    }

    #[test]
    fn unknown_report_id_is_rejected() {
        let desc = ReportDescriptor::parse(&joystick_descriptor()).unwrap();
        let err = desc.walk_input(&[0x07, 0, 0, 0], |_| {}).unwrap_err();
        assert_eq!(err, DescriptorError::UnknownReportId(0x07));
    }

    #[test]
    fn short_report_is_rejected() {
        let desc = ReportDescriptor::parse(&joystick_descriptor()).unwrap();
        let err = desc.walk_input(&[0x01, 0x40], |_| {}).unwrap_err();
        assert!(matches!(err, DescriptorError::ReportTooShort { .. }));
    }

    #[test]
    fn signed_fields_sign_extend() {
        // Mouse-style relative X/Y, i8.
        let desc = ReportDescriptor::parse(&[
            0x05, 0x01, // Usage Page (Generic Desktop)
            0x09, 0x02, // Usage (Mouse)
            0xa1, 0x01, // Collection
            0x09, 0x30, //   Usage (X)
            0x09, 0x31, //   Usage (Y)
            0x15, 0x81, //   Logical Minimum (-127)
            0x25, 0x7f, //   Logical Maximum (127)
            0x75, 0x08, //   Report Size (8)
            0x95, 0x02, //   Report Count (2)
            0x81, 0x06, //   Input (Data,Var,Rel)
            0xc0,
        ])
        .unwrap();

        let mut events = Vec::new();
        desc.walk_input(&[0xff, 0x05], |e| events.push(e)).unwrap();
        assert_eq!(events[0].value, -1);
        assert_eq!(events[1].value, 5);
    }

    #[test]
    fn keyboard_array_emits_key_usages() {
        let desc = ReportDescriptor::parse(&[
            0x05, 0x07, // Usage Page (Keyboard)
            0x19, 0x00, // Usage Minimum (0)
            0x29, 0xff, // Usage Maximum (255)
            0x15, 0x00, // Logical Minimum (0)
            0x26, 0xff, 0x00, // Logical Maximum (255)
            0x75, 0x08, // Report Size (8)
            0x95, 0x06, // Report Count (6)
            0x81, 0x00, // Input (Data,Array)
        ])
        .unwrap();

        let mut keys = Vec::new();
        desc.walk_input(&[0x04, 0x00, 0x16, 0, 0, 0], |e| keys.push(e.usage))
            .unwrap();
        assert_eq!(keys, vec![0x04, 0x16]);
    }

    #[test]
    fn oversized_field_truncates_but_keeps_layout() {
        // A 64-bit vendor field followed by an 8-bit button byte. The
        // walker must not shift past 32 bits and must still skip the full
        // 64 bits before the next field.
        let desc = ReportDescriptor::parse(&[
            0x06, 0x00, 0xff, // Usage Page (Vendor)
            0x09, 0x01, // Usage (1)
            0x15, 0x00, // Logical Minimum (0)
            0x25, 0x7f, // Logical Maximum (127)
            0x75, 0x40, // Report Size (64)
            0x95, 0x01, // Report Count (1)
            0x81, 0x02, // Input (Data,Var,Abs)
            0x09, 0x02, // Usage (2)
            0x75, 0x08, // Report Size (8)
            0x81, 0x02, // Input (Data,Var,Abs)
        ])
        .unwrap();

        let mut events = Vec::new();
        desc.walk_input(
            &[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x55],
            |e| events.push(e),
        )
        .unwrap();

        assert_eq!(events.len(), 2);
        // Low 32 bits of the wide field, little-endian.
        assert_eq!(events[0].value, 0x7856_3412);
        assert_eq!(events[1].usage, 2);
        assert_eq!(events[1].value, 0x55);
    }

    #[test]
    fn empty_descriptor_rejected() {
        assert_eq!(
            ReportDescriptor::parse(&[]).unwrap_err(),
            DescriptorError::NoInputItems
        );
    }
}
