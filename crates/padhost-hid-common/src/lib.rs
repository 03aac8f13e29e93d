//! Shared HID wire plumbing for the padhost controller stack.
//!
//! Everything in this crate is I/O-free. It provides:
//!
//! - [`ReportParser`] / [`ReportBuilder`]: cursor-style byte readers and
//!   writers used by every family codec.
//! - [`normalize`]: integer axis/pedal/hat normalization shared by the
//!   usage-stream codecs.
//! - [`crc`]: the CRC-32 trailer used by Sony output reports.
//! - [`descriptor`]: a small HID report-descriptor parser plus a report
//!   walker that turns raw input reports into `(usage page, usage, value)`
//!   events.
//! - [`usage`]: the HID usage-page/usage constants the codecs care about.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod crc;
pub mod descriptor;
pub mod normalize;
pub mod report_parser;
pub mod usage;

pub use descriptor::{DescriptorError, ReportDescriptor, UsageEvent};
pub use normalize::HidGlobals;
pub use report_parser::{ReportBuilder, ReportParser};

/// Bluetooth HID transaction header for outgoing DATA/output reports.
///
/// `(HID_MESSAGE_TYPE_DATA << 4) | HID_REPORT_TYPE_OUTPUT`.
pub const TRANSACTION_DATA_OUTPUT: u8 = 0xa2;

/// Bluetooth HID transaction header for a GET_REPORT of a feature report.
///
/// `(HID_MESSAGE_TYPE_GET_REPORT << 4) | HID_REPORT_TYPE_FEATURE`.
pub const TRANSACTION_GET_FEATURE: u8 = 0x43;

/// A single outgoing frame, tagged with the L2CAP channel it belongs on.
///
/// Family codecs emit these; the engine owns the transport and the queueing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// Send on the interrupt channel (input/output reports).
    Interrupt(Vec<u8>),
    /// Send on the control channel (GET_REPORT / SET_REPORT requests).
    Control(Vec<u8>),
}

impl WireFrame {
    /// Payload bytes regardless of channel.
    pub fn payload(&self) -> &[u8] {
        match self {
            WireFrame::Interrupt(b) | WireFrame::Control(b) => b,
        }
    }
}
