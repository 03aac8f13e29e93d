//! Sony DualShock 4 and DualSense protocol.
//!
//! Both pads handshake over feature reports (calibration, firmware
//! version), stream extended input reports with CRC-less payloads, and take
//! CRC-trailed output reports for rumble and the lightbar. Register layouts
//! follow the Linux `hid-playstation` and `hid-sony` drivers.
//!
//! The crate is pure: [`Ds4Device`] and [`Ds5Device`] consume report bytes
//! and produce [`WireFrame`]s for the engine to queue; the engine owns the
//! transport and all timers. The touchpad doubles as a virtual mouse, fed
//! through the shared [`TouchpadTracker`].
//!
//! [`WireFrame`]: padhost_hid_common::WireFrame

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod common;
pub mod ds4;
pub mod ds5;
pub mod touchpad;

pub use common::SensorCalibration;
pub use ds4::Ds4Device;
pub use ds5::{Ds5Device, Ds5State};
pub use touchpad::{TouchPoint, TouchpadTracker};

/// Sony vendor id.
pub const SONY_VID: u16 = 0x054c;
/// DualShock 4 (first revision) product id.
pub const DS4_PID: u16 = 0x05c4;
/// DualShock 4 (second revision) product id.
pub const DS4_V2_PID: u16 = 0x09cc;
/// DualSense product id.
pub const DS5_PID: u16 = ds5::DS5_PID;
/// DualSense Edge product id.
pub const DS5_EDGE_PID: u16 = ds5::DS5_EDGE_PID;

/// Known device names, for clones that do not answer SDP queries.
pub const DEVICE_NAMES: &[(&str, u16, u16)] = &[
    ("Wireless Controller", SONY_VID, DS4_V2_PID),
    ("DualSense Wireless Controller", SONY_VID, DS5_PID),
    ("DualSense Edge Wireless Controller", SONY_VID, DS5_EDGE_PID),
];
