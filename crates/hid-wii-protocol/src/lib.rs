//! Nintendo Wii controller protocol.
//!
//! Supports the Wii Remote (both generations, sideways, upright and
//! accelerometer modes), the Nunchuk and Classic Controller extensions,
//! the Wii U Pro Controller and the Balance Board. Protocol details follow
//! wiibrew.org and the Linux `hid-wiimote` driver.
//!
//! The crate is pure: [`WiiDevice`] consumes input report bytes and
//! produces [`WireFrame`]s for the engine to queue; rumble timers live in
//! the engine.
//!
//! [`WireFrame`]: padhost_hid_common::WireFrame

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod fsm;
pub mod ids;
pub mod input;
pub mod output;

pub use fsm::{Reaction, WiiDevice, WiiFsm};
pub use ids::{DevType, ExtType, WiiMode};
pub use input::{BoardCalibration, BoardPoints};

/// Known device names, for clones that do not answer SDP queries.
pub const DEVICE_NAMES: &[(&str, u16, u16)] = &[
    ("Nintendo RVL-CNT-01", ids::NINTENDO_VID, ids::REMOTE_PID),
    ("Nintendo RVL-CNT-01-TR", ids::NINTENDO_VID, ids::REMOTE_MP_PID),
    ("Nintendo RVL-CNT-01-UC", ids::NINTENDO_VID, ids::REMOTE_MP_PID),
    ("Nintendo RVL-WBC-01", ids::NINTENDO_VID, ids::REMOTE_PID),
];
